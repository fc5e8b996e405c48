use corvid_proto::packet::header::ResponseCode;
use corvid_proto::packet::question::Question;
use corvid_proto::packet::record::Record;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error("upstream answered with {rcode:?}")]
    Upstream { rcode: ResponseCode },
    #[error("network failure: {0}")]
    Network(String),
    #[error("no answer")]
    NoAnswer,
    #[error("not supported: {0}")]
    Unsupported(&'static str),
}

impl ResolveError {
    pub fn network(error: impl std::fmt::Display) -> Self {
        Self::Network(error.to_string())
    }

    /// A definitive negative answer from an authority.
    pub fn is_nxdomain(&self) -> bool {
        matches!(
            self,
            Self::Upstream {
                rcode: ResponseCode::NameError
            }
        )
    }
}

/// A single strategy for answering a question. Implementations respect
/// the deadline: once it passed, in-flight reads are abandoned and the
/// call returns `ResolveError::DeadlineExceeded`.
#[async_trait::async_trait]
pub trait Resolver: Send + Sync + std::fmt::Debug {
    fn kind(&self) -> &'static str;

    async fn resolve(
        &self,
        question: &Question,
        deadline: Instant,
    ) -> Result<Vec<Record>, ResolveError>;
}
