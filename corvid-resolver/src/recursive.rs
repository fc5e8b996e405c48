use crate::forward::exchange;
use crate::prelude::{ResolveError, Resolver};
use corvid_proto::packet::header::ResponseCode;
use corvid_proto::packet::question::Question;
use corvid_proto::packet::record::Record;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tokio::time::Instant;

/// A stub of a recursive resolver: it asks the configured root servers
/// once and returns whatever direct answers come back. It cannot chase
/// referrals; the forwarding resolver is the production path.
pub struct RecursiveResolver {
    socket: UdpSocket,
    root_servers: Vec<String>,
}

impl std::fmt::Debug for RecursiveResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecursiveResolver")
            .field("root_servers", &self.root_servers)
            .finish()
    }
}

impl RecursiveResolver {
    pub async fn new(bind: SocketAddr, root_servers: Vec<String>) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(bind).await?;
        Ok(Self {
            socket,
            root_servers,
        })
    }
}

#[async_trait::async_trait]
impl Resolver for RecursiveResolver {
    fn kind(&self) -> &'static str {
        "recursive"
    }

    #[tracing::instrument(skip(self, question), fields(name = %question.name))]
    async fn resolve(
        &self,
        question: &Question,
        deadline: Instant,
    ) -> Result<Vec<Record>, ResolveError> {
        if self.root_servers.is_empty() {
            return Err(ResolveError::Unsupported("no root server configured"));
        }
        let mut last_error = ResolveError::NoAnswer;
        for server in &self.root_servers {
            match exchange(&self.socket, server, question, deadline).await {
                Ok(response) => {
                    if response.header.response_code != ResponseCode::NoError {
                        return Err(ResolveError::Upstream {
                            rcode: response.header.response_code,
                        });
                    }
                    if !response.answers.is_empty() {
                        return Ok(response.answers);
                    }
                    // a referral would live in the authority section and
                    // this stub does not follow referrals
                    last_error = ResolveError::Unsupported("cannot chase referrals");
                }
                Err(ResolveError::DeadlineExceeded) => return Err(ResolveError::DeadlineExceeded),
                Err(error) => {
                    tracing::debug!("root server {server} failed: {error}");
                    last_error = error;
                }
            }
        }
        Err(last_error)
    }
}
