pub mod cache;
pub mod forward;
#[cfg(feature = "mock")]
pub mod mock;
pub mod prelude;
pub mod recursive;

use corvid_proto::packet::question::Question;
use corvid_proto::packet::record::Record;
use prelude::{ResolveError, Resolver};
use tokio::time::{Duration, Instant};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChainBuilderError {
    NoResolver,
}

/// One link of the chain: a resolver, a name for the logs, whether its
/// errors abort the chain and how long a single pass through it may take.
#[derive(Debug)]
pub struct ChainLink {
    resolver: Box<dyn Resolver>,
    name: String,
    skip_on_error: bool,
    timeout: Duration,
}

#[derive(Debug, Default)]
pub struct ChainResolverBuilder {
    links: Vec<ChainLink>,
    stop_on_nxdomain: Option<bool>,
}

impl ChainResolverBuilder {
    pub fn add_link(
        &mut self,
        resolver: Box<dyn Resolver>,
        name: impl Into<String>,
        skip_on_error: bool,
        timeout: Duration,
    ) {
        self.links.push(ChainLink {
            resolver,
            name: name.into(),
            skip_on_error,
            timeout,
        });
    }

    pub fn with_link(
        mut self,
        resolver: Box<dyn Resolver>,
        name: impl Into<String>,
        skip_on_error: bool,
        timeout: Duration,
    ) -> Self {
        self.add_link(resolver, name, skip_on_error, timeout);
        self
    }

    /// Whether a name error from a link ends the chain. Defaults to true,
    /// an authoritative negative is a definitive result.
    pub fn with_stop_on_nxdomain(mut self, value: bool) -> Self {
        self.stop_on_nxdomain = Some(value);
        self
    }

    pub fn build(self) -> Result<ChainResolver, ChainBuilderError> {
        if self.links.is_empty() {
            return Err(ChainBuilderError::NoResolver);
        }
        Ok(ChainResolver {
            links: self.links,
            stop_on_nxdomain: self.stop_on_nxdomain.unwrap_or(true),
        })
    }
}

/// Consults an ordered list of resolvers until one produces a definitive
/// answer: the first non-empty answer set wins, a name error stops the
/// walk when configured so, other errors continue or propagate per link.
#[derive(Debug)]
pub struct ChainResolver {
    links: Vec<ChainLink>,
    stop_on_nxdomain: bool,
}

impl ChainResolver {
    pub fn builder() -> ChainResolverBuilder {
        ChainResolverBuilder::default()
    }
}

#[async_trait::async_trait]
impl Resolver for ChainResolver {
    fn kind(&self) -> &'static str {
        "chain"
    }

    async fn resolve(
        &self,
        question: &Question,
        deadline: Instant,
    ) -> Result<Vec<Record>, ResolveError> {
        let mut last_error = ResolveError::NoAnswer;
        for link in &self.links {
            let link_deadline = deadline.min(Instant::now() + link.timeout);
            match link.resolver.resolve(question, link_deadline).await {
                Ok(answers) if !answers.is_empty() => return Ok(answers),
                Ok(_) => {
                    tracing::debug!("link {} had nothing, moving on", link.name);
                }
                Err(error) if error.is_nxdomain() && self.stop_on_nxdomain => {
                    return Err(error);
                }
                Err(error) => {
                    if Instant::now() >= deadline {
                        return Err(ResolveError::DeadlineExceeded);
                    }
                    if !link.skip_on_error {
                        return Err(error);
                    }
                    tracing::debug!("link {} failed: {error}, moving on", link.name);
                    last_error = error;
                }
            }
        }
        Err(last_error)
    }
}
