use crate::prelude::{ResolveError, Resolver};
use corvid_proto::packet::question::Question;
use corvid_proto::packet::record::Record;
use corvid_proto::packet::QueryType;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::Instant;

/// Answers from a fixed table, `NoAnswer` for everything else.
#[derive(Debug, Default)]
pub struct MockResolver {
    responses: Vec<(String, QueryType, Vec<Record>)>,
}

impl MockResolver {
    pub fn with_answers(
        mut self,
        name: impl Into<String>,
        qtype: QueryType,
        records: Vec<Record>,
    ) -> Self {
        self.responses.push((name.into(), qtype, records));
        self
    }
}

#[async_trait::async_trait]
impl Resolver for MockResolver {
    fn kind(&self) -> &'static str {
        "mock"
    }

    async fn resolve(
        &self,
        question: &Question,
        _deadline: Instant,
    ) -> Result<Vec<Record>, ResolveError> {
        self.responses
            .iter()
            .find(|(name, qtype, _)| question.name == name.as_str() && question.qtype == *qtype)
            .map(|(_, _, records)| records.clone())
            .ok_or(ResolveError::NoAnswer)
    }
}

/// Fails every resolution with a fixed error.
#[derive(Debug)]
pub struct FailingResolver {
    error: ResolveError,
}

impl FailingResolver {
    pub fn new(error: ResolveError) -> Self {
        Self { error }
    }
}

impl Default for FailingResolver {
    fn default() -> Self {
        Self::new(ResolveError::Network("mock failure".into()))
    }
}

#[async_trait::async_trait]
impl Resolver for FailingResolver {
    fn kind(&self) -> &'static str {
        "failing"
    }

    async fn resolve(
        &self,
        _question: &Question,
        _deadline: Instant,
    ) -> Result<Vec<Record>, ResolveError> {
        Err(self.error.clone())
    }
}

/// Counts how often the wrapped resolver is invoked.
#[derive(Debug)]
pub struct CountingResolver<R> {
    inner: R,
    calls: Arc<AtomicUsize>,
}

impl<R: Resolver> CountingResolver<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait::async_trait]
impl<R: Resolver> Resolver for CountingResolver<R> {
    fn kind(&self) -> &'static str {
        "counting"
    }

    async fn resolve(
        &self,
        question: &Question,
        deadline: Instant,
    ) -> Result<Vec<Record>, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.resolve(question, deadline).await
    }
}
