use crate::prelude::{ResolveError, Resolver};
use corvid_proto::packet::question::Question;
use corvid_proto::packet::record::Record;
use moka::future::Cache;
use std::time::{Duration, SystemTime};
use tokio::time::Instant;

/// (canonical name, qtype, qclass)
type CacheKey = (String, u16, u16);

/// Caches the answers of any inner resolver. Entries expire after the
/// configured time to live and are evicted lazily when a lookup finds
/// them stale.
pub struct CacheResolver<R> {
    inner: R,
    cache: Cache<CacheKey, (SystemTime, Vec<Record>)>,
    ttl: Duration,
}

impl<R: Resolver> std::fmt::Debug for CacheResolver<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheResolver")
            .field("inner", &self.inner)
            .field("ttl", &self.ttl)
            .finish()
    }
}

fn cache_key(question: &Question) -> CacheKey {
    (
        question.name.canonical(),
        question.qtype.into_num(),
        question.qclass as u16,
    )
}

impl<R: Resolver> CacheResolver<R> {
    pub fn new(inner: R, size: u64, ttl: Duration) -> Self {
        Self {
            inner,
            cache: Cache::new(size),
            ttl,
        }
    }
}

#[async_trait::async_trait]
impl<R: Resolver> Resolver for CacheResolver<R> {
    fn kind(&self) -> &'static str {
        "cache"
    }

    #[tracing::instrument(skip(self, question), fields(name = %question.name))]
    async fn resolve(
        &self,
        question: &Question,
        deadline: Instant,
    ) -> Result<Vec<Record>, ResolveError> {
        let key = cache_key(question);
        if let Some((until, records)) = self.cache.get(&key) {
            let now = SystemTime::now();
            if let Ok(remaining) = until.duration_since(now) {
                tracing::debug!(
                    "found in cache with {} seconds remaining",
                    remaining.as_secs()
                );
                return Ok(records
                    .iter()
                    .map(|record| record.delayed_ttl(remaining.as_secs() as u32))
                    .collect());
            }
            tracing::debug!("found in cache but expired");
            self.cache.invalidate(&key).await;
        }

        let answers = self.inner.resolve(question, deadline).await?;
        if !answers.is_empty() {
            let until = SystemTime::now() + self.ttl;
            self.cache.insert(key, (until, answers.clone())).await;
        }
        Ok(answers)
    }
}

#[cfg(test)]
mod tests {
    use super::CacheResolver;
    use crate::mock::{CountingResolver, MockResolver};
    use crate::prelude::{ResolveError, Resolver};
    use corvid_proto::packet::question::Question;
    use corvid_proto::packet::record::Record;
    use corvid_proto::packet::QueryType;
    use std::net::Ipv4Addr;
    use std::time::{Duration, SystemTime};
    use tokio::time::Instant;

    fn question(name: &str) -> Question {
        Question::new(name.parse().unwrap(), QueryType::A)
    }

    fn answer(name: &str) -> Record {
        Record::A {
            domain: name.parse().unwrap(),
            addr: Ipv4Addr::new(10, 0, 0, 1),
            ttl: 180,
        }
    }

    fn deadline() -> Instant {
        Instant::now() + Duration::from_secs(1)
    }

    #[tokio::test]
    async fn should_serve_second_lookup_from_cache() {
        let inner = CountingResolver::new(
            MockResolver::default().with_answers("perdu.com", QueryType::A, vec![answer("perdu.com")]),
        );
        let counter = inner.counter();
        let resolver = CacheResolver::new(inner, 10, Duration::from_secs(60));

        let first = resolver.resolve(&question("perdu.com"), deadline()).await.unwrap();
        let second = resolver.resolve(&question("perdu.com"), deadline()).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn should_rewrite_remaining_ttl_on_hit() {
        let inner =
            MockResolver::default().with_answers("perdu.com", QueryType::A, vec![answer("perdu.com")]);
        let resolver = CacheResolver::new(inner, 10, Duration::from_secs(60));
        resolver.resolve(&question("perdu.com"), deadline()).await.unwrap();
        let found = resolver.resolve(&question("perdu.com"), deadline()).await.unwrap();
        assert!(found[0].ttl() <= 60);
    }

    #[tokio::test]
    async fn should_evict_expired_entry_and_ask_inner_again() {
        let inner = CountingResolver::new(
            MockResolver::default().with_answers("perdu.com", QueryType::A, vec![answer("perdu.com")]),
        );
        let counter = inner.counter();
        let resolver = CacheResolver::new(inner, 10, Duration::from_secs(60));
        // plant an already expired entry
        resolver
            .cache
            .insert(
                super::cache_key(&question("perdu.com")),
                (
                    SystemTime::now() - Duration::from_secs(10),
                    vec![answer("perdu.com")],
                ),
            )
            .await;

        let found = resolver.resolve(&question("perdu.com"), deadline()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 1);
        // the stale entry was dropped before the refill
        assert!(resolver
            .cache
            .get(&super::cache_key(&question("perdu.com")))
            .is_some());
    }

    #[tokio::test]
    async fn should_not_cache_errors_or_empty_answers() {
        let inner = CountingResolver::new(MockResolver::default());
        let counter = inner.counter();
        let resolver = CacheResolver::new(inner, 10, Duration::from_secs(60));
        for _ in 0..2 {
            let error = resolver
                .resolve(&question("missing.com"), deadline())
                .await
                .unwrap_err();
            assert_eq!(error, ResolveError::NoAnswer);
        }
        assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cache_key_should_fold_case() {
        let inner = CountingResolver::new(
            MockResolver::default().with_answers("perdu.com", QueryType::A, vec![answer("perdu.com")]),
        );
        let counter = inner.counter();
        let resolver = CacheResolver::new(inner, 10, Duration::from_secs(60));
        resolver.resolve(&question("perdu.com"), deadline()).await.unwrap();
        resolver.resolve(&question("PERDU.COM"), deadline()).await.unwrap();
        assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
