use corvid_proto::name::DomainName;
use corvid_proto::packet::record::Record;
use corvid_proto::packet::QueryType;
use corvid_resolver::prelude::Resolver;
use corvid_store::{QueryOptions, RecordStore, StoreError};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStats {
    pub running: bool,
    pub address: SocketAddr,
    pub upstream_type: String,
}

/// The management surface of a running server: record edits, liveness
/// stats and teardown, consumed by external management glue.
pub struct DnsService {
    store: Arc<dyn RecordStore>,
    resolver: Option<Arc<dyn Resolver>>,
    address: SocketAddr,
    running: AtomicBool,
    shutdown: CancellationToken,
}

impl DnsService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        resolver: Option<Arc<dyn Resolver>>,
        address: SocketAddr,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            store,
            resolver,
            address,
            running: AtomicBool::new(true),
            shutdown,
        }
    }

    pub async fn add_record(&self, record: Record) -> Result<(), StoreError> {
        self.store.put(record).await
    }

    /// Stores either every record or none of them.
    pub async fn add_records(&self, records: Vec<Record>) -> Result<(), StoreError> {
        self.store.batch_put(records).await
    }

    pub async fn remove_record(
        &self,
        name: &DomainName,
        qtype: QueryType,
    ) -> Result<(), StoreError> {
        self.store.delete(name, qtype).await
    }

    /// Best-effort removal over several names.
    pub async fn remove_records(
        &self,
        names: Vec<DomainName>,
        qtype: QueryType,
    ) -> Result<(), StoreError> {
        self.store.batch_delete(names, qtype).await
    }

    pub async fn list_records(&self) -> Result<Vec<Record>, StoreError> {
        self.store.list().await
    }

    pub async fn list_records_by_zone(&self, zone: &str) -> Result<Vec<Record>, StoreError> {
        self.store.list_by_zone(zone).await
    }

    pub async fn query_records(
        &self,
        options: QueryOptions,
    ) -> Result<Vec<Record>, StoreError> {
        self.store.query(options).await
    }

    pub async fn zones(&self) -> Result<Vec<String>, StoreError> {
        self.store.zones().await
    }

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            running: self.running.load(Ordering::SeqCst),
            address: self.address,
            upstream_type: self
                .resolver
                .as_ref()
                .map(|resolver| resolver.kind().to_string())
                .unwrap_or_else(|| "none".to_string()),
        }
    }

    /// Cancels the serve loops and tears the store down.
    pub async fn close(&self) -> Result<(), StoreError> {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.cancel();
        self.store.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::DnsService;
    use corvid_proto::packet::record::Record;
    use corvid_proto::packet::QueryType;
    use corvid_store::{MemoryStore, RecordStore, StoreError};
    use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn address() -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(127, 0, 0, 1), 53))
    }

    fn record() -> Record {
        Record::A {
            domain: "www.example.com".parse().unwrap(),
            addr: Ipv4Addr::new(192, 0, 2, 1),
            ttl: 300,
        }
    }

    #[tokio::test]
    async fn should_manage_records_through_the_store() {
        let store = Arc::new(MemoryStore::default());
        let service = DnsService::new(store.clone(), None, address(), CancellationToken::new());

        service.add_record(record()).await.unwrap();
        let found = store
            .get(&"www.example.com".parse().unwrap(), QueryType::A)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);

        service
            .remove_record(&"www.example.com".parse().unwrap(), QueryType::A)
            .await
            .unwrap();
        assert_eq!(
            store
                .get(&"www.example.com".parse().unwrap(), QueryType::A)
                .await,
            Err(StoreError::NotFound)
        );
    }

    #[tokio::test]
    async fn should_expose_zone_listing_and_queries() {
        use corvid_store::QueryOptions;

        let store = Arc::new(MemoryStore::default());
        let service = DnsService::new(store, None, address(), CancellationToken::new());

        service
            .add_records(vec![
                record(),
                Record::A {
                    domain: "mail.example.com".parse().unwrap(),
                    addr: Ipv4Addr::new(192, 0, 2, 2),
                    ttl: 300,
                },
                Record::A {
                    domain: "other.example.org".parse().unwrap(),
                    addr: Ipv4Addr::new(192, 0, 2, 3),
                    ttl: 300,
                },
            ])
            .await
            .unwrap();

        assert_eq!(service.list_records().await.unwrap().len(), 3);
        assert_eq!(
            service.list_records_by_zone("example.com").await.unwrap().len(),
            2
        );
        assert!(service
            .zones()
            .await
            .unwrap()
            .contains(&"example.org".to_string()));
        let found = service
            .query_records(QueryOptions::default().with_name_prefix("mail."))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);

        service
            .remove_records(
                vec![
                    "www.example.com".parse().unwrap(),
                    "missing.example.com".parse().unwrap(),
                ],
                QueryType::A,
            )
            .await
            .unwrap();
        assert_eq!(service.list_records().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn stats_should_reflect_liveness_and_upstream() {
        let store = Arc::new(MemoryStore::default());
        let shutdown = CancellationToken::new();
        let service = DnsService::new(store, None, address(), shutdown.clone());

        let stats = service.stats();
        assert!(stats.running);
        assert_eq!(stats.upstream_type, "none");

        service.close().await.unwrap();
        assert!(!service.stats().running);
        assert!(shutdown.is_cancelled());
    }

    #[tokio::test]
    async fn close_should_tear_the_store_down() {
        let store = Arc::new(MemoryStore::default());
        let service = DnsService::new(store.clone(), None, address(), CancellationToken::new());
        service.close().await.unwrap();
        assert_eq!(service.add_record(record()).await, Err(StoreError::Closed));
    }
}
