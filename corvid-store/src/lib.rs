pub mod memory;
pub mod query;
pub mod validator;

use corvid_proto::name::DomainName;
use corvid_proto::packet::record::Record;
use corvid_proto::packet::QueryType;

pub use memory::MemoryStore;
pub use query::{QueryOptions, SortBy, SortOrder};
pub use validator::RecordValidator;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("invalid record: {0}")]
    InvalidRecord(String),
    #[error("invalid name: {0}")]
    InvalidName(String),
    #[error("ttl {ttl} outside of [{min}, {max}]")]
    InvalidTtl { ttl: u32, min: u32, max: u32 },
    #[error("invalid zone: {0}")]
    InvalidZone(String),
    #[error("store is closed")]
    Closed,
}

/// The authoritative record storage. Records are keyed by
/// (normalized name, type); the value of a key is an ordered RRset.
///
/// `QueryType::Any` selects every type of a name on `get` and `delete`.
/// Readers may run in parallel; writers are serialized; the observed
/// (records, zones) state is always a consistent snapshot.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Returns a copy of the RRset stored at (name, qtype).
    async fn get(&self, name: &DomainName, qtype: QueryType) -> Result<Vec<Record>, StoreError>;

    /// Validates and upserts a record: an equal (name, type, rdata) triple
    /// is replaced, anything else is appended to its RRset.
    async fn put(&self, record: Record) -> Result<(), StoreError>;

    /// Validates every record before storing any of them; the first
    /// rejection leaves the store untouched.
    async fn batch_put(&self, records: Vec<Record>) -> Result<(), StoreError>;

    /// Removes the whole RRset at (name, qtype).
    async fn delete(&self, name: &DomainName, qtype: QueryType) -> Result<(), StoreError>;

    /// Best-effort removal over several names; missing names are skipped.
    async fn batch_delete(
        &self,
        names: Vec<DomainName>,
        qtype: QueryType,
    ) -> Result<(), StoreError>;

    async fn list(&self) -> Result<Vec<Record>, StoreError>;

    async fn list_by_zone(&self, zone: &str) -> Result<Vec<Record>, StoreError>;

    async fn query(&self, options: QueryOptions) -> Result<Vec<Record>, StoreError>;

    /// The zones derivable from the live record names.
    async fn zones(&self) -> Result<Vec<String>, StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;

    /// Tears the store down; every later operation returns `Closed`.
    async fn close(&self) -> Result<(), StoreError>;
}
