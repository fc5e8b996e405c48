use crate::query::{QueryOptions, SortBy, SortOrder};
use crate::validator::RecordValidator;
use crate::{RecordStore, StoreError};
use corvid_proto::name::DomainName;
use corvid_proto::packet::record::Record;
use corvid_proto::packet::QueryType;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

/// The in-memory reference store. The records map and the zone set live
/// behind a single lock so every reader observes them as one consistent
/// snapshot.
pub struct MemoryStore {
    validator: RecordValidator,
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    /// (canonical name, record type) to its ordered RRset
    records: BTreeMap<(String, u16), Vec<Record>>,
    /// every non-empty suffix of a live record name
    zones: BTreeSet<String>,
    closed: bool,
}

/// All non-empty suffixes of a canonical name: `a.b.c.` gives
/// `{a.b.c, b.c, c}`.
fn zones_of(canonical: &str) -> Vec<String> {
    let trimmed = canonical.strip_suffix('.').unwrap_or(canonical);
    if trimmed.is_empty() {
        return Vec::new();
    }
    let labels: Vec<&str> = trimmed.split('.').collect();
    (0..labels.len()).map(|idx| labels[idx..].join(".")).collect()
}

/// Whether a canonical name sits inside a zone, on a label boundary.
fn in_zone(canonical: &str, zone: &str) -> bool {
    let mut suffix = String::with_capacity(zone.len() + 2);
    suffix.push('.');
    suffix.push_str(zone);
    suffix.push('.');
    canonical.ends_with(&suffix) || canonical == &suffix[1..]
}

fn normalize_zone(zone: &str) -> Result<String, StoreError> {
    let trimmed = zone.strip_suffix('.').unwrap_or(zone);
    if trimmed.is_empty() || trimmed.split('.').any(|label| label.is_empty()) {
        return Err(StoreError::InvalidZone(zone.to_string()));
    }
    Ok(trimmed.to_ascii_lowercase())
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(RecordValidator::default())
    }
}

impl MemoryStore {
    pub fn new(validator: RecordValidator) -> Self {
        Self {
            validator,
            inner: RwLock::new(Inner::default()),
        }
    }

    /// The record rewritten onto its canonical owner name.
    fn normalize(record: &Record) -> Result<(String, Record), StoreError> {
        let canonical = record.domain().canonical();
        let normalized: DomainName = canonical
            .parse()
            .map_err(|_| StoreError::InvalidName(record.domain().to_string()))?;
        Ok((canonical, record.with_domain(normalized)))
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner.read().map_err(|_| StoreError::Closed)
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner.write().map_err(|_| StoreError::Closed)
    }
}

impl Inner {
    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    /// Upserts a normalized record, lock held by the caller.
    fn put_locked(&mut self, canonical: String, record: Record) {
        self.zones.extend(zones_of(&canonical));
        let key = (canonical, record.qtype().into_num());
        let rrset = self.records.entry(key).or_default();
        match rrset.iter_mut().find(|existing| existing.same_data(&record)) {
            Some(existing) => *existing = record,
            None => rrset.push(record),
        }
    }

    /// Removes every RRset selected by (name, qtype), lock held by the
    /// caller; returns how many sets were dropped.
    fn delete_locked(&mut self, canonical: &str, qtype: QueryType) -> usize {
        let keys: Vec<(String, u16)> = match qtype {
            QueryType::Any => self
                .records
                .range((canonical.to_string(), 0)..=(canonical.to_string(), u16::MAX))
                .map(|(key, _)| key.clone())
                .collect(),
            other => {
                let key = (canonical.to_string(), other.into_num());
                if self.records.contains_key(&key) {
                    vec![key]
                } else {
                    Vec::new()
                }
            }
        };
        for key in &keys {
            self.records.remove(key);
        }
        keys.len()
    }

    /// Rebuilds the zone set from the remaining names, lock held by the
    /// caller. Preferred over reference counting for its simplicity.
    fn rebuild_zones_locked(&mut self) {
        self.zones = self
            .records
            .keys()
            .flat_map(|(name, _)| zones_of(name))
            .collect();
    }

    fn records_at_locked(&self, canonical: &str, qtype: QueryType) -> Vec<Record> {
        match qtype {
            QueryType::Any => self
                .records
                .range((canonical.to_string(), 0)..=(canonical.to_string(), u16::MAX))
                .flat_map(|(_, rrset)| rrset.iter().cloned())
                .collect(),
            other => self
                .records
                .get(&(canonical.to_string(), other.into_num()))
                .cloned()
                .unwrap_or_default(),
        }
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, name: &DomainName, qtype: QueryType) -> Result<Vec<Record>, StoreError> {
        let inner = self.read()?;
        inner.ensure_open()?;
        let found = inner.records_at_locked(&name.canonical(), qtype);
        if found.is_empty() {
            return Err(StoreError::NotFound);
        }
        Ok(found)
    }

    #[tracing::instrument(skip_all, fields(name = %record.domain(), qtype = record.qtype().as_name()))]
    async fn put(&self, record: Record) -> Result<(), StoreError> {
        self.validator.validate(&record)?;
        let (canonical, record) = Self::normalize(&record)?;
        let mut inner = self.write()?;
        inner.ensure_open()?;
        inner.put_locked(canonical, record);
        tracing::debug!("record stored");
        Ok(())
    }

    async fn batch_put(&self, records: Vec<Record>) -> Result<(), StoreError> {
        // validate everything before storing anything
        let mut normalized = Vec::with_capacity(records.len());
        for record in &records {
            self.validator.validate(record)?;
            normalized.push(Self::normalize(record)?);
        }
        let mut inner = self.write()?;
        inner.ensure_open()?;
        for (canonical, record) in normalized {
            inner.put_locked(canonical, record);
        }
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(name = %name, qtype = qtype.as_name()))]
    async fn delete(&self, name: &DomainName, qtype: QueryType) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        inner.ensure_open()?;
        let removed = inner.delete_locked(&name.canonical(), qtype);
        if removed == 0 {
            return Err(StoreError::NotFound);
        }
        inner.rebuild_zones_locked();
        tracing::debug!(removed, "record sets removed");
        Ok(())
    }

    async fn batch_delete(
        &self,
        names: Vec<DomainName>,
        qtype: QueryType,
    ) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        inner.ensure_open()?;
        for name in names {
            inner.delete_locked(&name.canonical(), qtype);
        }
        inner.rebuild_zones_locked();
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Record>, StoreError> {
        let inner = self.read()?;
        inner.ensure_open()?;
        Ok(inner
            .records
            .values()
            .flat_map(|rrset| rrset.iter().cloned())
            .collect())
    }

    async fn list_by_zone(&self, zone: &str) -> Result<Vec<Record>, StoreError> {
        let zone = normalize_zone(zone)?;
        let inner = self.read()?;
        inner.ensure_open()?;
        Ok(inner
            .records
            .iter()
            .filter(|((name, _), _)| in_zone(name, &zone))
            .flat_map(|(_, rrset)| rrset.iter().cloned())
            .collect())
    }

    async fn query(&self, options: QueryOptions) -> Result<Vec<Record>, StoreError> {
        let zone = options.zone.as_deref().map(normalize_zone).transpose()?;
        let name = options
            .name
            .as_deref()
            .map(|value| value.strip_suffix('.').unwrap_or(value).to_ascii_lowercase());
        let prefix = options.name_prefix.as_deref().map(str::to_ascii_lowercase);
        let qtype = options.qtype.map(QueryType::into_num);

        let inner = self.read()?;
        inner.ensure_open()?;

        let mut found: Vec<Record> = inner
            .records
            .iter()
            .filter(|((key_name, key_type), _)| {
                let bare = key_name.strip_suffix('.').unwrap_or(key_name);
                if let Some(name) = &name {
                    if bare != name {
                        return false;
                    }
                }
                if let Some(prefix) = &prefix {
                    if !bare.starts_with(prefix.as_str()) {
                        return false;
                    }
                }
                if let Some(qtype) = qtype {
                    if *key_type != qtype {
                        return false;
                    }
                }
                if let Some(zone) = &zone {
                    if !in_zone(key_name, zone) {
                        return false;
                    }
                }
                true
            })
            .flat_map(|(_, rrset)| rrset.iter().cloned())
            .collect();
        drop(inner);

        match options.sort_by {
            SortBy::Name => found.sort_by(|left, right| left.domain().cmp(right.domain())),
            SortBy::Type => found.sort_by_key(|record| record.qtype().into_num()),
            SortBy::Ttl => found.sort_by_key(Record::ttl),
        }
        if options.sort_order == SortOrder::Desc {
            found.reverse();
        }

        let limit = if options.limit == 0 {
            usize::MAX
        } else {
            options.limit
        };
        Ok(found.into_iter().skip(options.offset).take(limit).collect())
    }

    async fn zones(&self) -> Result<Vec<String>, StoreError> {
        let inner = self.read()?;
        inner.ensure_open()?;
        Ok(inner.zones.iter().cloned().collect())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let inner = self.read()?;
        inner.ensure_open()?;
        Ok(inner.records.values().map(Vec::len).sum())
    }

    async fn close(&self) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        inner.closed = true;
        Ok(())
    }
}
