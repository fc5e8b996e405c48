use corvid_proto::packet::QueryType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    Name,
    Type,
    Ttl,
}

impl Default for SortBy {
    fn default() -> Self {
        Self::Name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl Default for SortOrder {
    fn default() -> Self {
        Self::Asc
    }
}

/// Filtering, sorting and pagination for store queries. Filters compose
/// as AND; pagination applies after sorting. A `limit` of zero means no
/// limit.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub name: Option<String>,
    pub name_prefix: Option<String>,
    pub qtype: Option<QueryType>,
    pub zone: Option<String>,
    pub limit: usize,
    pub offset: usize,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

impl QueryOptions {
    pub fn with_name(mut self, value: impl Into<String>) -> Self {
        self.name = Some(value.into());
        self
    }

    pub fn with_name_prefix(mut self, value: impl Into<String>) -> Self {
        self.name_prefix = Some(value.into());
        self
    }

    pub fn with_qtype(mut self, value: QueryType) -> Self {
        self.qtype = Some(value);
        self
    }

    pub fn with_zone(mut self, value: impl Into<String>) -> Self {
        self.zone = Some(value.into());
        self
    }

    pub fn with_limit(mut self, value: usize) -> Self {
        self.limit = value;
        self
    }

    pub fn with_offset(mut self, value: usize) -> Self {
        self.offset = value;
        self
    }

    pub fn with_sort(mut self, by: SortBy, order: SortOrder) -> Self {
        self.sort_by = by;
        self.sort_order = order;
        self
    }
}
