use serde_json::Value;

/// Store answer to a `StoreQuery`. The aggregation tree mirrors the request
/// tree shape for shape; the engine treats a mismatch as a contract bug.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreResponse {
    /// Documents matching definition scope and user filters.
    pub total_hits: u64,
    /// Documents matching definition scope only.
    pub total_hits_without_filters: u64,
    pub aggregation: Option<AggResult>,
    /// Present when the query asked for documents.
    pub documents: Vec<Value>,
}

impl StoreResponse {
    pub fn empty() -> Self {
        Self {
            total_hits: 0,
            total_hits_without_filters: 0,
            aggregation: None,
            documents: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AggResult {
    /// Values aligned by index with the requested metrics; `None` where the
    /// bucket held no documents with the metric's field.
    Metrics(Vec<Option<f64>>),
    Buckets(Vec<BucketResult>),
    Nested {
        doc_count: u64,
        sub: Box<AggResult>,
    },
    Filtered {
        doc_count: u64,
        sub: Box<AggResult>,
    },
    WithSibling {
        main: Box<AggResult>,
        sibling: Box<AggResult>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BucketResult {
    pub key: BucketKey,
    pub doc_count: u64,
    pub sub: Option<Box<AggResult>>,
}

/// Typed bucket key as the store reports it. Date keys stay epoch
/// milliseconds; the engine renders them in the evaluation timezone.
#[derive(Debug, Clone, PartialEq)]
pub enum BucketKey {
    Date(i64),
    Str(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl BucketKey {
    /// Canonical string rendering for non-date keys: booleans as
    /// `true`/`false`, numbers as their decimal form.
    pub fn render(&self) -> String {
        match self {
            BucketKey::Date(ms) => ms.to_string(),
            BucketKey::Str(s) => s.clone(),
            BucketKey::Bool(b) => b.to_string(),
            BucketKey::Int(i) => i.to_string(),
            BucketKey::Float(f) => format!("{f:?}"),
        }
    }

    pub fn as_date_millis(&self) -> Option<i64> {
        match self {
            BucketKey::Date(ms) => Some(*ms),
            _ => None,
        }
    }
}
