use thiserror::Error;

use crate::report::descriptor::VersionSelector;
use crate::store::document::ElementKind;
use crate::store::query::{DateField, FilterExpr, StoreQuery};
use crate::store::response::StoreResponse;

/// Boundary to the document-oriented analytics store. One evaluation makes
/// at most one `execute` call, preceded by at most one stats call and one
/// catalog call; the engine never retries any of them.
#[allow(async_fn_in_trait)]
pub trait AnalyticsStore {
    async fn execute(&self, query: &StoreQuery) -> Result<StoreResponse, StoreError>;

    /// Minimum and maximum observed value of a date field under a filter;
    /// `None` when no document matches.
    async fn date_field_stats(
        &self,
        filter: &FilterExpr,
        field: DateField,
    ) -> Result<Option<MinMaxStat>, StoreError>;

    /// Element ids (flow nodes or user tasks) declared by the definition
    /// versions in scope. Empty when the definition is unknown; an unknown
    /// definition is an empty result, not an error.
    async fn element_ids(
        &self,
        definition_key: &str,
        versions: &VersionSelector,
        tenant_ids: &[String],
        kind: ElementKind,
    ) -> Result<Vec<String>, StoreError>;
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Request(String),

    #[error("store response malformed: {0}")]
    Malformed(String),
}

/// Observed `{min, max}` of a field, in epoch milliseconds for date fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMaxStat {
    pub min: f64,
    pub max: f64,
}

impl MinMaxStat {
    pub fn span_millis(&self) -> (i64, i64) {
        (self.min as i64, self.max as i64)
    }
}
