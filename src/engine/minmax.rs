use tracing::debug;

use crate::store::client::{AnalyticsStore, MinMaxStat, StoreError};
use crate::store::query::{DateField, FilterExpr};

/// Observed span of a date field under the evaluation's filter, used only
/// when the group-by part sizes its histogram interval automatically.
pub async fn resolve_date_span<S: AnalyticsStore>(
    store: &S,
    filter: &FilterExpr,
    field: DateField,
) -> Result<Option<MinMaxStat>, StoreError> {
    let stats = store.date_field_stats(filter, field).await?;
    match &stats {
        Some(s) => debug!(min = s.min, max = s.max, ?field, "Resolved date span"),
        None => debug!(?field, "No documents in scope for date span"),
    }
    Ok(stats)
}
