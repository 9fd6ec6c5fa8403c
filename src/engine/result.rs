use std::cmp::Ordering;

use chrono::DateTime;
use serde::Serialize;
use serde_json::Value;

use crate::report::descriptor::{AggregationType, SortBy, SortDirection, SortSpec};

/// Key of the synthetic bucket used when a dimension is not grouped.
pub const UNGROUPED_KEY: &str = "none";

/// Canonical decoded result of one report evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeResult {
    pub instance_count: u64,
    pub instance_count_without_filters: u64,
    /// False when the outer grouping produced more keys than the bucket
    /// ceiling and some were dropped.
    pub is_complete: bool,
    pub groups: Vec<GroupByResult>,
}

impl CompositeResult {
    pub fn empty() -> Self {
        Self {
            instance_count: 0,
            instance_count_without_filters: 0,
            is_complete: true,
            groups: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupByResult {
    pub key: String,
    pub distributions: Vec<DistributedByResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributedByResult {
    pub key: String,
    pub value: ViewValue,
}

/// The measured quantity of one bucket. Numeric aggregates are always
/// present; an empty bucket decodes to zero, never null.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ViewValue {
    Count(u64),
    Duration(DurationStats),
    Raw(Vec<Value>),
}

impl ViewValue {
    /// Scalar used for value sorting and overlays; raw rows have none.
    pub fn scalar(&self, aggregation: AggregationType) -> Option<f64> {
        match self {
            ViewValue::Count(n) => Some(*n as f64),
            ViewValue::Duration(stats) => Some(stats.component(aggregation)),
            ViewValue::Raw(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DurationStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub median: f64,
}

impl DurationStats {
    pub fn zero() -> Self {
        Self {
            min: 0.0,
            max: 0.0,
            avg: 0.0,
            median: 0.0,
        }
    }

    pub fn component(&self, aggregation: AggregationType) -> f64 {
        match aggregation {
            AggregationType::Min => self.min,
            AggregationType::Max => self.max,
            AggregationType::Avg => self.avg,
            AggregationType::Median => self.median,
        }
    }
}

/// Re-orders decoded groups per an explicit sort spec. Group-by parts have
/// already applied their per-variant defaults; this only runs when the
/// report configuration carries one.
pub fn apply_sort(groups: &mut [GroupByResult], sort: &SortSpec, aggregation: AggregationType) {
    match sort.by {
        SortBy::Key => groups.sort_by(|a, b| compare_keys(&a.key, &b.key)),
        SortBy::Value => groups.sort_by(|a, b| {
            let va = group_scalar(a, aggregation);
            let vb = group_scalar(b, aggregation);
            va.partial_cmp(&vb).unwrap_or(Ordering::Equal)
        }),
    }
    if sort.order == SortDirection::Desc {
        groups.reverse();
    }
}

/// Sum of the group's distribution scalars; single-distribution groups sort
/// by their one value.
fn group_scalar(group: &GroupByResult, aggregation: AggregationType) -> f64 {
    group
        .distributions
        .iter()
        .filter_map(|d| d.value.scalar(aggregation))
        .sum()
}

/// Orders keys numerically when both parse as numbers, chronologically when
/// both parse as date keys, lexicographically otherwise.
pub fn compare_keys(a: &str, b: &str) -> Ordering {
    if let (Ok(na), Ok(nb)) = (a.parse::<f64>(), b.parse::<f64>()) {
        return na.partial_cmp(&nb).unwrap_or(Ordering::Equal);
    }
    if let (Some(da), Some(db)) = (parse_date_key(a), parse_date_key(b)) {
        return da.cmp(&db);
    }
    a.cmp(b)
}

fn parse_date_key(key: &str) -> Option<i64> {
    DateTime::parse_from_str(key, "%Y-%m-%dT%H:%M:%S%.3f%z")
        .ok()
        .map(|dt| dt.timestamp_millis())
}
