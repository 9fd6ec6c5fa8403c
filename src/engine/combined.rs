use std::cmp::Ordering;

use futures::future::try_join_all;
use indexmap::IndexMap;
use serde::Serialize;

use crate::engine::errors::{ConfigError, EvalError};
use crate::engine::evaluator::ReportEvaluator;
use crate::engine::result::{
    CompositeResult, DistributedByResult, GroupByResult, UNGROUPED_KEY, ViewValue, compare_keys,
};
use crate::engine::view::{ResolvedView, ViewPart};
use crate::report::ReportDescriptor;
use crate::report::descriptor::DistributedByDef;
use crate::store::client::AnalyticsStore;

/// Overlay of independently evaluated reports sharing one key range.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedResult {
    pub reports: IndexMap<String, CompositeResult>,
}

/// Evaluates each constituent on its own and merges the decoded results
/// client-side. Constituents must be single-distribution reports so their
/// groups overlay onto one axis.
pub async fn evaluate_combined<S: AnalyticsStore>(
    evaluator: &ReportEvaluator<'_, S>,
    entries: Vec<(String, ReportDescriptor)>,
) -> Result<CombinedResult, EvalError> {
    let mut empty_values = Vec::with_capacity(entries.len());
    for (_, descriptor) in &entries {
        match &descriptor.distributed_by {
            Some(DistributedByDef::None) => {}
            _ => {
                return Err(ConfigError::IncompatibleDimensions(
                    "combined reports require an undistributed constituent".into(),
                )
                .into());
            }
        }
        let view = descriptor.view.as_ref().ok_or(ConfigError::MissingView)?;
        let resolved = ResolvedView::resolve(view)?;
        if resolved.part == ViewPart::RawData {
            return Err(ConfigError::IncompatibleDimensions(
                "raw data reports cannot be combined".into(),
            )
            .into());
        }
        empty_values.push(resolved.empty_value());
    }

    let evaluations = entries
        .iter()
        .map(|(_, descriptor)| evaluator.evaluate(descriptor.clone()));
    let results = try_join_all(evaluations).await?;

    let ids: Vec<String> = entries.into_iter().map(|(id, _)| id).collect();
    Ok(merge_results(ids, results, empty_values))
}

/// Pure merge over already-decoded results: the union of all group keys in
/// one shared order, each constituent zero-filled where it had no bucket.
pub fn merge_results(
    ids: Vec<String>,
    results: Vec<CompositeResult>,
    empty_values: Vec<ViewValue>,
) -> CombinedResult {
    let mut keys: Vec<String> = Vec::new();
    for result in &results {
        for group in &result.groups {
            if !keys.contains(&group.key) {
                keys.push(group.key.clone());
            }
        }
    }
    keys.sort_by(|a, b| compare_keys(a, b));
    if descending_axis(&results) {
        keys.reverse();
    }

    let mut reports = IndexMap::with_capacity(results.len());
    for ((id, mut result), empty) in ids.into_iter().zip(results).zip(empty_values) {
        let mut by_key: IndexMap<String, GroupByResult> = result
            .groups
            .drain(..)
            .map(|g| (g.key.clone(), g))
            .collect();
        result.groups = keys
            .iter()
            .map(|key| {
                by_key.shift_remove(key).unwrap_or_else(|| GroupByResult {
                    key: key.clone(),
                    distributions: vec![DistributedByResult {
                        key: UNGROUPED_KEY.to_string(),
                        value: empty.clone(),
                    }],
                })
            })
            .collect();
        reports.insert(id, result);
    }

    CombinedResult { reports }
}

/// The shared axis keeps the first constituent's direction; a report whose
/// own groups run most-recent-first flips the union to match.
fn descending_axis(results: &[CompositeResult]) -> bool {
    for result in results {
        if result.groups.len() >= 2 {
            return compare_keys(&result.groups[0].key, &result.groups[1].key)
                == Ordering::Greater;
        }
    }
    false
}
