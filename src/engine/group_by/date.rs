use std::cmp::Reverse;

use crate::engine::result::GroupByResult;
use crate::report::descriptor::SortDirection;

/// Applies the bucket ceiling to decoded date buckets. When the store
/// returned more distinct buckets than the ceiling, the most recent ones
/// are retained and the result is marked incomplete; the effective display
/// order is restored afterwards.
pub fn limit_date_buckets(
    mut entries: Vec<(i64, GroupByResult)>,
    limit: usize,
    order: SortDirection,
) -> (Vec<GroupByResult>, bool) {
    let complete = entries.len() <= limit;
    if !complete {
        entries.sort_by_key(|(millis, _)| Reverse(*millis));
        entries.truncate(limit);
    }
    match order {
        SortDirection::Asc => entries.sort_by_key(|(millis, _)| *millis),
        SortDirection::Desc => entries.sort_by_key(|(millis, _)| Reverse(*millis)),
    }
    (entries.into_iter().map(|(_, group)| group).collect(), complete)
}

/// Applies the bucket ceiling to terms buckets, keeping insertion order.
pub fn limit_term_buckets(
    mut groups: Vec<GroupByResult>,
    limit: usize,
) -> (Vec<GroupByResult>, bool) {
    let complete = groups.len() <= limit;
    if !complete {
        groups.truncate(limit);
    }
    (groups, complete)
}
