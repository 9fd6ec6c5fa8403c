use chrono::Weekday;
use indexmap::IndexMap;

use procsight::report::descriptor::{SortDirection, VersionSelector};
use procsight::shared::datetime::bucketing::DateBucketer;
use procsight::store::client::{AnalyticsStore, MinMaxStat, StoreError};
use procsight::store::document::{
    ElementInstanceDoc, ElementKind, ProcessInstanceDoc, VariableValue,
};
use procsight::store::query::{
    Aggregation, DateField, FilterExpr, HistogramInterval, MetricAgg, MetricField, StoreQuery,
    TermsOrder, TermsSource, VariableMatch,
};
use procsight::store::response::{AggResult, BucketKey, BucketResult, StoreResponse};

/// Catalog entry for a deployed definition version.
#[derive(Debug, Clone)]
pub struct DefinitionEntry {
    pub key: String,
    pub version: String,
    pub tenant_id: Option<String>,
    pub flow_node_ids: Vec<String>,
    pub user_task_ids: Vec<String>,
}

/// In-memory analytics store: interprets the structured query contract over
/// plain document vectors. Test double for the real store.
#[derive(Debug, Default)]
pub struct MemStore {
    pub instances: Vec<ProcessInstanceDoc>,
    pub definitions: Vec<DefinitionEntry>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_definition(mut self, definition: DefinitionEntry) -> Self {
        self.definitions.push(definition);
        self
    }

    pub fn with_instance(mut self, instance: ProcessInstanceDoc) -> Self {
        self.instances.push(instance);
        self
    }

    pub fn with_instances(mut self, instances: Vec<ProcessInstanceDoc>) -> Self {
        self.instances.extend(instances);
        self
    }

    fn latest_version(&self, key: &str) -> Option<String> {
        self.definitions
            .iter()
            .filter(|d| d.key == key)
            .map(|d| d.version.clone())
            .max_by(|a, b| compare_versions(a, b))
    }

    fn doc_matches(&self, doc: &ProcessInstanceDoc, expr: &FilterExpr) -> bool {
        match expr {
            FilterExpr::MatchAll => true,
            FilterExpr::And(clauses) => clauses.iter().all(|c| self.doc_matches(doc, c)),
            FilterExpr::Or(clauses) => clauses.iter().any(|c| self.doc_matches(doc, c)),
            FilterExpr::Not(inner) => !self.doc_matches(doc, inner),
            FilterExpr::DefinitionKey(key) => doc.definition_key == *key,
            FilterExpr::DefinitionVersions(selector) => match selector {
                VersionSelector::All => true,
                VersionSelector::Latest => {
                    self.latest_version(&doc.definition_key).as_deref()
                        == Some(doc.definition_version.as_str())
                }
                VersionSelector::Explicit(versions) => {
                    versions.contains(&doc.definition_version)
                }
            },
            FilterExpr::TenantIn(tenants) => doc
                .tenant_id
                .as_ref()
                .is_some_and(|t| tenants.contains(t)),
            FilterExpr::State(state) => doc.state == *state,
            FilterExpr::DateRange { field, range } => match field {
                DateField::InstanceStart => {
                    range.contains(doc.start_date.timestamp_millis() as f64)
                }
                DateField::InstanceEnd => doc
                    .end_date
                    .is_some_and(|e| range.contains(e.timestamp_millis() as f64)),
                _ => false,
            },
            FilterExpr::DurationRange { now_millis, range } => {
                range.contains(doc.duration_at(*now_millis) as f64)
            }
            FilterExpr::Variable { name, matches } => doc
                .variable(name)
                .is_some_and(|value| variable_matches(value, matches)),
            FilterExpr::ExecutedFlowNode { ids } => {
                doc.flow_nodes.iter().any(|n| ids.contains(&n.id))
            }
            FilterExpr::ElementIdIn(_) | FilterExpr::ElementDurationRange { .. } => false,
        }
    }

    fn item_matches(&self, item: &Item<'_>, expr: &FilterExpr) -> bool {
        match expr {
            FilterExpr::And(clauses) => clauses.iter().all(|c| self.item_matches(item, c)),
            FilterExpr::Or(clauses) => clauses.iter().any(|c| self.item_matches(item, c)),
            FilterExpr::Not(inner) => !self.item_matches(item, inner),
            FilterExpr::ElementIdIn(ids) => match item {
                Item::Element { element, .. } => ids.contains(&element.id),
                Item::Instance(_) => false,
            },
            FilterExpr::ElementDurationRange { now_millis, range } => match item {
                Item::Element { element, .. } => {
                    range.contains(element.duration_at(*now_millis) as f64)
                }
                Item::Instance(_) => false,
            },
            instance_level => self.doc_matches(item.owner(), instance_level),
        }
    }

    fn eval_agg(&self, items: &[Item<'_>], agg: &Aggregation) -> AggResult {
        match agg {
            Aggregation::Metrics(specs) => {
                AggResult::Metrics(specs.iter().map(|s| metric(items, s)).collect())
            }
            Aggregation::DateHistogram {
                field,
                interval,
                timezone,
                order,
                bounds,
                sub,
            } => {
                let bucketer = DateBucketer::new(*timezone, Weekday::Mon, "");
                let mut dated: Vec<(i64, Item<'_>)> = items
                    .iter()
                    .filter_map(|it| it.date_millis(*field).map(|ms| (ms, *it)))
                    .collect();
                if let Some(b) = bounds {
                    dated.retain(|(ms, _)| *ms >= b.min_millis && *ms <= b.max_millis);
                }

                let starts: Vec<i64> = match interval {
                    HistogramInterval::Calendar(unit) => {
                        let span = match bounds {
                            Some(b) => Some((
                                bucketer.truncate_millis(b.min_millis, *unit),
                                bucketer.truncate_millis(b.max_millis, *unit),
                            )),
                            None => {
                                let keys: Vec<i64> = dated
                                    .iter()
                                    .map(|(ms, _)| bucketer.truncate_millis(*ms, *unit))
                                    .collect();
                                keys.iter()
                                    .min()
                                    .copied()
                                    .zip(keys.iter().max().copied())
                            }
                        };
                        match span {
                            Some((min, max)) => {
                                let mut starts = Vec::new();
                                let mut cursor = min;
                                while cursor <= max {
                                    starts.push(cursor);
                                    cursor = bucketer.next_millis(cursor, *unit);
                                }
                                starts
                            }
                            None => Vec::new(),
                        }
                    }
                    HistogramInterval::Fixed { millis } => {
                        let span = match bounds {
                            Some(b) => Some((b.min_millis, b.max_millis)),
                            None => {
                                let values: Vec<i64> =
                                    dated.iter().map(|(ms, _)| *ms).collect();
                                values.iter().min().copied().zip(values.iter().max().copied())
                            }
                        };
                        match span {
                            Some((min, max)) => {
                                let mut starts = Vec::new();
                                let mut cursor = min;
                                while cursor <= max {
                                    starts.push(cursor);
                                    cursor += millis;
                                }
                                starts
                            }
                            None => Vec::new(),
                        }
                    }
                };

                let mut buckets: Vec<BucketResult> = starts
                    .iter()
                    .map(|start| {
                        let members: Vec<Item<'_>> = dated
                            .iter()
                            .filter(|(ms, _)| match interval {
                                HistogramInterval::Calendar(unit) => {
                                    bucketer.truncate_millis(*ms, *unit) == *start
                                }
                                HistogramInterval::Fixed { millis } => {
                                    *ms >= *start && *ms < *start + millis
                                }
                            })
                            .map(|(_, it)| *it)
                            .collect();
                        BucketResult {
                            key: BucketKey::Date(*start),
                            doc_count: members.len() as u64,
                            sub: Some(Box::new(self.eval_agg(&members, sub))),
                        }
                    })
                    .collect();
                if *order == SortDirection::Desc {
                    buckets.reverse();
                }
                AggResult::Buckets(buckets)
            }
            Aggregation::Terms { source, order, sub } => {
                let mut grouped: IndexMap<String, (BucketKey, Vec<Item<'_>>)> = IndexMap::new();
                for item in items {
                    let key = match source {
                        TermsSource::VariableValue { name } => {
                            item.owner().variable(name).map(variable_key)
                        }
                        TermsSource::ElementId => match item {
                            Item::Element { element, .. } => {
                                Some(BucketKey::Str(element.id.clone()))
                            }
                            Item::Instance(_) => None,
                        },
                    };
                    let Some(key) = key else { continue };
                    grouped
                        .entry(key.render())
                        .or_insert_with(|| (key, Vec::new()))
                        .1
                        .push(*item);
                }

                let mut entries: Vec<(BucketKey, Vec<Item<'_>>)> =
                    grouped.into_values().collect();
                match order {
                    TermsOrder::KeyAsc => entries.sort_by(|a, b| compare_bucket_keys(&a.0, &b.0)),
                    TermsOrder::KeyDesc => {
                        entries.sort_by(|a, b| compare_bucket_keys(&b.0, &a.0))
                    }
                    TermsOrder::CountDesc => entries.sort_by(|a, b| {
                        b.1.len()
                            .cmp(&a.1.len())
                            .then_with(|| compare_bucket_keys(&a.0, &b.0))
                    }),
                    TermsOrder::CountAsc => entries.sort_by(|a, b| {
                        a.1.len()
                            .cmp(&b.1.len())
                            .then_with(|| compare_bucket_keys(&a.0, &b.0))
                    }),
                }

                AggResult::Buckets(
                    entries
                        .into_iter()
                        .map(|(key, members)| BucketResult {
                            doc_count: members.len() as u64,
                            sub: Some(Box::new(self.eval_agg(&members, sub))),
                            key,
                        })
                        .collect(),
                )
            }
            Aggregation::Nested { kind, sub } => {
                let elements: Vec<Item<'_>> = items
                    .iter()
                    .flat_map(|item| {
                        let owner = item.owner();
                        owner
                            .elements(*kind)
                            .iter()
                            .map(move |element| Item::Element { owner, element })
                    })
                    .collect();
                AggResult::Nested {
                    doc_count: elements.len() as u64,
                    sub: Box::new(self.eval_agg(&elements, sub)),
                }
            }
            Aggregation::Filtered { filter, sub } => {
                let kept: Vec<Item<'_>> = items
                    .iter()
                    .filter(|item| self.item_matches(item, filter))
                    .copied()
                    .collect();
                AggResult::Filtered {
                    doc_count: kept.len() as u64,
                    sub: Box::new(self.eval_agg(&kept, sub)),
                }
            }
            Aggregation::WithSibling { main, sibling } => AggResult::WithSibling {
                main: Box::new(self.eval_agg(items, main)),
                sibling: Box::new(self.eval_agg(items, sibling)),
            },
        }
    }
}

impl AnalyticsStore for MemStore {
    async fn execute(&self, query: &StoreQuery) -> Result<StoreResponse, StoreError> {
        let in_scope: Vec<&ProcessInstanceDoc> = self
            .instances
            .iter()
            .filter(|doc| self.doc_matches(doc, &query.definition_filter))
            .collect();
        let hits: Vec<&ProcessInstanceDoc> = in_scope
            .iter()
            .copied()
            .filter(|doc| self.doc_matches(doc, &query.user_filter))
            .collect();

        let items: Vec<Item<'_>> = hits.iter().map(|doc| Item::Instance(*doc)).collect();
        let aggregation = query
            .aggregation
            .as_ref()
            .map(|agg| self.eval_agg(&items, agg));
        let documents = if query.fetch_documents {
            hits.iter()
                .map(|doc| serde_json::to_value(doc).expect("document serializes"))
                .collect()
        } else {
            Vec::new()
        };

        Ok(StoreResponse {
            total_hits: hits.len() as u64,
            total_hits_without_filters: in_scope.len() as u64,
            aggregation,
            documents,
        })
    }

    async fn date_field_stats(
        &self,
        filter: &FilterExpr,
        field: DateField,
    ) -> Result<Option<MinMaxStat>, StoreError> {
        let mut values: Vec<i64> = Vec::new();
        for doc in self.instances.iter().filter(|d| self.doc_matches(d, filter)) {
            match field {
                DateField::InstanceStart => values.push(doc.start_date.timestamp_millis()),
                DateField::InstanceEnd => {
                    if let Some(end) = doc.end_date {
                        values.push(end.timestamp_millis());
                    }
                }
                DateField::ElementStart => values.extend(
                    doc.flow_nodes
                        .iter()
                        .chain(doc.user_tasks.iter())
                        .map(|e| e.start_date.timestamp_millis()),
                ),
                DateField::ElementEnd => values.extend(
                    doc.flow_nodes
                        .iter()
                        .chain(doc.user_tasks.iter())
                        .filter_map(|e| e.end_date.map(|d| d.timestamp_millis())),
                ),
            }
        }
        Ok(values
            .iter()
            .min()
            .copied()
            .zip(values.iter().max().copied())
            .map(|(min, max)| MinMaxStat {
                min: min as f64,
                max: max as f64,
            }))
    }

    async fn element_ids(
        &self,
        definition_key: &str,
        versions: &VersionSelector,
        tenant_ids: &[String],
        kind: ElementKind,
    ) -> Result<Vec<String>, StoreError> {
        let latest = self.latest_version(definition_key);
        let mut ids = Vec::new();
        for definition in &self.definitions {
            if definition.key != definition_key {
                continue;
            }
            let version_matches = match versions {
                VersionSelector::All => true,
                VersionSelector::Latest => latest.as_deref() == Some(definition.version.as_str()),
                VersionSelector::Explicit(list) => list.contains(&definition.version),
            };
            let tenant_matches = tenant_ids.is_empty()
                || definition
                    .tenant_id
                    .as_ref()
                    .is_none_or(|t| tenant_ids.contains(t));
            if !version_matches || !tenant_matches {
                continue;
            }
            let declared = match kind {
                ElementKind::FlowNode => &definition.flow_node_ids,
                ElementKind::UserTask => &definition.user_task_ids,
            };
            for id in declared {
                if !ids.contains(id) {
                    ids.push(id.clone());
                }
            }
        }
        Ok(ids)
    }
}

/// One document in aggregation scope: an instance, or a nested element with
/// its owning instance.
#[derive(Debug, Clone, Copy)]
enum Item<'a> {
    Instance(&'a ProcessInstanceDoc),
    Element {
        owner: &'a ProcessInstanceDoc,
        element: &'a ElementInstanceDoc,
    },
}

impl<'a> Item<'a> {
    fn owner(&self) -> &'a ProcessInstanceDoc {
        match self {
            Item::Instance(doc) => doc,
            Item::Element { owner, .. } => owner,
        }
    }

    fn date_millis(&self, field: DateField) -> Option<i64> {
        match (self, field) {
            (_, DateField::InstanceStart) => Some(self.owner().start_date.timestamp_millis()),
            (_, DateField::InstanceEnd) => {
                self.owner().end_date.map(|d| d.timestamp_millis())
            }
            (Item::Element { element, .. }, DateField::ElementStart) => {
                Some(element.start_date.timestamp_millis())
            }
            (Item::Element { element, .. }, DateField::ElementEnd) => {
                element.end_date.map(|d| d.timestamp_millis())
            }
            (Item::Instance(_), _) => None,
        }
    }

    fn metric_value(&self, field: MetricField) -> Option<f64> {
        match (self, field) {
            (_, MetricField::InstanceDuration { now_millis }) => {
                Some(self.owner().duration_at(now_millis) as f64)
            }
            (Item::Element { element, .. }, MetricField::ElementDuration { now_millis }) => {
                Some(element.duration_at(now_millis) as f64)
            }
            (Item::Instance(_), MetricField::ElementDuration { .. }) => None,
        }
    }
}

fn metric(items: &[Item<'_>], spec: &MetricAgg) -> Option<f64> {
    match spec {
        MetricAgg::Count => Some(items.len() as f64),
        MetricAgg::Min(field) => field_values(items, *field)
            .into_iter()
            .min_by(|a, b| a.partial_cmp(b).unwrap()),
        MetricAgg::Max(field) => field_values(items, *field)
            .into_iter()
            .max_by(|a, b| a.partial_cmp(b).unwrap()),
        MetricAgg::Avg(field) => {
            let values = field_values(items, *field);
            if values.is_empty() {
                None
            } else {
                Some(values.iter().sum::<f64>() / values.len() as f64)
            }
        }
        MetricAgg::Percentile { field, pct } => {
            let mut values = field_values(items, *field);
            if values.is_empty() {
                return None;
            }
            values.sort_by(|a, b| a.partial_cmp(b).unwrap());
            let rank = (pct / 100.0) * (values.len() - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let fraction = rank - lower as f64;
            Some(values[lower] + (values[upper] - values[lower]) * fraction)
        }
    }
}

fn field_values(items: &[Item<'_>], field: MetricField) -> Vec<f64> {
    items.iter().filter_map(|it| it.metric_value(field)).collect()
}

fn variable_matches(value: &VariableValue, matches: &VariableMatch) -> bool {
    match matches {
        VariableMatch::StringIn { values, negate } => match value {
            VariableValue::String(s) => values.contains(s) != *negate,
            _ => false,
        },
        VariableMatch::BooleanIs(expected) => {
            matches!(value, VariableValue::Boolean(b) if b == expected)
        }
        VariableMatch::NumberIn { values, negate } => match variable_number(value) {
            Some(n) => values.iter().any(|v| *v == n) != *negate,
            None => false,
        },
        VariableMatch::NumberRange(range) => {
            variable_number(value).is_some_and(|n| range.contains(n))
        }
        VariableMatch::DateRange(range) => match value {
            VariableValue::Date(d) => range.contains(d.timestamp_millis() as f64),
            _ => false,
        },
    }
}

fn variable_number(value: &VariableValue) -> Option<f64> {
    match value {
        VariableValue::Integer(i) => Some(*i as f64),
        VariableValue::Double(d) => Some(*d),
        _ => None,
    }
}

fn variable_key(value: &VariableValue) -> BucketKey {
    match value {
        VariableValue::String(s) => BucketKey::Str(s.clone()),
        VariableValue::Boolean(b) => BucketKey::Bool(*b),
        VariableValue::Integer(i) => BucketKey::Int(*i),
        VariableValue::Double(d) => BucketKey::Float(*d),
        VariableValue::Date(d) => BucketKey::Str(d.to_rfc3339()),
    }
}

fn compare_bucket_keys(a: &BucketKey, b: &BucketKey) -> std::cmp::Ordering {
    match (key_number(a), key_number(b)) {
        (Some(na), Some(nb)) => na.partial_cmp(&nb).unwrap_or(std::cmp::Ordering::Equal),
        _ => a.render().cmp(&b.render()),
    }
}

fn key_number(key: &BucketKey) -> Option<f64> {
    match key {
        BucketKey::Int(i) => Some(*i as f64),
        BucketKey::Float(f) => Some(*f),
        BucketKey::Date(ms) => Some(*ms as f64),
        _ => None,
    }
}

fn compare_versions(a: &str, b: &str) -> std::cmp::Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(na), Ok(nb)) => na.cmp(&nb),
        _ => a.cmp(b),
    }
}
