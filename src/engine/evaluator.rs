use std::sync::Arc;

use tracing::debug;

use crate::engine::context::ExecutionContext;
use crate::engine::distributed_by::DistributedByPart;
use crate::engine::errors::{ConfigError, EvalError};
use crate::engine::filter;
use crate::engine::group_by::GroupByPart;
use crate::engine::minmax;
use crate::engine::result::{
    CompositeResult, DistributedByResult, GroupByResult, UNGROUPED_KEY, ViewValue, apply_sort,
};
use crate::engine::view::{ResolvedView, ViewPart, ViewScope};
use crate::report::ReportDescriptor;
use crate::shared::clock::Clock;
use crate::shared::config::{CONFIG, Settings};
use crate::store::client::AnalyticsStore;
use crate::store::query::{Aggregation, FilterExpr, NumericRange, StoreQuery};
use crate::store::response::AggResult;

/// Composes view, group-by and distributed-by parts per evaluated report:
/// builds the base filter query, resolves stats when automatic sizing asks
/// for them, issues the single store round trip and drives decoding.
pub struct ReportEvaluator<'a, S> {
    store: &'a S,
    clock: Clock,
    settings: Arc<Settings>,
}

impl<'a, S: AnalyticsStore> ReportEvaluator<'a, S> {
    pub fn new(store: &'a S, clock: Clock) -> Self {
        Self {
            store,
            clock,
            settings: CONFIG.clone(),
        }
    }

    pub fn with_settings(store: &'a S, clock: Clock, settings: Settings) -> Self {
        Self {
            store,
            clock,
            settings: Arc::new(settings),
        }
    }

    pub async fn evaluate(
        &self,
        descriptor: ReportDescriptor,
    ) -> Result<CompositeResult, EvalError> {
        let result = self.evaluate_inner(descriptor).await;
        if let Err(e) = &result {
            e.log_error();
        }
        result
    }

    async fn evaluate_inner(
        &self,
        descriptor: ReportDescriptor,
    ) -> Result<CompositeResult, EvalError> {
        let ctx = ExecutionContext::new(descriptor, &self.clock, &self.settings)?;
        let view = ResolvedView::resolve(ctx.view()?)?;
        let group = GroupByPart::resolve(ctx.group_by()?, &view)?;
        let dist = DistributedByPart::resolve(ctx.distributed_by()?, &view)?;

        if view.part == ViewPart::RawData
            && (group != GroupByPart::None || dist != DistributedByPart::None)
        {
            return Err(ConfigError::IncompatibleDimensions(
                "raw data cannot be grouped or distributed".into(),
            )
            .into());
        }

        debug!(
            definition = %ctx.descriptor.definition_key,
            ?group,
            ?dist,
            "Evaluating report"
        );

        let filters = filter::compile(&ctx)?;
        let definition_filter = self.definition_filter(&ctx);

        // A grouped date field already bounded by the report's own filters
        // lets the histogram carry hard bounds instead of overflow
        // detection.
        let bounds = match group.date_field(view.scope) {
            Some(field) if !field.is_element_field() => {
                filter::bounded_window_for_field(&ctx, field)?
            }
            _ => None,
        };

        let mut user_filter = filters.instance.clone();
        if let (Some(span), Some(field)) = (bounds, group.date_field(view.scope)) {
            user_filter = FilterExpr::and(vec![
                user_filter,
                FilterExpr::DateRange {
                    field,
                    range: NumericRange::closed(span.min_millis as f64, span.max_millis as f64),
                },
            ]);
        }

        let stats = if group.needs_min_max_stats() {
            let field = group
                .date_field(view.scope)
                .expect("automatic sizing implies a date field");
            let scope_filter = FilterExpr::and(vec![
                definition_filter.clone(),
                user_filter.clone(),
            ]);
            minmax::resolve_date_span(self.store, &scope_filter, field).await?
        } else {
            None
        };

        let mut expected_keys: Vec<String> = match dist.catalog_kind() {
            Some(kind) => {
                self.store
                    .element_ids(
                        &ctx.descriptor.definition_key,
                        &ctx.descriptor.definition_versions,
                        &ctx.descriptor.tenant_ids,
                        kind,
                    )
                    .await?
            }
            None => Vec::new(),
        };

        let aggregation = if view.part == ViewPart::RawData {
            None
        } else {
            let metrics = Aggregation::Metrics(view.metrics(ctx.now_millis()));
            let dist_agg = dist.build(metrics, &view, &ctx);
            let group_agg = group.build(dist_agg, &view, &ctx, stats, bounds);
            let scoped = match view.scope {
                ViewScope::Instances => group_agg,
                ViewScope::Elements(kind) => {
                    let inner = if filters.has_view_filters() {
                        Aggregation::Filtered {
                            filter: filters.view.clone(),
                            sub: Box::new(group_agg),
                        }
                    } else {
                        group_agg
                    };
                    Aggregation::Nested {
                        kind,
                        sub: Box::new(inner),
                    }
                }
            };
            Some(match dist.key_enumeration() {
                Some(sibling) => Aggregation::WithSibling {
                    main: Box::new(scoped),
                    sibling: Box::new(sibling),
                },
                None => scoped,
            })
        };

        let query = StoreQuery {
            definition_filter,
            user_filter,
            aggregation,
            fetch_documents: view.part == ViewPart::RawData,
        };
        let response = self.store.execute(&query).await?;
        debug!(
            hits = response.total_hits,
            unfiltered = response.total_hits_without_filters,
            "Store responded"
        );

        if view.part == ViewPart::RawData {
            return Ok(CompositeResult {
                instance_count: response.total_hits,
                instance_count_without_filters: response.total_hits_without_filters,
                is_complete: true,
                groups: vec![GroupByResult {
                    key: UNGROUPED_KEY.to_string(),
                    distributions: vec![DistributedByResult {
                        key: UNGROUPED_KEY.to_string(),
                        value: ViewValue::Raw(response.documents),
                    }],
                }],
            });
        }

        let Some(mut agg) = response.aggregation.as_ref() else {
            return Ok(CompositeResult {
                instance_count: response.total_hits,
                instance_count_without_filters: response.total_hits_without_filters,
                is_complete: true,
                groups: Vec::new(),
            });
        };

        if let AggResult::WithSibling { main, sibling } = agg {
            for key in decode_enumerated_keys(sibling)? {
                if !expected_keys.contains(&key) {
                    expected_keys.push(key);
                }
            }
            agg = main.as_ref();
        }

        if let ViewScope::Elements(_) = view.scope {
            agg = match agg {
                AggResult::Nested { sub, .. } => sub.as_ref(),
                other => {
                    return Err(EvalError::Response(format!(
                        "expected nested element scope, got {other:?}"
                    )));
                }
            };
            if filters.has_view_filters() {
                agg = match agg {
                    AggResult::Filtered { sub, .. } => sub.as_ref(),
                    other => {
                        return Err(EvalError::Response(format!(
                            "expected view-filter scope, got {other:?}"
                        )));
                    }
                };
            }
        }

        let (mut groups, is_complete) = group.decode(agg, &view, &dist, &expected_keys, &ctx)?;

        if let Some(sort) = &ctx.descriptor.configuration.sorting {
            apply_sort(&mut groups, sort, ctx.descriptor.configuration.aggregation_type);
        }

        Ok(CompositeResult {
            instance_count: response.total_hits,
            instance_count_without_filters: response.total_hits_without_filters,
            is_complete,
            groups,
        })
    }

    fn definition_filter(&self, ctx: &ExecutionContext) -> FilterExpr {
        let mut clauses = vec![
            FilterExpr::DefinitionKey(ctx.descriptor.definition_key.clone()),
            FilterExpr::DefinitionVersions(ctx.descriptor.definition_versions.clone()),
        ];
        if !ctx.descriptor.tenant_ids.is_empty() {
            clauses.push(FilterExpr::TenantIn(ctx.descriptor.tenant_ids.clone()));
        }
        FilterExpr::and(clauses)
    }
}

/// Reads the key-enumeration sibling back into a plain key list, skipping
/// the scope wrappers it was built with.
fn decode_enumerated_keys(agg: &AggResult) -> Result<Vec<String>, EvalError> {
    match agg {
        AggResult::Nested { sub, .. } | AggResult::Filtered { sub, .. } => {
            decode_enumerated_keys(sub)
        }
        AggResult::Buckets(buckets) => Ok(buckets.iter().map(|b| b.key.render()).collect()),
        other => Err(EvalError::Response(format!(
            "key enumeration was not bucketed: {other:?}"
        ))),
    }
}
