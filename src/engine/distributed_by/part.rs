use indexmap::IndexMap;

use crate::engine::context::ExecutionContext;
use crate::engine::errors::{ConfigError, EvalError};
use crate::engine::result::{DistributedByResult, UNGROUPED_KEY, compare_keys};
use crate::engine::view::{ResolvedView, ViewScope};
use crate::report::descriptor::{DateUnit, DistributedByDef, SortDirection};
use crate::store::document::ElementKind;
use crate::store::query::{Aggregation, DateField, MetricAgg, TermsOrder, TermsSource};
use crate::store::response::AggResult;

/// Second bucketing dimension inside each outer bucket.
#[derive(Debug, Clone, PartialEq)]
pub enum DistributedByPart {
    None,
    Variable { name: String },
    FlowNode,
    UserTask,
    StartDate { unit: DateUnit },
    EndDate { unit: DateUnit },
}

impl DistributedByPart {
    pub fn resolve(def: &DistributedByDef, view: &ResolvedView) -> Result<Self, ConfigError> {
        match def {
            DistributedByDef::None => Ok(DistributedByPart::None),
            DistributedByDef::Variable(var) => {
                if view.scope != ViewScope::Instances {
                    return Err(ConfigError::IncompatibleDimensions(
                        "variable distribution needs a process-instance view".into(),
                    ));
                }
                Ok(DistributedByPart::Variable {
                    name: var.name.clone(),
                })
            }
            DistributedByDef::FlowNode => match view.scope {
                ViewScope::Elements(ElementKind::FlowNode) => Ok(DistributedByPart::FlowNode),
                _ => Err(ConfigError::IncompatibleDimensions(
                    "flow-node distribution needs a flow-node view".into(),
                )),
            },
            DistributedByDef::UserTask => match view.scope {
                ViewScope::Elements(ElementKind::UserTask) => Ok(DistributedByPart::UserTask),
                _ => Err(ConfigError::IncompatibleDimensions(
                    "user-task distribution needs a user-task view".into(),
                )),
            },
            DistributedByDef::StartDate { unit } | DistributedByDef::EndDate { unit }
                if unit.is_automatic() =>
            {
                Err(ConfigError::IncompatibleDimensions(
                    "automatic interval is only available on the outer dimension".into(),
                ))
            }
            DistributedByDef::StartDate { unit } => Ok(DistributedByPart::StartDate { unit: *unit }),
            DistributedByDef::EndDate { unit } => Ok(DistributedByPart::EndDate { unit: *unit }),
        }
    }

    /// Wraps the view's metric aggregation in this dimension's bucketing,
    /// staying in the current scope.
    pub fn build(
        &self,
        inner: Aggregation,
        view: &ResolvedView,
        ctx: &ExecutionContext,
    ) -> Aggregation {
        match self {
            DistributedByPart::None => inner,
            DistributedByPart::Variable { name } => Aggregation::Terms {
                source: TermsSource::VariableValue { name: name.clone() },
                order: TermsOrder::KeyAsc,
                sub: Box::new(inner),
            },
            DistributedByPart::FlowNode | DistributedByPart::UserTask => Aggregation::Terms {
                source: TermsSource::ElementId,
                order: TermsOrder::KeyAsc,
                sub: Box::new(inner),
            },
            DistributedByPart::StartDate { unit } => Aggregation::DateHistogram {
                field: date_field(view.scope, true),
                interval: crate::store::query::HistogramInterval::Calendar(*unit),
                timezone: ctx.timezone,
                order: SortDirection::Asc,
                bounds: None,
                sub: Box::new(inner),
            },
            DistributedByPart::EndDate { unit } => Aggregation::DateHistogram {
                field: date_field(view.scope, false),
                interval: crate::store::query::HistogramInterval::Calendar(*unit),
                timezone: ctx.timezone,
                order: SortDirection::Asc,
                bounds: None,
                sub: Box::new(inner),
            },
        }
    }

    /// Side aggregation enumerating every key the distribution is expected
    /// to carry, run over the base query without view-level narrowing. The
    /// decode step unions these with the observed keys so zero-match keys
    /// still materialize.
    pub fn key_enumeration(&self) -> Option<Aggregation> {
        let count = Aggregation::Metrics(vec![MetricAgg::Count]);
        match self {
            DistributedByPart::Variable { name } => Some(Aggregation::Terms {
                source: TermsSource::VariableValue { name: name.clone() },
                order: TermsOrder::KeyAsc,
                sub: Box::new(count),
            }),
            DistributedByPart::FlowNode => Some(Aggregation::Nested {
                kind: ElementKind::FlowNode,
                sub: Box::new(Aggregation::Terms {
                    source: TermsSource::ElementId,
                    order: TermsOrder::KeyAsc,
                    sub: Box::new(count),
                }),
            }),
            DistributedByPart::UserTask => Some(Aggregation::Nested {
                kind: ElementKind::UserTask,
                sub: Box::new(Aggregation::Terms {
                    source: TermsSource::ElementId,
                    order: TermsOrder::KeyAsc,
                    sub: Box::new(count),
                }),
            }),
            DistributedByPart::None
            | DistributedByPart::StartDate { .. }
            | DistributedByPart::EndDate { .. } => None,
        }
    }

    /// Element kind whose catalog ids complete the expected key set.
    pub fn catalog_kind(&self) -> Option<ElementKind> {
        match self {
            DistributedByPart::FlowNode => Some(ElementKind::FlowNode),
            DistributedByPart::UserTask => Some(ElementKind::UserTask),
            _ => None,
        }
    }

    /// Decodes one outer bucket's sub-result into an ordered, key-complete
    /// distribution list.
    pub fn decode(
        &self,
        agg: &AggResult,
        view: &ResolvedView,
        expected_keys: &[String],
        ctx: &ExecutionContext,
    ) -> Result<Vec<DistributedByResult>, EvalError> {
        match self {
            DistributedByPart::None => Ok(vec![DistributedByResult {
                key: UNGROUPED_KEY.to_string(),
                value: decode_view_value(agg, view)?,
            }]),
            DistributedByPart::Variable { .. }
            | DistributedByPart::FlowNode
            | DistributedByPart::UserTask => {
                let buckets = expect_buckets(agg)?;
                let mut observed: IndexMap<String, DistributedByResult> = IndexMap::new();
                for bucket in buckets {
                    let sub = bucket
                        .sub
                        .as_deref()
                        .ok_or_else(|| EvalError::Response("terms bucket lost its metrics".into()))?;
                    let key = bucket.key.render();
                    observed.insert(
                        key.clone(),
                        DistributedByResult {
                            key,
                            value: decode_view_value(sub, view)?,
                        },
                    );
                }
                for key in expected_keys {
                    if !observed.contains_key(key) {
                        observed.insert(
                            key.clone(),
                            DistributedByResult {
                                key: key.clone(),
                                value: view.empty_value(),
                            },
                        );
                    }
                }
                let mut results: Vec<DistributedByResult> =
                    observed.into_iter().map(|(_, v)| v).collect();
                results.sort_by(|a, b| compare_keys(&a.key, &b.key));
                Ok(results)
            }
            DistributedByPart::StartDate { .. } | DistributedByPart::EndDate { .. } => {
                let buckets = expect_buckets(agg)?;
                let mut results = Vec::with_capacity(buckets.len());
                for bucket in buckets {
                    let millis = bucket.key.as_date_millis().ok_or_else(|| {
                        EvalError::Response("date sub-bucket carried a non-date key".into())
                    })?;
                    let sub = bucket
                        .sub
                        .as_deref()
                        .ok_or_else(|| EvalError::Response("date bucket lost its metrics".into()))?;
                    results.push(DistributedByResult {
                        key: ctx.bucketer.format_key_millis(millis),
                        value: decode_view_value(sub, view)?,
                    });
                }
                Ok(results)
            }
        }
    }
}

fn date_field(scope: ViewScope, start: bool) -> DateField {
    match (scope, start) {
        (ViewScope::Instances, true) => DateField::InstanceStart,
        (ViewScope::Instances, false) => DateField::InstanceEnd,
        (ViewScope::Elements(_), true) => DateField::ElementStart,
        (ViewScope::Elements(_), false) => DateField::ElementEnd,
    }
}

fn decode_view_value(
    agg: &AggResult,
    view: &ResolvedView,
) -> Result<crate::engine::result::ViewValue, EvalError> {
    match agg {
        AggResult::Metrics(values) => Ok(view.decode(values)),
        other => Err(EvalError::Response(format!(
            "expected leaf metrics, got {other:?}"
        ))),
    }
}

fn expect_buckets(agg: &AggResult) -> Result<&[crate::store::response::BucketResult], EvalError> {
    match agg {
        AggResult::Buckets(buckets) => Ok(buckets),
        other => Err(EvalError::Response(format!(
            "expected bucketed aggregation, got {other:?}"
        ))),
    }
}
