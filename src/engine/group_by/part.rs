use crate::engine::context::ExecutionContext;
use crate::engine::distributed_by::DistributedByPart;
use crate::engine::errors::{ConfigError, EvalError};
use crate::engine::group_by::date::{limit_date_buckets, limit_term_buckets};
use crate::engine::result::{GroupByResult, UNGROUPED_KEY};
use crate::engine::view::{ResolvedView, ViewScope};
use crate::report::descriptor::{DateUnit, GroupByDef, SortDirection};
use crate::shared::datetime::interval::AutoInterval;
use crate::store::client::MinMaxStat;
use crate::store::document::ElementKind;
use crate::store::query::{
    Aggregation, DateField, HistogramInterval, TermsOrder, TermsSource, TimeSpan,
};
use crate::store::response::AggResult;

/// Outer bucketing dimension.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupByPart {
    None,
    Date { start_field: bool, unit: DateUnit },
    AutomaticDate { start_field: bool },
    Variable { name: String },
    Elements,
}

impl GroupByPart {
    pub fn resolve(def: &GroupByDef, view: &ResolvedView) -> Result<Self, ConfigError> {
        match def {
            GroupByDef::None => Ok(GroupByPart::None),
            GroupByDef::StartDate { unit } if unit.is_automatic() => {
                Ok(GroupByPart::AutomaticDate { start_field: true })
            }
            GroupByDef::EndDate { unit } if unit.is_automatic() => {
                Ok(GroupByPart::AutomaticDate { start_field: false })
            }
            GroupByDef::StartDate { unit } => Ok(GroupByPart::Date {
                start_field: true,
                unit: *unit,
            }),
            GroupByDef::EndDate { unit } => Ok(GroupByPart::Date {
                start_field: false,
                unit: *unit,
            }),
            GroupByDef::Variable(var) => {
                if view.scope != ViewScope::Instances {
                    return Err(ConfigError::IncompatibleDimensions(
                        "variable grouping needs a process-instance view".into(),
                    ));
                }
                Ok(GroupByPart::Variable {
                    name: var.name.clone(),
                })
            }
            GroupByDef::FlowNodes => match view.scope {
                ViewScope::Elements(ElementKind::FlowNode) => Ok(GroupByPart::Elements),
                _ => Err(ConfigError::IncompatibleDimensions(
                    "flow-node grouping needs a flow-node view".into(),
                )),
            },
            GroupByDef::UserTasks => match view.scope {
                ViewScope::Elements(ElementKind::UserTask) => Ok(GroupByPart::Elements),
                _ => Err(ConfigError::IncompatibleDimensions(
                    "user-task grouping needs a user-task view".into(),
                )),
            },
        }
    }

    /// Automatic interval sizing needs the observed span before the query
    /// can be built.
    pub fn needs_min_max_stats(&self) -> bool {
        matches!(self, GroupByPart::AutomaticDate { .. })
    }

    pub fn date_field(&self, scope: ViewScope) -> Option<DateField> {
        let start = match self {
            GroupByPart::Date { start_field, .. } => *start_field,
            GroupByPart::AutomaticDate { start_field } => *start_field,
            _ => return None,
        };
        Some(match (scope, start) {
            (ViewScope::Instances, true) => DateField::InstanceStart,
            (ViewScope::Instances, false) => DateField::InstanceEnd,
            (ViewScope::Elements(_), true) => DateField::ElementStart,
            (ViewScope::Elements(_), false) => DateField::ElementEnd,
        })
    }

    /// Process-instance dates read most-recent-first; flow-node and
    /// user-task timelines read chronologically. Kept as per-variant
    /// defaults on purpose.
    fn date_order(&self, scope: ViewScope) -> SortDirection {
        match scope {
            ViewScope::Instances => SortDirection::Desc,
            ViewScope::Elements(_) => SortDirection::Asc,
        }
    }

    fn terms_order(&self, view: &ResolvedView) -> TermsOrder {
        if view.is_frequency() {
            TermsOrder::CountDesc
        } else {
            TermsOrder::KeyAsc
        }
    }

    /// Wraps the inner (distributed-by + view) aggregation in the outer
    /// bucketing. `stats` is only consulted for automatic sizing, `bounds`
    /// when the report's own filters already bound the grouped field.
    pub fn build(
        &self,
        inner: Aggregation,
        view: &ResolvedView,
        ctx: &ExecutionContext,
        stats: Option<MinMaxStat>,
        bounds: Option<TimeSpan>,
    ) -> Aggregation {
        match self {
            GroupByPart::None => inner,
            GroupByPart::Date { unit, .. } => Aggregation::DateHistogram {
                field: self.date_field(view.scope).expect("date grouping has a field"),
                interval: HistogramInterval::Calendar(*unit),
                timezone: ctx.timezone,
                order: self.date_order(view.scope),
                bounds,
                sub: Box::new(inner),
            },
            GroupByPart::AutomaticDate { .. } => {
                let field = self.date_field(view.scope).expect("date grouping has a field");
                match stats {
                    Some(stats) => {
                        let (min, max) = stats.span_millis();
                        let interval = AutoInterval::from_span(min, max);
                        Aggregation::DateHistogram {
                            field,
                            interval: HistogramInterval::Fixed {
                                millis: interval.interval_millis,
                            },
                            timezone: ctx.timezone,
                            order: SortDirection::Asc,
                            bounds: Some(TimeSpan {
                                min_millis: min,
                                max_millis: max,
                            }),
                            sub: Box::new(inner),
                        }
                    }
                    // No observed span: fall back to the month path.
                    // Automatic grouping always reads chronologically.
                    None => Aggregation::DateHistogram {
                        field,
                        interval: HistogramInterval::Calendar(DateUnit::Month),
                        timezone: ctx.timezone,
                        order: SortDirection::Asc,
                        bounds,
                        sub: Box::new(inner),
                    },
                }
            }
            GroupByPart::Variable { name } => Aggregation::Terms {
                source: TermsSource::VariableValue { name: name.clone() },
                order: self.terms_order(view),
                sub: Box::new(inner),
            },
            GroupByPart::Elements => Aggregation::Terms {
                source: TermsSource::ElementId,
                order: self.terms_order(view),
                sub: Box::new(inner),
            },
        }
    }

    /// Decodes the outer aggregation into ordered groups, applying the
    /// bucket ceiling. Returns the groups and whether the result is
    /// complete.
    pub fn decode(
        &self,
        agg: &AggResult,
        view: &ResolvedView,
        dist: &DistributedByPart,
        expected_dist_keys: &[String],
        ctx: &ExecutionContext,
    ) -> Result<(Vec<GroupByResult>, bool), EvalError> {
        match self {
            GroupByPart::None => {
                let distributions = dist.decode(agg, view, expected_dist_keys, ctx)?;
                Ok((
                    vec![GroupByResult {
                        key: UNGROUPED_KEY.to_string(),
                        distributions,
                    }],
                    true,
                ))
            }
            GroupByPart::Date { .. } | GroupByPart::AutomaticDate { .. } => {
                let buckets = expect_buckets(agg)?;
                let mut entries = Vec::with_capacity(buckets.len());
                for bucket in buckets {
                    let millis = bucket.key.as_date_millis().ok_or_else(|| {
                        EvalError::Response("date histogram carried a non-date key".into())
                    })?;
                    let sub = bucket
                        .sub
                        .as_deref()
                        .ok_or_else(|| EvalError::Response("date bucket lost its sub-result".into()))?;
                    entries.push((
                        millis,
                        GroupByResult {
                            key: ctx.bucketer.format_key_millis(millis),
                            distributions: dist.decode(sub, view, expected_dist_keys, ctx)?,
                        },
                    ));
                }
                let order = match self {
                    GroupByPart::AutomaticDate { .. } => SortDirection::Asc,
                    _ => self.date_order(view.scope),
                };
                Ok(limit_date_buckets(entries, ctx.bucket_limit, order))
            }
            GroupByPart::Variable { .. } | GroupByPart::Elements => {
                let buckets = expect_buckets(agg)?;
                let mut groups = Vec::with_capacity(buckets.len());
                for bucket in buckets {
                    let sub = bucket
                        .sub
                        .as_deref()
                        .ok_or_else(|| EvalError::Response("terms bucket lost its sub-result".into()))?;
                    groups.push(GroupByResult {
                        key: bucket.key.render(),
                        distributions: dist.decode(sub, view, expected_dist_keys, ctx)?,
                    });
                }
                Ok(limit_term_buckets(groups, ctx.bucket_limit))
            }
        }
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
