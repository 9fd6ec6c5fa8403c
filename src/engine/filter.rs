use chrono::{Duration, Months};

use crate::engine::context::ExecutionContext;
use crate::engine::errors::ConfigError;
use crate::report::descriptor::DateUnit;
use crate::report::filters::{
    ComparisonOperator, DateFilter, FilterLevel, FilterPredicate, MembershipOperator,
    VariablePredicate,
};
use crate::store::document::InstanceState;
use crate::store::query::{DateField, FilterExpr, NumericRange, TimeSpan, VariableMatch};

/// Report filters compiled into store predicates, split by level: instance
/// filters restrict the instance set, view filters narrow nested element
/// scope.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFilters {
    pub instance: FilterExpr,
    pub view: FilterExpr,
}

impl CompiledFilters {
    pub fn has_view_filters(&self) -> bool {
        self.view != FilterExpr::MatchAll
    }
}

pub fn compile(ctx: &ExecutionContext) -> Result<CompiledFilters, ConfigError> {
    let mut instance = Vec::new();
    let mut view = Vec::new();
    for filter in &ctx.descriptor.filters {
        match filter.filter_level {
            FilterLevel::Instance => instance.push(compile_instance(&filter.predicate, ctx)?),
            FilterLevel::View => view.push(compile_view(&filter.predicate, ctx)?),
        }
    }
    Ok(CompiledFilters {
        instance: FilterExpr::and(instance),
        view: FilterExpr::and(view),
    })
}

fn compile_instance(
    predicate: &FilterPredicate,
    ctx: &ExecutionContext,
) -> Result<FilterExpr, ConfigError> {
    match predicate {
        FilterPredicate::InstanceStartDate(date) => Ok(FilterExpr::DateRange {
            field: DateField::InstanceStart,
            range: date_window(date, ctx)?,
        }),
        FilterPredicate::InstanceEndDate(date) => Ok(FilterExpr::DateRange {
            field: DateField::InstanceEnd,
            range: date_window(date, ctx)?,
        }),
        FilterPredicate::Variable(variable) => Ok(FilterExpr::Variable {
            name: variable.name.clone(),
            matches: variable_match(&variable.predicate)?,
        }),
        FilterPredicate::ExecutedFlowNodes { ids } => {
            Ok(FilterExpr::ExecutedFlowNode { ids: ids.clone() })
        }
        FilterPredicate::RunningInstancesOnly => Ok(FilterExpr::State(InstanceState::Running)),
        FilterPredicate::CompletedInstancesOnly => Ok(FilterExpr::State(InstanceState::Completed)),
        FilterPredicate::Duration(duration) => Ok(FilterExpr::DurationRange {
            now_millis: ctx.now_millis(),
            range: comparison_range(duration.operator, duration.millis as f64)?,
        }),
    }
}

fn compile_view(
    predicate: &FilterPredicate,
    ctx: &ExecutionContext,
) -> Result<FilterExpr, ConfigError> {
    match predicate {
        FilterPredicate::ExecutedFlowNodes { ids } => Ok(FilterExpr::ElementIdIn(ids.clone())),
        FilterPredicate::Duration(duration) => Ok(FilterExpr::ElementDurationRange {
            now_millis: ctx.now_millis(),
            range: comparison_range(duration.operator, duration.millis as f64)?,
        }),
        other => Err(ConfigError::UnsupportedFilter(format!(
            "filter does not apply at view level: {other:?}"
        ))),
    }
}

/// Resolves a date filter to an epoch-millisecond window against the pinned
/// evaluation instant.
pub fn date_window(filter: &DateFilter, ctx: &ExecutionContext) -> Result<NumericRange, ConfigError> {
    match filter {
        DateFilter::Fixed { start, end } => Ok(NumericRange::exclusive_inclusive(
            start.map(|s| s.timestamp_millis() as f64),
            end.map(|e| e.timestamp_millis() as f64),
        )),
        DateFilter::Rolling { value, unit } => {
            let now = ctx.now;
            let start = match unit {
                DateUnit::Minute => now - Duration::minutes(*value as i64),
                DateUnit::Hour => now - Duration::hours(*value as i64),
                DateUnit::Day => now - Duration::days(*value as i64),
                DateUnit::Week => now - Duration::days(7 * *value as i64),
                DateUnit::Month => now - Months::new(*value),
                DateUnit::Year => now - Months::new(12 * *value),
                DateUnit::Automatic => {
                    return Err(ConfigError::UnsupportedFilter(
                        "rolling window needs a concrete unit".into(),
                    ));
                }
            };
            Ok(NumericRange::closed(
                start.timestamp_millis() as f64,
                now.timestamp_millis() as f64,
            ))
        }
        DateFilter::Relative { value, unit } => {
            if unit.is_automatic() {
                return Err(ConfigError::UnsupportedFilter(
                    "relative window needs a concrete unit".into(),
                ));
            }
            let unit_start = ctx.bucketer.truncate(ctx.now, *unit);
            if *value == 0 {
                return Ok(NumericRange::closed(
                    unit_start.timestamp_millis() as f64,
                    ctx.now_millis() as f64,
                ));
            }
            let start = ctx.bucketer.minus(unit_start, *unit, *value);
            Ok(NumericRange {
                gte: Some(start.timestamp_millis() as f64),
                lt: Some(unit_start.timestamp_millis() as f64),
                ..Default::default()
            })
        }
    }
}

fn variable_match(predicate: &VariablePredicate) -> Result<VariableMatch, ConfigError> {
    match predicate {
        VariablePredicate::String { operator, values } => Ok(VariableMatch::StringIn {
            values: values.clone(),
            negate: *operator == MembershipOperator::NotIn,
        }),
        VariablePredicate::Boolean { value } => Ok(VariableMatch::BooleanIs(*value)),
        VariablePredicate::Integer { operator, values } => {
            number_match(*operator, values.iter().map(|v| *v as f64).collect())
        }
        VariablePredicate::Double { operator, values } => number_match(*operator, values.clone()),
        VariablePredicate::Date { start, end } => {
            Ok(VariableMatch::DateRange(NumericRange::exclusive_inclusive(
                start.map(|s| s.timestamp_millis() as f64),
                end.map(|e| e.timestamp_millis() as f64),
            )))
        }
    }
}

fn number_match(
    operator: ComparisonOperator,
    values: Vec<f64>,
) -> Result<VariableMatch, ConfigError> {
    match operator {
        ComparisonOperator::In => Ok(VariableMatch::NumberIn {
            values,
            negate: false,
        }),
        ComparisonOperator::NotIn => Ok(VariableMatch::NumberIn {
            values,
            negate: true,
        }),
        comparison => {
            let value = values.first().copied().ok_or_else(|| {
                ConfigError::UnsupportedFilter("comparison filter needs a value".into())
            })?;
            Ok(VariableMatch::NumberRange(comparison_range(
                comparison, value,
            )?))
        }
    }
}

fn comparison_range(operator: ComparisonOperator, value: f64) -> Result<NumericRange, ConfigError> {
    match operator {
        ComparisonOperator::LessThan => Ok(NumericRange::less_than(value)),
        ComparisonOperator::LessThanEquals => Ok(NumericRange::at_most(value)),
        ComparisonOperator::GreaterThan => Ok(NumericRange::greater_than(value)),
        ComparisonOperator::GreaterThanEquals => Ok(NumericRange::at_least(value)),
        ComparisonOperator::In | ComparisonOperator::NotIn => Err(ConfigError::UnsupportedFilter(
            "membership operator is not a comparison".into(),
        )),
    }
}

/// Window already imposed on a grouped date field by the report's own
/// instance-level filters. `Some` only when both bounds are present, which
/// is what lets the histogram carry hard bounds instead of overflow
/// detection.
pub fn bounded_window_for_field(
    ctx: &ExecutionContext,
    field: DateField,
) -> Result<Option<TimeSpan>, ConfigError> {
    let mut span: Option<TimeSpan> = None;
    for filter in &ctx.descriptor.filters {
        if filter.filter_level != FilterLevel::Instance {
            continue;
        }
        let date = match (&filter.predicate, field) {
            (FilterPredicate::InstanceStartDate(d), DateField::InstanceStart) => d,
            (FilterPredicate::InstanceEndDate(d), DateField::InstanceEnd) => d,
            _ => continue,
        };
        let window = date_window(date, ctx)?;
        let (Some(lower), Some(upper)) = (window.lower_millis(), window.upper_millis()) else {
            continue;
        };
        span = Some(match span {
            None => TimeSpan {
                min_millis: lower,
                max_millis: upper,
            },
            Some(existing) => TimeSpan {
                min_millis: existing.min_millis.max(lower),
                max_millis: existing.max_millis.min(upper),
            },
        });
    }
    Ok(span)
}
