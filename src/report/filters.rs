use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::report::descriptor::DateUnit;

/// A single typed filter predicate plus the level it applies at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportFilter {
    #[serde(flatten)]
    pub predicate: FilterPredicate,
    #[serde(default)]
    pub filter_level: FilterLevel,
}

impl ReportFilter {
    pub fn instance(predicate: FilterPredicate) -> Self {
        Self {
            predicate,
            filter_level: FilterLevel::Instance,
        }
    }

    pub fn view(predicate: FilterPredicate) -> Self {
        Self {
            predicate,
            filter_level: FilterLevel::View,
        }
    }
}

/// Instance-level filters restrict which process instances a report sees;
/// view-level filters narrow the nested flow-node/user-task documents the
/// view aggregates over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum FilterLevel {
    #[default]
    Instance,
    View,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum FilterPredicate {
    InstanceStartDate(DateFilter),
    InstanceEndDate(DateFilter),
    Variable(VariableFilter),
    ExecutedFlowNodes { ids: Vec<String> },
    RunningInstancesOnly,
    CompletedInstancesOnly,
    Duration(DurationFilter),
}

/// Date window over an instance date field. Fixed windows treat the start
/// bound as exclusive and the end bound as inclusive; rolling and relative
/// windows are anchored to the pinned evaluation instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DateFilter {
    Fixed {
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    },
    /// The continuous window of the last `value` units ending now.
    Rolling { value: u32, unit: DateUnit },
    /// The `value` whole units before the current one; 0 means the current
    /// unit so far.
    Relative { value: u32, unit: DateUnit },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableFilter {
    pub name: String,
    #[serde(flatten)]
    pub predicate: VariablePredicate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum VariablePredicate {
    String {
        operator: MembershipOperator,
        values: Vec<String>,
    },
    Boolean {
        value: bool,
    },
    Integer {
        operator: ComparisonOperator,
        values: Vec<i64>,
    },
    Double {
        operator: ComparisonOperator,
        values: Vec<f64>,
    },
    /// Variable date filters only support fixed windows.
    Date {
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MembershipOperator {
    In,
    NotIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComparisonOperator {
    In,
    NotIn,
    LessThan,
    LessThanEquals,
    GreaterThan,
    GreaterThanEquals,
}

/// Threshold over the derived instance duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurationFilter {
    pub operator: ComparisonOperator,
    pub millis: i64,
}
