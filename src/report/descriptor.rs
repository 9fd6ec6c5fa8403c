use serde::{Deserialize, Serialize};

use crate::report::filters::ReportFilter;

/// User-authored report definition: what to measure, how to bucket it, and
/// which slice of the recorded history it runs over. Produced by the
/// persistence layer; this crate only evaluates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDescriptor {
    pub definition_key: String,
    #[serde(default)]
    pub definition_versions: VersionSelector,
    /// Empty means no tenant restriction.
    #[serde(default)]
    pub tenant_ids: Vec<String>,
    pub view: Option<ViewDef>,
    pub group_by: Option<GroupByDef>,
    pub distributed_by: Option<DistributedByDef>,
    #[serde(default)]
    pub filters: Vec<ReportFilter>,
    #[serde(default)]
    pub configuration: ReportConfiguration,
}

/// Which definition versions a report runs over. Carried on the wire as a
/// string list with `"ALL"` and `"LATEST"` sentinels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub enum VersionSelector {
    All,
    Latest,
    Explicit(Vec<String>),
}

impl Default for VersionSelector {
    fn default() -> Self {
        VersionSelector::All
    }
}

impl From<Vec<String>> for VersionSelector {
    fn from(versions: Vec<String>) -> Self {
        if versions.is_empty() || versions.iter().any(|v| v.eq_ignore_ascii_case("all")) {
            VersionSelector::All
        } else if versions.iter().any(|v| v.eq_ignore_ascii_case("latest")) {
            VersionSelector::Latest
        } else {
            VersionSelector::Explicit(versions)
        }
    }
}

impl From<VersionSelector> for Vec<String> {
    fn from(selector: VersionSelector) -> Self {
        match selector {
            VersionSelector::All => vec!["ALL".to_string()],
            VersionSelector::Latest => vec!["LATEST".to_string()],
            VersionSelector::Explicit(versions) => versions,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewDef {
    pub entity: ViewEntity,
    pub property: ViewProperty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewEntity {
    ProcessInstance,
    FlowNode,
    UserTask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewProperty {
    Frequency,
    Duration,
    RawData,
}

/// Outer bucketing dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum GroupByDef {
    None,
    StartDate { unit: DateUnit },
    EndDate { unit: DateUnit },
    Variable(VariableRef),
    FlowNodes,
    UserTasks,
}

/// Inner bucketing dimension within each outer bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum DistributedByDef {
    None,
    Variable(VariableRef),
    FlowNode,
    UserTask,
    StartDate { unit: DateUnit },
    EndDate { unit: DateUnit },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableRef {
    pub name: String,
    #[serde(rename = "type")]
    pub var_type: VariableType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VariableType {
    String,
    Boolean,
    Integer,
    Double,
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DateUnit {
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
    Automatic,
}

impl DateUnit {
    pub fn is_automatic(&self) -> bool {
        matches!(self, DateUnit::Automatic)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportConfiguration {
    pub aggregation_type: AggregationType,
    pub sorting: Option<SortSpec>,
    pub bucket_limit: Option<usize>,
    pub timezone: Option<String>,
}

/// Which duration statistic a report treats as its headline value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum AggregationType {
    Min,
    Max,
    #[default]
    Avg,
    Median,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortSpec {
    pub by: SortBy,
    pub order: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortBy {
    #[serde(rename = "SORT_BY_KEY")]
    Key,
    #[serde(rename = "SORT_BY_VALUE")]
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[serde(rename = "ASC")]
    Asc,
    #[serde(rename = "DESC")]
    Desc,
}
