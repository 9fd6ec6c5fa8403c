use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Indexed process-instance document. This is the contract with the import
/// pipeline that populates the analytics store; the engine only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessInstanceDoc {
    pub instance_id: String,
    pub definition_key: String,
    pub definition_version: String,
    pub tenant_id: Option<String>,
    pub state: InstanceState,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    /// Engine-recorded duration for completed instances; running instances
    /// derive theirs from the pinned evaluation instant.
    pub duration_ms: Option<i64>,
    #[serde(default)]
    pub flow_nodes: Vec<ElementInstanceDoc>,
    #[serde(default)]
    pub user_tasks: Vec<ElementInstanceDoc>,
    #[serde(default)]
    pub variables: Vec<VariableDoc>,
}

impl ProcessInstanceDoc {
    /// Duration in milliseconds, deriving `max(0, now − start)` for
    /// instances that have not ended.
    pub fn duration_at(&self, now_millis: i64) -> i64 {
        match self.duration_ms {
            Some(d) => d,
            None => (now_millis - self.start_date.timestamp_millis()).max(0),
        }
    }

    pub fn elements(&self, kind: ElementKind) -> &[ElementInstanceDoc] {
        match kind {
            ElementKind::FlowNode => &self.flow_nodes,
            ElementKind::UserTask => &self.user_tasks,
        }
    }

    pub fn variable(&self, name: &str) -> Option<&VariableValue> {
        self.variables
            .iter()
            .find(|v| v.name == name)
            .map(|v| &v.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InstanceState {
    Running,
    Completed,
}

/// Nested flow-node or user-task sub-event of an instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementInstanceDoc {
    /// Model element id (activity id / task definition key).
    pub id: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
}

impl ElementInstanceDoc {
    pub fn duration_at(&self, now_millis: i64) -> i64 {
        match self.duration_ms {
            Some(d) => d,
            None => (now_millis - self.start_date.timestamp_millis()).max(0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementKind {
    FlowNode,
    UserTask,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableDoc {
    pub name: String,
    pub value: VariableValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum VariableValue {
    String(String),
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Date(DateTime<Utc>),
}
