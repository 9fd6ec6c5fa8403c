use chrono::{DateTime, Duration, Utc};

use procsight::store::document::{
    ElementInstanceDoc, InstanceState, ProcessInstanceDoc, VariableDoc, VariableValue,
};

pub struct InstanceFactory {
    doc: ProcessInstanceDoc,
}

impl InstanceFactory {
    pub fn new() -> Self {
        Self {
            doc: ProcessInstanceDoc {
                instance_id: "instance-1".to_string(),
                definition_key: "invoice".to_string(),
                definition_version: "1".to_string(),
                tenant_id: None,
                state: InstanceState::Completed,
                start_date: DateTime::UNIX_EPOCH,
                end_date: Some(DateTime::UNIX_EPOCH),
                duration_ms: Some(0),
                flow_nodes: Vec::new(),
                user_tasks: Vec::new(),
                variables: Vec::new(),
            },
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.doc.instance_id = id.to_string();
        self
    }

    pub fn with_definition(mut self, key: &str, version: &str) -> Self {
        self.doc.definition_key = key.to_string();
        self.doc.definition_version = version.to_string();
        self
    }

    pub fn with_tenant(mut self, tenant: &str) -> Self {
        self.doc.tenant_id = Some(tenant.to_string());
        self
    }

    /// Completed instance started at `start` with the given duration.
    pub fn completed(mut self, start: DateTime<Utc>, duration_ms: i64) -> Self {
        self.doc.state = InstanceState::Completed;
        self.doc.start_date = start;
        self.doc.end_date = Some(start + Duration::milliseconds(duration_ms));
        self.doc.duration_ms = Some(duration_ms);
        self
    }

    /// Running instance started at `start`; its duration derives from the
    /// evaluation instant.
    pub fn running(mut self, start: DateTime<Utc>) -> Self {
        self.doc.state = InstanceState::Running;
        self.doc.start_date = start;
        self.doc.end_date = None;
        self.doc.duration_ms = None;
        self
    }

    pub fn with_flow_node(mut self, id: &str, start: DateTime<Utc>, duration_ms: i64) -> Self {
        self.doc.flow_nodes.push(element(id, start, Some(duration_ms)));
        self
    }

    pub fn with_user_task(mut self, id: &str, start: DateTime<Utc>, duration_ms: i64) -> Self {
        self.doc.user_tasks.push(element(id, start, Some(duration_ms)));
        self
    }

    pub fn with_running_user_task(mut self, id: &str, start: DateTime<Utc>) -> Self {
        self.doc.user_tasks.push(element(id, start, None));
        self
    }

    pub fn with_variable(mut self, name: &str, value: VariableValue) -> Self {
        self.doc.variables.push(VariableDoc {
            name: name.to_string(),
            value,
        });
        self
    }

    /// Distinct instance id per build when several instances share a
    /// factory chain.
    pub fn build_numbered(self, n: u32) -> ProcessInstanceDoc {
        let mut doc = self.doc;
        doc.instance_id = format!("{}-{}", doc.instance_id, n);
        doc
    }

    pub fn build(self) -> ProcessInstanceDoc {
        self.doc
    }
}

fn element(id: &str, start: DateTime<Utc>, duration_ms: Option<i64>) -> ElementInstanceDoc {
    ElementInstanceDoc {
        id: id.to_string(),
        start_date: start,
        end_date: duration_ms.map(|d| start + Duration::milliseconds(d)),
        duration_ms,
    }
}
