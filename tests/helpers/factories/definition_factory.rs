use crate::helpers::memstore::DefinitionEntry;

pub struct DefinitionFactory {
    entry: DefinitionEntry,
}

impl DefinitionFactory {
    pub fn new(key: &str) -> Self {
        Self {
            entry: DefinitionEntry {
                key: key.to_string(),
                version: "1".to_string(),
                tenant_id: None,
                flow_node_ids: Vec::new(),
                user_task_ids: Vec::new(),
            },
        }
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.entry.version = version.to_string();
        self
    }

    pub fn with_tenant(mut self, tenant: &str) -> Self {
        self.entry.tenant_id = Some(tenant.to_string());
        self
    }

    pub fn with_flow_nodes(mut self, ids: Vec<&str>) -> Self {
        self.entry.flow_node_ids = ids.into_iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_user_tasks(mut self, ids: Vec<&str>) -> Self {
        self.entry.user_task_ids = ids.into_iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn build(self) -> DefinitionEntry {
        self.entry
    }
}
