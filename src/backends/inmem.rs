use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::{Backend, BackendError, SettingsSchema, Workspace};
use crate::terraform::{BackendConfig, Module};

const SCHEMA: SettingsSchema<'static> = SettingsSchema {
    required: &[],
    strings: &["lock_id"],
    booleans: &[],
};

/// Workspaces held in memory. Workspaces that were never seeded are empty.
#[derive(Debug, Clone, Default)]
pub struct InmemBackend {
    workspaces: Arc<HashMap<String, Vec<Module>>>,
}

impl InmemBackend {
    pub fn with_workspaces(workspaces: HashMap<String, Vec<Module>>) -> Self {
        Self {
            workspaces: Arc::new(workspaces),
        }
    }

    pub fn with_default(modules: Vec<Module>) -> Self {
        Self::with_workspaces(HashMap::from([(
            super::DEFAULT_WORKSPACE.to_string(),
            modules,
        )]))
    }
}

#[async_trait]
impl Backend for InmemBackend {
    fn name(&self) -> &str {
        "inmem"
    }

    fn validate(&self, config: &BackendConfig) -> Vec<String> {
        SCHEMA.check(&config.settings)
    }

    fn configure(&mut self, _config: &BackendConfig) -> Result<(), BackendError> {
        Ok(())
    }

    async fn open_workspace(&self, name: &str) -> Result<Box<dyn Workspace>, BackendError> {
        Ok(Box::new(InmemWorkspace {
            name: name.to_string(),
            store: Arc::clone(&self.workspaces),
            modules: Vec::new(),
        }))
    }
}

#[derive(Debug)]
pub struct InmemWorkspace {
    name: String,
    store: Arc<HashMap<String, Vec<Module>>>,
    modules: Vec<Module>,
}

#[async_trait]
impl Workspace for InmemWorkspace {
    async fn refresh(&mut self) -> Result<(), BackendError> {
        self.modules = self.store.get(&self.name).cloned().unwrap_or_default();
        Ok(())
    }

    fn modules(&self) -> &[Module] {
        &self.modules
    }
}
