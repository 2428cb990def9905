use std::path::PathBuf;

use async_trait::async_trait;

use super::{
    Backend, BackendError, DEFAULT_WORKSPACE, SettingsSchema, Workspace, string_setting,
};
use crate::terraform::{BackendConfig, Module, parse_state};

const DEFAULT_STATE_PATH: &str = "terraform.tfstate";
const DEFAULT_WORKSPACE_DIR: &str = "terraform.tfstate.d";

const SCHEMA: SettingsSchema<'static> = SettingsSchema {
    required: &[],
    strings: &["path", "workspace_dir"],
    booleans: &[],
};

/// State stored as files on the local filesystem.
#[derive(Debug, Default)]
pub struct LocalBackend {
    paths: Option<LocalPaths>,
}

#[derive(Debug, Clone)]
struct LocalPaths {
    state: PathBuf,
    workspace_dir: PathBuf,
}

impl LocalPaths {
    fn for_workspace(&self, name: &str) -> PathBuf {
        if name == DEFAULT_WORKSPACE {
            self.state.clone()
        } else {
            self.workspace_dir.join(name).join(DEFAULT_STATE_PATH)
        }
    }
}

#[async_trait]
impl Backend for LocalBackend {
    fn name(&self) -> &str {
        "local"
    }

    fn validate(&self, config: &BackendConfig) -> Vec<String> {
        SCHEMA.check(&config.settings)
    }

    fn configure(&mut self, config: &BackendConfig) -> Result<(), BackendError> {
        let state = string_setting(&config.settings, "path").unwrap_or(DEFAULT_STATE_PATH);
        let workspace_dir =
            string_setting(&config.settings, "workspace_dir").unwrap_or(DEFAULT_WORKSPACE_DIR);

        self.paths = Some(LocalPaths {
            state: config.resolve_path(state),
            workspace_dir: config.resolve_path(workspace_dir),
        });
        Ok(())
    }

    async fn open_workspace(&self, name: &str) -> Result<Box<dyn Workspace>, BackendError> {
        let paths = self.paths.as_ref().ok_or(BackendError::NotConfigured)?;
        let path = paths.for_workspace(name);
        tracing::debug!(workspace = %name, path = %path.display(), "opening local workspace");
        Ok(Box::new(LocalWorkspace {
            path,
            modules: Vec::new(),
        }))
    }
}

#[derive(Debug)]
pub struct LocalWorkspace {
    path: PathBuf,
    modules: Vec<Module>,
}

#[async_trait]
impl Workspace for LocalWorkspace {
    async fn refresh(&mut self) -> Result<(), BackendError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no state file, treating as empty");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };
        self.modules = parse_state(&bytes)?;
        Ok(())
    }

    fn modules(&self) -> &[Module] {
        &self.modules
    }
}
