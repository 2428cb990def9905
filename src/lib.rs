//! tfstate-retrieve - read values out of a Terraform state workspace.
//!
//! Loads a JSON argument file, selects the backend declared by a Terraform
//! configuration, refreshes the requested workspace and projects the
//! requested outputs and resource attributes into a nested JSON object.

pub mod arguments;
pub mod backends;
pub mod cli;
pub mod error;
pub mod lookup;
pub mod output;
pub mod response;
pub mod retrieve;
pub mod snapshot;
pub mod terraform;

use std::path::Path;

pub use arguments::{Arguments, Retrieve};
pub use backends::{Backend, BackendRegistry, Workspace};
pub use error::RetrieveError;
pub use lookup::Lookup;
pub use output::Envelope;
pub use snapshot::StateSnapshot;

use terraform::BackendConfig;

/// Runs the whole pipeline for one argument file and returns the serialized
/// response object.
pub async fn run(argument_file: &Path, registry: &BackendRegistry) -> Result<String, RetrieveError> {
    let arguments = Arguments::load(argument_file)?;
    run_with_arguments(&arguments, registry).await
}

pub async fn run_with_arguments(
    arguments: &Arguments,
    registry: &BackendRegistry,
) -> Result<String, RetrieveError> {
    let config_path = &arguments.terraform_config_path;
    let config =
        BackendConfig::load(config_path).map_err(|e| RetrieveError::TerraformConfig {
            path: config_path.display().to_string(),
            reason: e.to_string(),
        })?;

    let snapshot = fetch_snapshot(&config, &arguments.state, registry).await?;
    let items = retrieve::retrieve_all(&snapshot, &arguments.retrieves, arguments.require_all)?;
    tracing::info!(count = items.len(), "values retrieved");

    let response = response::shape(items)?;
    Ok(serde_json::to_string(&response)?)
}

/// Instantiates the declared backend, opens `workspace` and refreshes it.
pub async fn fetch_snapshot(
    config: &BackendConfig,
    workspace: &str,
    registry: &BackendRegistry,
) -> Result<StateSnapshot, RetrieveError> {
    let mut backend = registry
        .get_backend(&config.backend_type)
        .ok_or_else(|| RetrieveError::UnknownBackend(config.backend_type.clone()))?;
    tracing::info!(backend = backend.name(), workspace = %workspace, "backend selected");

    let errors = backend.validate(config);
    if !errors.is_empty() {
        return Err(RetrieveError::Backend(errors.join(", ")));
    }

    backend
        .configure(config)
        .map_err(|e| RetrieveError::Backend(e.to_string()))?;

    let mut handle = backend
        .open_workspace(workspace)
        .await
        .map_err(|e| RetrieveError::Backend(e.to_string()))?;

    handle
        .refresh()
        .await
        .map_err(|e| RetrieveError::Refresh(e.to_string()))?;

    let snapshot = StateSnapshot::from_modules(handle.modules());
    tracing::info!(
        outputs = snapshot.output_count(),
        resources = snapshot.resource_count(),
        "workspace refreshed"
    );
    Ok(snapshot)
}
