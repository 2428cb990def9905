//! The JSON argument file handed to the binary by the automation driver.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::RetrieveError;
use crate::lookup::Lookup;

pub const DEFAULT_STATE: &str = "default";
pub const DEFAULT_MODULE_PATH: &str = "root";

/// Every key is optional and an explicit `null` counts as absent.
#[derive(Debug, Deserialize)]
struct RawArguments {
    terraform_config_path: Option<String>,
    state: Option<String>,
    require_all: Option<bool>,
    retrieves: Option<Vec<RawRetrieve>>,
}

#[derive(Debug, Deserialize)]
struct RawRetrieve {
    module_path: Option<String>,
    retrieve: Option<String>,
}

/// Validated arguments with defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Arguments {
    pub terraform_config_path: PathBuf,
    pub state: String,
    pub require_all: bool,
    pub retrieves: Vec<Retrieve>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Retrieve {
    pub module_path: String,
    pub lookup: Lookup,
}

impl Arguments {
    pub fn load(path: &Path) -> Result<Self, RetrieveError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| RetrieveError::ReadArguments {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let arguments = Self::parse(&contents, path)?;
        tracing::debug!(
            path = %path.display(),
            state = %arguments.state,
            retrieves = arguments.retrieves.len(),
            require_all = arguments.require_all,
            "arguments loaded"
        );
        Ok(arguments)
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, RetrieveError> {
        let raw: RawArguments =
            serde_json::from_str(contents).map_err(|e| RetrieveError::InvalidArguments {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawArguments) -> Result<Self, RetrieveError> {
        let terraform_config_path = non_empty(raw.terraform_config_path)
            .ok_or(RetrieveError::MissingConfigPath)?;
        let raw_retrieves = raw.retrieves.unwrap_or_default();
        if raw_retrieves.is_empty() {
            return Err(RetrieveError::NothingToRetrieve);
        }

        let retrieves = raw_retrieves
            .into_iter()
            .map(|r| {
                let lookup = Lookup::parse(r.retrieve.as_deref().unwrap_or_default())?;
                let module_path = non_empty(r.module_path)
                    .unwrap_or_else(|| DEFAULT_MODULE_PATH.to_string());
                Ok(Retrieve {
                    module_path,
                    lookup,
                })
            })
            .collect::<Result<Vec<_>, RetrieveError>>()?;

        Ok(Self {
            terraform_config_path: PathBuf::from(terraform_config_path),
            state: non_empty(raw.state).unwrap_or_else(|| DEFAULT_STATE.to_string()),
            require_all: raw.require_all.unwrap_or_default(),
            retrieves,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
