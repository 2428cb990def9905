//! Extracts the backend declaration from a Terraform configuration.
//!
//! Only `terraform { backend "<type>" { ... } }` is inspected; every other
//! block is ignored and no expression is evaluated.

use std::path::{Path, PathBuf};

use hcl::{Block, Body};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unable to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: hcl::Error,
    },

    #[error("No Terraform files found in directory.")]
    NoFilesFound,

    #[error("No backend block found in Terraform configuration.")]
    NoBackend,

    #[error("Multiple backend blocks found in Terraform configuration.")]
    MultipleBackends,

    #[error("Backend block must have exactly one label (the backend type).")]
    InvalidBackendBlock,

    #[error("unable to convert backend setting '{key}': {source}")]
    Setting {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The declared backend: its type and its raw, unevaluated settings.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    pub backend_type: String,
    pub settings: Map<String, Value>,
    /// Directory relative backend paths resolve against.
    pub working_dir: PathBuf,
}

impl BackendConfig {
    /// Loads a single `.tf` file, or every `*.tf` file directly inside a
    /// directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let (files, working_dir) = if path.is_dir() {
            (terraform_files(path)?, path.to_path_buf())
        } else {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            (vec![path.to_path_buf()], dir)
        };

        let mut found: Vec<Block> = Vec::new();
        for file in &files {
            tracing::debug!(path = %file.display(), "parsing terraform file");
            let contents = std::fs::read_to_string(file)?;
            let body = hcl::parse(&contents).map_err(|source| ConfigError::Parse {
                path: file.display().to_string(),
                source,
            })?;
            found.extend(backend_blocks(&body).into_iter().cloned());
        }

        let block = match found.as_slice() {
            [] => return Err(ConfigError::NoBackend),
            [block] => block,
            _ => return Err(ConfigError::MultipleBackends),
        };
        let mut config = Self::from_block(block)?;
        config.working_dir = working_dir;
        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let body = hcl::parse(contents).map_err(|source| ConfigError::Parse {
            path: "<inline>".to_string(),
            source,
        })?;
        match backend_blocks(&body).as_slice() {
            [] => Err(ConfigError::NoBackend),
            [block] => Self::from_block(block),
            _ => Err(ConfigError::MultipleBackends),
        }
    }

    fn from_block(block: &Block) -> Result<Self, ConfigError> {
        let backend_type = match block.labels() {
            [label] => label.as_str().to_string(),
            _ => return Err(ConfigError::InvalidBackendBlock),
        };
        Ok(Self {
            backend_type,
            settings: body_to_map(block.body())?,
            working_dir: PathBuf::from("."),
        })
    }

    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }
}

fn terraform_files(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "tf") {
            files.push(path);
        }
    }

    if files.is_empty() {
        return Err(ConfigError::NoFilesFound);
    }
    files.sort();
    Ok(files)
}

fn backend_blocks(body: &Body) -> Vec<&Block> {
    body.blocks()
        .filter(|block| block.identifier() == "terraform")
        .flat_map(|terraform| terraform.body().blocks())
        .filter(|block| block.identifier() == "backend")
        .collect()
}

fn body_to_map(body: &Body) -> Result<Map<String, Value>, ConfigError> {
    let mut map = Map::new();
    for attribute in body.attributes() {
        let value = hcl::Value::from(attribute.expr().clone());
        let value = serde_json::to_value(value).map_err(|source| ConfigError::Setting {
            key: attribute.key().to_string(),
            source,
        })?;
        map.insert(attribute.key().to_string(), value);
    }
    for block in body.blocks() {
        map.insert(
            block.identifier().to_string(),
            Value::Object(body_to_map(block.body())?),
        );
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_local_backend() {
        let config = BackendConfig::parse(
            r#"
            terraform {
              required_version = ">= 0.11"
              backend "local" {
                path = "state/terraform.tfstate"
              }
            }

            resource "aws_s3_bucket" "backups" {
              bucket = "tsam.backups"
            }
            "#,
        )
        .unwrap();

        assert_eq!(config.backend_type, "local");
        assert_eq!(
            Value::Object(config.settings),
            json!({"path": "state/terraform.tfstate"})
        );
    }

    #[test]
    fn test_nested_blocks_and_literals() {
        let config = BackendConfig::parse(
            r#"
            terraform {
              backend "remote" {
                hostname     = "app.terraform.io"
                organization = "acme"
                retry_max    = 3
                skip_verify  = false

                workspaces {
                  prefix = "network-"
                }
              }
            }
            "#,
        )
        .unwrap();

        assert_eq!(config.backend_type, "remote");
        assert_eq!(
            Value::Object(config.settings),
            json!({
                "hostname": "app.terraform.io",
                "organization": "acme",
                "retry_max": 3,
                "skip_verify": false,
                "workspaces": {"prefix": "network-"}
            })
        );
    }

    #[test]
    fn test_no_backend() {
        let err = BackendConfig::parse("terraform {\n  required_version = \">= 1.0\"\n}\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::NoBackend));
    }

    #[test]
    fn test_multiple_backends() {
        let err = BackendConfig::parse(
            r#"
            terraform {
              backend "local" {}
            }
            terraform {
              backend "http" {}
            }
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MultipleBackends));
    }

    #[test]
    fn test_invalid_hcl() {
        let err = BackendConfig::parse("terraform {").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_directory_resolves_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("backend.tf"),
            "terraform {\n  backend \"local\" {\n    path = \"a.tfstate\"\n  }\n}\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("main.tf"), "variable \"region\" {}\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "backend \"s3\" {}").unwrap();

        let config = BackendConfig::load(dir.path()).unwrap();
        assert_eq!(config.backend_type, "local");
        assert_eq!(config.working_dir, dir.path());
        assert_eq!(config.resolve_path("a.tfstate"), dir.path().join("a.tfstate"));
    }

    #[test]
    fn test_load_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = BackendConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::NoFilesFound));
    }

    #[test]
    fn test_load_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("backend.tf");
        std::fs::write(&file, "terraform {\n  backend \"inmem\" {}\n}\n").unwrap();

        let config = BackendConfig::load(&file).unwrap();
        assert_eq!(config.backend_type, "inmem");
        assert!(config.settings.is_empty());
        assert_eq!(config.working_dir, dir.path());
    }
}
