//! Terraform state decoding.
//!
//! Handles the legacy module-list format (versions 1-3) and the current
//! resource-list format (version 4). Version 4 attributes are flattened into
//! the legacy flat-map encoding (`tags.%`, `versioning.#`, `versioning.0.enabled`)
//! so lookups see one representation regardless of which Terraform wrote it.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

pub const ROOT_MODULE: &str = "root";

#[derive(Debug, Error)]
pub enum StateError {
    #[error("state is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported state version {0}.")]
    UnsupportedVersion(u64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub path: Vec<String>,
    pub outputs: HashMap<String, OutputState>,
    pub resources: HashMap<String, ResourceState>,
}

impl Module {
    pub fn new(path: Vec<String>) -> Self {
        Self {
            path,
            outputs: HashMap::new(),
            resources: HashMap::new(),
        }
    }

    pub fn root() -> Self {
        Self::new(vec![ROOT_MODULE.to_string()])
    }

    pub fn with_output(mut self, name: &str, value: Value) -> Self {
        self.outputs.insert(name.to_string(), OutputState { value });
        self
    }

    pub fn with_resource<'a>(
        mut self,
        address: &str,
        id: &str,
        attributes: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        self.resources.insert(
            address.to_string(),
            ResourceState {
                id: id.to_string(),
                attributes: attributes
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            },
        );
        self
    }

    /// Dotted module address, e.g. `root.child`.
    pub fn dotted_path(&self) -> String {
        self.path.join(".")
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OutputState {
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResourceState {
    pub id: String,
    pub attributes: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct VersionProbe {
    #[serde(default)]
    version: u64,
}

#[derive(Debug, Deserialize)]
struct LegacyState {
    #[serde(default)]
    modules: Vec<LegacyModule>,
}

#[derive(Debug, Deserialize)]
struct LegacyModule {
    #[serde(default)]
    path: Vec<String>,
    #[serde(default)]
    outputs: HashMap<String, OutputState>,
    #[serde(default)]
    resources: HashMap<String, LegacyResource>,
}

#[derive(Debug, Deserialize)]
struct LegacyResource {
    #[serde(default)]
    primary: Option<LegacyInstance>,
}

#[derive(Debug, Default, Deserialize)]
struct LegacyInstance {
    #[serde(default)]
    id: String,
    #[serde(default)]
    attributes: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct CurrentState {
    #[serde(default)]
    outputs: HashMap<String, OutputState>,
    #[serde(default)]
    resources: Vec<CurrentResource>,
}

#[derive(Debug, Deserialize)]
struct CurrentResource {
    #[serde(default)]
    module: Option<String>,
    #[serde(default = "managed_mode")]
    mode: String,
    #[serde(rename = "type")]
    resource_type: String,
    name: String,
    #[serde(default)]
    instances: Vec<CurrentInstance>,
}

#[derive(Debug, Deserialize)]
struct CurrentInstance {
    #[serde(default)]
    index_key: Option<Value>,
    #[serde(default)]
    attributes: Option<serde_json::Map<String, Value>>,
}

fn managed_mode() -> String {
    "managed".to_string()
}

/// Decodes raw state bytes. An empty (or whitespace-only) payload means no
/// state has been written yet and yields no modules.
pub fn parse_state(bytes: &[u8]) -> Result<Vec<Module>, StateError> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(Vec::new());
    }

    let probe: VersionProbe = serde_json::from_slice(bytes)?;
    match probe.version {
        1..=3 => {
            let state: LegacyState = serde_json::from_slice(bytes)?;
            Ok(from_legacy(state))
        }
        4 => {
            let state: CurrentState = serde_json::from_slice(bytes)?;
            Ok(from_current(state))
        }
        other => Err(StateError::UnsupportedVersion(other)),
    }
}

fn from_legacy(state: LegacyState) -> Vec<Module> {
    state
        .modules
        .into_iter()
        .map(|m| Module {
            path: m.path,
            outputs: m.outputs,
            resources: m
                .resources
                .into_iter()
                .map(|(address, resource)| {
                    let primary = resource.primary.unwrap_or_default();
                    (
                        address,
                        ResourceState {
                            id: primary.id,
                            attributes: primary.attributes,
                        },
                    )
                })
                .collect(),
        })
        .collect()
}

fn from_current(state: CurrentState) -> Vec<Module> {
    let mut modules: BTreeMap<Vec<String>, Module> = BTreeMap::new();
    let root = vec![ROOT_MODULE.to_string()];
    modules.insert(
        root.clone(),
        Module {
            outputs: state.outputs,
            ..Module::new(root)
        },
    );

    for resource in state.resources {
        let path = module_path(resource.module.as_deref());
        let base = if resource.mode == "data" {
            format!("data.{}.{}", resource.resource_type, resource.name)
        } else {
            format!("{}.{}", resource.resource_type, resource.name)
        };

        let module = modules
            .entry(path.clone())
            .or_insert_with(|| Module::new(path));

        for instance in resource.instances {
            let address = match &instance.index_key {
                Some(Value::Number(n)) => format!("{base}.{n}"),
                Some(Value::String(key)) => format!("{base}[\"{key}\"]"),
                _ => base.clone(),
            };
            let attributes = instance
                .attributes
                .map(|attrs| flatten_attributes(&attrs))
                .unwrap_or_default();
            let id = attributes.get("id").cloned().unwrap_or_default();
            module
                .resources
                .insert(address, ResourceState { id, attributes });
        }
    }

    modules.into_values().collect()
}

/// `module.a.module.b` becomes `[root, a, b]`.
fn module_path(address: Option<&str>) -> Vec<String> {
    let mut path = vec![ROOT_MODULE.to_string()];
    let Some(address) = address.filter(|a| !a.is_empty()) else {
        return path;
    };

    let mut parts = address.split('.');
    while let Some(part) = parts.next() {
        if part == "module" {
            if let Some(name) = parts.next() {
                path.push(name.to_string());
            }
        } else {
            path.push(part.to_string());
        }
    }
    path
}

pub fn flatten_attributes(attributes: &serde_json::Map<String, Value>) -> HashMap<String, String> {
    let mut flat = HashMap::new();
    for (key, value) in attributes {
        flatten_value(key, value, &mut flat);
    }
    flat
}

fn flatten_value(prefix: &str, value: &Value, flat: &mut HashMap<String, String>) {
    match value {
        Value::Null => {}
        Value::Bool(b) => {
            flat.insert(prefix.to_string(), b.to_string());
        }
        Value::Number(n) => {
            flat.insert(prefix.to_string(), n.to_string());
        }
        Value::String(s) => {
            flat.insert(prefix.to_string(), s.clone());
        }
        Value::Array(items) => {
            flat.insert(format!("{prefix}.#"), items.len().to_string());
            for (i, item) in items.iter().enumerate() {
                flatten_value(&format!("{prefix}.{i}"), item, flat);
            }
        }
        Value::Object(map) => {
            flat.insert(format!("{prefix}.%"), map.len().to_string());
            for (key, item) in map {
                flatten_value(&format!("{prefix}.{key}"), item, flat);
            }
        }
    }
}
