pub mod consul;
pub mod http;
pub mod inmem;
pub mod local;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::terraform::{BackendConfig, Module, StateError};

pub const DEFAULT_WORKSPACE: &str = "default";

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend not configured")]
    NotConfigured,
    #[error("workspaces not supported: {0}")]
    WorkspacesNotSupported(String),
    #[error("invalid setting '{key}': {message}")]
    InvalidSetting { key: String, message: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("unexpected response ({status}) from {url}")]
    Status { status: u16, url: String },
    #[error(transparent)]
    State(#[from] StateError),
}

/// A storage location for Terraform state, selected by the backend block's
/// type.
#[async_trait]
pub trait Backend: Send + Sync {
    fn name(&self) -> &str;

    /// Reports every problem with the raw settings; an empty list means valid.
    fn validate(&self, config: &BackendConfig) -> Vec<String>;

    fn configure(&mut self, config: &BackendConfig) -> Result<(), BackendError>;

    async fn open_workspace(&self, name: &str) -> Result<Box<dyn Workspace>, BackendError>;
}

/// One named workspace. `modules` reflects the last successful `refresh`.
#[async_trait]
pub trait Workspace: Send + Sync {
    async fn refresh(&mut self) -> Result<(), BackendError>;

    fn modules(&self) -> &[Module];
}

pub type BackendConstructor = Box<dyn Fn() -> Box<dyn Backend> + Send + Sync>;

pub struct BackendRegistry {
    constructors: BTreeMap<String, BackendConstructor>,
}

impl BackendRegistry {
    pub fn empty() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    pub fn register<F>(&mut self, backend_type: &str, constructor: F) -> &mut Self
    where
        F: Fn() -> Box<dyn Backend> + Send + Sync + 'static,
    {
        self.constructors
            .insert(backend_type.to_string(), Box::new(constructor));
        self
    }

    pub fn get_backend(&self, backend_type: &str) -> Option<Box<dyn Backend>> {
        self.constructors.get(backend_type).map(|create| create())
    }

    pub fn backend_types(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register("local", || Box::new(local::LocalBackend::default()))
            .register("http", || Box::new(http::HttpBackend::default()))
            .register("consul", || Box::new(consul::ConsulBackend::default()))
            .register("inmem", || Box::new(inmem::InmemBackend::default()));
        registry
    }
}

/// Checks raw backend settings against the names a backend understands.
/// Required settings must be non-empty strings; optional ones must have the
/// given JSON kind when present.
pub(crate) struct SettingsSchema<'a> {
    pub required: &'a [&'a str],
    pub strings: &'a [&'a str],
    pub booleans: &'a [&'a str],
}

impl SettingsSchema<'_> {
    pub fn check(&self, settings: &Map<String, Value>) -> Vec<String> {
        let mut errors = Vec::new();

        for key in self.required {
            match settings.get(*key) {
                Some(Value::String(s)) if !s.is_empty() => {}
                _ => errors.push(format!("\"{key}\" is required")),
            }
        }

        for (key, value) in settings {
            let key = key.as_str();
            if self.strings.contains(&key) || self.required.contains(&key) {
                if !value.is_string() {
                    errors.push(format!("\"{key}\" must be a string"));
                }
            } else if self.booleans.contains(&key) {
                if !value.is_boolean() {
                    errors.push(format!("\"{key}\" must be a boolean"));
                }
            } else {
                errors.push(format!("unsupported argument \"{key}\""));
            }
        }

        errors
    }
}

pub(crate) fn string_setting<'a>(settings: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    settings
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}
