use async_trait::async_trait;
use reqwest::{StatusCode, Url};

use super::{
    Backend, BackendError, DEFAULT_WORKSPACE, SettingsSchema, Workspace, string_setting,
};
use crate::terraform::{BackendConfig, Module, parse_state};

const DEFAULT_ADDRESS: &str = "127.0.0.1:8500";
const DEFAULT_SCHEME: &str = "http";
const WORKSPACE_SEPARATOR: &str = "-env:";

const SCHEMA: SettingsSchema<'static> = SettingsSchema {
    required: &["path"],
    strings: &["address", "scheme", "access_token", "datacenter"],
    booleans: &["gzip", "lock"],
};

#[derive(Clone)]
struct ConsulSettings {
    path: String,
    base_url: Url,
    access_token: Option<String>,
    datacenter: Option<String>,
}

/// State stored under a key in Consul's KV store.
#[derive(Default)]
pub struct ConsulBackend {
    settings: Option<ConsulSettings>,
}

impl ConsulSettings {
    fn key_for(&self, workspace: &str) -> String {
        if workspace == DEFAULT_WORKSPACE {
            self.path.clone()
        } else {
            format!("{}{}{}", self.path, WORKSPACE_SEPARATOR, workspace)
        }
    }
}

#[async_trait]
impl Backend for ConsulBackend {
    fn name(&self) -> &str {
        "consul"
    }

    fn validate(&self, config: &BackendConfig) -> Vec<String> {
        let mut errors = SCHEMA.check(&config.settings);
        if let Some(scheme) = string_setting(&config.settings, "scheme") {
            if scheme != "http" && scheme != "https" {
                errors.push(format!("\"scheme\" must be http or https, got {scheme}"));
            }
        }
        if config.settings.get("gzip").and_then(|v| v.as_bool()) == Some(true) {
            errors.push("\"gzip\" compressed state is not supported".to_string());
        }
        errors
    }

    fn configure(&mut self, config: &BackendConfig) -> Result<(), BackendError> {
        let path = string_setting(&config.settings, "path").ok_or_else(|| {
            BackendError::InvalidSetting {
                key: "path".to_string(),
                message: "required".to_string(),
            }
        })?;
        let address = string_setting(&config.settings, "address").unwrap_or(DEFAULT_ADDRESS);
        let scheme = string_setting(&config.settings, "scheme").unwrap_or(DEFAULT_SCHEME);
        let base_url = Url::parse(&format!("{}://{}", scheme, address.trim_end_matches('/')))
            .map_err(|e| BackendError::InvalidSetting {
                key: "address".to_string(),
                message: e.to_string(),
            })?;

        self.settings = Some(ConsulSettings {
            path: path.trim_matches('/').to_string(),
            base_url,
            access_token: string_setting(&config.settings, "access_token").map(str::to_string),
            datacenter: string_setting(&config.settings, "datacenter").map(str::to_string),
        });
        Ok(())
    }

    async fn open_workspace(&self, name: &str) -> Result<Box<dyn Workspace>, BackendError> {
        let settings = self.settings.clone().ok_or(BackendError::NotConfigured)?;
        let key = settings.key_for(name);
        tracing::debug!(workspace = %name, key = %key, "opening consul workspace");

        Ok(Box::new(ConsulWorkspace {
            client: reqwest::Client::new(),
            key,
            settings,
            modules: Vec::new(),
        }))
    }
}

impl std::fmt::Debug for ConsulBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsulBackend")
            .field("path", &self.settings.as_ref().map(|s| s.path.as_str()))
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

pub struct ConsulWorkspace {
    client: reqwest::Client,
    key: String,
    settings: ConsulSettings,
    modules: Vec<Module>,
}

impl ConsulWorkspace {
    /// `<base>/v1/kv/<key>?raw[&dc=<datacenter>]`, with every key segment and
    /// the datacenter escaped.
    fn url(&self) -> Result<Url, BackendError> {
        let mut url = self.settings.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| BackendError::InvalidSetting {
                key: "address".to_string(),
                message: format!("{} cannot be used as a base URL", self.settings.base_url),
            })?
            .pop_if_empty()
            .extend(["v1", "kv"])
            .extend(self.key.split('/'));
        url.set_query(Some("raw"));
        if let Some(datacenter) = &self.settings.datacenter {
            url.query_pairs_mut().append_pair("dc", datacenter);
        }
        Ok(url)
    }
}

#[async_trait]
impl Workspace for ConsulWorkspace {
    async fn refresh(&mut self) -> Result<(), BackendError> {
        let url = self.url()?;
        let mut request = self.client.get(url.clone());
        if let Some(token) = &self.settings.access_token {
            request = request.header("X-Consul-Token", token);
        }

        let response = request.send().await?;
        let bytes = match response.status() {
            StatusCode::OK => response.bytes().await?.to_vec(),
            StatusCode::NOT_FOUND => Vec::new(),
            other => {
                return Err(BackendError::Status {
                    status: other.as_u16(),
                    url: url.to_string(),
                });
            }
        };

        self.modules = parse_state(&bytes)?;
        Ok(())
    }

    fn modules(&self) -> &[Module] {
        &self.modules
    }
}
