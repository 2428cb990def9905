use async_trait::async_trait;
use reqwest::StatusCode;

use super::{
    Backend, BackendError, DEFAULT_WORKSPACE, SettingsSchema, Workspace, string_setting,
};
use crate::terraform::{BackendConfig, Module, parse_state};

const SCHEMA: SettingsSchema<'static> = SettingsSchema {
    required: &["address"],
    strings: &[
        "username",
        "password",
        "update_method",
        "lock_address",
        "unlock_address",
        "lock_method",
        "unlock_method",
    ],
    booleans: &["skip_cert_verification"],
};

#[derive(Clone)]
struct HttpSettings {
    address: String,
    username: Option<String>,
    password: Option<String>,
}

/// State fetched with a GET against a single REST address. Only the default
/// workspace exists.
#[derive(Default)]
pub struct HttpBackend {
    settings: Option<HttpSettings>,
}

#[async_trait]
impl Backend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    fn validate(&self, config: &BackendConfig) -> Vec<String> {
        let mut errors = SCHEMA.check(&config.settings);
        if let Some(address) = string_setting(&config.settings, "address") {
            if let Err(e) = reqwest::Url::parse(address) {
                errors.push(format!("\"address\" is not a valid URL: {e}"));
            }
        }
        if config.settings.get("skip_cert_verification").and_then(|v| v.as_bool()) == Some(true) {
            errors.push("\"skip_cert_verification\" is not supported".to_string());
        }
        errors
    }

    fn configure(&mut self, config: &BackendConfig) -> Result<(), BackendError> {
        let address = string_setting(&config.settings, "address").ok_or_else(|| {
            BackendError::InvalidSetting {
                key: "address".to_string(),
                message: "required".to_string(),
            }
        })?;

        self.settings = Some(HttpSettings {
            address: address.to_string(),
            username: string_setting(&config.settings, "username").map(str::to_string),
            password: string_setting(&config.settings, "password").map(str::to_string),
        });
        Ok(())
    }

    async fn open_workspace(&self, name: &str) -> Result<Box<dyn Workspace>, BackendError> {
        let settings = self.settings.clone().ok_or(BackendError::NotConfigured)?;
        if name != DEFAULT_WORKSPACE {
            return Err(BackendError::WorkspacesNotSupported(name.to_string()));
        }

        Ok(Box::new(HttpWorkspace {
            client: reqwest::Client::new(),
            settings,
            modules: Vec::new(),
        }))
    }
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field(
                "address",
                &self.settings.as_ref().map(|s| s.address.as_str()),
            )
            .field("password", &"[REDACTED]")
            .finish()
    }
}

pub struct HttpWorkspace {
    client: reqwest::Client,
    settings: HttpSettings,
    modules: Vec<Module>,
}

#[async_trait]
impl Workspace for HttpWorkspace {
    async fn refresh(&mut self) -> Result<(), BackendError> {
        let mut request = self.client.get(&self.settings.address);
        if let Some(username) = &self.settings.username {
            request = request.basic_auth(username, self.settings.password.as_ref());
        }

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!(status = status.as_u16(), "http state fetched");

        let bytes = match status {
            StatusCode::OK => response.bytes().await?.to_vec(),
            StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => Vec::new(),
            other => {
                return Err(BackendError::Status {
                    status: other.as_u16(),
                    url: self.settings.address.clone(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(settings: serde_json::Value) -> BackendConfig {
        BackendConfig {
            backend_type: "http".to_string(),
            settings: settings.as_object().cloned().unwrap_or_default(),
            working_dir: ".".into(),
        }
    }

    #[test]
    fn test_validate_requires_address() {
        let errors = HttpBackend::default().validate(&config(json!({})));
        assert_eq!(errors, vec!["\"address\" is required"]);
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let errors = HttpBackend::default().validate(&config(json!({"address": "not a url"})));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("\"address\" is not a valid URL"));
    }

    #[tokio::test]
    async fn test_named_workspace_unsupported() {
        let mut backend = HttpBackend::default();
        backend
            .configure(&config(json!({"address": "https://state.example.com/app"})))
            .unwrap();
        let result = backend.open_workspace("staging").await;
        assert!(matches!(result, Err(BackendError::WorkspacesNotSupported(name)) if name == "staging"));
    }

    #[test]
    fn test_debug_does_not_expose_password() {
        let mut backend = HttpBackend::default();
        backend
            .configure(&config(json!({
                "address": "https://state.example.com/app",
                "username": "ci",
                "password": "super_secret_password"
            })))
            .unwrap();
        let debug_output = format!("{:?}", backend);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_password"));
    }
}
