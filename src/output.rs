use std::process::ExitCode;

use serde::Serialize;

const INVALID_RESPONSE: &str = r#"{"msg":"Invalid response object"}"#;

/// The single JSON line written to stdout.
///
/// On success `msg` carries the serialized response data as a string; on
/// failure it carries the reason and `failed` is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    pub changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<bool>,
}

impl Envelope {
    pub fn success(data: String) -> Self {
        Self {
            msg: Some(data),
            changed: false,
            failed: None,
        }
    }

    pub fn failure(reason: impl ToString) -> Self {
        Self {
            msg: Some(reason.to_string()),
            changed: false,
            failed: Some(true),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.failed == Some(true)
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.is_failure() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        }
    }

    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to serialize response envelope");
            INVALID_RESPONSE.to_string()
        })
    }

    /// Prints the envelope and returns the matching process exit code.
    pub fn emit(&self) -> ExitCode {
        println!("{}", self.to_line());
        self.exit_code()
    }
}

impl<E: std::fmt::Display> From<Result<String, E>> for Envelope {
    fn from(result: Result<String, E>) -> Self {
        match result {
            Ok(data) => Envelope::success(data),
            Err(err) => Envelope::failure(err),
        }
    }
}
