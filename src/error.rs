use thiserror::Error;

use crate::lookup::LookupError;

/// Every failure the pipeline can report. The `Display` text is what the
/// driver sees in the `msg` field of the failure envelope.
#[derive(Debug, Error)]
pub enum RetrieveError {
    #[error("No argument file provided.")]
    NoArgumentFile,

    #[error("Could not read configuration file: '{path}'. Reason: '{reason}'.")]
    ReadArguments { path: String, reason: String },

    #[error("Configuration file not valid JSON: '{path}'. Reason: '{reason}'.")]
    InvalidArguments { path: String, reason: String },

    #[error("Terraform configuration file not given. Missing terraform_config_path?")]
    MissingConfigPath,

    #[error("Nothing to retrieve.")]
    NothingToRetrieve,

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("Could not load Terraform configuration: '{path}'. Reason: '{reason}'.")]
    TerraformConfig { path: String, reason: String },

    #[error("Unknown remote-backend type '{0}'.")]
    UnknownBackend(String),

    #[error("Error while configuring Terraform backend: '{0}'.")]
    Backend(String),

    #[error("Error while refreshing Terraform state: '{0}'.")]
    Refresh(String),

    #[error("Output '{0}' not found.")]
    OutputNotFound(String),

    #[error("Resource '{0}' not found.")]
    ResourceNotFound(String),

    #[error("Resource attribute '{0}' not found.")]
    AttributeNotFound(String),

    #[error("Response key '{0}' conflicts with another retrieved value.")]
    ResponseConflict(String),

    #[error("Could not serialize response: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_arguments_display() {
        let err = RetrieveError::ReadArguments {
            path: "/tmp/args.json".to_string(),
            reason: "No such file or directory (os error 2)".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Could not read configuration file: '/tmp/args.json'. Reason: 'No such file or directory (os error 2)'."
        );
    }

    #[test]
    fn test_missing_config_path_display() {
        assert_eq!(
            RetrieveError::MissingConfigPath.to_string(),
            "Terraform configuration file not given. Missing terraform_config_path?"
        );
    }

    #[test]
    fn test_not_found_displays() {
        assert_eq!(
            RetrieveError::OutputNotFound("root.nonexistent".to_string()).to_string(),
            "Output 'root.nonexistent' not found."
        );
        assert_eq!(
            RetrieveError::ResourceNotFound("root.aws_s3_bucket.nope".to_string()).to_string(),
            "Resource 'root.aws_s3_bucket.nope' not found."
        );
        assert_eq!(
            RetrieveError::AttributeNotFound("no_such_attr".to_string()).to_string(),
            "Resource attribute 'no_such_attr' not found."
        );
    }

    #[test]
    fn test_backend_displays() {
        assert_eq!(
            RetrieveError::UnknownBackend("s3".to_string()).to_string(),
            "Unknown remote-backend type 's3'."
        );
        assert_eq!(
            RetrieveError::Backend("address is required".to_string()).to_string(),
            "Error while configuring Terraform backend: 'address is required'."
        );
    }

    #[test]
    fn test_lookup_error_is_transparent() {
        let err: RetrieveError = LookupError::Unsupported("x/foo".to_string()).into();
        assert!(matches!(err, RetrieveError::Lookup(_)));
        assert_eq!(
            err.to_string(),
            "Unsupported retrieve format: 'x/foo'. Must start with 'o/' or 'r/'."
        );
    }
}
