use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;

use crate::error::RetrieveError;

/// Extracts values from a Terraform state workspace as a JSON object.
#[derive(Parser, Debug)]
#[command(about, disable_help_flag = true, disable_version_flag = true)]
pub struct Cli {
    /// JSON file describing the configuration, workspace and values to retrieve
    #[arg(value_name = "ARGUMENT_FILE", allow_hyphen_values = true)]
    pub argument_file: Option<PathBuf>,
}

impl Cli {
    /// Returns the argument file path. Any other shape of command line is
    /// reported as a missing argument file. There are no flags: `--help` is
    /// taken as a file name like any other first argument.
    pub fn argument_file_from<I, T>(args: I) -> Result<PathBuf, RetrieveError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        match Cli::try_parse_from(args) {
            Ok(Cli {
                argument_file: Some(path),
            }) => Ok(path),
            Ok(_) => Err(RetrieveError::NoArgumentFile),
            Err(err) => {
                tracing::debug!(error = %err, "unusable command line");
                Err(RetrieveError::NoArgumentFile)
            }
        }
    }
}
