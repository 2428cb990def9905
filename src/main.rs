use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use tfstate_retrieve::{BackendRegistry, Envelope, cli::Cli};

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = color_eyre::install() {
        eprintln!("failed to install error report handler: {err}");
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let result = match Cli::argument_file_from(std::env::args_os()) {
        Ok(path) => tfstate_retrieve::run(&path, &BackendRegistry::default()).await,
        Err(err) => Err(err),
    };

    if let Err(err) = &result {
        tracing::error!(error = %err, "retrieve failed");
    }

    Envelope::from(result).emit()
}
