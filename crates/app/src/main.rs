//! Storefront CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use storefront::{Cli, CliError, connect, execute};
use storefront_infrastructure::logging;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = logging::init(&config.logging) {
        eprintln!("Warning: {e}");
    }

    let result = async {
        let client = connect(&config).await?;
        let mut out = std::io::stdout();
        execute(&client, &cli.command, &mut out).await
    }
    .await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    }
}

fn report(error: &CliError) -> ExitCode {
    eprintln!("Error: {error}");
    if let CliError::Client(storefront_application::ClientError::RequestRejected {
        field_errors, ..
    }) = error
    {
        for (field, message) in field_errors {
            eprintln!("  {field}: {message}");
        }
    }
    if error.requires_login() {
        eprintln!("Run `storefront login` to sign in again.");
    }
    ExitCode::from(error.exit_code())
}
