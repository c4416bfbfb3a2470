//! `pr-backfill` entrypoint: copies a repository's pull request history into
//! a local `SQLite` database.

mod cli;

use std::io::{self, Write};
use std::process::ExitCode;

use ortho_config::OrthoConfig;
use pr_backfill::{BackfillConfig, BackfillError};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info";

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(code) => code,
        Err(error) => {
            if writeln!(io::stderr().lock(), "{error}").is_err() {
                return ExitCode::FAILURE;
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode, BackfillError> {
    let config = load_config()?;

    if config.migrate_db {
        cli::migrations::run(&config)?;
        return Ok(ExitCode::SUCCESS);
    }

    let summary = cli::backfill::run(&config).await?;
    cli::output::write_summary(&summary)?;

    if summary.is_aborted() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Installs the stderr log subscriber, honouring `RUST_LOG`.
fn init_tracing() {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(DEFAULT_LOG_FILTER),
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Loads configuration from CLI, environment, and files.
///
/// # Errors
///
/// Returns [`BackfillError::Configuration`] when ortho-config fails to parse
/// arguments or load configuration files.
fn load_config() -> Result<BackfillConfig, BackfillError> {
    BackfillConfig::load().map_err(|error| BackfillError::Configuration {
        message: error.to_string(),
    })
}
