//! Shared test utilities.

use std::process::{Command, Output};

use tempfile::TempDir;

pub mod github;
pub mod runtime;

/// Environment variables the binary reads; cleared so runs are hermetic.
const BACKFILL_ENV: [&str; 11] = [
    "PR_BACKFILL_OWNER",
    "PR_BACKFILL_REPO",
    "PR_BACKFILL_TOKEN",
    "PR_BACKFILL_DATABASE_URL",
    "PR_BACKFILL_API_BASE",
    "PR_BACKFILL_PER_PAGE",
    "PR_BACKFILL_SKIP_COMMITS",
    "PR_BACKFILL_MIGRATE_DB",
    "PR_BACKFILL_MAX_SERVER_RETRIES",
    "GITHUB_TOKEN",
    "DATABASE_URL",
];

/// Creates a temporary directory for database tests.
///
/// # Panics
///
/// Panics if the temporary directory cannot be created.
pub fn create_temp_dir() -> TempDir {
    TempDir::new().unwrap_or_else(|error| panic!("failed to create temporary directory: {error}"))
}

/// Path of a fresh database file inside `temp_dir`.
pub fn database_path(temp_dir: &TempDir) -> String {
    temp_dir
        .path()
        .join("history.sqlite")
        .to_string_lossy()
        .into_owned()
}

/// Runs the `pr-backfill` binary with a scrubbed environment.
///
/// # Panics
///
/// Panics if the binary cannot be spawned.
pub fn run_backfill_binary(args: &[&str], env: &[(&str, Option<&str>)]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_pr-backfill"));
    command.args(args).env("RUST_LOG", "info");

    for key in BACKFILL_ENV {
        command.env_remove(key);
    }

    for (key, value) in env {
        match value {
            Some(env_value) => {
                command.env(key, env_value);
            }
            None => {
                command.env_remove(key);
            }
        }
    }

    command
        .output()
        .unwrap_or_else(|error| panic!("failed to execute binary: {error}"))
}
