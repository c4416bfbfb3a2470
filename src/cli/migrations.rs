//! Database migration operations.

use pr_backfill::persistence::{PersistenceError, migrate_database};
use pr_backfill::telemetry::StderrJsonlTelemetrySink;
use pr_backfill::{BackfillConfig, BackfillError};
use tracing::info;

/// Runs database migrations and reports the resulting schema version.
///
/// # Errors
///
/// Returns [`BackfillError::Configuration`] if the database URL is missing or
/// blank, and [`BackfillError::Persistence`] for connection or migration
/// failures.
pub fn run(config: &BackfillConfig) -> Result<(), BackfillError> {
    let database_url = config.resolve_database_url()?;

    let telemetry = StderrJsonlTelemetrySink;
    let version =
        migrate_database(&database_url, &telemetry).map_err(map_persistence_error)?;
    info!(schema_version = version.as_str(), "database is up to date");
    Ok(())
}

/// Blank URLs are a configuration problem; everything else is a runtime
/// persistence failure.
pub fn map_persistence_error(error: PersistenceError) -> BackfillError {
    if is_configuration_error(&error) {
        BackfillError::Configuration {
            message: error.to_string(),
        }
    } else {
        BackfillError::Persistence(error)
    }
}

/// Returns true if the persistence error is a configuration problem.
const fn is_configuration_error(error: &PersistenceError) -> bool {
    matches!(
        error,
        PersistenceError::BlankDatabaseUrl | PersistenceError::MissingDatabaseUrl
    )
}
