//! Error types for persistence operations.

use thiserror::Error;

/// Errors returned while opening, migrating or querying the `SQLite` store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistenceError {
    /// No database URL/path was provided.
    #[error("database URL is required (use --database-url, PR_BACKFILL_DATABASE_URL or DATABASE_URL)")]
    MissingDatabaseUrl,

    /// The database URL/path was present but blank.
    #[error("database URL must not be blank")]
    BlankDatabaseUrl,

    /// Establishing a `SQLite` connection failed.
    #[error("failed to connect to SQLite database: {message}")]
    ConnectionFailed {
        /// Error detail from Diesel.
        message: String,
    },

    /// Running pending migrations failed.
    #[error("failed to run database migrations: {message}")]
    MigrationFailed {
        /// Error detail from Diesel migrations.
        message: String,
    },

    /// Enabling foreign key enforcement failed.
    #[error("failed to enable foreign keys: {message}")]
    ForeignKeysEnableFailed {
        /// Error detail from the PRAGMA execution.
        message: String,
    },

    /// Reading the schema version from the migration table failed.
    #[error("failed to read schema version after migrations: {message}")]
    SchemaVersionQueryFailed {
        /// Error detail from Diesel query execution.
        message: String,
    },

    /// The migrations completed but no schema version could be found.
    #[error("no schema version recorded after migrations ran")]
    MissingSchemaVersion,

    /// The history tables do not exist yet.
    #[error("database schema is not initialised (run with --migrate-db)")]
    SchemaNotInitialised,

    /// A read query failed.
    #[error("database query failed: {message}")]
    QueryFailed {
        /// Error detail from Diesel query execution.
        message: String,
    },

    /// The connection lock was poisoned by a panicking writer.
    #[error("database connection lock is poisoned")]
    ConnectionPoisoned,
}

/// A batch of rows could not be written.
///
/// The whole batch is rolled back, so none of the named rows were changed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("upsert into {table} failed for {count} row(s) [{ids}]: {message}", count = .natural_ids.len(), ids = .natural_ids.join(", "))]
pub struct UpsertError {
    /// Table the batch targeted.
    pub table: &'static str,
    /// Natural ids of every row in the batch.
    pub natural_ids: Vec<String>,
    /// Error detail from the database.
    pub message: String,
}
