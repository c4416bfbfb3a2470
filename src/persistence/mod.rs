//! Relational persistence for the fetched history.
//!
//! The store is a `SQLite` database whose schema is managed with embedded
//! Diesel migrations. Rows are written through the [`UpsertSink`] seam so the
//! pipeline can be exercised against a mock sink.

mod error;
mod migrator;
mod store;

pub use error::{PersistenceError, UpsertError};
pub use migrator::{INITIAL_SCHEMA_VERSION, MIGRATIONS, SchemaVersion, migrate_database};
pub use store::{RowBatch, SqliteStore, Table, UpsertRow, UpsertSink};

#[cfg(test)]
pub use store::MockUpsertSink;
