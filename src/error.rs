//! Top-level errors surfaced to the command-line entrypoint.

use thiserror::Error;

use crate::persistence::PersistenceError;

/// Errors that stop a backfill before or outside the pipeline run.
///
/// Failures inside a run (fetch, mapping, upsert) are recorded in the
/// [`RunSummary`](crate::pipeline::RunSummary) instead.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackfillError {
    /// A repository owner or name was blank or contained a path separator.
    #[error("invalid repository segment {segment:?}: {reason}")]
    InvalidRepositorySegment {
        /// The rejected value.
        segment: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The configured API base URL could not be parsed.
    #[error("API base URL is invalid: {0}")]
    InvalidApiBase(String),

    /// The authentication token was missing.
    #[error("personal access token is required (use --token, PR_BACKFILL_TOKEN or GITHUB_TOKEN)")]
    MissingToken,

    /// Configuration could not be loaded or is inconsistent.
    #[error("configuration error: {message}")]
    Configuration {
        /// Details about the configuration failure.
        message: String,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build GitHub client: {message}")]
    Client {
        /// Error detail from Octocrab.
        message: String,
    },

    /// Opening or migrating the store failed.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Local I/O operation failed.
    #[error("I/O error: {message}")]
    Io {
        /// Error detail from the underlying I/O operation.
        message: String,
    },
}
