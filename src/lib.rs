//! Backfills a GitHub repository's pull request history into `SQLite`.
//!
//! The library pages through pull requests, their details, reviews, review
//! comments and issue comments, plus the repository's commits, maps each
//! payload to a flat row and upserts the rows keyed on GitHub's natural
//! identifiers, so repeated runs converge on the same content. Rate limits
//! and transient server errors are absorbed by the client; everything else
//! that goes wrong during a run is recorded in the [`RunSummary`].

pub mod config;
pub mod error;
pub mod github;
pub mod persistence;
pub mod pipeline;
pub mod records;
pub mod telemetry;

pub use config::BackfillConfig;
pub use error::BackfillError;
pub use github::{
    ApiClient, FetchError, OctocrabApiClient, PersonalAccessToken, RepositoryLocator, RetryPolicy,
};
pub use persistence::{SqliteStore, UpsertSink};
pub use pipeline::{Orchestrator, RunContext, RunOutcome, RunSummary};
