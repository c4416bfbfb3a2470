//! GitHub REST access for the backfill.
//!
//! The client wraps Octocrab's raw request API so that pagination, rate-limit
//! waits and retries are handled in one place, and the fetchers compose it
//! into complete per-resource page sequences.

pub mod client;
pub mod endpoint;
pub mod error;
pub mod fetchers;
pub mod locator;
pub mod pagination;
pub mod rate_limit;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use client::{ApiClient, OctocrabApiClient, RetryPolicy};
pub use endpoint::{Endpoint, ResourceKind};
pub use error::FetchError;
pub use locator::{
    DEFAULT_API_BASE, PersonalAccessToken, PullRequestNumber, RepositoryLocator, RepositoryName, RepositoryOwner,
};
pub use pagination::{MAX_PER_PAGE, Page, PageToken, PerPage, ResourcePages};
pub use rate_limit::{RateLimitGate, RateLimitInfo};
