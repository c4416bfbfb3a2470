//! One fetcher per resource kind.
//!
//! Listing fetchers return a lazy [`ResourcePages`] so callers can map and
//! persist each page before requesting the next. Fetching a repository's
//! history costs one call per listing page plus four per pull request
//! (detail, reviews, review comments, issue comments).

use serde_json::Value;

use super::client::ApiClient;
use super::endpoint::Endpoint;
use super::error::FetchError;
use super::locator::{PullRequestNumber, RepositoryLocator};
use super::pagination::{PerPage, ResourcePages};

/// Every pull request in the repository, in any state.
#[must_use]
pub fn pull_requests<'client>(
    client: &'client dyn ApiClient,
    locator: &RepositoryLocator,
    per_page: PerPage,
) -> ResourcePages<'client> {
    ResourcePages::new(client, Endpoint::pull_requests(locator, per_page))
}

/// Full detail object for one pull request.
///
/// The listing omits line counts and commit totals; only this call returns
/// them.
///
/// # Errors
///
/// Returns the client's [`FetchError`], or [`FetchError::Decode`] when the
/// response carries no object.
pub async fn pull_request_detail(
    client: &dyn ApiClient,
    locator: &RepositoryLocator,
    number: PullRequestNumber,
) -> Result<Value, FetchError> {
    let endpoint = Endpoint::pull_request_detail(locator, number);
    let page = client.get_page(&endpoint, None).await?;
    page.items
        .into_iter()
        .next()
        .ok_or_else(|| FetchError::Decode {
            endpoint: endpoint.path().to_owned(),
            message: "empty response for pull request detail".to_owned(),
        })
}

/// Reviews submitted on one pull request.
#[must_use]
pub fn reviews<'client>(
    client: &'client dyn ApiClient,
    locator: &RepositoryLocator,
    number: PullRequestNumber,
    per_page: PerPage,
) -> ResourcePages<'client> {
    ResourcePages::new(client, Endpoint::reviews(locator, number, per_page))
}

/// Line comments on one pull request's diff.
#[must_use]
pub fn review_comments<'client>(
    client: &'client dyn ApiClient,
    locator: &RepositoryLocator,
    number: PullRequestNumber,
    per_page: PerPage,
) -> ResourcePages<'client> {
    ResourcePages::new(client, Endpoint::review_comments(locator, number, per_page))
}

/// Conversation comments on one pull request.
#[must_use]
pub fn issue_comments<'client>(
    client: &'client dyn ApiClient,
    locator: &RepositoryLocator,
    number: PullRequestNumber,
    per_page: PerPage,
) -> ResourcePages<'client> {
    ResourcePages::new(client, Endpoint::issue_comments(locator, number, per_page))
}

/// Every commit reachable from the repository's default branch.
#[must_use]
pub fn commits<'client>(
    client: &'client dyn ApiClient,
    locator: &RepositoryLocator,
    per_page: PerPage,
) -> ResourcePages<'client> {
    ResourcePages::new(client, Endpoint::commits(locator, per_page))
}
