//! The closed set of GitHub REST paths the backfill reads.

use super::locator::{PullRequestNumber, RepositoryLocator};
use super::pagination::PerPage;

/// Resource kind an endpoint returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Repository pull request listing.
    PullRequests,
    /// Single pull request detail object.
    PullRequestDetail,
    /// Reviews on one pull request.
    Reviews,
    /// Line comments on one pull request's diff.
    ReviewComments,
    /// Conversation comments on one pull request.
    IssueComments,
    /// Repository commit listing.
    Commits,
}

impl ResourceKind {
    /// Stable snake-case label used in logs and run summaries.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PullRequests => "pull_requests",
            Self::PullRequestDetail => "pull_request_detail",
            Self::Reviews => "reviews",
            Self::ReviewComments => "review_comments",
            Self::IssueComments => "issue_comments",
            Self::Commits => "commits",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// A resolved API path together with the query parameters of its first page.
///
/// Only the constructors below can build one, so the client never requests a
/// path outside the supported set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    kind: ResourceKind,
    path: String,
    query: Vec<(&'static str, String)>,
}

impl Endpoint {
    fn listing(kind: ResourceKind, path: String, per_page: PerPage) -> Self {
        Self {
            kind,
            path,
            query: vec![("per_page", per_page.get().to_string())],
        }
    }

    /// `GET /repos/{owner}/{repo}/pulls?state=all`.
    #[must_use]
    pub fn pull_requests(locator: &RepositoryLocator, per_page: PerPage) -> Self {
        let mut endpoint = Self::listing(
            ResourceKind::PullRequests,
            format!("{}/pulls", locator.repo_path()),
            per_page,
        );
        endpoint.query.insert(0, ("state", "all".to_owned()));
        endpoint
    }

    /// `GET /repos/{owner}/{repo}/pulls/{number}`.
    #[must_use]
    pub fn pull_request_detail(locator: &RepositoryLocator, number: PullRequestNumber) -> Self {
        Self {
            kind: ResourceKind::PullRequestDetail,
            path: format!("{}/pulls/{}", locator.repo_path(), number.get()),
            query: Vec::new(),
        }
    }

    /// `GET /repos/{owner}/{repo}/pulls/{number}/reviews`.
    #[must_use]
    pub fn reviews(locator: &RepositoryLocator, number: PullRequestNumber, per_page: PerPage) -> Self {
        Self::listing(
            ResourceKind::Reviews,
            format!("{}/pulls/{}/reviews", locator.repo_path(), number.get()),
            per_page,
        )
    }

    /// `GET /repos/{owner}/{repo}/pulls/{number}/comments`.
    #[must_use]
    pub fn review_comments(
        locator: &RepositoryLocator,
        number: PullRequestNumber,
        per_page: PerPage,
    ) -> Self {
        Self::listing(
            ResourceKind::ReviewComments,
            format!("{}/pulls/{}/comments", locator.repo_path(), number.get()),
            per_page,
        )
    }

    /// `GET /repos/{owner}/{repo}/issues/{number}/comments`.
    #[must_use]
    pub fn issue_comments(
        locator: &RepositoryLocator,
        number: PullRequestNumber,
        per_page: PerPage,
    ) -> Self {
        Self::listing(
            ResourceKind::IssueComments,
            format!("{}/issues/{}/comments", locator.repo_path(), number.get()),
            per_page,
        )
    }

    /// `GET /repos/{owner}/{repo}/commits`.
    #[must_use]
    pub fn commits(locator: &RepositoryLocator, per_page: PerPage) -> Self {
        Self::listing(
            ResourceKind::Commits,
            format!("{}/commits", locator.repo_path()),
            per_page,
        )
    }

    /// Resource kind this endpoint returns.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Path relative to the API base.
    #[must_use]
    pub const fn path(&self) -> &str {
        self.path.as_str()
    }

    /// Path and query of the first page.
    #[must_use]
    pub fn first_page_path(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = self
            .query
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{query}", self.path)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::{Endpoint, ResourceKind};
    use crate::github::locator::{PullRequestNumber, RepositoryLocator};
    use crate::github::pagination::PerPage;

    #[fixture]
    fn locator() -> RepositoryLocator {
        RepositoryLocator::from_owner_repo("octo", "repo").expect("locator should build")
    }

    fn pr(number: u64) -> PullRequestNumber {
        PullRequestNumber::new(number).expect("non-zero PR number")
    }

    #[rstest]
    fn pull_request_listing_requests_all_states(locator: RepositoryLocator) {
        let endpoint = Endpoint::pull_requests(&locator, PerPage::default());
        assert_eq!(endpoint.kind(), ResourceKind::PullRequests);
        assert_eq!(
            endpoint.first_page_path(),
            "/repos/octo/repo/pulls?state=all&per_page=100"
        );
    }

    #[rstest]
    fn detail_has_no_query(locator: RepositoryLocator) {
        let endpoint = Endpoint::pull_request_detail(&locator, pr(7));
        assert_eq!(endpoint.first_page_path(), "/repos/octo/repo/pulls/7");
    }

    #[rstest]
    #[case::reviews(Endpoint::reviews, "/repos/octo/repo/pulls/7/reviews")]
    #[case::review_comments(Endpoint::review_comments, "/repos/octo/repo/pulls/7/comments")]
    #[case::issue_comments(Endpoint::issue_comments, "/repos/octo/repo/issues/7/comments")]
    fn per_pull_request_paths(
        locator: RepositoryLocator,
        #[case] build: fn(&RepositoryLocator, PullRequestNumber, PerPage) -> Endpoint,
        #[case] expected_path: &str,
    ) {
        let per_page = PerPage::new(30).expect("valid page size");
        let endpoint = build(&locator, pr(7), per_page);
        assert_eq!(endpoint.path(), expected_path);
        assert_eq!(
            endpoint.first_page_path(),
            format!("{expected_path}?per_page=30")
        );
    }
}
