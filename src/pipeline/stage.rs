//! Progress markers for a run.

/// Stage the orchestrator is in. `Aborted` is reachable from any stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Nothing fetched yet.
    Init,
    /// Walking the pull request listing.
    FetchPullRequests,
    /// Fetching one pull request's detail.
    FetchPullRequestDetail,
    /// Fetching one pull request's reviews.
    FetchReviews,
    /// Fetching one pull request's review and issue comments.
    FetchComments,
    /// Walking the repository commit listing.
    FetchCommits,
    /// Finished normally.
    Done,
    /// Stopped early.
    Aborted,
}

impl PipelineStage {
    /// Snake-case label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::FetchPullRequests => "fetch_pull_requests",
            Self::FetchPullRequestDetail => "fetch_pull_request_detail",
            Self::FetchReviews => "fetch_reviews",
            Self::FetchComments => "fetch_comments",
            Self::FetchCommits => "fetch_commits",
            Self::Done => "done",
            Self::Aborted => "aborted",
        }
    }

    /// Returns true for `Done` and `Aborted`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}
