//! Inputs for one backfill run.

use crate::github::{PerPage, RepositoryLocator};

/// Everything the orchestrator needs to know about a run, resolved from
/// configuration before the run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    /// Repository to backfill.
    pub locator: RepositoryLocator,
    /// Page size for every listing.
    pub per_page: PerPage,
    /// Whether to fetch repository commits after the pull requests.
    pub include_commits: bool,
}

impl RunContext {
    /// Context with default page size and commits included.
    #[must_use]
    pub fn new(locator: RepositoryLocator) -> Self {
        Self {
            locator,
            per_page: PerPage::default(),
            include_commits: true,
        }
    }

    /// Overrides the page size.
    #[must_use]
    pub const fn with_per_page(mut self, per_page: PerPage) -> Self {
        self.per_page = per_page;
        self
    }

    /// Enables or disables the commit stage.
    #[must_use]
    pub const fn with_commits(mut self, include_commits: bool) -> Self {
        self.include_commits = include_commits;
        self
    }

    /// `owner/repo`, stored as `repository_id` on every row.
    #[must_use]
    pub fn repository_id(&self) -> String {
        self.locator.full_name()
    }
}
