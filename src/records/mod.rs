//! Normalised row shapes for the four history tables.
//!
//! Rows are produced by the pure functions in [`mapper`] and consumed by the
//! upsert sink. Each row carries its natural key, the `owner/repo`
//! `repository_id` and a `project_id` that this pipeline never fills.

pub mod mapper;
mod wire;

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use crate::github::ResourceKind;

pub use mapper::{map_comment, map_commit, map_pull_request, map_review};

/// Lifecycle state stored for a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PullRequestState {
    /// Still open.
    Open,
    /// Closed without merging.
    Closed,
    /// Merged into its base branch.
    Merged,
}

impl PullRequestState {
    /// Stored column value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Merged => "merged",
        }
    }
}

/// Submitted review verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReviewState {
    /// Approved the changes.
    Approved,
    /// Requested changes.
    ChangesRequested,
    /// Commented without a verdict.
    Commented,
    /// A previous verdict was dismissed.
    Dismissed,
}

impl ReviewState {
    /// Stored column value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::ChangesRequested => "changes_requested",
            Self::Commented => "commented",
            Self::Dismissed => "dismissed",
        }
    }
}

/// Which endpoint a comment came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommentKind {
    /// A comment attached to a line of the diff.
    ReviewComment,
    /// A comment on the pull request conversation.
    IssueComment,
}

impl CommentKind {
    /// Stored column value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReviewComment => "review_comment",
            Self::IssueComment => "issue_comment",
        }
    }

    /// Resource kind of the endpoint producing this comment kind.
    #[must_use]
    pub const fn resource_kind(self) -> ResourceKind {
        match self {
            Self::ReviewComment => ResourceKind::ReviewComments,
            Self::IssueComment => ResourceKind::IssueComments,
        }
    }
}

/// Formats a timestamp the way every table stores it.
#[must_use]
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// A row of `github_pull_requests`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRow {
    /// GitHub's numeric pull request id (natural key).
    pub github_pr_id: i64,
    /// `owner/repo`.
    pub repository_id: String,
    /// `owner/repo`, kept for consumers that read the display name.
    pub repository_full_name: String,
    /// Number within the repository.
    pub pr_number: i64,
    /// Title at fetch time.
    pub title: String,
    /// Description, if any.
    pub body: Option<String>,
    /// Open, closed or merged.
    pub state: PullRequestState,
    /// Author's GitHub user id.
    pub author_github_id: Option<i64>,
    /// Author's login.
    pub author_login: Option<String>,
    /// Commit count, only present on the detail response.
    pub commits_count: Option<i64>,
    /// Added lines, only present on the detail response.
    pub additions: Option<i64>,
    /// Deleted lines, only present on the detail response.
    pub deletions: Option<i64>,
    /// Changed files, only present on the detail response.
    pub changed_files: Option<i64>,
    /// Target branch.
    pub base_ref: Option<String>,
    /// Source branch.
    pub head_ref: Option<String>,
    /// JSON array of assignee user ids, `None` when there are none.
    pub assignees: Option<String>,
    /// JSON array of requested reviewer user ids, `None` when there are none.
    pub requested_reviewers: Option<String>,
    /// Creation time on GitHub.
    pub github_created_at: Option<DateTime<Utc>>,
    /// Last update time on GitHub.
    pub github_updated_at: Option<DateTime<Utc>>,
    /// Close time, if closed or merged.
    pub closed_at: Option<DateTime<Utc>>,
    /// Merge time, if merged.
    pub merged_at: Option<DateTime<Utc>>,
    /// Always `None`; resolved by a later process.
    pub project_id: Option<String>,
}

/// A row of `github_pr_reviews`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRow {
    /// GitHub's numeric review id (natural key).
    pub github_review_id: i64,
    /// Owning pull request's `github_pr_id`.
    pub github_pr_id: i64,
    /// `owner/repo`.
    pub repository_id: String,
    /// Submitted verdict.
    pub state: ReviewState,
    /// Reviewer's GitHub user id.
    pub reviewer_github_id: Option<i64>,
    /// Reviewer's login.
    pub reviewer_login: Option<String>,
    /// Review summary text.
    pub body: Option<String>,
    /// Commit the review was made against.
    pub commit_id: Option<String>,
    /// Submission time.
    pub github_submitted_at: Option<DateTime<Utc>>,
    /// Always `None`.
    pub project_id: Option<String>,
}

/// A row of `github_pr_comments`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRow {
    /// GitHub's numeric comment id (natural key).
    pub github_comment_id: i64,
    /// Owning pull request's `github_pr_id`.
    pub github_pr_id: i64,
    /// `owner/repo`.
    pub repository_id: String,
    /// Review comment or issue comment.
    pub comment_type: CommentKind,
    /// Author's GitHub user id.
    pub author_github_id: Option<i64>,
    /// Author's login.
    pub author_login: Option<String>,
    /// Whether the author is a bot account.
    pub is_bot: bool,
    /// Comment text.
    pub body: Option<String>,
    /// Review this line comment belongs to.
    pub review_id: Option<i64>,
    /// Comment this one replies to.
    pub in_reply_to_id: Option<i64>,
    /// File the line comment is attached to.
    pub path: Option<String>,
    /// Line in the current diff.
    pub line: Option<i64>,
    /// Line in the original diff.
    pub original_line: Option<i64>,
    /// Legacy diff position.
    pub position: Option<i64>,
    /// Commit the line comment refers to.
    pub commit_id: Option<String>,
    /// Creation time on GitHub.
    pub github_created_at: Option<DateTime<Utc>>,
    /// Last update time on GitHub.
    pub github_updated_at: Option<DateTime<Utc>>,
    /// Always `None`.
    pub project_id: Option<String>,
}

/// A row of `github_commits`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRow {
    /// Full 40 character hex SHA (natural key).
    pub sha: String,
    /// `owner/repo`.
    pub repository_id: String,
    /// `owner/repo`.
    pub repository_full_name: String,
    /// Commit message.
    pub message: Option<String>,
    /// Author's GitHub user id, when the author email maps to an account.
    pub author_github_id: Option<i64>,
    /// Author's login.
    pub author_login: Option<String>,
    /// Author name from the commit itself.
    pub author_name: Option<String>,
    /// Committer's login.
    pub committer_login: Option<String>,
    /// Committer name from the commit itself.
    pub committer_name: Option<String>,
    /// Author date.
    pub github_timestamp: Option<DateTime<Utc>>,
    /// Committer date.
    pub committed_at: Option<DateTime<Utc>>,
    /// Added lines, when GitHub reported stats.
    pub additions: Option<i64>,
    /// Deleted lines, when GitHub reported stats.
    pub deletions: Option<i64>,
    /// Always `None`.
    pub project_id: Option<String>,
}

/// A wire item could not be turned into a row.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MappingError {
    /// The item was not the expected JSON shape.
    #[error("{kind} item is malformed: {message}")]
    Malformed {
        /// Resource kind being mapped.
        kind: ResourceKind,
        /// Deserialiser detail.
        message: String,
    },

    /// A required field was missing or null.
    #[error("{kind} item is missing required field `{field}`")]
    MissingField {
        /// Resource kind being mapped.
        kind: ResourceKind,
        /// Name of the missing field.
        field: &'static str,
    },

    /// A timestamp was not valid RFC 3339.
    #[error("{kind} field `{field}` has invalid timestamp {value:?}")]
    InvalidTimestamp {
        /// Resource kind being mapped.
        kind: ResourceKind,
        /// Name of the timestamp field.
        field: &'static str,
        /// The rejected value.
        value: String,
    },

    /// A commit SHA was not 40 hex characters.
    #[error("commit SHA {value:?} is not 40 hex characters")]
    InvalidSha {
        /// The rejected value.
        value: String,
    },

    /// A state string was not one the schema accepts.
    #[error("{kind} has unknown state {value:?}")]
    UnknownState {
        /// Resource kind being mapped.
        kind: ResourceKind,
        /// The rejected value.
        value: String,
    },
}
