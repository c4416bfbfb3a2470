//! Lenient deserialisation targets for GitHub payloads.
//!
//! Every field is optional so that a missing natural id is reported as a
//! precise mapping error rather than a generic deserialisation failure.

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub(super) struct WireUser {
    pub id: Option<i64>,
    pub login: Option<String>,
    #[serde(rename = "type")]
    pub account_type: Option<String>,
}

impl WireUser {
    pub fn is_bot(&self) -> bool {
        self.account_type.as_deref() == Some("Bot")
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct WireRef {
    #[serde(rename = "ref")]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct WirePullRequest {
    pub id: Option<i64>,
    pub number: Option<i64>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub state: Option<String>,
    pub merged: Option<bool>,
    pub user: Option<WireUser>,
    pub commits: Option<i64>,
    pub additions: Option<i64>,
    pub deletions: Option<i64>,
    pub changed_files: Option<i64>,
    pub base: Option<WireRef>,
    pub head: Option<WireRef>,
    pub assignees: Option<Vec<WireUser>>,
    pub requested_reviewers: Option<Vec<WireUser>>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub closed_at: Option<String>,
    pub merged_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct WireReview {
    pub id: Option<i64>,
    pub state: Option<String>,
    pub user: Option<WireUser>,
    pub body: Option<String>,
    pub commit_id: Option<String>,
    pub submitted_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct WireComment {
    pub id: Option<i64>,
    pub user: Option<WireUser>,
    pub body: Option<String>,
    pub pull_request_review_id: Option<i64>,
    pub in_reply_to_id: Option<i64>,
    pub path: Option<String>,
    pub line: Option<i64>,
    pub original_line: Option<i64>,
    pub position: Option<i64>,
    pub commit_id: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct WireSignature {
    pub name: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct WireCommitDetail {
    pub message: Option<String>,
    pub author: Option<WireSignature>,
    pub committer: Option<WireSignature>,
}

#[derive(Debug, Deserialize)]
pub(super) struct WireStats {
    pub additions: Option<i64>,
    pub deletions: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct WireCommit {
    pub sha: Option<String>,
    pub commit: Option<WireCommitDetail>,
    pub author: Option<WireUser>,
    pub committer: Option<WireUser>,
    pub stats: Option<WireStats>,
}
