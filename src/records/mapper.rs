//! Pure mapping from GitHub JSON items to rows.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::wire::{WireComment, WireCommit, WirePullRequest, WireReview, WireUser};
use super::{
    CommentKind, CommentRow, CommitRow, MappingError, PullRequestRow, PullRequestState,
    ReviewRow, ReviewState,
};
use crate::github::ResourceKind;

fn decode<T: DeserializeOwned>(kind: ResourceKind, item: &Value) -> Result<T, MappingError> {
    T::deserialize(item).map_err(|error| MappingError::Malformed {
        kind,
        message: error.to_string(),
    })
}

fn required<T>(kind: ResourceKind, field: &'static str, value: Option<T>) -> Result<T, MappingError> {
    value.ok_or(MappingError::MissingField { kind, field })
}

fn timestamp(
    kind: ResourceKind,
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<DateTime<Utc>>, MappingError> {
    value
        .map(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(|parsed| parsed.with_timezone(&Utc))
                .map_err(|_| MappingError::InvalidTimestamp {
                    kind,
                    field,
                    value: raw.to_owned(),
                })
        })
        .transpose()
}

fn user_ids_json(users: Option<&[WireUser]>) -> Option<String> {
    let ids: Vec<i64> = users?.iter().filter_map(|user| user.id).collect();
    if ids.is_empty() {
        return None;
    }
    serde_json::to_string(&ids).ok()
}

fn pull_request_state(
    raw: Option<&str>,
    merged: bool,
) -> Result<PullRequestState, MappingError> {
    if merged {
        return Ok(PullRequestState::Merged);
    }
    let kind = ResourceKind::PullRequests;
    match required(kind, "state", raw)? {
        "open" => Ok(PullRequestState::Open),
        "closed" => Ok(PullRequestState::Closed),
        other => Err(MappingError::UnknownState {
            kind,
            value: other.to_owned(),
        }),
    }
}

/// Maps a pull request listing or detail item.
///
/// # Errors
///
/// Returns [`MappingError`] when `id`, `number`, `title` or `state` is
/// missing, a timestamp is invalid, or the state is unknown.
pub fn map_pull_request(item: &Value, repository_id: &str) -> Result<PullRequestRow, MappingError> {
    let kind = ResourceKind::PullRequests;
    let wire: WirePullRequest = decode(kind, item)?;

    let merged = wire.merged_at.is_some() || wire.merged == Some(true);
    let author = wire.user.unwrap_or_default();

    Ok(PullRequestRow {
        github_pr_id: required(kind, "id", wire.id)?,
        repository_id: repository_id.to_owned(),
        repository_full_name: repository_id.to_owned(),
        pr_number: required(kind, "number", wire.number)?,
        title: required(kind, "title", wire.title)?,
        body: wire.body,
        state: pull_request_state(wire.state.as_deref(), merged)?,
        author_github_id: author.id,
        author_login: author.login,
        commits_count: wire.commits,
        additions: wire.additions,
        deletions: wire.deletions,
        changed_files: wire.changed_files,
        base_ref: wire.base.and_then(|base| base.name),
        head_ref: wire.head.and_then(|head| head.name),
        assignees: user_ids_json(wire.assignees.as_deref()),
        requested_reviewers: user_ids_json(wire.requested_reviewers.as_deref()),
        github_created_at: timestamp(kind, "created_at", wire.created_at.as_deref())?,
        github_updated_at: timestamp(kind, "updated_at", wire.updated_at.as_deref())?,
        closed_at: timestamp(kind, "closed_at", wire.closed_at.as_deref())?,
        merged_at: timestamp(kind, "merged_at", wire.merged_at.as_deref())?,
        project_id: None,
    })
}

/// Maps a review item belonging to the pull request `github_pr_id`.
///
/// Returns `Ok(None)` for pending reviews, which are drafts that have not
/// been submitted.
///
/// # Errors
///
/// Returns [`MappingError`] when `id` or `state` is missing, the state is
/// unknown, or `submitted_at` is invalid.
pub fn map_review(
    item: &Value,
    github_pr_id: i64,
    repository_id: &str,
) -> Result<Option<ReviewRow>, MappingError> {
    let kind = ResourceKind::Reviews;
    let wire: WireReview = decode(kind, item)?;

    let state = match required(kind, "state", wire.state.as_deref())? {
        "PENDING" => return Ok(None),
        "APPROVED" => ReviewState::Approved,
        "CHANGES_REQUESTED" => ReviewState::ChangesRequested,
        "COMMENTED" => ReviewState::Commented,
        "DISMISSED" => ReviewState::Dismissed,
        other => {
            return Err(MappingError::UnknownState {
                kind,
                value: other.to_owned(),
            });
        }
    };
    let reviewer = wire.user.unwrap_or_default();

    Ok(Some(ReviewRow {
        github_review_id: required(kind, "id", wire.id)?,
        github_pr_id,
        repository_id: repository_id.to_owned(),
        state,
        reviewer_github_id: reviewer.id,
        reviewer_login: reviewer.login,
        body: wire.body,
        commit_id: wire.commit_id,
        github_submitted_at: timestamp(kind, "submitted_at", wire.submitted_at.as_deref())?,
        project_id: None,
    }))
}

/// Maps a review comment or issue comment belonging to `github_pr_id`.
///
/// Line fields are dropped for issue comments, which have no diff anchor.
///
/// # Errors
///
/// Returns [`MappingError`] when `id` is missing or a timestamp is invalid.
pub fn map_comment(
    item: &Value,
    comment_kind: CommentKind,
    github_pr_id: i64,
    repository_id: &str,
) -> Result<CommentRow, MappingError> {
    let kind = comment_kind.resource_kind();
    let wire: WireComment = decode(kind, item)?;
    let author = wire.user.unwrap_or_default();
    let on_diff = comment_kind == CommentKind::ReviewComment;

    Ok(CommentRow {
        github_comment_id: required(kind, "id", wire.id)?,
        github_pr_id,
        repository_id: repository_id.to_owned(),
        comment_type: comment_kind,
        is_bot: author.is_bot(),
        author_github_id: author.id,
        author_login: author.login,
        body: wire.body,
        review_id: wire.pull_request_review_id.filter(|_| on_diff),
        in_reply_to_id: wire.in_reply_to_id.filter(|_| on_diff),
        path: wire.path.filter(|_| on_diff),
        line: wire.line.filter(|_| on_diff),
        original_line: wire.original_line.filter(|_| on_diff),
        position: wire.position.filter(|_| on_diff),
        commit_id: wire.commit_id.filter(|_| on_diff),
        github_created_at: timestamp(kind, "created_at", wire.created_at.as_deref())?,
        github_updated_at: timestamp(kind, "updated_at", wire.updated_at.as_deref())?,
        project_id: None,
    })
}

fn is_full_sha(value: &str) -> bool {
    value.len() == 40 && value.bytes().all(|byte| byte.is_ascii_hexdigit())
}

/// Maps a repository commit listing item.
///
/// # Errors
///
/// Returns [`MappingError`] when the SHA is missing or not 40 hex
/// characters, or a date is invalid.
pub fn map_commit(item: &Value, repository_id: &str) -> Result<CommitRow, MappingError> {
    let kind = ResourceKind::Commits;
    let wire: WireCommit = decode(kind, item)?;

    let sha = required(kind, "sha", wire.sha)?;
    if !is_full_sha(&sha) {
        return Err(MappingError::InvalidSha { value: sha });
    }

    let (message, author_signature, committer_signature) = match wire.commit {
        Some(commit) => (commit.message, commit.author, commit.committer),
        None => (None, None, None),
    };
    let author = wire.author.unwrap_or_default();
    let committer = wire.committer.unwrap_or_default();
    let author_date = author_signature.as_ref().and_then(|sig| sig.date.as_deref());
    let committer_date = committer_signature
        .as_ref()
        .and_then(|sig| sig.date.as_deref());

    Ok(CommitRow {
        sha: sha.to_ascii_lowercase(),
        repository_id: repository_id.to_owned(),
        repository_full_name: repository_id.to_owned(),
        message,
        author_github_id: author.id,
        author_login: author.login,
        author_name: author_signature.as_ref().and_then(|sig| sig.name.clone()),
        committer_login: committer.login,
        committer_name: committer_signature.as_ref().and_then(|sig| sig.name.clone()),
        github_timestamp: timestamp(kind, "commit.author.date", author_date)?,
        committed_at: timestamp(kind, "commit.committer.date", committer_date)?,
        additions: wire.stats.as_ref().and_then(|stats| stats.additions),
        deletions: wire.stats.as_ref().and_then(|stats| stats.deletions),
        project_id: None,
    })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::{Value, json};

    use super::{map_comment, map_commit, map_pull_request, map_review};
    use crate::github::ResourceKind;
    use crate::records::{
        CommentKind, MappingError, PullRequestState, ReviewState, format_timestamp,
    };

    const REPO: &str = "octo/repo";

    fn pull_request_json() -> Value {
        json!({
            "id": 1001,
            "number": 7,
            "title": "Add widgets",
            "body": "Adds the widget module",
            "state": "closed",
            "user": { "id": 11, "login": "alice", "type": "User" },
            "commits": 3,
            "additions": 40,
            "deletions": 2,
            "changed_files": 4,
            "base": { "ref": "main" },
            "head": { "ref": "feature/widgets" },
            "assignees": [{ "id": 11 }, { "id": 12 }],
            "requested_reviewers": [],
            "created_at": "2025-01-01T10:00:00+02:00",
            "updated_at": "2025-01-02T00:00:00Z",
            "closed_at": "2025-01-03T00:00:00Z",
            "merged_at": "2025-01-03T00:00:00Z"
        })
    }

    #[rstest]
    fn maps_pull_request_detail() {
        let row = map_pull_request(&pull_request_json(), REPO).expect("PR should map");

        assert_eq!(row.github_pr_id, 1001);
        assert_eq!(row.pr_number, 7);
        assert_eq!(row.state, PullRequestState::Merged);
        assert_eq!(row.author_login.as_deref(), Some("alice"));
        assert_eq!(row.additions, Some(40));
        assert_eq!(row.base_ref.as_deref(), Some("main"));
        assert_eq!(row.assignees.as_deref(), Some("[11,12]"));
        assert_eq!(row.requested_reviewers, None);
        assert_eq!(
            row.github_created_at.as_ref().map(format_timestamp).as_deref(),
            Some("2025-01-01T08:00:00Z")
        );
        assert_eq!(row.project_id, None);
    }

    #[rstest]
    fn listing_item_leaves_detail_counters_null() {
        let item = json!({
            "id": 1002, "number": 8, "title": "Fix", "state": "open", "merged_at": null
        });
        let row = map_pull_request(&item, REPO).expect("listing item should map");

        assert_eq!(row.state, PullRequestState::Open);
        assert_eq!(row.commits_count, None);
        assert_eq!(row.changed_files, None);
    }

    #[rstest]
    #[case::id("id")]
    #[case::number("number")]
    #[case::title("title")]
    fn pull_request_requires_identity(#[case] field: &'static str) {
        let mut item = pull_request_json();
        item.as_object_mut().expect("object").remove(field);

        assert_eq!(
            map_pull_request(&item, REPO),
            Err(MappingError::MissingField {
                kind: ResourceKind::PullRequests,
                field,
            })
        );
    }

    #[rstest]
    fn rejects_invalid_timestamp() {
        let mut item = pull_request_json();
        item["updated_at"] = json!("yesterday");

        assert!(matches!(
            map_pull_request(&item, REPO),
            Err(MappingError::InvalidTimestamp { field: "updated_at", .. })
        ));
    }

    #[rstest]
    #[case("APPROVED", Some(ReviewState::Approved))]
    #[case("CHANGES_REQUESTED", Some(ReviewState::ChangesRequested))]
    #[case("COMMENTED", Some(ReviewState::Commented))]
    #[case("DISMISSED", Some(ReviewState::Dismissed))]
    #[case("PENDING", None)]
    fn maps_review_states(#[case] state: &str, #[case] expected: Option<ReviewState>) {
        let item = json!({
            "id": 501,
            "state": state,
            "user": { "id": 12, "login": "bob" },
            "submitted_at": "2025-01-02T00:00:00Z"
        });

        let row = map_review(&item, 1001, REPO).expect("review should map");

        assert_eq!(row.as_ref().map(|review| review.state), expected);
        if let Some(review) = row {
            assert_eq!(review.github_pr_id, 1001);
            assert_eq!(review.reviewer_login.as_deref(), Some("bob"));
        }
    }

    #[rstest]
    fn unknown_review_state_is_an_error() {
        let item = json!({ "id": 502, "state": "SHRUGGED" });
        assert_eq!(
            map_review(&item, 1001, REPO),
            Err(MappingError::UnknownState {
                kind: ResourceKind::Reviews,
                value: "SHRUGGED".to_owned(),
            })
        );
    }

    #[rstest]
    fn review_comment_keeps_line_fields() {
        let item = json!({
            "id": 901,
            "body": "nit",
            "user": { "id": 13, "login": "ci-bot[bot]", "type": "Bot" },
            "pull_request_review_id": 501,
            "in_reply_to_id": 900,
            "path": "src/lib.rs",
            "line": 10,
            "original_line": 9,
            "position": 4,
            "commit_id": "abc",
            "created_at": "2025-01-02T00:00:00Z"
        });

        let row = map_comment(&item, CommentKind::ReviewComment, 1001, REPO)
            .expect("comment should map");

        assert!(row.is_bot);
        assert_eq!(row.comment_type, CommentKind::ReviewComment);
        assert_eq!(row.review_id, Some(501));
        assert_eq!(row.path.as_deref(), Some("src/lib.rs"));
        assert_eq!(row.line, Some(10));
    }

    #[rstest]
    fn issue_comment_drops_line_fields() {
        let item = json!({
            "id": 902,
            "body": "LGTM",
            "user": { "id": 12, "login": "bob", "type": "User" },
            "path": "ignored",
            "line": 3
        });

        let row =
            map_comment(&item, CommentKind::IssueComment, 1001, REPO).expect("comment should map");

        assert!(!row.is_bot);
        assert_eq!(row.path, None);
        assert_eq!(row.line, None);
        assert_eq!(row.github_pr_id, 1001);
    }

    #[rstest]
    fn comment_without_id_names_its_kind() {
        let item = json!({ "body": "orphan" });
        assert_eq!(
            map_comment(&item, CommentKind::IssueComment, 1001, REPO),
            Err(MappingError::MissingField {
                kind: ResourceKind::IssueComments,
                field: "id",
            })
        );
    }

    #[rstest]
    fn maps_commit_with_unlinked_author() {
        let item = json!({
            "sha": "ABCDEF0123456789ABCDEF0123456789ABCDEF01",
            "commit": {
                "message": "Initial commit",
                "author": { "name": "Alice", "date": "2025-01-01T00:00:00Z" },
                "committer": { "name": "GitHub", "date": "2025-01-01T00:00:05Z" }
            },
            "author": null,
            "committer": { "id": 19864447, "login": "web-flow" }
        });

        let row = map_commit(&item, REPO).expect("commit should map");

        assert_eq!(row.sha, "abcdef0123456789abcdef0123456789abcdef01");
        assert_eq!(row.author_github_id, None);
        assert_eq!(row.author_name.as_deref(), Some("Alice"));
        assert_eq!(row.committer_login.as_deref(), Some("web-flow"));
        assert_eq!(
            row.committed_at.as_ref().map(format_timestamp).as_deref(),
            Some("2025-01-01T00:00:05Z")
        );
        assert_eq!(row.additions, None);
    }

    #[rstest]
    #[case::short("abc123")]
    #[case::not_hex("zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz")]
    fn rejects_malformed_sha(#[case] sha: &str) {
        let item = json!({ "sha": sha, "commit": { "message": "m" } });
        assert_eq!(
            map_commit(&item, REPO),
            Err(MappingError::InvalidSha {
                value: sha.to_owned()
            })
        );
    }

    #[rstest]
    fn non_object_item_is_malformed() {
        assert!(matches!(
            map_commit(&json!("sha"), REPO),
            Err(MappingError::Malformed { kind: ResourceKind::Commits, .. })
        ));
    }
}
