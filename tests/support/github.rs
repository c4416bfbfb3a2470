//! Wiremock fixtures describing a small repository history.
//!
//! The repository `octo/repo` has two pull requests (#7 and #8), one review,
//! three comments and three commits. The listing is split across two pages.
//!
//! [`mount_open_and_merged_history`] serves a second shape of the same
//! repository: #1 open with a review, two line comments and one issue
//! comment, and #2 merged with one issue comment.

use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Owner used by every fixture.
pub const OWNER: &str = "octo";
/// Repository name used by every fixture.
pub const REPO: &str = "repo";

const PULLS: &str = "/repos/octo/repo/pulls";

fn user(id: i64, login: &str) -> Value {
    json!({ "id": id, "login": login, "type": "User" })
}

fn pull_request(id: i64, number: u64, state: &str) -> Value {
    json!({
        "id": id,
        "number": number,
        "title": format!("Pull request {number}"),
        "body": "Description",
        "state": state,
        "user": user(11, "alice"),
        "base": { "ref": "main" },
        "head": { "ref": format!("feature-{number}") },
        "assignees": [],
        "requested_reviewers": [],
        "created_at": "2025-01-01T00:00:00Z",
        "updated_at": "2025-01-02T00:00:00Z",
        "closed_at": null,
        "merged_at": null
    })
}

fn merged_pull_request(id: i64, number: u64) -> Value {
    let mut value = pull_request(id, number, "closed");
    value["closed_at"] = json!("2025-01-04T00:00:00Z");
    value["merged_at"] = json!("2025-01-04T00:00:00Z");
    value
}

fn detail(id: i64, number: u64) -> Value {
    let mut value = pull_request(id, number, "open");
    value["commits"] = json!(2);
    value["additions"] = json!(12);
    value["deletions"] = json!(3);
    value["changed_files"] = json!(2);
    value
}

fn comment(id: i64, login: &str) -> Value {
    json!({
        "id": id,
        "body": format!("Comment {id}"),
        "user": user(12, login),
        "created_at": "2025-01-03T00:00:00Z",
        "updated_at": "2025-01-03T00:00:00Z"
    })
}

fn review_comment(id: i64) -> Value {
    let mut value = comment(id, "bob");
    value["pull_request_review_id"] = json!(501);
    value["path"] = json!("src/lib.rs");
    value["line"] = json!(10);
    value["original_line"] = json!(10);
    value["commit_id"] = json!("a".repeat(40));
    value
}

fn commit(seed: char) -> Value {
    json!({
        "sha": seed.to_string().repeat(40),
        "commit": {
            "message": format!("Commit {seed}"),
            "author": { "name": "Alice", "date": "2025-01-01T00:00:00Z" },
            "committer": { "name": "Alice", "date": "2025-01-01T00:00:00Z" }
        },
        "author": user(11, "alice"),
        "committer": user(11, "alice")
    })
}

async fn mount_json(server: &MockServer, endpoint: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Serves the listing across two pages, one pull request each.
pub async fn mount_listing(server: &MockServer) {
    let next = format!("<{}{PULLS}?state=all&per_page=1&page=2>; rel=\"next\"", server.uri());
    Mock::given(method("GET"))
        .and(path(PULLS))
        .and(query_param_is_missing("page"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([pull_request(1007, 7, "open")]))
                .insert_header("link", next.as_str()),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(PULLS))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([pull_request(1008, 8, "open")])),
        )
        .mount(server)
        .await;
}

/// Serves detail, reviews and comments for both pull requests.
///
/// Issue comments for #7 are left out so callers can mount their own
/// response for that endpoint.
pub async fn mount_children_except_issue_comments_of_7(server: &MockServer) {
    mount_json(server, "/repos/octo/repo/pulls/7", detail(1007, 7)).await;
    mount_json(server, "/repos/octo/repo/pulls/8", detail(1008, 8)).await;
    mount_json(
        server,
        "/repos/octo/repo/pulls/7/reviews",
        json!([{
            "id": 501,
            "state": "APPROVED",
            "body": "Looks good",
            "user": user(12, "bob"),
            "commit_id": "a".repeat(40),
            "submitted_at": "2025-01-03T00:00:00Z"
        }]),
    )
    .await;
    mount_json(server, "/repos/octo/repo/pulls/8/reviews", json!([])).await;
    mount_json(
        server,
        "/repos/octo/repo/pulls/7/comments",
        json!([review_comment(901)]),
    )
    .await;
    mount_json(server, "/repos/octo/repo/pulls/8/comments", json!([])).await;
    mount_json(
        server,
        "/repos/octo/repo/issues/8/comments",
        json!([comment(903, "carol")]),
    )
    .await;
}

/// Serves the issue comments of #7.
pub async fn mount_issue_comments_of_7(server: &MockServer) {
    mount_json(
        server,
        "/repos/octo/repo/issues/7/comments",
        json!([comment(902, "bob")]),
    )
    .await;
}

/// Makes the issue comments of #7 fail with a client error.
pub async fn mount_failing_issue_comments_of_7(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/repos/octo/repo/issues/7/comments"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })))
        .mount(server)
        .await;
}

/// Serves three commits on one page.
pub async fn mount_commits(server: &MockServer) {
    mount_json(
        server,
        "/repos/octo/repo/commits",
        json!([commit('a'), commit('b'), commit('c')]),
    )
    .await;
}

/// Serves the complete history: 2 pull requests, 1 review, 3 comments and
/// 3 commits.
pub async fn mount_repository_history(server: &MockServer) {
    mount_listing(server).await;
    mount_children_except_issue_comments_of_7(server).await;
    mount_issue_comments_of_7(server).await;
    mount_commits(server).await;
}

/// Rejects the pull request listing with bad credentials.
pub async fn mount_unauthorised_listing(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(PULLS))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Bad credentials" })),
        )
        .mount(server)
        .await;
}

/// Answers the first listing request with a secondary rate limit asking for
/// a one second pause.
pub async fn mount_rate_limit_once(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(PULLS))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({ "message": "You have exceeded a secondary rate limit" }))
                .insert_header("retry-after", "1"),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .mount(server)
        .await;
}

/// Complete history except that the issue comments of #7 return 404.
pub async fn mount_history_with_failing_comments(server: &MockServer) {
    mount_listing(server).await;
    mount_children_except_issue_comments_of_7(server).await;
    mount_failing_issue_comments_of_7(server).await;
    mount_commits(server).await;
}

/// Complete history behind one secondary rate limit on the listing.
pub async fn mount_rate_limited_history(server: &MockServer) {
    mount_rate_limit_once(server).await;
    mount_repository_history(server).await;
}

/// Single-page history with one open and one merged pull request: 2 pull
/// requests, 1 review, 4 comments and 3 commits.
pub async fn mount_open_and_merged_history(server: &MockServer) {
    let mut merged = merged_pull_request(2002, 2);
    merged["commits"] = json!(1);
    mount_json(
        server,
        PULLS,
        json!([pull_request(2001, 1, "open"), merged_pull_request(2002, 2)]),
    )
    .await;
    mount_json(server, "/repos/octo/repo/pulls/1", detail(2001, 1)).await;
    mount_json(server, "/repos/octo/repo/pulls/2", merged).await;
    mount_json(
        server,
        "/repos/octo/repo/pulls/1/reviews",
        json!([{
            "id": 701,
            "state": "CHANGES_REQUESTED",
            "body": "Please rename",
            "user": user(12, "bob"),
            "commit_id": "b".repeat(40),
            "submitted_at": "2025-01-03T00:00:00Z"
        }]),
    )
    .await;
    mount_json(server, "/repos/octo/repo/pulls/2/reviews", json!([])).await;
    let mut first = review_comment(801);
    first["pull_request_review_id"] = json!(701);
    let mut reply = review_comment(802);
    reply["pull_request_review_id"] = json!(701);
    reply["in_reply_to_id"] = json!(801);
    mount_json(
        server,
        "/repos/octo/repo/pulls/1/comments",
        json!([first, reply]),
    )
    .await;
    mount_json(server, "/repos/octo/repo/pulls/2/comments", json!([])).await;
    mount_json(
        server,
        "/repos/octo/repo/issues/1/comments",
        json!([comment(803, "carol")]),
    )
    .await;
    mount_json(
        server,
        "/repos/octo/repo/issues/2/comments",
        json!([comment(804, "alice")]),
    )
    .await;
    mount_commits(server).await;
}
