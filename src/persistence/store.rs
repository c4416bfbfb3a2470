//! Conflict-aware batch upserts into the history tables.
//!
//! A single generic writer handles all four tables. Each row type describes
//! its table, natural key and column bindings through [`UpsertRow`]; the
//! writer turns a batch into `INSERT ... ON CONFLICT(key) DO UPDATE` so a
//! re-fetched row overwrites the stored one instead of duplicating it.

use std::sync::Mutex;

use diesel::Connection;
use diesel::QueryableByName;
use diesel::RunQueryDsl;
use diesel::query_builder::{BoxedSqlQuery, SqlQuery};
use diesel::sql_query;
use diesel::sql_types::{BigInt, Bool, Nullable, Text};
use diesel::sqlite::{Sqlite, SqliteConnection};
use tracing::debug;

use crate::records::{CommentRow, CommitRow, PullRequestRow, ReviewRow, format_timestamp};
use crate::telemetry::TelemetrySink;

use super::migrator::{SchemaVersion, establish, run_migrations};
use super::{PersistenceError, UpsertError};

/// Bound parameters per statement, kept under `SQLite`'s historical limit of
/// 999 host parameters.
const MAX_BOUND_PARAMETERS: usize = 999;

const NOW_UTC: &str = "strftime('%Y-%m-%dT%H:%M:%SZ', 'now')";

/// The four history tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    /// `github_pull_requests`.
    PullRequests,
    /// `github_pr_reviews`.
    Reviews,
    /// `github_pr_comments`.
    Comments,
    /// `github_commits`.
    Commits,
}

impl Table {
    /// Every table, parents before children.
    pub const ALL: [Self; 4] = [Self::PullRequests, Self::Reviews, Self::Comments, Self::Commits];

    /// Table name in the schema.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PullRequests => "github_pull_requests",
            Self::Reviews => "github_pr_reviews",
            Self::Comments => "github_pr_comments",
            Self::Commits => "github_commits",
        }
    }

    /// Natural unique key used as the conflict target.
    #[must_use]
    pub const fn conflict_key(self) -> &'static str {
        match self {
            Self::PullRequests => "github_pr_id",
            Self::Reviews => "github_review_id",
            Self::Comments => "github_comment_id",
            Self::Commits => "sha",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.name())
    }
}

type RowQuery = BoxedSqlQuery<'static, Sqlite, SqlQuery>;

/// A row type that can be written by the generic upsert.
pub trait UpsertRow {
    /// Destination table.
    const TABLE: Table;

    /// Data columns in binding order. Bookkeeping columns are added by the
    /// writer.
    const COLUMNS: &'static [&'static str];

    /// Natural key rendered for logs and errors.
    fn natural_id(&self) -> String;

    /// Binds this row's values in [`Self::COLUMNS`] order.
    fn bind(&self, query: RowQuery) -> RowQuery;
}

impl UpsertRow for PullRequestRow {
    const TABLE: Table = Table::PullRequests;
    const COLUMNS: &'static [&'static str] = &[
        "github_pr_id",
        "repository_id",
        "repository_full_name",
        "pr_number",
        "title",
        "body",
        "state",
        "author_github_id",
        "author_login",
        "commits_count",
        "additions",
        "deletions",
        "changed_files",
        "base_ref",
        "head_ref",
        "assignees",
        "requested_reviewers",
        "github_created_at",
        "github_updated_at",
        "closed_at",
        "merged_at",
        "project_id",
    ];

    fn natural_id(&self) -> String {
        self.github_pr_id.to_string()
    }

    fn bind(&self, query: RowQuery) -> RowQuery {
        query
            .bind::<BigInt, _>(self.github_pr_id)
            .bind::<Text, _>(self.repository_id.clone())
            .bind::<Text, _>(self.repository_full_name.clone())
            .bind::<BigInt, _>(self.pr_number)
            .bind::<Text, _>(self.title.clone())
            .bind::<Nullable<Text>, _>(self.body.clone())
            .bind::<Text, _>(self.state.as_str())
            .bind::<Nullable<BigInt>, _>(self.author_github_id)
            .bind::<Nullable<Text>, _>(self.author_login.clone())
            .bind::<Nullable<BigInt>, _>(self.commits_count)
            .bind::<Nullable<BigInt>, _>(self.additions)
            .bind::<Nullable<BigInt>, _>(self.deletions)
            .bind::<Nullable<BigInt>, _>(self.changed_files)
            .bind::<Nullable<Text>, _>(self.base_ref.clone())
            .bind::<Nullable<Text>, _>(self.head_ref.clone())
            .bind::<Nullable<Text>, _>(self.assignees.clone())
            .bind::<Nullable<Text>, _>(self.requested_reviewers.clone())
            .bind::<Nullable<Text>, _>(self.github_created_at.as_ref().map(format_timestamp))
            .bind::<Nullable<Text>, _>(self.github_updated_at.as_ref().map(format_timestamp))
            .bind::<Nullable<Text>, _>(self.closed_at.as_ref().map(format_timestamp))
            .bind::<Nullable<Text>, _>(self.merged_at.as_ref().map(format_timestamp))
            .bind::<Nullable<Text>, _>(self.project_id.clone())
    }
}

impl UpsertRow for ReviewRow {
    const TABLE: Table = Table::Reviews;
    const COLUMNS: &'static [&'static str] = &[
        "github_review_id",
        "github_pr_id",
        "repository_id",
        "state",
        "reviewer_github_id",
        "reviewer_login",
        "body",
        "commit_id",
        "github_submitted_at",
        "project_id",
    ];

    fn natural_id(&self) -> String {
        self.github_review_id.to_string()
    }

    fn bind(&self, query: RowQuery) -> RowQuery {
        query
            .bind::<BigInt, _>(self.github_review_id)
            .bind::<BigInt, _>(self.github_pr_id)
            .bind::<Text, _>(self.repository_id.clone())
            .bind::<Text, _>(self.state.as_str())
            .bind::<Nullable<BigInt>, _>(self.reviewer_github_id)
            .bind::<Nullable<Text>, _>(self.reviewer_login.clone())
            .bind::<Nullable<Text>, _>(self.body.clone())
            .bind::<Nullable<Text>, _>(self.commit_id.clone())
            .bind::<Nullable<Text>, _>(self.github_submitted_at.as_ref().map(format_timestamp))
            .bind::<Nullable<Text>, _>(self.project_id.clone())
    }
}

impl UpsertRow for CommentRow {
    const TABLE: Table = Table::Comments;
    const COLUMNS: &'static [&'static str] = &[
        "github_comment_id",
        "github_pr_id",
        "repository_id",
        "comment_type",
        "author_github_id",
        "author_login",
        "is_bot",
        "body",
        "review_id",
        "in_reply_to_id",
        "path",
        "line",
        "original_line",
        "position",
        "commit_id",
        "github_created_at",
        "github_updated_at",
        "project_id",
    ];

    fn natural_id(&self) -> String {
        self.github_comment_id.to_string()
    }

    fn bind(&self, query: RowQuery) -> RowQuery {
        query
            .bind::<BigInt, _>(self.github_comment_id)
            .bind::<BigInt, _>(self.github_pr_id)
            .bind::<Text, _>(self.repository_id.clone())
            .bind::<Text, _>(self.comment_type.as_str())
            .bind::<Nullable<BigInt>, _>(self.author_github_id)
            .bind::<Nullable<Text>, _>(self.author_login.clone())
            .bind::<Bool, _>(self.is_bot)
            .bind::<Nullable<Text>, _>(self.body.clone())
            .bind::<Nullable<BigInt>, _>(self.review_id)
            .bind::<Nullable<BigInt>, _>(self.in_reply_to_id)
            .bind::<Nullable<Text>, _>(self.path.clone())
            .bind::<Nullable<BigInt>, _>(self.line)
            .bind::<Nullable<BigInt>, _>(self.original_line)
            .bind::<Nullable<BigInt>, _>(self.position)
            .bind::<Nullable<Text>, _>(self.commit_id.clone())
            .bind::<Nullable<Text>, _>(self.github_created_at.as_ref().map(format_timestamp))
            .bind::<Nullable<Text>, _>(self.github_updated_at.as_ref().map(format_timestamp))
            .bind::<Nullable<Text>, _>(self.project_id.clone())
    }
}

impl UpsertRow for CommitRow {
    const TABLE: Table = Table::Commits;
    const COLUMNS: &'static [&'static str] = &[
        "sha",
        "repository_id",
        "repository_full_name",
        "message",
        "author_github_id",
        "author_login",
        "author_name",
        "committer_login",
        "committer_name",
        "github_timestamp",
        "committed_at",
        "additions",
        "deletions",
        "project_id",
    ];

    fn natural_id(&self) -> String {
        self.sha.clone()
    }

    fn bind(&self, query: RowQuery) -> RowQuery {
        query
            .bind::<Text, _>(self.sha.clone())
            .bind::<Text, _>(self.repository_id.clone())
            .bind::<Text, _>(self.repository_full_name.clone())
            .bind::<Nullable<Text>, _>(self.message.clone())
            .bind::<Nullable<BigInt>, _>(self.author_github_id)
            .bind::<Nullable<Text>, _>(self.author_login.clone())
            .bind::<Nullable<Text>, _>(self.author_name.clone())
            .bind::<Nullable<Text>, _>(self.committer_login.clone())
            .bind::<Nullable<Text>, _>(self.committer_name.clone())
            .bind::<Nullable<Text>, _>(self.github_timestamp.as_ref().map(format_timestamp))
            .bind::<Nullable<Text>, _>(self.committed_at.as_ref().map(format_timestamp))
            .bind::<Nullable<BigInt>, _>(self.additions)
            .bind::<Nullable<BigInt>, _>(self.deletions)
            .bind::<Nullable<Text>, _>(self.project_id.clone())
    }
}

/// One page of rows destined for a single table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowBatch {
    /// Pull request rows.
    PullRequests(Vec<PullRequestRow>),
    /// Review rows.
    Reviews(Vec<ReviewRow>),
    /// Review and issue comment rows.
    Comments(Vec<CommentRow>),
    /// Commit rows.
    Commits(Vec<CommitRow>),
}

impl RowBatch {
    /// Destination table.
    #[must_use]
    pub const fn table(&self) -> Table {
        match self {
            Self::PullRequests(_) => Table::PullRequests,
            Self::Reviews(_) => Table::Reviews,
            Self::Comments(_) => Table::Comments,
            Self::Commits(_) => Table::Commits,
        }
    }

    /// Number of rows in the batch.
    #[must_use]
    pub const fn len(&self) -> usize {
        match self {
            Self::PullRequests(rows) => rows.len(),
            Self::Reviews(rows) => rows.len(),
            Self::Comments(rows) => rows.len(),
            Self::Commits(rows) => rows.len(),
        }
    }

    /// Returns true when the batch has no rows.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Natural ids of every row, in batch order.
    #[must_use]
    pub fn natural_ids(&self) -> Vec<String> {
        fn ids<R: UpsertRow>(rows: &[R]) -> Vec<String> {
            rows.iter().map(UpsertRow::natural_id).collect()
        }
        match self {
            Self::PullRequests(rows) => ids(rows),
            Self::Reviews(rows) => ids(rows),
            Self::Comments(rows) => ids(rows),
            Self::Commits(rows) => ids(rows),
        }
    }
}

/// Idempotent writer for row batches.
#[cfg_attr(test, mockall::automock)]
pub trait UpsertSink: Send + Sync {
    /// Inserts or overwrites every row in `batch` atomically, returning the
    /// number of rows written.
    ///
    /// # Errors
    ///
    /// Returns [`UpsertError`] naming the table and the batch's natural ids
    /// when the write fails; no row in the batch is changed.
    fn upsert(&self, batch: &RowBatch) -> Result<usize, UpsertError>;
}

fn upsert_statement(table: Table, columns: &[&str], row_count: usize) -> String {
    let placeholders = vec!["?"; columns.len()].join(", ");
    let row_values = format!("({placeholders}, {NOW_UTC}, {NOW_UTC})");
    let values = vec![row_values.as_str(); row_count].join(", ");
    let assignments = columns
        .iter()
        .filter(|column| **column != table.conflict_key())
        .map(|column| format!("{column} = excluded.{column}"))
        .chain(std::iter::once("updated_at = excluded.updated_at".to_owned()))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "INSERT INTO {table} ({columns}, created_at, updated_at) VALUES {values} \
         ON CONFLICT({key}) DO UPDATE SET {assignments}",
        table = table.name(),
        columns = columns.join(", "),
        key = table.conflict_key(),
    )
}

fn upsert_rows<R: UpsertRow>(
    connection: &mut SqliteConnection,
    rows: &[R],
) -> Result<usize, diesel::result::Error> {
    let rows_per_statement = MAX_BOUND_PARAMETERS
        .checked_div(R::COLUMNS.len())
        .unwrap_or(MAX_BOUND_PARAMETERS)
        .max(1);
    connection.transaction(|transaction| {
        let mut written = 0;
        for chunk in rows.chunks(rows_per_statement) {
            let statement = upsert_statement(R::TABLE, R::COLUMNS, chunk.len());
            let query = chunk
                .iter()
                .fold(sql_query(statement).into_boxed::<Sqlite>(), |query, row| {
                    row.bind(query)
                });
            written += query.execute(transaction)?;
        }
        Ok(written)
    })
}

/// `SQLite`-backed history store.
///
/// Holds a single connection so that `:memory:` databases keep their schema
/// for the life of the store.
pub struct SqliteStore {
    connection: Mutex<SqliteConnection>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Opens an already-migrated store.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::SchemaNotInitialised`] when the history
    /// tables are missing, or a connection error.
    pub fn open(database_url: &str) -> Result<Self, PersistenceError> {
        let mut connection = establish(database_url)?;
        ensure_schema(&mut connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    /// Opens a store and applies any pending migrations first.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the connection or migrations fail.
    pub fn open_and_migrate(
        database_url: &str,
        telemetry: &dyn TelemetrySink,
    ) -> Result<(Self, SchemaVersion), PersistenceError> {
        let mut connection = establish(database_url)?;
        let version = run_migrations(&mut connection, telemetry)?;
        Ok((
            Self {
                connection: Mutex::new(connection),
            },
            version,
        ))
    }

    /// Number of rows currently stored in `table`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::QueryFailed`] when the count fails.
    pub fn row_count(&self, table: Table) -> Result<u64, PersistenceError> {
        #[derive(QueryableByName)]
        struct Count {
            #[diesel(sql_type = BigInt)]
            count: i64,
        }

        let mut connection = self
            .connection
            .lock()
            .map_err(|_| PersistenceError::ConnectionPoisoned)?;
        let row: Count = sql_query(format!("SELECT COUNT(*) AS count FROM {}", table.name()))
            .get_result(&mut *connection)
            .map_err(|error| PersistenceError::QueryFailed {
                message: error.to_string(),
            })?;
        Ok(u64::try_from(row.count).unwrap_or(0))
    }

    /// Runs `query` against the store's connection. Intended for read-only
    /// inspection such as reporting and tests.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::QueryFailed`] when the query fails.
    pub fn inspect<T>(
        &self,
        query: impl FnOnce(&mut SqliteConnection) -> Result<T, diesel::result::Error>,
    ) -> Result<T, PersistenceError> {
        let mut connection = self
            .connection
            .lock()
            .map_err(|_| PersistenceError::ConnectionPoisoned)?;
        query(&mut connection).map_err(|error| PersistenceError::QueryFailed {
            message: error.to_string(),
        })
    }
}

fn ensure_schema(connection: &mut SqliteConnection) -> Result<(), PersistenceError> {
    #[derive(QueryableByName)]
    struct Count {
        #[diesel(sql_type = BigInt)]
        count: i64,
    }

    let names = Table::ALL
        .iter()
        .map(|table| format!("'{}'", table.name()))
        .collect::<Vec<_>>()
        .join(", ");
    let found: Count = sql_query(format!(
        "SELECT COUNT(*) AS count FROM sqlite_master WHERE type = 'table' AND name IN ({names})"
    ))
    .get_result(connection)
    .map_err(|error| PersistenceError::QueryFailed {
        message: error.to_string(),
    })?;

    if usize::try_from(found.count).ok() == Some(Table::ALL.len()) {
        Ok(())
    } else {
        Err(PersistenceError::SchemaNotInitialised)
    }
}

impl UpsertSink for SqliteStore {
    fn upsert(&self, batch: &RowBatch) -> Result<usize, UpsertError> {
        if batch.is_empty() {
            return Ok(0);
        }

        let table = batch.table();
        let failure = |message: String| UpsertError {
            table: table.name(),
            natural_ids: batch.natural_ids(),
            message,
        };

        let mut connection = self
            .connection
            .lock()
            .map_err(|_| failure(PersistenceError::ConnectionPoisoned.to_string()))?;

        let written = match batch {
            RowBatch::PullRequests(rows) => upsert_rows(&mut connection, rows),
            RowBatch::Reviews(rows) => upsert_rows(&mut connection, rows),
            RowBatch::Comments(rows) => upsert_rows(&mut connection, rows),
            RowBatch::Commits(rows) => upsert_rows(&mut connection, rows),
        }
        .map_err(|error| failure(error.to_string()))?;

        debug!(table = table.name(), rows = written, "upserted batch");
        Ok(written)
    }
}
