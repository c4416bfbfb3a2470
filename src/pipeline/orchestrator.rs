//! Sequences fetch, map and upsert for every resource kind.
//!
//! Pull requests are processed one listing page at a time: detail for each
//! pull request, one batch upsert for the page, then reviews, review comments
//! and issue comments for every pull request that was persisted. Commits
//! follow once the listing is exhausted. Only a failure of the listing itself
//! stops the run; everything else is recorded and skipped.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::github::{ApiClient, FetchError, PullRequestNumber, ResourceKind, ResourcePages, fetchers};
use crate::persistence::{RowBatch, Table, UpsertSink};
use crate::records::{
    CommentKind, MappingError, map_comment, map_commit, map_pull_request, map_review,
};
use crate::telemetry::{TelemetryEvent, TelemetrySink};

use super::context::RunContext;
use super::stage::PipelineStage;
use super::summary::{FailureRecord, RunSummary};

const CHILDREN_SKIPPED: &str =
    "reviews and comments skipped because the pull request was not persisted";

struct RunState {
    repository: String,
    stage: PipelineStage,
    summary: RunSummary,
}

impl RunState {
    fn new(repository: String) -> Self {
        Self {
            summary: RunSummary::new(repository.clone()),
            repository,
            stage: PipelineStage::Init,
        }
    }

    fn enter(&mut self, stage: PipelineStage) {
        if self.stage != stage {
            debug!(
                repository = %self.repository,
                from = %self.stage,
                to = %stage,
                "pipeline stage changed"
            );
            self.stage = stage;
        }
    }

    fn record(&mut self, failure: FailureRecord) {
        warn!(
            repository = %self.repository,
            kind = %failure.kind,
            pr_number = failure.pr_number,
            natural_ids = ?failure.natural_ids,
            reason = %failure.reason,
            "recorded failure and continuing"
        );
        self.summary.push_failure(failure);
    }
}

/// Natural id of a raw item, for failure reports on items that did not map.
fn raw_natural_id(item: &Value) -> Vec<String> {
    item.get("id")
        .filter(|id| !id.is_null())
        .map(ToString::to_string)
        .or_else(|| item.get("sha").and_then(Value::as_str).map(ToOwned::to_owned))
        .into_iter()
        .collect()
}

/// Runs a backfill against the given client and sink.
pub struct Orchestrator<'deps> {
    client: &'deps dyn ApiClient,
    sink: &'deps dyn UpsertSink,
    telemetry: &'deps dyn TelemetrySink,
}

impl std::fmt::Debug for Orchestrator<'_> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("Orchestrator").finish_non_exhaustive()
    }
}

impl<'deps> Orchestrator<'deps> {
    /// Wires the orchestrator to its collaborators.
    #[must_use]
    pub const fn new(
        client: &'deps dyn ApiClient,
        sink: &'deps dyn UpsertSink,
        telemetry: &'deps dyn TelemetrySink,
    ) -> Self {
        Self {
            client,
            sink,
            telemetry,
        }
    }

    /// Backfills the repository described by `context`.
    ///
    /// Always returns a summary. The outcome is
    /// [`RunOutcome::Aborted`](super::RunOutcome::Aborted) only when the pull
    /// request listing could not be fetched.
    pub async fn run(&self, context: &RunContext) -> RunSummary {
        let mut run = RunState::new(context.repository_id());
        info!(
            repository = %run.repository,
            per_page = context.per_page.get(),
            include_commits = context.include_commits,
            "starting backfill"
        );

        if let Err(error) = self.sync_pull_requests(context, &mut run).await {
            run.enter(PipelineStage::Aborted);
            run.record(FailureRecord {
                kind: ResourceKind::PullRequests,
                pr_number: None,
                natural_ids: Vec::new(),
                reason: error.to_string(),
            });
            run.summary.abort(error.to_string());
            return self.finish(run);
        }

        if context.include_commits {
            self.sync_commits(context, &mut run).await;
        }

        run.enter(PipelineStage::Done);
        self.finish(run)
    }

    fn finish(&self, run: RunState) -> RunSummary {
        let summary = run.summary;
        info!(
            repository = %run.repository,
            outcome = summary.outcome().as_str(),
            upserted = summary.total_upserted(),
            failures = summary.failures().len(),
            "backfill finished"
        );
        self.telemetry.record(TelemetryEvent::RunFinished {
            repository: run.repository,
            outcome: summary.outcome().as_str().to_owned(),
            upserted: summary.total_upserted(),
            failures: u64::try_from(summary.failures().len()).unwrap_or(u64::MAX),
        });
        summary
    }

    async fn sync_pull_requests(
        &self,
        context: &RunContext,
        run: &mut RunState,
    ) -> Result<(), FetchError> {
        run.enter(PipelineStage::FetchPullRequests);
        let mut listing = fetchers::pull_requests(self.client, &context.locator, context.per_page);

        while let Some(page) = listing.next_page().await? {
            run.summary.add_fetched(Table::PullRequests, page.len());
            let persisted = self.persist_pull_request_page(context, run, &page).await;
            for (number, github_pr_id) in persisted {
                self.sync_children(context, run, number, github_pr_id).await;
            }
            run.enter(PipelineStage::FetchPullRequests);
        }
        Ok(())
    }

    /// Maps and upserts one listing page, returning the pull requests whose
    /// children may now be written.
    async fn persist_pull_request_page(
        &self,
        context: &RunContext,
        run: &mut RunState,
        page: &[Value],
    ) -> Vec<(PullRequestNumber, i64)> {
        let mut rows = Vec::with_capacity(page.len());
        let mut persisted = Vec::with_capacity(page.len());

        for item in page {
            let Some(number) = item
                .get("number")
                .and_then(Value::as_u64)
                .and_then(PullRequestNumber::new)
            else {
                run.summary.add_failed(Table::PullRequests, 1);
                run.record(FailureRecord {
                    kind: ResourceKind::PullRequests,
                    pr_number: None,
                    natural_ids: raw_natural_id(item),
                    reason: MappingError::MissingField {
                        kind: ResourceKind::PullRequests,
                        field: "number",
                    }
                    .to_string(),
                });
                continue;
            };

            run.enter(PipelineStage::FetchPullRequestDetail);
            let detail =
                match fetchers::pull_request_detail(self.client, &context.locator, number).await {
                    Ok(detail) => Some(detail),
                    Err(error) => {
                        run.record(FailureRecord {
                            kind: ResourceKind::PullRequestDetail,
                            pr_number: Some(number.get()),
                            natural_ids: raw_natural_id(item),
                            reason: format!("{error}; stored listing fields instead"),
                        });
                        None
                    }
                };

            match map_pull_request(detail.as_ref().unwrap_or(item), &run.repository) {
                Ok(row) => {
                    persisted.push((number, row.github_pr_id));
                    rows.push(row);
                }
                Err(error) => {
                    run.summary.add_failed(Table::PullRequests, 1);
                    run.record(FailureRecord {
                        kind: ResourceKind::PullRequests,
                        pr_number: Some(number.get()),
                        natural_ids: raw_natural_id(item),
                        reason: error.to_string(),
                    });
                }
            }
        }

        if rows.is_empty() {
            return Vec::new();
        }

        let batch = RowBatch::PullRequests(rows);
        match self.sink.upsert(&batch) {
            Ok(written) => {
                run.summary.add_upserted(Table::PullRequests, written);
                persisted
            }
            Err(error) => {
                run.summary.add_failed(Table::PullRequests, batch.len());
                run.record(FailureRecord {
                    kind: ResourceKind::PullRequests,
                    pr_number: None,
                    natural_ids: error.natural_ids.clone(),
                    reason: error.to_string(),
                });
                for (number, _) in persisted {
                    run.record(FailureRecord {
                        kind: ResourceKind::PullRequests,
                        pr_number: Some(number.get()),
                        natural_ids: Vec::new(),
                        reason: CHILDREN_SKIPPED.to_owned(),
                    });
                }
                Vec::new()
            }
        }
    }

    async fn sync_children(
        &self,
        context: &RunContext,
        run: &mut RunState,
        number: PullRequestNumber,
        github_pr_id: i64,
    ) {
        let repository = run.repository.clone();
        let locator = &context.locator;
        let per_page = context.per_page;

        run.enter(PipelineStage::FetchReviews);
        self.sync_pages(
            run,
            fetchers::reviews(self.client, locator, number, per_page),
            Some(number),
            |item| map_review(item, github_pr_id, &repository),
            RowBatch::Reviews,
        )
        .await;

        run.enter(PipelineStage::FetchComments);
        for comment_kind in [CommentKind::ReviewComment, CommentKind::IssueComment] {
            let pages = match comment_kind {
                CommentKind::ReviewComment => {
                    fetchers::review_comments(self.client, locator, number, per_page)
                }
                CommentKind::IssueComment => {
                    fetchers::issue_comments(self.client, locator, number, per_page)
                }
            };
            self.sync_pages(
                run,
                pages,
                Some(number),
                |item| map_comment(item, comment_kind, github_pr_id, &repository).map(Some),
                RowBatch::Comments,
            )
            .await;
        }

        debug!(repository = %repository, pr_number = number.get(), "synced pull request");
    }

    async fn sync_commits(&self, context: &RunContext, run: &mut RunState) {
        run.enter(PipelineStage::FetchCommits);
        let repository = run.repository.clone();
        self.sync_pages(
            run,
            fetchers::commits(self.client, &context.locator, context.per_page),
            None,
            |item| map_commit(item, &repository).map(Some),
            RowBatch::Commits,
        )
        .await;
    }

    /// Streams one resource unit page by page into the sink. A fetch or
    /// upsert failure ends the unit; mapping failures skip only the item.
    async fn sync_pages<R>(
        &self,
        run: &mut RunState,
        mut pages: ResourcePages<'_>,
        pr_number: Option<PullRequestNumber>,
        map: impl Fn(&Value) -> Result<Option<R>, MappingError>,
        wrap: fn(Vec<R>) -> RowBatch,
    ) {
        let kind = pages.endpoint().kind();
        let table = table_for(kind);
        let pr = pr_number.map(PullRequestNumber::get);

        loop {
            let items = match pages.next_page().await {
                Ok(Some(items)) => items,
                Ok(None) => return,
                Err(error) => {
                    run.record(FailureRecord {
                        kind,
                        pr_number: pr,
                        natural_ids: Vec::new(),
                        reason: error.to_string(),
                    });
                    return;
                }
            };

            run.summary.add_fetched(table, items.len());
            let mut rows = Vec::with_capacity(items.len());
            for item in &items {
                match map(item) {
                    Ok(Some(row)) => rows.push(row),
                    Ok(None) => {}
                    Err(error) => {
                        run.summary.add_failed(table, 1);
                        run.record(FailureRecord {
                            kind,
                            pr_number: pr,
                            natural_ids: raw_natural_id(item),
                            reason: error.to_string(),
                        });
                    }
                }
            }

            if rows.is_empty() {
                continue;
            }

            let batch = wrap(rows);
            match self.sink.upsert(&batch) {
                Ok(written) => run.summary.add_upserted(table, written),
                Err(error) => {
                    run.summary.add_failed(table, batch.len());
                    run.record(FailureRecord {
                        kind,
                        pr_number: pr,
                        natural_ids: error.natural_ids.clone(),
                        reason: error.to_string(),
                    });
                    return;
                }
            }
        }
    }
}

/// Table rows of `kind` are written to.
const fn table_for(kind: ResourceKind) -> Table {
    match kind {
        ResourceKind::PullRequests | ResourceKind::PullRequestDetail => Table::PullRequests,
        ResourceKind::Reviews => Table::Reviews,
        ResourceKind::ReviewComments | ResourceKind::IssueComments => Table::Comments,
        ResourceKind::Commits => Table::Commits,
    }
}
