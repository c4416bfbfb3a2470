//! Scenario state and the run harness for the backfill BDD tests.

use std::sync::Arc;
use std::time::{Duration, Instant};

use pr_backfill::persistence::{SqliteStore, Table};
use pr_backfill::pipeline::{Orchestrator, RunContext, RunSummary};
use pr_backfill::telemetry::NoopTelemetrySink;
use pr_backfill::telemetry::test_support::RecordingTelemetrySink;
use pr_backfill::{OctocrabApiClient, PersonalAccessToken, RepositoryLocator, RetryPolicy};
use rstest_bdd::Slot;
use rstest_bdd_macros::ScenarioState;
use tempfile::TempDir;
use wiremock::MockServer;

use crate::support::github::{OWNER, REPO};
use crate::support::runtime::{SharedRuntime, ensure_runtime_and_server};
use crate::support::{create_temp_dir, database_path};

#[derive(ScenarioState, Default)]
pub(crate) struct BackfillState {
    pub(crate) runtime: Slot<SharedRuntime>,
    pub(crate) server: Slot<MockServer>,
    pub(crate) temp_dir: Slot<TempDir>,
    pub(crate) database_url: Slot<String>,
    pub(crate) telemetry: Slot<Arc<RecordingTelemetrySink>>,
    pub(crate) summary: Slot<RunSummary>,
    pub(crate) elapsed: Slot<Duration>,
}

impl BackfillState {
    /// Runtime and mock server, creating both on first use.
    pub(crate) fn runtime(&self) -> SharedRuntime {
        ensure_runtime_and_server(&self.runtime, &self.server)
            .unwrap_or_else(|error| panic!("failed to start runtime and server: {error}"))
    }

    /// Database URL, creating a fresh temporary file on first use.
    pub(crate) fn database_url(&self) -> String {
        if let Some(url) = self.database_url.with_ref(Clone::clone) {
            return url;
        }
        let temp_dir = create_temp_dir();
        let url = database_path(&temp_dir);
        self.temp_dir.set(temp_dir);
        self.database_url.set(url.clone());
        url
    }

    /// Recording sink shared by the client and the orchestrator.
    pub(crate) fn telemetry(&self) -> Arc<RecordingTelemetrySink> {
        if let Some(sink) = self.telemetry.with_ref(Arc::clone) {
            return sink;
        }
        let sink = Arc::new(RecordingTelemetrySink::default());
        self.telemetry.set(Arc::clone(&sink));
        sink
    }
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_server_retries: 1,
        min_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
        max_rate_limit_waits: 3,
    }
}

/// Runs one complete backfill against the mock server and stores the
/// summary and elapsed time.
pub(crate) fn run_backfill(state: &BackfillState) {
    let runtime = state.runtime();
    let server_uri = state
        .server
        .with_ref(MockServer::uri)
        .unwrap_or_else(|| panic!("mock server not initialised"));
    let database_url = state.database_url();
    let telemetry = state.telemetry();

    let started = Instant::now();
    let summary = runtime.block_on(async {
        let locator = RepositoryLocator::with_api_base(&server_uri, OWNER, REPO)
            .unwrap_or_else(|error| panic!("invalid locator: {error}"));
        let token = PersonalAccessToken::new("test-token")
            .unwrap_or_else(|error| panic!("invalid token: {error}"));
        let client = OctocrabApiClient::new(&token, &locator)
            .unwrap_or_else(|error| panic!("failed to build client: {error}"))
            .with_retry_policy(fast_policy())
            .with_telemetry(telemetry.clone());
        let (store, _) = SqliteStore::open_and_migrate(&database_url, &NoopTelemetrySink)
            .unwrap_or_else(|error| panic!("failed to open store: {error}"));

        Orchestrator::new(&client, &store, telemetry.as_ref())
            .run(&RunContext::new(locator))
            .await
    });

    state.elapsed.set(started.elapsed());
    state.summary.set(summary);
}

/// Row counts in table order: pull requests, reviews, comments, commits.
pub(crate) fn stored_counts(state: &BackfillState) -> Vec<u64> {
    let store = SqliteStore::open(&state.database_url())
        .unwrap_or_else(|error| panic!("failed to reopen store: {error}"));
    Table::ALL
        .iter()
        .map(|table| {
            store
                .row_count(*table)
                .unwrap_or_else(|error| panic!("failed to count {table}: {error}"))
        })
        .collect()
}
