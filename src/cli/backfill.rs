//! Full backfill of one repository.

use std::sync::Arc;

use pr_backfill::github::rate_limit::RateLimitGate;
use pr_backfill::persistence::SqliteStore;
use pr_backfill::pipeline::{Orchestrator, RunSummary};
use pr_backfill::telemetry::{StderrJsonlTelemetrySink, TelemetrySink};
use pr_backfill::{BackfillConfig, BackfillError, OctocrabApiClient};
use tracing::info;

use super::migrations::map_persistence_error;

/// Resolves configuration, prepares the store and runs the pipeline.
///
/// Pending migrations are applied before the first request so a fresh
/// database path works without a separate `--migrate-db` invocation.
///
/// # Errors
///
/// Returns a [`BackfillError`] for configuration problems, store setup
/// failures, or when the GitHub client cannot be built. Failures during the
/// run itself are reported in the returned [`RunSummary`].
pub async fn run(config: &BackfillConfig) -> Result<RunSummary, BackfillError> {
    let context = config.run_context()?;
    let token = config.resolve_token()?;
    let database_url = config.resolve_database_url()?;

    let telemetry: Arc<dyn TelemetrySink> = Arc::new(StderrJsonlTelemetrySink);
    let (store, schema_version) = SqliteStore::open_and_migrate(&database_url, telemetry.as_ref())
        .map_err(map_persistence_error)?;
    info!(
        schema_version = schema_version.as_str(),
        "history store ready"
    );

    let client = OctocrabApiClient::new(&token, &context.locator)?
        .with_retry_policy(config.retry_policy())
        .with_telemetry(Arc::clone(&telemetry));

    let orchestrator = Orchestrator::new(&client, &store, telemetry.as_ref());
    let summary = orchestrator.run(&context).await;
    log_request_budget(client.gate()).await;
    Ok(summary)
}

/// Logs how many requests the run issued and the last budget GitHub
/// reported. Returns the request count.
async fn log_request_budget(gate: &RateLimitGate) -> u64 {
    let requests = gate.calls().await;
    match gate.latest().await {
        Some(budget) => info!(
            requests,
            rate_limit = budget.limit(),
            rate_limit_remaining = budget.remaining(),
            rate_limit_reset_at = budget.reset_at(),
            "GitHub request budget"
        ),
        None => info!(requests, "GitHub request budget"),
    }
    requests
}
