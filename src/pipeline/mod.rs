//! Backfill run orchestration.

mod context;
mod orchestrator;
mod stage;
mod summary;


pub use context::RunContext;
pub use orchestrator::Orchestrator;
pub use stage::PipelineStage;
pub use summary::{FailureRecord, RunOutcome, RunSummary, TableCounts};
