//! Terminal report of a backfill run.

use std::collections::BTreeMap;
use std::fmt;

use crate::github::ResourceKind;
use crate::persistence::Table;

/// Row counters for one table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCounts {
    /// Items received from GitHub.
    pub fetched: u64,
    /// Rows written to the store.
    pub upserted: u64,
    /// Items that could not be mapped or written.
    pub failed: u64,
}

/// One thing that went wrong without stopping the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    /// Resource kind being fetched or written.
    pub kind: ResourceKind,
    /// Owning pull request, when the failure is scoped to one.
    pub pr_number: Option<u64>,
    /// Natural ids of the affected rows, when known.
    pub natural_ids: Vec<String>,
    /// Human-readable cause.
    pub reason: String,
}

impl fmt::Display for FailureRecord {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.kind)?;
        if let Some(number) = self.pr_number {
            write!(formatter, " for #{number}")?;
        }
        if !self.natural_ids.is_empty() {
            write!(formatter, " [{}]", self.natural_ids.join(", "))?;
        }
        write!(formatter, ": {}", self.reason)
    }
}

/// How the run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every stage ran; individual failures may still be recorded.
    Completed,
    /// The pull request listing failed so nothing downstream could run.
    Aborted {
        /// Why the run stopped.
        reason: String,
    },
}

impl RunOutcome {
    /// `completed` or `aborted`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Aborted { .. } => "aborted",
        }
    }
}

/// Per-table counts, failures and outcome of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    repository: String,
    counts: BTreeMap<Table, TableCounts>,
    failures: Vec<FailureRecord>,
    outcome: RunOutcome,
}

impl RunSummary {
    /// Starts an empty summary for `repository` (`owner/repo`).
    #[must_use]
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            counts: Table::ALL
                .into_iter()
                .map(|table| (table, TableCounts::default()))
                .collect(),
            failures: Vec::new(),
            outcome: RunOutcome::Completed,
        }
    }

    /// `owner/repo` this run backfilled.
    #[must_use]
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Counters for `table`.
    #[must_use]
    pub fn counts(&self, table: Table) -> TableCounts {
        self.counts.get(&table).copied().unwrap_or_default()
    }

    /// Failures recorded during the run, in the order they happened.
    #[must_use]
    pub fn failures(&self) -> &[FailureRecord] {
        &self.failures
    }

    /// How the run ended.
    #[must_use]
    pub const fn outcome(&self) -> &RunOutcome {
        &self.outcome
    }

    /// Returns true when the run stopped early.
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        matches!(self.outcome, RunOutcome::Aborted { .. })
    }

    /// Rows written across every table.
    #[must_use]
    pub fn total_upserted(&self) -> u64 {
        self.counts.values().map(|counts| counts.upserted).sum()
    }

    fn entry(&mut self, table: Table) -> &mut TableCounts {
        self.counts.entry(table).or_default()
    }

    pub(crate) fn add_fetched(&mut self, table: Table, count: usize) {
        let counts = self.entry(table);
        counts.fetched = counts.fetched.saturating_add(widen(count));
    }

    pub(crate) fn add_upserted(&mut self, table: Table, count: usize) {
        let counts = self.entry(table);
        counts.upserted = counts.upserted.saturating_add(widen(count));
    }

    pub(crate) fn add_failed(&mut self, table: Table, count: usize) {
        let counts = self.entry(table);
        counts.failed = counts.failed.saturating_add(widen(count));
    }

    pub(crate) fn push_failure(&mut self, failure: FailureRecord) {
        self.failures.push(failure);
    }

    pub(crate) fn abort(&mut self, reason: String) {
        self.outcome = RunOutcome::Aborted { reason };
    }
}

fn widen(count: usize) -> u64 {
    u64::try_from(count).unwrap_or(u64::MAX)
}

impl fmt::Display for RunSummary {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            formatter,
            "Backfill of {} {}",
            self.repository,
            self.outcome.as_str()
        )?;
        if let RunOutcome::Aborted { reason } = &self.outcome {
            writeln!(formatter, "  reason: {reason}")?;
        }
        for (table, counts) in &self.counts {
            writeln!(
                formatter,
                "  {:<22} fetched {:>6}  upserted {:>6}  failed {:>4}",
                table.name(),
                counts.fetched,
                counts.upserted,
                counts.failed
            )?;
        }
        if !self.failures.is_empty() {
            writeln!(formatter, "Failures ({}):", self.failures.len())?;
            for failure in &self.failures {
                writeln!(formatter, "  - {failure}")?;
            }
        }
        Ok(())
    }
}
