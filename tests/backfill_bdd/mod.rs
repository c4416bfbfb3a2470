//! Support modules for the backfill BDD tests.

pub(crate) mod state;

pub(crate) use state::{BackfillState, run_backfill, stored_counts};
