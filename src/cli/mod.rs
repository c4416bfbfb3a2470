//! CLI operation handlers.
//!
//! - [`backfill`]: fetch the repository history and upsert it
//! - [`migrations`]: database schema migrations only
//!
//! Summary rendering lives in [`output`].

pub mod backfill;
pub mod migrations;
pub mod output;
