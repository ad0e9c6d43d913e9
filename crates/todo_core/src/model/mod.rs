//! Domain model for activity groups and the todos that reference them.
//!
//! # Responsibility
//! - Define the records shared by repository, service and CLI layers.
//! - Keep the todo -> activity reference explicit before and after enrichment.
//!
//! # Invariants
//! - Identifiers are assigned by the store; unsaved records carry `0`.
//! - Timestamps are UTC with millisecond precision, matching persistence.

pub mod activity;
pub mod todo;

use chrono::{DateTime, SubsecRound, Utc};

/// Timestamp type used by every persisted record and by pagination cursors.
pub type Timestamp = DateTime<Utc>;

/// Returns the current time truncated to the precision stored in SQLite.
pub fn now_millis() -> Timestamp {
    Utc::now().trunc_subsecs(3)
}
