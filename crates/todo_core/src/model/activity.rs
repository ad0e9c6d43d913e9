//! Activity group domain model.
//!
//! An activity is the parent record a todo points at through
//! `Todo::activity_group`.

use super::{now_millis, Timestamp};
use serde::{Deserialize, Serialize};

/// Store-assigned identifier of an activity group.
pub type ActivityId = i64;

/// Parent record grouping todos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    /// Store-assigned id; `0` until the record is stored.
    pub id: ActivityId,
    pub email: String,
    pub title: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Activity {
    /// Creates an unsaved activity stamped with the current time.
    pub fn new(title: impl Into<String>, email: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: 0,
            email: email.into(),
            title: title.into(),
            created_at: now,
            updated_at: now,
        }
    }
}
