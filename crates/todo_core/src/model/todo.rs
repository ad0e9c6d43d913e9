//! Todo domain model.
//!
//! # Responsibility
//! - Define the child record and its reference to an activity group.
//!
//! # Invariants
//! - `ActivityGroup::Resolved(a)` always satisfies `a.id == ` the id the todo
//!   referenced before enrichment.
//! - A todo whose reference could not be resolved keeps `ActivityGroup::Ref`.

use super::activity::{Activity, ActivityId};
use super::{now_millis, Timestamp};
use serde::{Deserialize, Serialize};

/// Store-assigned identifier of a todo.
pub type TodoId = i64;

/// Reference from a todo to its activity group.
///
/// Serialized untagged: a bare id before enrichment, the full activity after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActivityGroup {
    /// Reference as loaded from storage.
    Ref(ActivityId),
    /// Reference replaced by the resolved parent record.
    Resolved(Activity),
}

impl ActivityGroup {
    /// Returns the referenced activity id regardless of resolution state.
    pub fn id(&self) -> ActivityId {
        match self {
            Self::Ref(id) => *id,
            Self::Resolved(activity) => activity.id,
        }
    }

    /// Returns the resolved activity, if enrichment has happened.
    pub fn resolved(&self) -> Option<&Activity> {
        match self {
            Self::Ref(_) => None,
            Self::Resolved(activity) => Some(activity),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// Child record referencing one activity group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    /// Store-assigned id; `0` until the record is stored.
    pub id: TodoId,
    #[serde(rename = "activity_group_id")]
    pub activity_group: ActivityGroup,
    pub title: String,
    pub is_active: bool,
    pub priority: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Todo {
    /// Creates an unsaved, active todo with default priority.
    pub fn new(activity_id: ActivityId, title: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: 0,
            activity_group: ActivityGroup::Ref(activity_id),
            title: title.into(),
            is_active: true,
            priority: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces the activity reference with the resolved record.
    ///
    /// Ignored when `activity.id` does not match the current reference.
    pub fn resolve_activity(&mut self, activity: Activity) -> bool {
        if activity.id != self.activity_group.id() {
            return false;
        }
        self.activity_group = ActivityGroup::Resolved(activity);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{ActivityGroup, Todo};
    use crate::model::activity::Activity;

    #[test]
    fn resolve_activity_keeps_reference_id() {
        let mut todo = Todo::new(5, "write report");
        let mut activity = Activity::new("work", "team@example.com");
        activity.id = 5;

        assert!(todo.resolve_activity(activity.clone()));
        assert_eq!(todo.activity_group.id(), 5);
        assert_eq!(todo.activity_group.resolved(), Some(&activity));
    }

    #[test]
    fn resolve_activity_rejects_mismatched_id() {
        let mut todo = Todo::new(5, "write report");
        let mut activity = Activity::new("home", "me@example.com");
        activity.id = 7;

        assert!(!todo.resolve_activity(activity));
        assert_eq!(todo.activity_group, ActivityGroup::Ref(5));
    }

    #[test]
    fn activity_group_serializes_untagged() {
        let todo = Todo::new(9, "call");
        let json = serde_json::to_value(&todo).unwrap();
        assert_eq!(json["activity_group_id"], serde_json::json!(9));
    }
}
