#![allow(dead_code)]

use async_trait::async_trait;
use chrono::DateTime;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use todo_core::db::{open_db_in_memory, share};
use todo_core::{
    Activity, ActivityId, ActivityStore, Page, RepoError, RepoResult, SqliteActivityRepository,
    SqliteTodoRepository, Timestamp, Todo, TodoId, TodoStore,
};

/// Fixed base time so tests control `created_at` ordering.
pub fn at(offset_secs: i64) -> Timestamp {
    DateTime::from_timestamp(1_700_000_000 + offset_secs, 0).unwrap()
}

pub fn activity(id: ActivityId) -> Activity {
    let mut activity = Activity::new(format!("activity {id}"), format!("group{id}@example.com"));
    activity.id = id;
    activity
}

pub fn todo(id: TodoId, activity_id: ActivityId, offset_secs: i64) -> Todo {
    let mut todo = Todo::new(activity_id, format!("todo {id}"));
    todo.id = id;
    todo.created_at = at(offset_secs);
    todo.updated_at = at(offset_secs);
    todo
}

pub fn sqlite_stores() -> (Arc<SqliteTodoRepository>, Arc<SqliteActivityRepository>) {
    let conn = share(open_db_in_memory().unwrap());
    (
        Arc::new(SqliteTodoRepository::new(conn.clone())),
        Arc::new(SqliteActivityRepository::new(conn)),
    )
}

/// Activity store double that records lookups and injects delays/failures.
#[derive(Default)]
pub struct FakeActivities {
    rows: HashMap<ActivityId, Activity>,
    delays: HashMap<ActivityId, Duration>,
    broken: HashSet<ActivityId>,
    default_delay: Duration,
    calls: Mutex<Vec<ActivityId>>,
    completed: Mutex<Vec<ActivityId>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeActivities {
    pub fn with_ids(ids: &[ActivityId]) -> Self {
        Self {
            rows: ids.iter().map(|&id| (id, activity(id))).collect(),
            ..Self::default()
        }
    }

    pub fn delay(mut self, id: ActivityId, delay: Duration) -> Self {
        self.delays.insert(id, delay);
        self
    }

    pub fn delay_all(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    /// Lookups for `id` fail with a storage error instead of `NotFound`.
    pub fn broken(mut self, id: ActivityId) -> Self {
        self.broken.insert(id);
        self
    }

    pub fn calls(&self) -> Vec<ActivityId> {
        let mut calls = self.calls.lock().unwrap().clone();
        calls.sort_unstable();
        calls
    }

    /// Ids whose lookup ran to the end instead of being cancelled.
    pub fn completed(&self) -> Vec<ActivityId> {
        let mut completed = self.completed.lock().unwrap().clone();
        completed.sort_unstable();
        completed
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ActivityStore for FakeActivities {
    async fn fetch_page(&self, _cursor: &str, _page_size: i64) -> RepoResult<Page<Activity>> {
        Ok(Page::empty())
    }

    async fn get_by_id(&self, id: ActivityId) -> RepoResult<Activity> {
        self.calls.lock().unwrap().push(id);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let delay = self.delays.get(&id).copied().unwrap_or(self.default_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.lock().unwrap().push(id);

        if self.broken.contains(&id) {
            return Err(RepoError::InvalidData(format!("corrupt activity row {id}")));
        }
        self.rows.get(&id).cloned().ok_or(RepoError::NotFound {
            entity: "activity",
            key: format!("id={id}"),
        })
    }

    async fn get_by_title(&self, title: &str) -> RepoResult<Activity> {
        Err(RepoError::NotFound {
            entity: "activity",
            key: format!("title={title}"),
        })
    }

    async fn update(&self, _activity: &Activity) -> RepoResult<()> {
        Err(RepoError::Worker("read-only fake".to_string()))
    }

    async fn store(&self, _activity: &Activity) -> RepoResult<ActivityId> {
        Err(RepoError::Worker("read-only fake".to_string()))
    }

    async fn delete(&self, _id: ActivityId) -> RepoResult<()> {
        Err(RepoError::Worker("read-only fake".to_string()))
    }
}

/// Todo store double serving one fixed page.
pub struct FakeTodos {
    page: Vec<Todo>,
    next_cursor: String,
}

impl FakeTodos {
    pub fn new(page: Vec<Todo>, next_cursor: &str) -> Self {
        Self {
            page,
            next_cursor: next_cursor.to_string(),
        }
    }
}

#[async_trait]
impl TodoStore for FakeTodos {
    async fn fetch_page(&self, _cursor: &str, _page_size: i64) -> RepoResult<Page<Todo>> {
        Ok(Page {
            items: self.page.clone(),
            next_cursor: self.next_cursor.clone(),
        })
    }

    async fn get_by_id(&self, id: TodoId) -> RepoResult<Todo> {
        self.page
            .iter()
            .find(|todo| todo.id == id)
            .cloned()
            .ok_or(RepoError::NotFound {
                entity: "todo",
                key: format!("id={id}"),
            })
    }

    async fn get_by_title(&self, title: &str) -> RepoResult<Todo> {
        self.page
            .iter()
            .find(|todo| todo.title == title)
            .cloned()
            .ok_or(RepoError::NotFound {
                entity: "todo",
                key: format!("title={title}"),
            })
    }

    async fn update(&self, _todo: &Todo) -> RepoResult<()> {
        Err(RepoError::Worker("read-only fake".to_string()))
    }

    async fn store(&self, _todo: &Todo) -> RepoResult<TodoId> {
        Err(RepoError::Worker("read-only fake".to_string()))
    }

    async fn delete(&self, _id: TodoId) -> RepoResult<()> {
        Err(RepoError::Worker("read-only fake".to_string()))
    }
}
