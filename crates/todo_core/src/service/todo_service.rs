//! Todo use-case service.
//!
//! # Responsibility
//! - Fetch keyset pages of todos and enrich them with their activity groups.
//! - Resolve the activity of single todos fetched by id or title.
//! - Guard store/delete with uniqueness and existence checks.
//!
//! # Invariants
//! - Page fetch never fails because of enrichment: an unenriched page is
//!   returned with an empty `next_cursor` so callers do not advance past it.
//! - Single-record reads fail when their activity cannot be resolved.
//! - One deadline covers the page query and the whole enrichment pass.

use super::enrichment::enrich_page;
use super::{normalize_page_size, within, ServiceError, ServiceSettings};
use crate::model::now_millis;
use crate::model::todo::{Todo, TodoId};
use crate::repo::{ActivityStore, Page, RepoResult, TodoStore};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Instant as StdInstant;
use tokio::time::Instant;

/// Result of a todo page fetch.
#[derive(Debug)]
pub struct TodoPage {
    /// Todos ordered ascending by `created_at`.
    pub todos: Vec<Todo>,
    /// Cursor for the next page; empty at the end of data or when
    /// enrichment failed.
    pub next_cursor: String,
    /// Cause of a failed enrichment pass, when one happened.
    pub enrichment_error: Option<ServiceError>,
}

/// Todo service facade over todo and activity stores.
pub struct TodoService<T: ?Sized, A: ?Sized> {
    todos: Arc<T>,
    activities: Arc<A>,
    settings: ServiceSettings,
}

impl<T, A> TodoService<T, A>
where
    T: TodoStore + ?Sized,
    A: ActivityStore + ?Sized + 'static,
{
    pub fn new(todos: Arc<T>, activities: Arc<A>, settings: ServiceSettings) -> Self {
        Self {
            todos,
            activities,
            settings,
        }
    }

    /// Fetches one page of todos with resolved activity groups.
    ///
    /// `num == 0` uses the default page size.
    ///
    /// # Errors
    /// - `BadParamInput` for an undecodable cursor or negative size.
    /// - `Store` when the page query fails or times out.
    ///
    /// Enrichment failures are reported through `TodoPage::enrichment_error`
    /// and a cleared `next_cursor`, never as `Err`.
    pub async fn fetch(&self, cursor: &str, num: i64) -> Result<TodoPage, ServiceError> {
        let started_at = StdInstant::now();
        let deadline = self.settings.deadline();
        let Page {
            items: mut todos,
            next_cursor,
        } = within(deadline, self.todos.fetch_page(cursor, normalize_page_size(num))).await?;

        match enrich_page(
            &self.activities,
            &mut todos,
            deadline,
            self.settings.max_concurrent_lookups,
        )
        .await
        {
            Ok(()) => {
                debug!(
                    "event=todo_fetch module=service status=ok rows={} has_next={} duration_ms={}",
                    todos.len(),
                    !next_cursor.is_empty(),
                    started_at.elapsed().as_millis()
                );
                Ok(TodoPage {
                    todos,
                    next_cursor,
                    enrichment_error: None,
                })
            }
            Err(err) => {
                warn!(
                    "event=todo_fetch module=service status=degraded rows={} duration_ms={} error={err}",
                    todos.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(TodoPage {
                    todos,
                    next_cursor: String::new(),
                    enrichment_error: Some(err.into()),
                })
            }
        }
    }

    /// Gets one todo by id with its activity resolved.
    pub async fn get_by_id(&self, id: TodoId) -> Result<Todo, ServiceError> {
        let deadline = self.settings.deadline();
        let todo = within(deadline, self.todos.get_by_id(id)).await?;
        Ok(self.resolve_single(todo, deadline).await?)
    }

    /// Gets the first todo with exactly this title, activity resolved.
    pub async fn get_by_title(&self, title: &str) -> Result<Todo, ServiceError> {
        let deadline = self.settings.deadline();
        let todo = within(deadline, self.todos.get_by_title(title)).await?;
        Ok(self.resolve_single(todo, deadline).await?)
    }

    /// Persists field changes and stamps `updated_at`.
    ///
    /// Existence is not re-checked; a missing row surfaces as `NotFound`
    /// from the store.
    pub async fn update(&self, todo: &mut Todo) -> Result<(), ServiceError> {
        let deadline = self.settings.deadline();
        todo.updated_at = now_millis();
        within(deadline, self.todos.update(todo)).await?;
        info!("event=todo_update module=service status=ok id={}", todo.id);
        Ok(())
    }

    /// Flips `is_active` on a stored todo and stamps `updated_at`.
    ///
    /// The row is loaded without resolving its activity, so todos whose
    /// activity is gone can still be completed or reopened.
    pub async fn set_active(&self, id: TodoId, is_active: bool) -> Result<Todo, ServiceError> {
        let deadline = self.settings.deadline();
        let mut todo = within(deadline, self.todos.get_by_id(id)).await?;
        todo.is_active = is_active;
        todo.updated_at = now_millis();
        within(deadline, self.todos.update(&todo)).await?;
        info!("event=todo_set_active module=service status=ok id={id} is_active={is_active}");
        Ok(todo)
    }

    /// Stores a new todo and writes the assigned id back into `todo`.
    ///
    /// # Errors
    /// - `Conflict` when a todo with the same title exists.
    ///
    /// A failing uniqueness lookup is tolerated; the insert still runs.
    pub async fn store(&self, todo: &mut Todo) -> Result<(), ServiceError> {
        let deadline = self.settings.deadline();
        match within(deadline, self.todos.get_by_title(&todo.title)).await {
            Ok(existing) => {
                debug!(
                    "event=todo_store module=service status=conflict existing_id={}",
                    existing.id
                );
                return Err(ServiceError::Conflict {
                    entity: "todo",
                    title: todo.title.clone(),
                });
            }
            Err(err) => {
                debug!("event=todo_store_precheck module=service status=skipped reason={err}");
            }
        }

        todo.id = within(deadline, self.todos.store(todo)).await?;
        info!("event=todo_store module=service status=ok id={}", todo.id);
        Ok(())
    }

    /// Deletes an existing todo.
    ///
    /// # Errors
    /// - `NotFound` when no todo has this id.
    /// - `Store(UnexpectedRowCount)` when the delete touches other than one row.
    pub async fn delete(&self, id: TodoId) -> Result<(), ServiceError> {
        let deadline = self.settings.deadline();
        within(deadline, self.todos.get_by_id(id)).await?;
        within(deadline, self.todos.delete(id)).await?;
        info!("event=todo_delete module=service status=ok id={id}");
        Ok(())
    }

    async fn resolve_single(&self, mut todo: Todo, deadline: Instant) -> RepoResult<Todo> {
        let activity = within(deadline, self.activities.get_by_id(todo.activity_group.id())).await?;
        todo.resolve_activity(activity);
        Ok(todo)
    }
}
