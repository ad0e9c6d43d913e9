//! Activity use-case service.
//!
//! # Responsibility
//! - Provide paged listing and CRUD entry points for activity groups.
//! - Enforce title uniqueness before store and existence before delete.
//!
//! # Invariants
//! - Every call runs under one deadline from `ServiceSettings`.
//! - `updated_at` is stamped here, never trusted from callers on update.

use super::{normalize_page_size, within, ServiceError, ServiceSettings};
use crate::model::activity::{Activity, ActivityId};
use crate::model::now_millis;
use crate::repo::{ActivityStore, Page};
use log::{debug, info};
use std::sync::Arc;

/// Activity service facade over an `ActivityStore`.
pub struct ActivityService<A: ?Sized> {
    store: Arc<A>,
    settings: ServiceSettings,
}

impl<A> ActivityService<A>
where
    A: ActivityStore + ?Sized,
{
    pub fn new(store: Arc<A>, settings: ServiceSettings) -> Self {
        Self { store, settings }
    }

    /// Lists one keyset page of activities. `num == 0` uses the default size.
    pub async fn fetch(&self, cursor: &str, num: i64) -> Result<Page<Activity>, ServiceError> {
        let deadline = self.settings.deadline();
        let page = within(deadline, self.store.fetch_page(cursor, normalize_page_size(num))).await?;
        Ok(page)
    }

    pub async fn get_by_id(&self, id: ActivityId) -> Result<Activity, ServiceError> {
        let deadline = self.settings.deadline();
        Ok(within(deadline, self.store.get_by_id(id)).await?)
    }

    pub async fn get_by_title(&self, title: &str) -> Result<Activity, ServiceError> {
        let deadline = self.settings.deadline();
        Ok(within(deadline, self.store.get_by_title(title)).await?)
    }

    /// Persists field changes and stamps `updated_at`.
    ///
    /// Existence is not re-checked; a missing row surfaces as `NotFound`
    /// from the store.
    pub async fn update(&self, activity: &mut Activity) -> Result<(), ServiceError> {
        let deadline = self.settings.deadline();
        activity.updated_at = now_millis();
        within(deadline, self.store.update(activity)).await?;
        info!(
            "event=activity_update module=service status=ok id={}",
            activity.id
        );
        Ok(())
    }

    /// Stores a new activity and writes the assigned id back into `activity`.
    ///
    /// # Errors
    /// - `Conflict` when an activity with the same title exists.
    ///
    /// A failing uniqueness lookup is tolerated; the insert still runs.
    pub async fn store(&self, activity: &mut Activity) -> Result<(), ServiceError> {
        let deadline = self.settings.deadline();
        match within(deadline, self.store.get_by_title(&activity.title)).await {
            Ok(existing) => {
                debug!(
                    "event=activity_store module=service status=conflict existing_id={}",
                    existing.id
                );
                return Err(ServiceError::Conflict {
                    entity: "activity",
                    title: activity.title.clone(),
                });
            }
            Err(err) => {
                debug!("event=activity_store_precheck module=service status=skipped reason={err}");
            }
        }

        activity.id = within(deadline, self.store.store(activity)).await?;
        info!(
            "event=activity_store module=service status=ok id={}",
            activity.id
        );
        Ok(())
    }

    /// Deletes an existing activity.
    ///
    /// # Errors
    /// - `NotFound` when no activity has this id.
    /// - `Store(UnexpectedRowCount)` when the delete touches other than one row.
    pub async fn delete(&self, id: ActivityId) -> Result<(), ServiceError> {
        let deadline = self.settings.deadline();
        within(deadline, self.store.get_by_id(id)).await?;
        within(deadline, self.store.delete(id)).await?;
        info!("event=activity_delete module=service status=ok id={id}");
        Ok(())
    }
}
