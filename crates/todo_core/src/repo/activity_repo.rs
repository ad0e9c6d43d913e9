//! Activity repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Resolve single activities by id for todo enrichment.
//! - Provide keyset-paged listing and CRUD over the `activity` table.
//!
//! # Invariants
//! - `get_by_id` may be called concurrently from many tasks on one handle.
//! - Missing rows surface as `RepoError::NotFound`, never as default records.

use super::{
    millis_to_timestamp, rows_changed_once, with_connection, Page, PageRequest, RepoError,
    RepoResult,
};
use crate::db::SharedConnection;
use crate::model::activity::{Activity, ActivityId};
use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const ENTITY: &str = "activity";

const ACTIVITY_SELECT_SQL: &str = "SELECT
    id,
    email,
    title,
    created_at,
    updated_at
FROM activity";

/// Persistence capability for activity groups.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Returns one keyset page ordered by `created_at`.
    async fn fetch_page(&self, cursor: &str, page_size: i64) -> RepoResult<Page<Activity>>;
    /// Resolves one activity by id.
    async fn get_by_id(&self, id: ActivityId) -> RepoResult<Activity>;
    /// Returns the first activity with exactly this title.
    async fn get_by_title(&self, title: &str) -> RepoResult<Activity>;
    /// Overwrites email, title and `updated_at` of an existing row.
    async fn update(&self, activity: &Activity) -> RepoResult<()>;
    /// Inserts a new row and returns the store-assigned id.
    async fn store(&self, activity: &Activity) -> RepoResult<ActivityId>;
    /// Removes one row by id.
    async fn delete(&self, id: ActivityId) -> RepoResult<()>;
}

/// SQLite-backed activity repository.
#[derive(Clone)]
pub struct SqliteActivityRepository {
    conn: SharedConnection,
}

impl SqliteActivityRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl ActivityStore for SqliteActivityRepository {
    async fn fetch_page(&self, cursor: &str, page_size: i64) -> RepoResult<Page<Activity>> {
        let request = PageRequest::parse(cursor, page_size)?;
        with_connection(&self.conn, move |conn| {
            let mut sql = String::from(ACTIVITY_SELECT_SQL);
            let mut bind_values: Vec<Value> = Vec::new();
            request.push_keyset_clause(&mut sql, &mut bind_values);

            let items = query_activities(conn, &sql, bind_values)?;
            Ok(request.finish(items, |activity| activity.created_at))
        })
        .await
    }

    async fn get_by_id(&self, id: ActivityId) -> RepoResult<Activity> {
        with_connection(&self.conn, move |conn| {
            let sql = format!("{ACTIVITY_SELECT_SQL} WHERE id = ?");
            query_activities(conn, &sql, vec![Value::Integer(id)])?
                .into_iter()
                .next()
                .ok_or_else(|| RepoError::not_found(ENTITY, format!("id={id}")))
        })
        .await
    }

    async fn get_by_title(&self, title: &str) -> RepoResult<Activity> {
        let title = title.to_string();
        with_connection(&self.conn, move |conn| {
            let sql = format!("{ACTIVITY_SELECT_SQL} WHERE title = ? ORDER BY id ASC LIMIT 1");
            query_activities(conn, &sql, vec![Value::Text(title.clone())])?
                .into_iter()
                .next()
                .ok_or_else(|| RepoError::not_found(ENTITY, format!("title={title}")))
        })
        .await
    }

    async fn update(&self, activity: &Activity) -> RepoResult<()> {
        let activity = activity.clone();
        with_connection(&self.conn, move |conn| {
            let changed = conn.execute(
                "UPDATE activity
                 SET
                    email = ?1,
                    title = ?2,
                    updated_at = ?3
                 WHERE id = ?4;",
                params![
                    activity.email.as_str(),
                    activity.title.as_str(),
                    activity.updated_at.timestamp_millis(),
                    activity.id,
                ],
            )?;
            rows_changed_once(ENTITY, activity.id, changed)
        })
        .await
    }

    async fn store(&self, activity: &Activity) -> RepoResult<ActivityId> {
        let activity = activity.clone();
        with_connection(&self.conn, move |conn| {
            conn.execute(
                "INSERT INTO activity (
                    email,
                    title,
                    created_at,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?4);",
                params![
                    activity.email.as_str(),
                    activity.title.as_str(),
                    activity.created_at.timestamp_millis(),
                    activity.updated_at.timestamp_millis(),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    async fn delete(&self, id: ActivityId) -> RepoResult<()> {
        with_connection(&self.conn, move |conn| {
            let affected = conn.execute("DELETE FROM activity WHERE id = ?1;", [id])?;
            if affected != 1 {
                return Err(RepoError::UnexpectedRowCount {
                    entity: ENTITY,
                    affected,
                });
            }
            Ok(())
        })
        .await
    }
}

fn query_activities(
    conn: &Connection,
    sql: &str,
    bind_values: Vec<Value>,
) -> RepoResult<Vec<Activity>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut activities = Vec::new();
    while let Some(row) = rows.next()? {
        activities.push(parse_activity_row(row)?);
    }
    Ok(activities)
}

fn parse_activity_row(row: &Row<'_>) -> RepoResult<Activity> {
    Ok(Activity {
        id: row.get("id")?,
        email: row.get("email")?,
        title: row.get("title")?,
        created_at: millis_to_timestamp(row.get("created_at")?, "activity.created_at")?,
        updated_at: millis_to_timestamp(row.get("updated_at")?, "activity.updated_at")?,
    })
}
