//! Todo repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide the keyset page query that feeds todo enrichment.
//! - Provide CRUD over the `todo` table.
//!
//! # Invariants
//! - Loaded todos always carry `ActivityGroup::Ref`; resolving the reference
//!   is the service layer's job.
//! - Writes persist only the referenced activity id, never an embedded copy.

use super::{
    millis_to_timestamp, rows_changed_once, with_connection, Page, PageRequest, RepoError,
    RepoResult,
};
use crate::db::SharedConnection;
use crate::model::todo::{ActivityGroup, Todo, TodoId};
use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const ENTITY: &str = "todo";

const TODO_SELECT_SQL: &str = "SELECT
    id,
    activity_group_id,
    title,
    is_active,
    priority,
    created_at,
    updated_at
FROM todo";

/// Persistence capability for todos.
#[async_trait]
pub trait TodoStore: Send + Sync {
    /// Returns one keyset page ordered by `created_at`.
    ///
    /// A non-empty cursor that does not decode fails with
    /// `RepoError::BadParamInput` before any query runs.
    async fn fetch_page(&self, cursor: &str, page_size: i64) -> RepoResult<Page<Todo>>;
    async fn get_by_id(&self, id: TodoId) -> RepoResult<Todo>;
    async fn get_by_title(&self, title: &str) -> RepoResult<Todo>;
    /// Overwrites mutable columns of an existing row.
    async fn update(&self, todo: &Todo) -> RepoResult<()>;
    /// Inserts a new row and returns the store-assigned id.
    async fn store(&self, todo: &Todo) -> RepoResult<TodoId>;
    async fn delete(&self, id: TodoId) -> RepoResult<()>;
}

/// SQLite-backed todo repository.
#[derive(Clone)]
pub struct SqliteTodoRepository {
    conn: SharedConnection,
}

impl SqliteTodoRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl TodoStore for SqliteTodoRepository {
    async fn fetch_page(&self, cursor: &str, page_size: i64) -> RepoResult<Page<Todo>> {
        let request = PageRequest::parse(cursor, page_size)?;
        with_connection(&self.conn, move |conn| {
            let mut sql = String::from(TODO_SELECT_SQL);
            let mut bind_values: Vec<Value> = Vec::new();
            request.push_keyset_clause(&mut sql, &mut bind_values);

            let items = query_todos(conn, &sql, bind_values)?;
            Ok(request.finish(items, |todo| todo.created_at))
        })
        .await
    }

    async fn get_by_id(&self, id: TodoId) -> RepoResult<Todo> {
        with_connection(&self.conn, move |conn| {
            let sql = format!("{TODO_SELECT_SQL} WHERE id = ?");
            query_todos(conn, &sql, vec![Value::Integer(id)])?
                .into_iter()
                .next()
                .ok_or_else(|| RepoError::not_found(ENTITY, format!("id={id}")))
        })
        .await
    }

    async fn get_by_title(&self, title: &str) -> RepoResult<Todo> {
        let title = title.to_string();
        with_connection(&self.conn, move |conn| {
            let sql = format!("{TODO_SELECT_SQL} WHERE title = ? ORDER BY id ASC LIMIT 1");
            query_todos(conn, &sql, vec![Value::Text(title.clone())])?
                .into_iter()
                .next()
                .ok_or_else(|| RepoError::not_found(ENTITY, format!("title={title}")))
        })
        .await
    }

    async fn update(&self, todo: &Todo) -> RepoResult<()> {
        let todo = todo.clone();
        with_connection(&self.conn, move |conn| {
            let changed = conn.execute(
                "UPDATE todo
                 SET
                    activity_group_id = ?1,
                    title = ?2,
                    is_active = ?3,
                    priority = ?4,
                    updated_at = ?5
                 WHERE id = ?6;",
                params![
                    todo.activity_group.id(),
                    todo.title.as_str(),
                    todo.is_active,
                    todo.priority,
                    todo.updated_at.timestamp_millis(),
                    todo.id,
                ],
            )?;
            rows_changed_once(ENTITY, todo.id, changed)
        })
        .await
    }

    async fn store(&self, todo: &Todo) -> RepoResult<TodoId> {
        let todo = todo.clone();
        with_connection(&self.conn, move |conn| {
            conn.execute(
                "INSERT INTO todo (
                    activity_group_id,
                    title,
                    is_active,
                    priority,
                    created_at,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                params![
                    todo.activity_group.id(),
                    todo.title.as_str(),
                    todo.is_active,
                    todo.priority,
                    todo.created_at.timestamp_millis(),
                    todo.updated_at.timestamp_millis(),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    async fn delete(&self, id: TodoId) -> RepoResult<()> {
        with_connection(&self.conn, move |conn| {
            let affected = conn.execute("DELETE FROM todo WHERE id = ?1;", [id])?;
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

fn query_todos(conn: &Connection, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<Todo>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut todos = Vec::new();
    while let Some(row) = rows.next()? {
        todos.push(parse_todo_row(row)?);
    }
    Ok(todos)
}

fn parse_todo_row(row: &Row<'_>) -> RepoResult<Todo> {
    let is_active = match row.get::<_, i64>("is_active")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_active value `{other}` in todo.is_active"
            )));
        }
    };

    Ok(Todo {
        id: row.get("id")?,
        activity_group: ActivityGroup::Ref(row.get("activity_group_id")?),
        title: row.get("title")?,
        is_active,
        priority: row.get("priority")?,
        created_at: millis_to_timestamp(row.get("created_at")?, "todo.created_at")?,
        updated_at: millis_to_timestamp(row.get("updated_at")?, "todo.updated_at")?,
    })
}
