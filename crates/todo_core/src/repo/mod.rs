//! Repository contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define the narrow async capabilities the services consume
//!   (`ActivityStore`, `TodoStore`).
//! - Own keyset pagination: cursor decoding, boundary query, next cursor.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Pages are ordered by `created_at ASC, id ASC`.
//! - `Page::next_cursor` is non-empty only for full pages.
//! - Every store is safe to call concurrently through a shared `Arc`.

pub mod activity_repo;
pub mod todo_repo;

use crate::cursor::{decode_cursor, encode_cursor};
use crate::db::{DbError, SharedConnection};
use crate::model::Timestamp;
use chrono::DateTime;
use log::warn;
use rusqlite::types::Value;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tokio::task;

pub use activity_repo::{ActivityStore, SqliteActivityRepository};
pub use todo_repo::{SqliteTodoRepository, TodoStore};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by activity and todo stores.
#[derive(Debug)]
pub enum RepoError {
    /// Caller supplied an unusable cursor or page size.
    BadParamInput(String),
    /// No row matched the lookup key.
    NotFound {
        entity: &'static str,
        key: String,
    },
    /// Underlying SQLite failure.
    Db(DbError),
    /// Persisted row could not be mapped back into the model.
    InvalidData(String),
    /// A write touched a number of rows other than one.
    UnexpectedRowCount {
        entity: &'static str,
        affected: usize,
    },
    /// The operation deadline passed before the store answered.
    DeadlineExceeded,
    /// A blocking worker or lookup task failed to complete.
    Worker(String),
}

impl RepoError {
    pub(crate) fn not_found(entity: &'static str, key: impl Display) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadParamInput(message) => write!(f, "bad request parameter: {message}"),
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::UnexpectedRowCount { entity, affected } => {
                write!(f, "unexpected {entity} row count: {affected} rows affected")
            }
            Self::DeadlineExceeded => write!(f, "store deadline exceeded"),
            Self::Worker(message) => write!(f, "store worker failed: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// One keyset page of records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Records ordered ascending by `created_at`.
    pub items: Vec<T>,
    /// Cursor for the next page; empty when this page was not full.
    pub next_cursor: String,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: String::new(),
        }
    }
}

/// Parsed page request: optional lower boundary plus row limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PageRequest {
    pub after: Option<Timestamp>,
    pub limit: i64,
}

impl PageRequest {
    /// Validates raw caller input without touching the store.
    ///
    /// An empty cursor means "from the start"; `page_size` is used as given.
    pub fn parse(cursor: &str, page_size: i64) -> RepoResult<Self> {
        if page_size < 0 {
            return Err(RepoError::BadParamInput(format!(
                "page size must not be negative, got {page_size}"
            )));
        }

        let after = if cursor.is_empty() {
            None
        } else {
            match decode_cursor(cursor) {
                Ok(boundary) => Some(boundary),
                Err(err) => {
                    warn!("event=page_cursor module=repo status=rejected error={err}");
                    return Err(RepoError::BadParamInput(err.to_string()));
                }
            }
        };

        Ok(Self {
            after,
            limit: page_size,
        })
    }

    /// Appends the keyset predicate, ordering and limit to `sql`.
    ///
    /// Stored timestamps are whole milliseconds, so `created_at > floor(t)`
    /// is exactly "strictly after `t`".
    pub fn push_keyset_clause(&self, sql: &mut String, bind_values: &mut Vec<Value>) {
        if let Some(after) = self.after {
            sql.push_str(" WHERE created_at > ?");
            bind_values.push(Value::Integer(after.timestamp_millis()));
        }
        sql.push_str(" ORDER BY created_at ASC, id ASC LIMIT ?");
        bind_values.push(Value::Integer(self.limit));
    }

    /// Wraps fetched rows, computing the next cursor for full pages only.
    pub fn finish<T>(&self, items: Vec<T>, created_at: impl Fn(&T) -> Timestamp) -> Page<T> {
        let full = self.limit > 0 && items.len() as i64 == self.limit;
        let next_cursor = match items.last() {
            Some(last) if full => encode_cursor(created_at(last)),
            _ => String::new(),
        };
        Page { items, next_cursor }
    }
}

/// Runs a synchronous SQLite operation on the blocking pool.
///
/// The connection lock is held only inside the worker thread.
pub(crate) async fn with_connection<T, F>(conn: &SharedConnection, op: F) -> RepoResult<T>
where
    T: Send + 'static,
    F: FnOnce(&Connection) -> RepoResult<T> + Send + 'static,
{
    let conn = Arc::clone(conn);
    task::spawn_blocking(move || {
        let guard = conn.lock();
        op(&*guard)
    })
    .await
    .map_err(|err| RepoError::Worker(err.to_string()))?
}

pub(crate) fn millis_to_timestamp(value: i64, column: &str) -> RepoResult<Timestamp> {
    DateTime::from_timestamp_millis(value).ok_or_else(|| {
        RepoError::InvalidData(format!("timestamp `{value}` out of range in {column}"))
    })
}

pub(crate) fn rows_changed_once(entity: &'static str, key: i64, affected: usize) -> RepoResult<()> {
    match affected {
        1 => Ok(()),
        0 => Err(RepoError::not_found(entity, format!("id={key}"))),
        other => Err(RepoError::UnexpectedRowCount {
            entity,
            affected: other,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{PageRequest, RepoError};
    use crate::cursor::{decode_cursor, encode_cursor};
    use chrono::DateTime;
    use rusqlite::types::Value;

    #[test]
    fn empty_cursor_has_no_boundary() {
        let request = PageRequest::parse("", 10).unwrap();
        assert_eq!(request.after, None);

        let mut sql = String::from("SELECT id FROM todo");
        let mut binds = Vec::new();
        request.push_keyset_clause(&mut sql, &mut binds);
        assert!(!sql.contains("WHERE"));
        assert_eq!(binds, vec![Value::Integer(10)]);
    }

    #[test]
    fn garbage_cursor_is_bad_param_input() {
        let err = PageRequest::parse("%%%", 10).unwrap_err();
        assert!(matches!(err, RepoError::BadParamInput(_)));
    }

    #[test]
    fn negative_page_size_is_bad_param_input() {
        let err = PageRequest::parse("", -1).unwrap_err();
        assert!(matches!(err, RepoError::BadParamInput(_)));
    }

    #[test]
    fn boundary_binds_floored_millis() {
        let boundary = DateTime::from_timestamp(10, 5_300_000).unwrap();
        let request = PageRequest::parse(&encode_cursor(boundary), 3).unwrap();

        let mut sql = String::new();
        let mut binds = Vec::new();
        request.push_keyset_clause(&mut sql, &mut binds);
        assert!(sql.contains("created_at > ?"));
        assert_eq!(binds, vec![Value::Integer(10_005), Value::Integer(3)]);
    }

    #[test]
    fn next_cursor_only_for_full_pages() {
        let request = PageRequest::parse("", 2).unwrap();
        let t1 = DateTime::from_timestamp(100, 0).unwrap();
        let t2 = DateTime::from_timestamp(200, 0).unwrap();

        let full = request.finish(vec![t1, t2], |t| *t);
        assert_eq!(decode_cursor(&full.next_cursor).unwrap(), t2);

        let partial = request.finish(vec![t1], |t| *t);
        assert!(partial.next_cursor.is_empty());
    }

    #[test]
    fn zero_page_size_yields_empty_cursor() {
        let request = PageRequest::parse("", 0).unwrap();
        let page = request.finish(Vec::<i64>::new(), |_| DateTime::from_timestamp(0, 0).unwrap());
        assert!(page.items.is_empty());
        assert!(page.next_cursor.is_empty());
    }
}
