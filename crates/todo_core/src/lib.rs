//! Core logic for the activity/todo service.
//!
//! Owns keyset pagination, concurrent activity enrichment of todo pages, and
//! the CRUD use-cases over SQLite-backed stores.

pub mod config;
pub mod cursor;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{AppConfig, ConfigError};
pub use cursor::{decode_cursor, encode_cursor, CursorError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::activity::{Activity, ActivityId};
pub use model::todo::{ActivityGroup, Todo, TodoId};
pub use model::Timestamp;
pub use repo::{
    ActivityStore, Page, RepoError, RepoResult, SqliteActivityRepository, SqliteTodoRepository,
    TodoStore,
};
pub use service::activity_service::ActivityService;
pub use service::enrichment::enrich_page;
pub use service::todo_service::{TodoPage, TodoService};
pub use service::{ServiceError, ServiceSettings};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
