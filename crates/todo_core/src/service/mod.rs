//! Use-case services over the activity and todo stores.
//!
//! # Responsibility
//! - Scope every operation to one deadline derived from the configured
//!   context timeout.
//! - Run existence and uniqueness checks around repository writes.
//! - Enrich todo pages with their activity groups.
//!
//! # Invariants
//! - A deadline that passes surfaces as `RepoError::DeadlineExceeded`.
//! - Services depend only on the `ActivityStore` / `TodoStore` capabilities.

pub mod activity_service;
pub mod enrichment;
pub mod todo_service;

use crate::repo::{RepoError, RepoResult};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Page size applied when callers pass `0`.
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Default per-operation timeout.
pub const DEFAULT_CONTEXT_TIMEOUT: Duration = Duration::from_secs(2);

/// Default upper bound on concurrent activity lookups per enrichment pass.
pub const DEFAULT_MAX_CONCURRENT_LOOKUPS: usize = 8;

/// Runtime knobs shared by all services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSettings {
    /// Deadline applied to each service call, measured from its start.
    pub context_timeout: Duration,
    /// Maximum activity lookups in flight during one enrichment pass.
    pub max_concurrent_lookups: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            context_timeout: DEFAULT_CONTEXT_TIMEOUT,
            max_concurrent_lookups: DEFAULT_MAX_CONCURRENT_LOOKUPS,
        }
    }
}

impl ServiceSettings {
    /// Starts the deadline for one service operation.
    pub fn deadline(&self) -> Instant {
        Instant::now() + self.context_timeout
    }
}

/// Service error for activity and todo use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Cursor or page size was rejected.
    BadParamInput(String),
    /// Requested record does not exist.
    NotFound { entity: &'static str, key: String },
    /// A record with the same title already exists.
    Conflict { entity: &'static str, title: String },
    /// Storage failure, including deadline expiry.
    Store(RepoError),
}

impl ServiceError {
    /// Returns whether the failure was caused by the operation deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Store(RepoError::DeadlineExceeded))
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadParamInput(message) => write!(f, "bad request parameter: {message}"),
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::Conflict { entity, title } => {
                write!(f, "{entity} with title `{title}` already exists")
            }
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::BadParamInput(message) => Self::BadParamInput(message),
            RepoError::NotFound { entity, key } => Self::NotFound { entity, key },
            other => Self::Store(other),
        }
    }
}

/// Maps `0` to `DEFAULT_PAGE_SIZE`; every other value passes through.
pub fn normalize_page_size(num: i64) -> i64 {
    if num == 0 {
        DEFAULT_PAGE_SIZE
    } else {
        num
    }
}

/// Awaits a store call, failing with `DeadlineExceeded` once `deadline` passes.
pub(crate) async fn within<T>(
    deadline: Instant,
    call: impl Future<Output = RepoResult<T>>,
) -> RepoResult<T> {
    match tokio::time::timeout_at(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(RepoError::DeadlineExceeded),
    }
}
