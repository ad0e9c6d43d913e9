//! Concurrent activity enrichment for pages of todos.
//!
//! # Responsibility
//! - Resolve every distinct activity id referenced by a page exactly once.
//! - Run lookups concurrently, bounded by a permit limit, under one deadline.
//! - Splice resolved activities back into the page in its original order.
//!
//! # Invariants
//! - Lookup calls never exceed the number of distinct referenced ids.
//! - All-or-nothing: on any lookup error or deadline expiry the page is left
//!   untouched and the remaining lookups are aborted.
//! - Only the collecting task writes the id -> activity map; lookup tasks
//!   hand results back through their join handles and never block on it.

use crate::model::activity::{Activity, ActivityId};
use crate::model::todo::Todo;
use crate::repo::{ActivityStore, RepoError, RepoResult};
use log::{debug, warn};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant as StdInstant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

/// Replaces each todo's activity reference with the resolved activity.
///
/// # Errors
/// - The first lookup error (`NotFound`, store failure, worker failure).
/// - `RepoError::DeadlineExceeded` when lookups outlive `deadline`.
///
/// On error `todos` is unchanged.
pub async fn enrich_page<A>(
    store: &Arc<A>,
    todos: &mut [Todo],
    deadline: Instant,
    max_concurrent_lookups: usize,
) -> RepoResult<()>
where
    A: ActivityStore + ?Sized + 'static,
{
    let ids: BTreeSet<ActivityId> = todos
        .iter()
        .map(|todo| todo.activity_group.id())
        .collect();
    if ids.is_empty() {
        return Ok(());
    }

    let started_at = StdInstant::now();
    let resolved = match resolve_activities(store, &ids, deadline, max_concurrent_lookups).await {
        Ok(resolved) => resolved,
        Err(err) => {
            warn!(
                "event=todo_enrich module=service status=error todos={} distinct_ids={} duration_ms={} error={err}",
                todos.len(),
                ids.len(),
                started_at.elapsed().as_millis()
            );
            return Err(err);
        }
    };

    for todo in todos.iter_mut() {
        if let Some(activity) = resolved.get(&todo.activity_group.id()) {
            todo.resolve_activity(activity.clone());
        }
    }

    debug!(
        "event=todo_enrich module=service status=ok todos={} distinct_ids={} duration_ms={}",
        todos.len(),
        ids.len(),
        started_at.elapsed().as_millis()
    );
    Ok(())
}

/// Fans out one lookup per id and collects the results.
///
/// The caller's task is the single collector and drains `join_next` while
/// lookups run, so the join never waits on a producer that cannot deliver.
async fn resolve_activities<A>(
    store: &Arc<A>,
    ids: &BTreeSet<ActivityId>,
    deadline: Instant,
    max_concurrent_lookups: usize,
) -> RepoResult<HashMap<ActivityId, Activity>>
where
    A: ActivityStore + ?Sized + 'static,
{
    let permits = Arc::new(Semaphore::new(
        max_concurrent_lookups.clamp(1, Semaphore::MAX_PERMITS),
    ));
    let mut lookups = JoinSet::new();
    for &id in ids {
        let store = Arc::clone(store);
        let permits = Arc::clone(&permits);
        lookups.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|err| RepoError::Worker(err.to_string()))?;
            store.get_by_id(id).await.map(|activity| (id, activity))
        });
    }

    let mut resolved = HashMap::with_capacity(ids.len());
    let collected = tokio::time::timeout_at(deadline, async {
        while let Some(joined) = lookups.join_next().await {
            let (id, activity) = joined.map_err(|err| RepoError::Worker(err.to_string()))??;
            resolved.insert(id, activity);
        }
        Ok::<(), RepoError>(())
    })
    .await;

    match collected {
        Ok(Ok(())) => Ok(resolved),
        Ok(Err(err)) => {
            lookups.abort_all();
            Err(err)
        }
        Err(_) => {
            lookups.abort_all();
            Err(RepoError::DeadlineExceeded)
        }
    }
}
