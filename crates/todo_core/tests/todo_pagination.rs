mod common;

use common::{at, sqlite_stores, todo};
use std::collections::HashSet;
use todo_core::{decode_cursor, encode_cursor, RepoError, SqliteTodoRepository, TodoStore};

async fn seed(todos: &SqliteTodoRepository, count: i64) -> Vec<i64> {
    let mut ids = Vec::new();
    for offset in 0..count {
        let mut row = todo(0, 1, offset);
        row.title = format!("todo at {offset}");
        ids.push(todos.store(&row).await.unwrap());
    }
    ids
}

#[tokio::test]
async fn first_page_starts_at_the_oldest_rows() {
    let (todos, _) = sqlite_stores();
    let ids = seed(&todos, 5).await;

    let page = todos.fetch_page("", 3).await.unwrap();

    assert_eq!(
        page.items.iter().map(|todo| todo.id).collect::<Vec<_>>(),
        ids[..3].to_vec()
    );
    assert_eq!(decode_cursor(&page.next_cursor).unwrap(), at(2));
}

#[tokio::test]
async fn page_after_boundary_holds_only_strictly_newer_rows() {
    let (todos, _) = sqlite_stores();
    seed(&todos, 6).await;

    let page = todos.fetch_page(&encode_cursor(at(2)), 10).await.unwrap();

    let created: Vec<_> = page.items.iter().map(|todo| todo.created_at).collect();
    assert_eq!(created, vec![at(3), at(4), at(5)]);
    assert!(page.next_cursor.is_empty());
}

#[tokio::test]
async fn next_cursor_is_set_only_for_full_pages() {
    let (todos, _) = sqlite_stores();
    seed(&todos, 4).await;

    let full = todos.fetch_page("", 4).await.unwrap();
    assert_eq!(full.items.len(), 4);
    assert!(!full.next_cursor.is_empty());

    let trailing = todos.fetch_page(&full.next_cursor, 4).await.unwrap();
    assert!(trailing.items.is_empty());
    assert!(trailing.next_cursor.is_empty());

    let partial = todos.fetch_page("", 5).await.unwrap();
    assert_eq!(partial.items.len(), 4);
    assert!(partial.next_cursor.is_empty());
}

#[tokio::test]
async fn walking_cursors_visits_every_row_once() {
    let (todos, _) = sqlite_stores();
    let ids = seed(&todos, 11).await;

    let mut seen = Vec::new();
    let mut cursor = String::new();
    loop {
        let page = todos.fetch_page(&cursor, 3).await.unwrap();
        seen.extend(page.items.iter().map(|todo| todo.id));
        if page.next_cursor.is_empty() {
            break;
        }
        cursor = page.next_cursor;
    }

    assert_eq!(seen, ids);
    assert_eq!(seen.iter().collect::<HashSet<_>>().len(), ids.len());
}

#[tokio::test]
async fn sub_millisecond_boundary_still_excludes_its_row() {
    let (todos, _) = sqlite_stores();
    seed(&todos, 3).await;

    let boundary = at(1) + chrono::Duration::microseconds(400);
    let page = todos.fetch_page(&encode_cursor(boundary), 10).await.unwrap();

    let created: Vec<_> = page.items.iter().map(|todo| todo.created_at).collect();
    assert_eq!(created, vec![at(2)]);
}

#[tokio::test]
async fn undecodable_cursor_is_rejected() {
    let (todos, _) = sqlite_stores();
    seed(&todos, 2).await;

    let err = todos.fetch_page("not a cursor!", 10).await.unwrap_err();
    assert!(matches!(err, RepoError::BadParamInput(_)));

    let err = todos.fetch_page("", -3).await.unwrap_err();
    assert!(matches!(err, RepoError::BadParamInput(_)));
}

#[tokio::test]
async fn zero_page_size_returns_nothing() {
    let (todos, _) = sqlite_stores();
    seed(&todos, 2).await;

    let page = todos.fetch_page("", 0).await.unwrap();
    assert!(page.items.is_empty());
    assert!(page.next_cursor.is_empty());
}

#[tokio::test]
async fn loaded_rows_keep_unresolved_references() {
    let (todos, _) = sqlite_stores();
    seed(&todos, 1).await;

    let page = todos.fetch_page("", 1).await.unwrap();
    assert_eq!(page.items[0].activity_group.id(), 1);
    assert!(!page.items[0].activity_group.is_resolved());
}
