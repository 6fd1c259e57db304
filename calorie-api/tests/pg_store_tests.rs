//! PostgreSQL store tests.
//!
//! Run with `--features db-tests` against a scratch database configured
//! through the `CALORIE_DB_*` variables. Tests create rows with unique
//! names and never delete existing data.

#![cfg(feature = "db-tests")]

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use calorie_api::{DbConfig, PgConnector};
use calorie_storage::{ConnectionState, StoreHandle};
use calorie_test_utils::NewFoodItem;

fn unique(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{} {}", prefix, nanos)
}

fn handle() -> StoreHandle {
    StoreHandle::new(Arc::new(PgConnector::new(DbConfig::from_env())))
}

#[tokio::test]
async fn test_connect_and_ping() {
    let handle = handle();
    let store = handle.acquire().await.expect("database reachable");
    store.ping().await.expect("ping succeeds");
    assert_eq!(handle.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn test_create_then_fetch() {
    let store = handle().acquire().await.expect("database reachable");
    let name = unique("Dragonfruit");
    let payload = NewFoodItem::new(name.clone(), 60)
        .and_then(|p| p.with_macros(Some(1.2), Some(13.0), None))
        .expect("valid payload");

    let created = store.create(&payload).await.expect("insert succeeds");
    let max_id = store
        .list_all()
        .await
        .expect("list succeeds")
        .iter()
        .map(|i| i.id)
        .max();
    assert_eq!(max_id, Some(created.id));

    let fetched = store
        .get_by_id(created.id)
        .await
        .expect("lookup succeeds")
        .expect("row exists");
    assert_eq!(fetched.name, name);
    assert_eq!(fetched.protein, Some(1.2));
    assert_eq!(fetched.fat, None);
}

#[tokio::test]
async fn test_concurrent_creates_do_not_collide() {
    let handle = Arc::new(handle());
    let mut tasks = Vec::new();
    for i in 0..6 {
        let handle = handle.clone();
        tasks.push(tokio::spawn(async move {
            let store = handle.acquire().await.expect("database reachable");
            let payload = NewFoodItem::new(unique(&format!("Racer {}", i)), 10).expect("valid");
            store.create(&payload).await.expect("insert succeeds").id
        }));
    }
    let mut ids = Vec::new();
    for task in tasks {
        ids.push(task.await.expect("task completes"));
    }
    let count = ids.len();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), count);
}

#[tokio::test]
async fn test_search_escapes_like_wildcards() {
    let store = handle().acquire().await.expect("database reachable");
    let marker = unique("pct");
    let literal = format!("100% {}", marker);
    store
        .create(&NewFoodItem::new(literal.clone(), 45).expect("valid"))
        .await
        .expect("insert succeeds");
    store
        .create(&NewFoodItem::new(format!("1000 {}", marker), 45).expect("valid"))
        .await
        .expect("insert succeeds");

    let found = store
        .search_by_name(&format!("0% {}", marker.to_uppercase()))
        .await
        .expect("search succeeds");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, literal);
}

#[tokio::test]
async fn test_update_absent_row() {
    let store = handle().acquire().await.expect("database reachable");
    let updated = store
        .update(i32::MAX, &NewFoodItem::new("Ghost", 1).expect("valid"))
        .await
        .expect("statement succeeds");
    assert!(updated.is_none());
}
