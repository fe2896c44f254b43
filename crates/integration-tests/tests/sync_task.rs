//! Scenarios for the spawned synchronizer loop: login edges, write-behind
//! persistence, cross-tab refresh, and sign-out behavior.

use std::time::Duration;

use serde_json::json;
use tokio::sync::watch;

use clementine_cart::{AuthStatus, CartStore, CartSynchronizer};
use clementine_core::UserId;

use clementine_integration_tests::{memory_repository, product, remote_cart, wait_until};

fn authenticated(id: &str) -> AuthStatus {
    AuthStatus::Authenticated(UserId::new(id))
}

#[tokio::test]
async fn test_login_edge_triggers_merge_exactly_once() {
    let (repository, docs) = memory_repository();
    let store = CartStore::new();
    let (auth_tx, auth_rx) = watch::channel(AuthStatus::Unauthenticated);

    let (_task, _handle) = CartSynchronizer::new(store.clone(), repository).run(auth_rx);

    store.add_item(&product("p-1", "Shirt"), &[]);
    auth_tx.send_replace(authenticated("u-1"));

    let docs_view = docs.clone();
    wait_until(move || remote_cart(&docs_view, "u-1").is_some()).await;
    let writes_after_login = docs.update_count();

    // Re-publishing the same status is a level, not an edge: no second merge.
    auth_tx.send_replace(authenticated("u-1"));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(docs.update_count(), writes_after_login);
    assert_eq!(store.total_quantity(), 1);
}

#[tokio::test]
async fn test_write_behind_persists_mutations_while_authenticated() {
    let (repository, docs) = memory_repository();
    let store = CartStore::new();
    let (auth_tx, auth_rx) = watch::channel(AuthStatus::Loading);

    let (_task, _handle) = CartSynchronizer::new(store.clone(), repository).run(auth_rx);

    auth_tx.send_replace(authenticated("u-2"));
    let docs_view = docs.clone();
    wait_until(move || remote_cart(&docs_view, "u-2").is_some()).await;

    let shirt = product("p-1", "Shirt");
    store.add_item(&shirt, &[]);
    store.add_item(&shirt, &[]);

    let docs_view = docs.clone();
    let persisted_quantity = move || {
        remote_cart(&docs_view, "u-2")
            .as_ref()
            .and_then(serde_json::Value::as_array)
            .and_then(|a| a.first())
            .and_then(|item| item.get("quantity"))
            .and_then(serde_json::Value::as_u64)
    };
    wait_until(move || persisted_quantity() == Some(2)).await;
}

#[tokio::test]
async fn test_write_behind_coalesces_to_latest_snapshot() {
    let (repository, docs) = memory_repository();
    let store = CartStore::new();
    let (auth_tx, auth_rx) = watch::channel(AuthStatus::Unauthenticated);

    let (_task, _handle) = CartSynchronizer::new(store.clone(), repository).run(auth_rx);

    auth_tx.send_replace(authenticated("u-7"));
    let docs_view = docs.clone();
    wait_until(move || remote_cart(&docs_view, "u-7").is_some()).await;
    let writes_after_login = docs.update_count();

    // Slow saves from here on: the first mutation's save stays in flight
    // while the remaining mutations land.
    docs.delay_updates(Duration::from_millis(100));
    let shirt = product("p-1", "Shirt");
    store.add_item(&shirt, &[]);
    tokio::time::sleep(Duration::from_millis(5)).await;
    for _ in 0..4 {
        store.add_item(&shirt, &[]);
    }

    let docs_view = docs.clone();
    let persisted_quantity = move || {
        remote_cart(&docs_view, "u-7")
            .as_ref()
            .and_then(serde_json::Value::as_array)
            .and_then(|a| a.first())
            .and_then(|item| item.get("quantity"))
            .and_then(serde_json::Value::as_u64)
    };
    wait_until(move || persisted_quantity() == Some(5)).await;

    // One in-flight write plus one follow-up with the final snapshot; the
    // three superseded snapshots were never written.
    assert_eq!(docs.update_count(), writes_after_login + 2);
}

#[tokio::test]
async fn test_mutation_during_login_sync_is_persisted() {
    let (repository, docs) = memory_repository();
    let store = CartStore::new();
    let (auth_tx, auth_rx) = watch::channel(AuthStatus::Unauthenticated);

    let (_task, _handle) = CartSynchronizer::new(store.clone(), repository).run(auth_rx);

    // The merge write stays in flight while the user keeps shopping.
    docs.delay_updates(Duration::from_millis(100));
    auth_tx.send_replace(authenticated("u-8"));
    tokio::time::sleep(Duration::from_millis(20)).await;
    store.add_item(&product("p-1", "Shirt"), &[]);

    let docs_view = docs.clone();
    let persisted_lines = move || {
        remote_cart(&docs_view, "u-8")
            .as_ref()
            .and_then(serde_json::Value::as_array)
            .map(Vec::len)
    };
    wait_until(move || persisted_lines() == Some(1)).await;
    assert_eq!(store.total_quantity(), 1);
}

#[tokio::test]
async fn test_anonymous_mutations_never_touch_remote() {
    let (repository, docs) = memory_repository();
    let store = CartStore::new();
    let (_auth_tx, auth_rx) = watch::channel(AuthStatus::Unauthenticated);

    let (_task, _handle) = CartSynchronizer::new(store.clone(), repository).run(auth_rx);

    store.add_item(&product("p-1", "Shirt"), &[]);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(docs.update_count(), 0);
    assert_eq!(store.total_quantity(), 1);
}

#[tokio::test]
async fn test_external_change_replaces_store_from_remote() {
    let (repository, docs) = memory_repository();
    let store = CartStore::new();
    let (auth_tx, auth_rx) = watch::channel(AuthStatus::Unauthenticated);

    let (_task, handle) = CartSynchronizer::new(store.clone(), repository).run(auth_rx);

    auth_tx.send_replace(authenticated("u-3"));
    let docs_view = docs.clone();
    wait_until(move || remote_cart(&docs_view, "u-3").is_some()).await;

    // Another tab/device already synced a different cart.
    docs.insert(
        "users",
        "u-3",
        json!({
            "cart": [{
                "cartItemId": "p-9-",
                "productId": "p-9",
                "name": "Candle",
                "unitPrice": "14.50",
                "quantity": 3
            }]
        }),
    );
    handle.notify_external_change();

    let store_view = store.clone();
    wait_until(move || store_view.total_quantity() == 3).await;
    assert_eq!(
        store.items().first().map(|i| i.product_id.as_str().to_owned()),
        Some("p-9".to_owned())
    );
}

#[tokio::test]
async fn test_sign_out_retains_local_cart() {
    let (repository, docs) = memory_repository();
    let store = CartStore::new();
    let (auth_tx, auth_rx) = watch::channel(AuthStatus::Unauthenticated);

    let (_task, _handle) = CartSynchronizer::new(store.clone(), repository).run(auth_rx);

    store.add_item(&product("p-1", "Shirt"), &[]);
    auth_tx.send_replace(authenticated("u-4"));
    let docs_view = docs.clone();
    wait_until(move || remote_cart(&docs_view, "u-4").is_some()).await;

    auth_tx.send_replace(AuthStatus::Unauthenticated);
    tokio::time::sleep(Duration::from_millis(50)).await;

    // No clear-on-sign-out: the device keeps its cart.
    assert_eq!(store.total_quantity(), 1);
}

#[tokio::test]
async fn test_task_stops_when_auth_signal_is_dropped() {
    let (repository, _docs) = memory_repository();
    let store = CartStore::new();
    let (auth_tx, auth_rx) = watch::channel(AuthStatus::Unauthenticated);

    let (task, _handle) = CartSynchronizer::new(store, repository).run(auth_rx);

    drop(auth_tx);
    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("task should stop")
        .expect("task should not panic");
}
