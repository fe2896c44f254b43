//! Login merge and remote-wins refresh scenarios.
//!
//! These tests drive the synchronizer's operations directly (no spawned
//! task), so every assertion is deterministic.

use serde_json::json;

use clementine_cart::{CartRepository, CartStore, CartSynchronizer};
use clementine_core::UserId;

use clementine_integration_tests::{line, memory_repository, remote_cart};

fn quantities(store: &CartStore) -> Vec<(String, u32)> {
    store
        .items()
        .iter()
        .map(|item| (item.line_id.as_str().to_owned(), item.quantity))
        .collect()
}

// =============================================================================
// Sync-On-Login
// =============================================================================

#[tokio::test]
async fn test_login_merge_sums_quantities_remote_first() {
    let (repository, docs) = memory_repository();
    let user = UserId::new("u-1");

    repository
        .save(&user, &[line("x", 2)])
        .await
        .expect("seed remote");

    let store = CartStore::new();
    store.set_items(vec![line("x", 3), line("y", 1)]);

    let sync = CartSynchronizer::new(store.clone(), repository);
    sync.sync_on_login(&user).await;

    // Store: remote-first ordering, matching quantities summed.
    assert_eq!(
        quantities(&store),
        vec![("x".to_owned(), 5), ("y".to_owned(), 1)]
    );

    // Remote document converged on the same contents.
    let cart = remote_cart(&docs, "u-1").expect("cart field");
    let stored: Vec<(String, u64)> = cart
        .as_array()
        .expect("array")
        .iter()
        .map(|item| {
            (
                item["cartItemId"].as_str().expect("id").to_owned(),
                item["quantity"].as_u64().expect("quantity"),
            )
        })
        .collect();
    assert_eq!(stored, vec![("x".to_owned(), 5), ("y".to_owned(), 1)]);
}

#[tokio::test]
async fn test_login_without_remote_document_pushes_local() {
    let (repository, docs) = memory_repository();
    let user = UserId::new("u-2");

    let store = CartStore::new();
    store.set_items(vec![line("a", 4)]);

    CartSynchronizer::new(store.clone(), repository)
        .sync_on_login(&user)
        .await;

    assert_eq!(quantities(&store), vec![("a".to_owned(), 4)]);
    assert!(remote_cart(&docs, "u-2").is_some());
}

#[tokio::test]
async fn test_login_fetch_failure_never_drops_local_items() {
    let (repository, docs) = memory_repository();
    let user = UserId::new("u-3");

    let store = CartStore::new();
    store.set_items(vec![line("a", 1), line("b", 2)]);

    docs.fail_requests(true);
    CartSynchronizer::new(store.clone(), repository)
        .sync_on_login(&user)
        .await;

    // Fetch and save both failed; the store still holds the local cart.
    assert_eq!(
        quantities(&store),
        vec![("a".to_owned(), 1), ("b".to_owned(), 2)]
    );
}

#[tokio::test]
async fn test_save_preserves_sibling_profile_fields() {
    let (repository, docs) = memory_repository();
    let user = UserId::new("u-4");

    docs.insert(
        "users",
        "u-4",
        json!({ "email": "shopper@example.com", "cart": [] }),
    );

    repository.save(&user, &[line("a", 1)]).await.expect("save");

    let doc = docs.document("users", "u-4").expect("document");
    assert_eq!(doc["email"], "shopper@example.com");
    assert_eq!(doc["cart"].as_array().map(Vec::len), Some(1));
}

// =============================================================================
// External change (remote wins)
// =============================================================================

#[tokio::test]
async fn test_refresh_replaces_store_wholesale() {
    let (repository, _docs) = memory_repository();
    let user = UserId::new("u-5");

    repository
        .save(&user, &[line("remote-only", 7)])
        .await
        .expect("seed remote");

    let store = CartStore::new();
    store.set_items(vec![line("local-only", 1)]);

    CartSynchronizer::new(store.clone(), repository)
        .refresh(&user)
        .await;

    // No merge: the local-only line is gone.
    assert_eq!(quantities(&store), vec![("remote-only".to_owned(), 7)]);
}

#[tokio::test]
async fn test_refresh_with_missing_document_empties_store() {
    let (repository, _docs) = memory_repository();
    let user = UserId::new("u-6");

    let store = CartStore::new();
    store.set_items(vec![line("a", 1)]);

    CartSynchronizer::new(store.clone(), repository)
        .refresh(&user)
        .await;

    assert!(store.items().is_empty());
}

#[tokio::test]
async fn test_refresh_failure_keeps_local_contents() {
    let (repository, docs) = memory_repository();
    let user = UserId::new("u-7");

    let store = CartStore::new();
    store.set_items(vec![line("a", 1)]);

    docs.fail_requests(true);
    CartSynchronizer::new(store.clone(), repository)
        .refresh(&user)
        .await;

    assert_eq!(quantities(&store), vec![("a".to_owned(), 1)]);
}

// =============================================================================
// Repository decode boundary
// =============================================================================

#[tokio::test]
async fn test_fetch_fails_closed_on_corrupt_document() {
    let (repository, docs) = memory_repository();
    docs.insert("users", "u-8", json!({ "cart": { "oops": true } }));

    let err = repository
        .fetch(&UserId::new("u-8"))
        .await
        .expect_err("corrupt document");
    assert!(err.to_string().contains("data corruption"));
}

#[tokio::test]
async fn test_fetch_treats_missing_cart_field_as_no_cart() {
    let (repository, docs) = memory_repository();
    docs.insert("users", "u-9", json!({ "email": "shopper@example.com" }));

    let fetched = repository
        .fetch(&UserId::new("u-9"))
        .await
        .expect("fetch");
    assert!(fetched.is_none());
}
