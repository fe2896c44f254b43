//! Integration tests for Clementine.
//!
//! # Test Categories
//!
//! - `cart_sync` - login merge and remote-wins refresh scenarios
//! - `sync_task` - the spawned synchronizer loop (write-behind, edges)
//!
//! This crate's library holds the shared fixtures: an in-memory
//! [`DocumentStore`] with failure injection and builders for carts and
//! products.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rust_decimal::Decimal;
use serde_json::{Map, Value};

use tracing_subscriber::EnvFilter;

use clementine_cart::{DocumentCartRepository, DocumentStore, RepositoryError};
use clementine_core::{LineItem, LineItemId, Product, ProductId};

static TRACING: std::sync::Once = std::sync::Once::new();

/// Install a fmt subscriber once per test binary; honors `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// In-memory document store with update-merge semantics, failure injection,
/// and an optional per-update delay for exercising in-flight saves.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    docs: Arc<Mutex<HashMap<String, Value>>>,
    fail_requests: Arc<AtomicBool>,
    update_count: Arc<AtomicUsize>,
    update_delay_ms: Arc<AtomicU64>,
}

impl MemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent request fail with an HTTP 500.
    pub fn fail_requests(&self, fail: bool) {
        self.fail_requests.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent update sleep before applying, keeping the
    /// write in flight while the caller does something else.
    pub fn delay_updates(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).expect("delay fits in u64");
        self.update_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Number of successful updates applied so far.
    #[must_use]
    pub fn update_count(&self) -> usize {
        self.update_count.load(Ordering::SeqCst)
    }

    /// Seed a document directly.
    pub fn insert(&self, collection: &str, id: &str, document: Value) {
        self.lock().insert(Self::key(collection, id), document);
    }

    /// Read a document directly.
    #[must_use]
    pub fn document(&self, collection: &str, id: &str) -> Option<Value> {
        self.lock().get(&Self::key(collection, id)).cloned()
    }

    fn key(collection: &str, id: &str) -> String {
        format!("{collection}/{id}")
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        self.docs.lock().expect("document store lock poisoned")
    }

    fn check_failure(&self) -> Result<(), RepositoryError> {
        if self.fail_requests.load(Ordering::SeqCst) {
            return Err(RepositoryError::Status(
                reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            ));
        }
        Ok(())
    }
}

impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, RepositoryError> {
        self.check_failure()?;
        Ok(self.lock().get(&Self::key(collection, id)).cloned())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Value,
    ) -> Result<(), RepositoryError> {
        self.check_failure()?;

        let delay_ms = self.update_delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        // Count before the document becomes visible so observers never see
        // a new document with a stale counter.
        self.update_count.fetch_add(1, Ordering::SeqCst);

        let mut docs = self.lock();
        let document = docs
            .entry(Self::key(collection, id))
            .or_insert_with(|| Value::Object(Map::new()));
        if let (Some(existing), Value::Object(new)) = (document.as_object_mut(), fields) {
            for (name, value) in new {
                existing.insert(name, value);
            }
        }
        Ok(())
    }
}

/// A repository over a fresh in-memory store, plus the store for seeding
/// and inspection.
#[must_use]
pub fn memory_repository() -> (DocumentCartRepository<MemoryDocumentStore>, MemoryDocumentStore) {
    init_tracing();
    let docs = MemoryDocumentStore::new();
    (DocumentCartRepository::new(docs.clone()), docs)
}

/// The `cart` field of a user document, if present.
#[must_use]
pub fn remote_cart(docs: &MemoryDocumentStore, user_id: &str) -> Option<Value> {
    docs.document("users", user_id)
        .and_then(|doc| doc.get("cart").cloned())
}

/// Build a line item where the line id doubles as the product id.
#[must_use]
pub fn line(line_id: &str, quantity: u32) -> LineItem {
    LineItem {
        line_id: LineItemId::new(line_id),
        product_id: ProductId::new(line_id),
        name: line_id.to_owned(),
        unit_price: Decimal::new(1000, 2),
        image: String::new(),
        quantity,
        options: vec![],
    }
}

/// Build an option-less catalog product.
#[must_use]
pub fn product(id: &str, name: &str) -> Product {
    Product {
        id: ProductId::new(id),
        name: name.to_owned(),
        price: Decimal::new(1999, 2),
        images: vec![format!("https://img.example/{id}.jpg")],
        category: "test".to_owned(),
        options: vec![],
    }
}

/// Poll `condition` until it holds, panicking after two seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
