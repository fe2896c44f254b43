//! The canonical in-memory cart store.
//!
//! `CartStore` is the single source of truth for all UI surfaces in a
//! session (header badge, footer badge, cart page, product grid). Every
//! mutation publishes the new snapshot to all subscribers before the call
//! returns, and writes through to the local durable cache when one is
//! configured.
//!
//! The store is an explicit constructed object, not a global: tests build
//! isolated instances, and applications hold one per session.

use std::sync::Arc;

use tokio::sync::watch;

use clementine_core::{LineItem, LineItemId, Product, SelectedOption};

use crate::cache::CartCache;
use crate::mutation;

/// Observable cart store.
///
/// Cheaply cloneable handle; all clones share the same state. Reads and
/// writes are safe from any thread - the watch channel is the only lock.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    items: watch::Sender<Vec<LineItem>>,
    cache: Option<CartCache>,
}

impl CartStore {
    /// Create an empty store with no durable cache.
    #[must_use]
    pub fn new() -> Self {
        Self::build(Vec::new(), None)
    }

    /// Create a store backed by a durable cache.
    ///
    /// Initial contents are loaded from the cache, so a restarted process
    /// sees the previous session's cart without a network round trip.
    #[must_use]
    pub fn with_cache(cache: CartCache) -> Self {
        let initial = cache.load();
        Self::build(initial, Some(cache))
    }

    fn build(initial: Vec<LineItem>, cache: Option<CartCache>) -> Self {
        let (items, _) = watch::channel(initial);
        Self {
            inner: Arc::new(CartStoreInner { items, cache }),
        }
    }

    /// Current cart snapshot, in order.
    #[must_use]
    pub fn items(&self) -> Vec<LineItem> {
        self.inner.items.borrow().clone()
    }

    /// Total number of units across all lines (the badge count).
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.inner
            .items
            .borrow()
            .iter()
            .map(|item| item.quantity)
            .sum()
    }

    /// Subscribe to cart changes.
    ///
    /// Every mutation is visible to every subscriber before the mutating
    /// call returns; `Receiver::borrow` always sees the latest snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<LineItem>> {
        self.inner.items.subscribe()
    }

    /// Replace the whole cart. Used by the synchronizer after fetch/merge.
    pub fn set_items(&self, items: Vec<LineItem>) {
        self.inner.items.send_replace(items);
        self.write_through();
    }

    /// Add one unit of `product` with the given option selections.
    pub fn add_item(&self, product: &Product, options: &[SelectedOption]) {
        self.apply(|items| mutation::add(items, product, options));
    }

    /// Remove the line with the given identity; no-op when absent.
    pub fn remove_item(&self, line_id: &LineItemId) {
        self.apply(|items| mutation::remove(items, line_id));
    }

    /// Replace a line's quantity; quantities below 1 are rejected as no-ops.
    pub fn update_quantity(&self, line_id: &LineItemId, quantity: u32) {
        self.apply(|items| mutation::update_quantity(items, line_id, quantity));
    }

    /// Empty the cart in place.
    pub fn clear(&self) {
        self.apply(mutation::clear);
    }

    /// Apply a pure mutation atomically and notify subscribers.
    fn apply(&self, f: impl FnOnce(&[LineItem]) -> Vec<LineItem>) {
        self.inner.items.send_modify(|items| *items = f(items));
        self.write_through();
    }

    /// Mirror the current snapshot into the durable cache, best-effort.
    fn write_through(&self) {
        let Some(cache) = &self.inner.cache else {
            return;
        };
        let items = self.inner.items.borrow().clone();
        if let Err(e) = cache.save(&items) {
            tracing::warn!(error = %e, "Failed to write cart cache");
        }
    }
}

impl Default for CartStore {
    fn default() -> Self {
        Self::new()
    }
}
