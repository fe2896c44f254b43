//! Clementine Cart - cart state, persistence, and synchronization.
//!
//! This crate is the stateful core of the storefront's cart: an observable
//! in-process store, a device-local durable cache, a document-store-backed
//! remote repository, and a synchronizer that reconciles the anonymous
//! (device-local) cart with the authenticated (server-persisted) cart.
//!
//! # Architecture
//!
//! - [`mutation`] - pure line-item identity and add/remove/update transforms
//! - [`store`] - the canonical in-memory cart, observable via watch channels
//! - [`cache`] - write-through JSON file cache for the anonymous path
//! - [`remote`] - the cart repository over a generic document store
//! - [`docstore`] - REST client for the document store API
//! - [`sync`] - login merge, write-behind persistence, cross-tab refresh
//! - [`config`] - environment-driven configuration
//!
//! The remote repository is the durability boundary; the local cache is a
//! latency/availability optimization so the cart survives restarts without a
//! network round trip.
//!
//! # Example
//!
//! ```rust,ignore
//! use clementine_cart::{
//!     CartCache, CartConfig, CartStore, CartSynchronizer, DocumentCartRepository,
//!     RestDocumentStore,
//! };
//!
//! let config = CartConfig::from_env()?;
//! let store = CartStore::with_cache(CartCache::new(config.cache_dir()));
//! let docs = RestDocumentStore::new(&config.docstore)?;
//! let repository = DocumentCartRepository::new(docs);
//!
//! // `auth` is a watch::Receiver<AuthStatus> fed by the identity provider.
//! let (task, handle) = CartSynchronizer::new(store.clone(), repository).run(auth);
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cache;
pub mod config;
pub mod docstore;
pub mod mutation;
pub mod remote;
pub mod store;
pub mod sync;

pub use cache::CartCache;
pub use config::{CartConfig, ConfigError, DocStoreConfig};
pub use docstore::{DocumentStore, RestDocumentStore};
pub use remote::{CartRepository, DocumentCartRepository, RepositoryError};
pub use store::CartStore;
pub use sync::{AuthStatus, CartSynchronizer, SyncHandle, merge_carts};
