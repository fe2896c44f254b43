//! Device-local durable cart cache.
//!
//! Mirrors the store to a JSON file so cart contents survive process
//! restarts on the anonymous path without a network round trip. The remote
//! repository remains the durability boundary; this cache is best-effort.
//!
//! Corruption never propagates: a missing, unreadable, or malformed file
//! degrades to the empty cart.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use clementine_core::LineItem;

/// File name of the cart slot inside the cache directory.
const CART_FILE: &str = "cart.json";

/// Errors that can occur when writing the cache.
///
/// Load never errors; only [`CartCache::save`] reports failures, and the
/// store logs rather than surfaces them.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Filesystem write failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Synchronous JSON-file cache for the cart.
#[derive(Debug, Clone)]
pub struct CartCache {
    path: PathBuf,
}

impl CartCache {
    /// Create a cache rooted at `dir`; the cart lives in `dir/cart.json`.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(CART_FILE),
        }
    }

    /// Load the cached cart.
    ///
    /// Returns the empty cart when no prior value exists or the stored data
    /// is malformed - corruption degrades, it never raises.
    #[must_use]
    pub fn load(&self) -> Vec<LineItem> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read cart cache");
                return Vec::new();
            }
        };

        match serde_json::from_str(&text) {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Discarding corrupt cart cache");
                Vec::new()
            }
        }
    }

    /// Persist the cart snapshot, creating the cache directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if serialization or the filesystem write fails.
    pub fn save(&self, items: &[LineItem]) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(items)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}
