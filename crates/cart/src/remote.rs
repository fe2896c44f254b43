//! Remote cart repository.
//!
//! One cart document per user, stored as the `cart` field of the user's
//! document in the `users` collection. This module is the explicit decode
//! boundary: documents are validated on the way in and fail closed when
//! structurally invalid, rather than trusting whatever a foreign writer put
//! in the store.

use std::future::Future;

use rust_decimal::Decimal;
use serde_json::{Value, json};
use thiserror::Error;

use clementine_core::{LineItem, UserId};

use crate::docstore::DocumentStore;

/// Collection holding one document per user.
const USERS_COLLECTION: &str = "users";

/// Field of the user document holding the line-item array.
const CART_FIELD: &str = "cart";

/// Errors that can occur when talking to the remote repository.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// HTTP request failed (includes timeouts).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The document API returned a non-success status.
    #[error("document API returned HTTP {0}")]
    Status(reqwest::StatusCode),

    /// A stored document violates the cart invariants.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Durable, per-user cart storage.
///
/// `fetch` distinguishes "no cart yet" (`Ok(None)`) from an empty cart so
/// callers can decide how to treat a user who has never synced.
pub trait CartRepository {
    /// Fetch the user's cart; `Ok(None)` when no cart document exists.
    fn fetch(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<Option<Vec<LineItem>>, RepositoryError>> + Send;

    /// Overwrite the user's cart with `items`.
    fn save(
        &self,
        user: &UserId,
        items: &[LineItem],
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Cart repository over a generic [`DocumentStore`].
#[derive(Clone)]
pub struct DocumentCartRepository<S> {
    docs: S,
}

impl<S: DocumentStore> DocumentCartRepository<S> {
    /// Create a repository over the given document store.
    pub const fn new(docs: S) -> Self {
        Self { docs }
    }
}

impl<S: DocumentStore + Sync> CartRepository for DocumentCartRepository<S> {
    async fn fetch(&self, user: &UserId) -> Result<Option<Vec<LineItem>>, RepositoryError> {
        let Some(document) = self.docs.get(USERS_COLLECTION, user.as_str()).await? else {
            return Ok(None);
        };
        decode_cart_document(&document)
    }

    async fn save(&self, user: &UserId, items: &[LineItem]) -> Result<(), RepositoryError> {
        // Update-merge keeps sibling profile fields on the user document.
        let fields = json!({ CART_FIELD: items });
        self.docs.update(USERS_COLLECTION, user.as_str(), fields).await
    }
}

/// Decode the `cart` field of a user document.
///
/// Missing field (or explicit null) means the user has no cart yet. A field
/// that is present but structurally invalid - wrong types, a zero quantity,
/// a negative price - is `DataCorruption`: never trust the cast.
///
/// # Errors
///
/// Returns `RepositoryError::DataCorruption` for invalid documents.
pub fn decode_cart_document(document: &Value) -> Result<Option<Vec<LineItem>>, RepositoryError> {
    let Some(cart) = document.get(CART_FIELD) else {
        return Ok(None);
    };
    if cart.is_null() {
        return Ok(None);
    }

    let items: Vec<LineItem> = serde_json::from_value(cart.clone())
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid cart field: {e}")))?;

    for item in &items {
        if item.quantity < 1 {
            return Err(RepositoryError::DataCorruption(format!(
                "line {} has quantity {}",
                item.line_id, item.quantity
            )));
        }
        if item.unit_price < Decimal::ZERO {
            return Err(RepositoryError::DataCorruption(format!(
                "line {} has negative price",
                item.line_id
            )));
        }
    }

    Ok(Some(items))
}
