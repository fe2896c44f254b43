//! Catalog product snapshot types.
//!
//! These are the read-side shapes the cart consumes when adding an item. The
//! catalog itself is owned externally; the cart copies the name, price, and
//! first image into the line item and never looks back.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// A selectable option a product defines (e.g. `size` with `["S", "M", "L"]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOption {
    /// Option name, unique within one product.
    pub name: String,
    /// The values a shopper can choose from.
    pub values: Vec<String>,
}

/// A catalog product as read from the product documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Catalog identity.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Current unit price.
    pub price: Decimal,
    /// Image URLs; the first one is snapshotted into cart lines.
    #[serde(default)]
    pub images: Vec<String>,
    /// Category handle.
    #[serde(default)]
    pub category: String,
    /// Options a shopper must resolve before the product can be added.
    #[serde(default)]
    pub options: Vec<ProductOption>,
}

impl Product {
    /// Whether the product requires option selections before an add.
    #[must_use]
    pub fn has_options(&self) -> bool {
        !self.options.is_empty()
    }
}
