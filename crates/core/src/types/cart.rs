//! Cart line-item types.
//!
//! A cart is an ordered sequence of [`LineItem`]s, unique by line ID. Line
//! items carry a denormalized snapshot of the product (name, price, image)
//! taken at the time of add - the snapshot is never re-synced if the catalog
//! changes later.
//!
//! Serde field names are camelCase because cart documents are shared with
//! JavaScript-style clients writing to the same document store.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{LineItemId, ProductId};

/// One selected value for one product option (e.g. `size: "XL"`).
///
/// The order of selections on a [`LineItem`] is display order; line-item
/// identity sorts by option name, so insertion order never affects identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedOption {
    /// Option name, unique within one line item.
    pub name: String,
    /// The value the shopper chose.
    pub value: String,
}

impl SelectedOption {
    /// Create a new option selection.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A single line in a cart.
///
/// ## Invariants
///
/// - `quantity >= 1`: a persisted cart never contains a zero-quantity line;
///   removal, not zero quantity, represents "no longer wanted".
/// - `line_id` is unique within a cart and deterministically derived from
///   `product_id` plus the sorted option selections.
/// - `unit_price` is non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Stable composite identity of (product, selected options).
    #[serde(rename = "cartItemId")]
    pub line_id: LineItemId,
    /// The product this line references.
    pub product_id: ProductId,
    /// Product name at time of add.
    pub name: String,
    /// Unit price at time of add.
    pub unit_price: Decimal,
    /// First product image at time of add; empty when the product had none.
    #[serde(default)]
    pub image: String,
    /// Number of units, always >= 1.
    pub quantity: u32,
    /// Selected option values, in display order.
    #[serde(default)]
    pub options: Vec<SelectedOption>,
}

impl LineItem {
    /// Line total: unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}
