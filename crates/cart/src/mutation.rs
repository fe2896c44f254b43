//! Line-item identity and pure cart mutations.
//!
//! Every function here is a pure transform `(&[LineItem], args) -> Vec<LineItem>`.
//! Inputs are never mutated, so subscribers holding a previous snapshot can
//! compare it against the next one to decide whether to re-render.
//!
//! The core correctness property of the subsystem is [`line_item_id`]:
//! identity depends on the content of the option selections, not on the
//! order a caller supplied them in.

use clementine_core::{LineItem, LineItemId, Product, ProductId, SelectedOption};

/// Compute the stable composite identity of a (product, selected-options) pair.
///
/// The identity is `"{productId}-{name1}:{value1},{name2}:{value2},..."` with
/// pairs sorted by option name, so `[size: XL, color: red]` and
/// `[color: red, size: XL]` collapse to the same line.
#[must_use]
pub fn line_item_id(product_id: &ProductId, options: &[SelectedOption]) -> LineItemId {
    let mut pairs: Vec<(&str, &str)> = options
        .iter()
        .map(|o| (o.name.as_str(), o.value.as_str()))
        .collect();
    pairs.sort_unstable();

    let encoded = pairs
        .iter()
        .map(|(name, value)| format!("{name}:{value}"))
        .collect::<Vec<_>>()
        .join(",");

    LineItemId::new(format!("{product_id}-{encoded}"))
}

/// Add one unit of `product` with the given option selections.
///
/// If a line with the same identity already exists, its quantity is
/// incremented in place (position in the sequence is preserved). Otherwise a
/// new quantity-1 line is appended, snapshotting the product's current name,
/// price, and first image.
///
/// Caller contract: for products that define options, `options` must hold one
/// resolved value per option name. An empty slice is only valid for products
/// without options; this function does not enforce that.
#[must_use]
pub fn add(items: &[LineItem], product: &Product, options: &[SelectedOption]) -> Vec<LineItem> {
    let line_id = line_item_id(&product.id, options);

    if items.iter().any(|item| item.line_id == line_id) {
        return items
            .iter()
            .map(|item| {
                if item.line_id == line_id {
                    LineItem {
                        quantity: item.quantity.saturating_add(1),
                        ..item.clone()
                    }
                } else {
                    item.clone()
                }
            })
            .collect();
    }

    let mut next = items.to_vec();
    next.push(LineItem {
        line_id,
        product_id: product.id.clone(),
        name: product.name.clone(),
        unit_price: product.price,
        image: product.images.first().cloned().unwrap_or_default(),
        quantity: 1,
        options: options.to_vec(),
    });
    next
}

/// Remove the line with the given identity. No-op when the id is absent.
#[must_use]
pub fn remove(items: &[LineItem], line_id: &LineItemId) -> Vec<LineItem> {
    items
        .iter()
        .filter(|item| item.line_id != *line_id)
        .cloned()
        .collect()
}

/// Replace the quantity of the line with the given identity.
///
/// A quantity below 1 is rejected as a no-op - callers wanting removal at
/// zero must call [`remove`] explicitly. Absent ids are also a no-op.
#[must_use]
pub fn update_quantity(items: &[LineItem], line_id: &LineItemId, quantity: u32) -> Vec<LineItem> {
    if quantity < 1 {
        return items.to_vec();
    }

    items
        .iter()
        .map(|item| {
            if item.line_id == *line_id {
                LineItem {
                    quantity,
                    ..item.clone()
                }
            } else {
                item.clone()
            }
        })
        .collect()
}

/// An empty cart.
#[must_use]
pub fn clear(_items: &[LineItem]) -> Vec<LineItem> {
    Vec::new()
}
