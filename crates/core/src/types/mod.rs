//! Core types for Clementine.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod id;
pub mod product;

pub use cart::{LineItem, SelectedOption};
pub use id::*;
pub use product::{Product, ProductOption};
