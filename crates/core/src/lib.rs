//! Clementine Core - Shared types library.
//!
//! This crate provides common types used across all Clementine components:
//! - `cart` - Cart state, persistence, and synchronization
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, product snapshots, and
//!   cart line items

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
