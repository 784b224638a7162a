//! Shopcart Core - Shared types library.
//!
//! This crate provides the common types used across the shopcart service:
//! newtype ID wrappers for shopcarts, items, products, and customers.
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP.
//! This keeps it lightweight and allows it to be used anywhere.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
