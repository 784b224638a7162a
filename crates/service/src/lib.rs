//! Shopcart service library.
//!
//! This crate provides the shopcart functionality as a library, allowing it
//! to be tested and reused. The aggregate-consistency core lives in
//! [`models`] (the record contract and the two entities) and [`services`]
//! (the operation contract, including the merge resolver); [`routes`] is a
//! thin HTTP layer over it.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
