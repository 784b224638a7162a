//! Business operations over the shopcart aggregate.

pub mod shopcarts;

pub use shopcarts::*;
