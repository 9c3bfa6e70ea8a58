//! Core types for the Wildflower client.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod id;
pub mod product;

pub use cart::{CartItem, ProductRef};
pub use id::*;
pub use product::Product;
