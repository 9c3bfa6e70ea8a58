//! Wildflower Core - Shared types library.
//!
//! This crate provides the domain types shared by the Wildflower client
//! components:
//! - `client` - Cart/wishlist state engine and offline manager
//! - `integration-tests` - Cross-module scenario tests
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no timers.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, products, and cart lines

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
