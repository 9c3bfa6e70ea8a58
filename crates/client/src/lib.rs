//! Wildflower client sync core.
//!
//! This crate provides the state-synchronization subsystem of the Wildflower
//! client as a UI-framework-independent library:
//!
//! - [`shopping`] - Cart and wishlist state engine with optimistic mutations,
//!   per-product debounced wishlist confirmation, and in-flight tracking
//! - [`offline`] - Offline manager composing the durable cache store, the
//!   sync queue with bounded retries, and the network monitor
//! - [`api`] - REST API client trait and its `reqwest` implementation
//! - [`catalog`] - Read-through product cache over the API
//! - [`store`] - Subscribable state container used by the engines
//! - [`storage`] - Durable key-value storage backing cache and queue
//!
//! # Architecture
//!
//! The backend is the source of truth. Mutations apply locally first, then
//! confirm against the server; a confirmed response replaces local state
//! wholesale and a failure restores the pre-mutation snapshot. Actions that
//! cannot reach the server are hardened into a durable queue and drained
//! when connectivity returns.
//!
//! # Example
//!
//! ```rust,ignore
//! use wildflower_client::api::HttpApi;
//! use wildflower_client::config::ClientConfig;
//! use wildflower_client::shopping::ShoppingStore;
//!
//! let config = ClientConfig::from_env()?;
//! let api = HttpApi::new(&config);
//! let shopping = ShoppingStore::new(api);
//!
//! shopping.add_to_cart(product, 1, Some("M".into()), None).await;
//! let total = shopping.cart_total();
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod catalog;
pub mod config;
pub mod offline;
pub mod shopping;
pub mod storage;
pub mod store;

#[cfg(test)]
mod test_support;
