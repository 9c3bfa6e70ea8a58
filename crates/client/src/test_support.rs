//! Scriptable in-memory API for tests.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use wildflower_core::{CartItem, PostId, Product, ProductId};

use crate::api::types::{AddToCartRequest, NewPost};
use crate::api::{ApiError, CommerceApi};

/// Per-operation call counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallCounts {
    pub fetch_cart: u32,
    pub add_to_cart: u32,
    pub remove_from_cart: u32,
    pub update_cart_quantity: u32,
    pub fetch_wishlist: u32,
    pub add_to_wishlist: u32,
    pub remove_from_wishlist: u32,
    pub get_product: u32,
    pub get_products: u32,
    pub create_comment: u32,
    pub like_post: u32,
    pub create_post: u32,
}

#[derive(Default)]
struct MockState {
    products: Vec<Product>,
    server_cart: Vec<CartItem>,
    server_wishlist: Vec<Product>,
    calls: CallCounts,
}

/// In-memory [`CommerceApi`] with failure injection, call counters, and a
/// gate for holding wishlist confirmations in flight.
#[derive(Clone, Default)]
pub struct MockApi {
    state: Arc<Mutex<MockState>>,
    fail_cart: Arc<AtomicBool>,
    fail_wishlist: Arc<AtomicBool>,
    fail_social: Arc<AtomicBool>,
    reject_social: Arc<AtomicBool>,
    cart_gate: Arc<tokio::sync::Mutex<()>>,
    wishlist_gate: Arc<tokio::sync::Mutex<()>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_products(&self, products: Vec<Product>) {
        self.state.lock().unwrap().products = products;
    }

    pub fn set_server_cart(&self, cart: Vec<CartItem>) {
        self.state.lock().unwrap().server_cart = cart;
    }

    pub fn set_server_wishlist(&self, wishlist: Vec<Product>) {
        self.state.lock().unwrap().server_wishlist = wishlist;
    }

    pub fn server_cart(&self) -> Vec<CartItem> {
        self.state.lock().unwrap().server_cart.clone()
    }

    pub fn server_wishlist(&self) -> Vec<Product> {
        self.state.lock().unwrap().server_wishlist.clone()
    }

    pub fn calls(&self) -> CallCounts {
        self.state.lock().unwrap().calls
    }

    pub fn fail_cart(&self, fail: bool) {
        self.fail_cart.store(fail, Ordering::SeqCst);
    }

    pub fn fail_wishlist(&self, fail: bool) {
        self.fail_wishlist.store(fail, Ordering::SeqCst);
    }

    pub fn fail_social(&self, fail: bool) {
        self.fail_social.store(fail, Ordering::SeqCst);
    }

    /// Make social writes fail with a non-retryable error.
    pub fn reject_social(&self, reject: bool) {
        self.reject_social.store(reject, Ordering::SeqCst);
    }

    /// Hold cart mutations in flight until the guard is dropped.
    pub async fn block_cart(&self) -> tokio::sync::OwnedMutexGuard<()> {
        Arc::clone(&self.cart_gate).lock_owned().await
    }

    /// Hold wishlist mutations in flight until the guard is dropped.
    pub async fn block_wishlist(&self) -> tokio::sync::OwnedMutexGuard<()> {
        Arc::clone(&self.wishlist_gate).lock_owned().await
    }

    fn unavailable() -> ApiError {
        ApiError::Unexpected {
            status: 503,
            message: "service unavailable".to_string(),
        }
    }

    fn find_product(&self, product_id: &ProductId) -> Option<Product> {
        self.state
            .lock()
            .unwrap()
            .products
            .iter()
            .find(|p| &p.id == product_id)
            .cloned()
    }
}

#[async_trait]
impl CommerceApi for MockApi {
    async fn fetch_cart(&self) -> Result<Vec<CartItem>, ApiError> {
        self.state.lock().unwrap().calls.fetch_cart += 1;
        if self.fail_cart.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(self.server_cart())
    }

    async fn add_to_cart(&self, request: &AddToCartRequest) -> Result<Vec<CartItem>, ApiError> {
        let _gate = self.cart_gate.lock().await;
        self.state.lock().unwrap().calls.add_to_cart += 1;
        if self.fail_cart.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }

        let product = self
            .find_product(&request.product_id)
            .ok_or_else(|| ApiError::NotFound(request.product_id.to_string()))?;

        let mut state = self.state.lock().unwrap();
        if let Some(line) = state.server_cart.iter_mut().find(|l| {
            l.matches(
                &request.product_id,
                request.size.as_deref(),
                request.variant.as_deref(),
            )
        }) {
            line.quantity += request.quantity;
        } else {
            state.server_cart.push(CartItem::new(
                product,
                request.quantity,
                request.size.clone(),
                request.variant.clone(),
            ));
        }
        Ok(state.server_cart.clone())
    }

    async fn remove_from_cart(
        &self,
        product_id: &ProductId,
        size: Option<&str>,
        variant: Option<&str>,
    ) -> Result<Vec<CartItem>, ApiError> {
        let _gate = self.cart_gate.lock().await;
        self.state.lock().unwrap().calls.remove_from_cart += 1;
        if self.fail_cart.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }

        let mut state = self.state.lock().unwrap();
        state
            .server_cart
            .retain(|l| !l.matches(product_id, size, variant));
        Ok(state.server_cart.clone())
    }

    async fn update_cart_quantity(
        &self,
        product_id: &ProductId,
        quantity: u32,
        size: Option<&str>,
        variant: Option<&str>,
    ) -> Result<Vec<CartItem>, ApiError> {
        let _gate = self.cart_gate.lock().await;
        self.state.lock().unwrap().calls.update_cart_quantity += 1;
        if self.fail_cart.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }

        let mut state = self.state.lock().unwrap();
        if let Some(line) = state
            .server_cart
            .iter_mut()
            .find(|l| l.matches(product_id, size, variant))
        {
            line.quantity = quantity;
        }
        Ok(state.server_cart.clone())
    }

    async fn fetch_wishlist(&self) -> Result<Vec<Product>, ApiError> {
        self.state.lock().unwrap().calls.fetch_wishlist += 1;
        if self.fail_wishlist.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(self.server_wishlist())
    }

    async fn add_to_wishlist(&self, product_id: &ProductId) -> Result<Vec<Product>, ApiError> {
        let _gate = self.wishlist_gate.lock().await;
        self.state.lock().unwrap().calls.add_to_wishlist += 1;
        if self.fail_wishlist.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }

        let product = self
            .find_product(product_id)
            .ok_or_else(|| ApiError::NotFound(product_id.to_string()))?;

        let mut state = self.state.lock().unwrap();
        if !state.server_wishlist.iter().any(|p| &p.id == product_id) {
            state.server_wishlist.push(product);
        }
        Ok(state.server_wishlist.clone())
    }

    async fn remove_from_wishlist(&self, product_id: &ProductId) -> Result<Vec<Product>, ApiError> {
        let _gate = self.wishlist_gate.lock().await;
        self.state.lock().unwrap().calls.remove_from_wishlist += 1;
        if self.fail_wishlist.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }

        let mut state = self.state.lock().unwrap();
        state.server_wishlist.retain(|p| &p.id != product_id);
        Ok(state.server_wishlist.clone())
    }

    async fn get_product(&self, product_id: &ProductId) -> Result<Product, ApiError> {
        self.state.lock().unwrap().calls.get_product += 1;
        self.find_product(product_id)
            .ok_or_else(|| ApiError::NotFound(product_id.to_string()))
    }

    async fn get_products(&self) -> Result<Vec<Product>, ApiError> {
        self.state.lock().unwrap().calls.get_products += 1;
        Ok(self.state.lock().unwrap().products.clone())
    }

    async fn create_comment(&self, _post_id: &PostId, _content: &str) -> Result<(), ApiError> {
        self.state.lock().unwrap().calls.create_comment += 1;
        if self.reject_social.load(Ordering::SeqCst) {
            return Err(ApiError::Unauthorized);
        }
        if self.fail_social.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(())
    }

    async fn like_post(&self, _post_id: &PostId) -> Result<(), ApiError> {
        self.state.lock().unwrap().calls.like_post += 1;
        if self.reject_social.load(Ordering::SeqCst) {
            return Err(ApiError::Unauthorized);
        }
        if self.fail_social.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(())
    }

    async fn create_post(&self, _post: &NewPost) -> Result<(), ApiError> {
        self.state.lock().unwrap().calls.create_post += 1;
        if self.reject_social.load(Ordering::SeqCst) {
            return Err(ApiError::Unauthorized);
        }
        if self.fail_social.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(())
    }
}
