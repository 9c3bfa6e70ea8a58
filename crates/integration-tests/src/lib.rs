//! Integration tests for the Wildflower client.
//!
//! The scenarios under `tests/` exercise the shopping engine and the
//! offline manager end to end against [`FakeBackend`], an in-process
//! stand-in for the commerce API with scriptable outages.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p wildflower-integration-tests
//! ```

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use rust_decimal::Decimal;

use wildflower_client::api::types::{AddToCartRequest, NewPost};
use wildflower_client::api::{ApiError, CommerceApi};
use wildflower_core::{CartItem, PostId, Product, ProductId};

/// In-process commerce backend with scriptable outages.
///
/// Holds an authoritative cart and wishlist the way the real server does,
/// so optimistic confirmations observe genuine server-side merge behavior.
#[derive(Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<BackendState>>,
    down: Arc<AtomicBool>,
}

#[derive(Default)]
struct BackendState {
    products: Vec<Product>,
    cart: Vec<CartItem>,
    wishlist: Vec<Product>,
    comments: Vec<(PostId, String)>,
    likes: Vec<PostId>,
    posts: Vec<NewPost>,
}

impl FakeBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a product available in the catalog.
    pub fn stock(&self, product: Product) {
        self.state.lock().unwrap().products.push(product);
    }

    /// Simulate a total outage (every request fails with a 503) or end one.
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    #[must_use]
    pub fn cart(&self) -> Vec<CartItem> {
        self.state.lock().unwrap().cart.clone()
    }

    #[must_use]
    pub fn wishlist(&self) -> Vec<Product> {
        self.state.lock().unwrap().wishlist.clone()
    }

    #[must_use]
    pub fn comments(&self) -> Vec<(PostId, String)> {
        self.state.lock().unwrap().comments.clone()
    }

    #[must_use]
    pub fn likes(&self) -> Vec<PostId> {
        self.state.lock().unwrap().likes.clone()
    }

    #[must_use]
    pub fn posts(&self) -> Vec<NewPost> {
        self.state.lock().unwrap().posts.clone()
    }

    fn check_up(&self) -> Result<(), ApiError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(ApiError::Unexpected {
                status: 503,
                message: "backend down".to_string(),
            });
        }
        Ok(())
    }

    fn product(&self, id: &ProductId) -> Result<Product, ApiError> {
        self.state
            .lock()
            .unwrap()
            .products
            .iter()
            .find(|p| &p.id == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(id.to_string()))
    }
}

#[async_trait]
impl CommerceApi for FakeBackend {
    async fn fetch_cart(&self) -> Result<Vec<CartItem>, ApiError> {
        self.check_up()?;
        Ok(self.cart())
    }

    async fn add_to_cart(&self, request: &AddToCartRequest) -> Result<Vec<CartItem>, ApiError> {
        self.check_up()?;
        let product = self.product(&request.product_id)?;

        let mut state = self.state.lock().unwrap();
        if let Some(line) = state.cart.iter_mut().find(|l| {
            l.matches(
                &request.product_id,
                request.size.as_deref(),
                request.variant.as_deref(),
            )
        }) {
            line.quantity += request.quantity;
        } else {
            state.cart.push(CartItem::new(
                product,
                request.quantity,
                request.size.clone(),
                request.variant.clone(),
            ));
        }
        Ok(state.cart.clone())
    }

    async fn remove_from_cart(
        &self,
        product_id: &ProductId,
        size: Option<&str>,
        variant: Option<&str>,
    ) -> Result<Vec<CartItem>, ApiError> {
        self.check_up()?;
        let mut state = self.state.lock().unwrap();
        state.cart.retain(|l| !l.matches(product_id, size, variant));
        Ok(state.cart.clone())
    }

    async fn update_cart_quantity(
        &self,
        product_id: &ProductId,
        quantity: u32,
        size: Option<&str>,
        variant: Option<&str>,
    ) -> Result<Vec<CartItem>, ApiError> {
        self.check_up()?;
        let mut state = self.state.lock().unwrap();
        if let Some(line) = state
            .cart
            .iter_mut()
            .find(|l| l.matches(product_id, size, variant))
        {
            line.quantity = quantity;
        }
        Ok(state.cart.clone())
    }

    async fn fetch_wishlist(&self) -> Result<Vec<Product>, ApiError> {
        self.check_up()?;
        Ok(self.wishlist())
    }

    async fn add_to_wishlist(&self, product_id: &ProductId) -> Result<Vec<Product>, ApiError> {
        self.check_up()?;
        let product = self.product(product_id)?;
        let mut state = self.state.lock().unwrap();
        if !state.wishlist.iter().any(|p| &p.id == product_id) {
            state.wishlist.push(product);
        }
        Ok(state.wishlist.clone())
    }

    async fn remove_from_wishlist(&self, product_id: &ProductId) -> Result<Vec<Product>, ApiError> {
        self.check_up()?;
        let mut state = self.state.lock().unwrap();
        state.wishlist.retain(|p| &p.id != product_id);
        Ok(state.wishlist.clone())
    }

    async fn get_product(&self, product_id: &ProductId) -> Result<Product, ApiError> {
        self.check_up()?;
        self.product(product_id)
    }

    async fn get_products(&self) -> Result<Vec<Product>, ApiError> {
        self.check_up()?;
        Ok(self.state.lock().unwrap().products.clone())
    }

    async fn create_comment(&self, post_id: &PostId, content: &str) -> Result<(), ApiError> {
        self.check_up()?;
        self.state
            .lock()
            .unwrap()
            .comments
            .push((post_id.clone(), content.to_string()));
        Ok(())
    }

    async fn like_post(&self, post_id: &PostId) -> Result<(), ApiError> {
        self.check_up()?;
        self.state.lock().unwrap().likes.push(post_id.clone());
        Ok(())
    }

    async fn create_post(&self, post: &NewPost) -> Result<(), ApiError> {
        self.check_up()?;
        self.state.lock().unwrap().posts.push(post.clone());
        Ok(())
    }
}

/// A catalog product with the given price, no discount.
#[must_use]
pub fn product(id: &str, price: i64) -> Product {
    Product {
        id: ProductId::new(id),
        title: format!("Product {id}"),
        price: Decimal::from(price),
        discount_percent: Decimal::ZERO,
        image_url: None,
        description: None,
    }
}
