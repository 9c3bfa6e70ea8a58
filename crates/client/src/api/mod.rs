//! Wildflower REST API client.
//!
//! # Architecture
//!
//! - The backend is the source of truth - cart mutations return the full
//!   authoritative cart, wishlist mutations return the full wishlist
//! - [`CommerceApi`] is the seam the state engines depend on; [`HttpApi`]
//!   implements it over `reqwest` with a bearer token
//! - Wire DTOs live in [`types`] and are converted to domain types in
//!   `conversions` (the wire calls the variant field `color`)

mod conversions;
pub mod types;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use wildflower_core::{CartItem, PostId, Product, ProductId};

use crate::config::ClientConfig;
use conversions::convert_cart;
use types::{AddToCartRequest, CartLineDto, CreateCommentRequest, NewPost, UpdateQuantityRequest};

/// Errors that can occur when talking to the Wildflower API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connectivity, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bearer token rejected.
    #[error("Unauthorized")]
    Unauthorized,

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Any other non-success response.
    #[error("Unexpected response ({status}): {message}")]
    Unexpected { status: u16, message: String },

    /// Local I/O failed while preparing a request (e.g. reading an upload).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Whether the failure is worth retrying later (queueable).
    ///
    /// Contract violations (bad token, missing resource) are not.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::RateLimited(_) | Self::Unexpected { status: 500..=599, .. }
        )
    }
}

/// The remote API surface consumed by the state engines.
///
/// Implemented by [`HttpApi`] in production and by scriptable mocks in
/// tests.
#[async_trait]
pub trait CommerceApi: Send + Sync {
    /// Fetch the full cart.
    async fn fetch_cart(&self) -> Result<Vec<CartItem>, ApiError>;

    /// Add a line to the cart; returns the full updated cart.
    async fn add_to_cart(&self, request: &AddToCartRequest) -> Result<Vec<CartItem>, ApiError>;

    /// Remove a line from the cart; returns the full updated cart.
    async fn remove_from_cart(
        &self,
        product_id: &ProductId,
        size: Option<&str>,
        variant: Option<&str>,
    ) -> Result<Vec<CartItem>, ApiError>;

    /// Update a line's quantity; returns the full updated cart.
    async fn update_cart_quantity(
        &self,
        product_id: &ProductId,
        quantity: u32,
        size: Option<&str>,
        variant: Option<&str>,
    ) -> Result<Vec<CartItem>, ApiError>;

    /// Fetch the full wishlist.
    async fn fetch_wishlist(&self) -> Result<Vec<Product>, ApiError>;

    /// Add a product to the wishlist; returns the full updated wishlist.
    async fn add_to_wishlist(&self, product_id: &ProductId) -> Result<Vec<Product>, ApiError>;

    /// Remove a product from the wishlist; returns the full updated wishlist.
    async fn remove_from_wishlist(&self, product_id: &ProductId) -> Result<Vec<Product>, ApiError>;

    /// Fetch a single product.
    async fn get_product(&self, product_id: &ProductId) -> Result<Product, ApiError>;

    /// Fetch the product catalog.
    async fn get_products(&self) -> Result<Vec<Product>, ApiError>;

    /// Create a comment on a post.
    async fn create_comment(&self, post_id: &PostId, content: &str) -> Result<(), ApiError>;

    /// Toggle the like state of a post.
    async fn like_post(&self, post_id: &PostId) -> Result<(), ApiError>;

    /// Publish a new post (multipart form with optional image).
    async fn create_post(&self, post: &NewPost) -> Result<(), ApiError>;
}

// =============================================================================
// HttpApi
// =============================================================================

/// `reqwest`-backed implementation of [`CommerceApi`].
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base_url: Url,
    token: String,
}

impl HttpApi {
    /// Create a new API client from configuration.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.api_base_url.clone(),
            token: config.api_token.expose_secret().to_string(),
        }
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url.join(path).map_err(|e| ApiError::Unexpected {
            status: 0,
            message: format!("invalid path {path}: {e}"),
        })
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.bearer_auth(&self.token)
    }

    /// Send a request and map non-success statuses to [`ApiError`].
    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = self.authed(builder).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            let path = response.url().path().to_string();
            return Err(ApiError::NotFound(path));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "API returned non-success status"
            );
            return Err(ApiError::Unexpected {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        Ok(response)
    }

    async fn get_cart_lines(&self, response: reqwest::Response) -> Result<Vec<CartItem>, ApiError> {
        let text = response.text().await?;
        let lines: Vec<CartLineDto> = serde_json::from_str(&text)?;
        Ok(convert_cart(lines))
    }
}

#[async_trait]
impl CommerceApi for HttpApi {
    #[instrument(skip(self))]
    async fn fetch_cart(&self) -> Result<Vec<CartItem>, ApiError> {
        let response = self.send(self.client.get(self.url("cart")?)).await?;
        self.get_cart_lines(response).await
    }

    #[instrument(skip(self, request), fields(product_id = %request.product_id))]
    async fn add_to_cart(&self, request: &AddToCartRequest) -> Result<Vec<CartItem>, ApiError> {
        let response = self
            .send(self.client.post(self.url("cart")?).json(request))
            .await?;
        self.get_cart_lines(response).await
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn remove_from_cart(
        &self,
        product_id: &ProductId,
        size: Option<&str>,
        variant: Option<&str>,
    ) -> Result<Vec<CartItem>, ApiError> {
        let mut url = self.url(&format!("cart/{product_id}"))?;
        append_line_identity(&mut url, size, variant);
        let response = self.send(self.client.delete(url)).await?;
        self.get_cart_lines(response).await
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn update_cart_quantity(
        &self,
        product_id: &ProductId,
        quantity: u32,
        size: Option<&str>,
        variant: Option<&str>,
    ) -> Result<Vec<CartItem>, ApiError> {
        let mut url = self.url(&format!("cart/{product_id}"))?;
        append_line_identity(&mut url, size, variant);
        let response = self
            .send(self.client.put(url).json(&UpdateQuantityRequest { quantity }))
            .await?;
        self.get_cart_lines(response).await
    }

    #[instrument(skip(self))]
    async fn fetch_wishlist(&self) -> Result<Vec<Product>, ApiError> {
        let response = self.send(self.client.get(self.url("wishlist")?)).await?;
        Ok(response.json().await?)
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn add_to_wishlist(&self, product_id: &ProductId) -> Result<Vec<Product>, ApiError> {
        let response = self
            .send(self.client.post(self.url(&format!("wishlist/{product_id}"))?))
            .await?;
        Ok(response.json().await?)
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn remove_from_wishlist(&self, product_id: &ProductId) -> Result<Vec<Product>, ApiError> {
        let response = self
            .send(self.client.delete(self.url(&format!("wishlist/{product_id}"))?))
            .await?;
        Ok(response.json().await?)
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn get_product(&self, product_id: &ProductId) -> Result<Product, ApiError> {
        let response = self
            .send(self.client.get(self.url(&format!("products/{product_id}"))?))
            .await?;
        Ok(response.json().await?)
    }

    #[instrument(skip(self))]
    async fn get_products(&self) -> Result<Vec<Product>, ApiError> {
        let response = self.send(self.client.get(self.url("products")?)).await?;
        Ok(response.json().await?)
    }

    #[instrument(skip(self, content), fields(post_id = %post_id))]
    async fn create_comment(&self, post_id: &PostId, content: &str) -> Result<(), ApiError> {
        let request = CreateCommentRequest {
            post_id: post_id.clone(),
            content: content.to_string(),
        };
        self.send(self.client.post(self.url("comments")?).json(&request))
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(post_id = %post_id))]
    async fn like_post(&self, post_id: &PostId) -> Result<(), ApiError> {
        self.send(self.client.put(self.url(&format!("post/like/{post_id}"))?))
            .await?;
        Ok(())
    }

    #[instrument(skip(self, post))]
    async fn create_post(&self, post: &NewPost) -> Result<(), ApiError> {
        let mut form = reqwest::multipart::Form::new().text("caption", post.caption.clone());

        if let Some(path) = &post.image_path {
            let bytes = tokio::fs::read(path).await?;
            let file_name = std::path::Path::new(path)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("upload.jpg")
                .to_string();
            form = form.part(
                "image",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name),
            );
        }

        self.send(self.client.post(self.url("post/create")?).multipart(form))
            .await?;
        Ok(())
    }
}

/// Append the `(size, variant)` part of a line's merge identity as query
/// parameters. The wire calls the variant dimension `color`.
fn append_line_identity(url: &mut Url, size: Option<&str>, variant: Option<&str>) {
    let mut pairs = url.query_pairs_mut();
    if let Some(size) = size {
        pairs.append_pair("size", size);
    }
    if let Some(variant) = variant {
        pairs.append_pair("color", variant);
    }
}
