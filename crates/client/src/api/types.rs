//! Wire types for the Wildflower REST API.
//!
//! Kept separate from the domain types in `wildflower-core`: the wire uses
//! camelCase keys, calls the variant dimension `color`, and cart lines carry
//! no client-local IDs.

use serde::{Deserialize, Serialize};

use wildflower_core::{PostId, Product, ProductId};

/// A cart line as returned by `GET /cart` and the cart mutations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineDto {
    /// Full product object, or a bare product ID when the backend has not
    /// expanded the reference.
    pub product: ProductRefDto,
    /// Line quantity.
    pub quantity: u32,
    /// Selected size, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    /// Selected variant. Wire name is `color`.
    #[serde(default, rename = "color", skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

/// Product reference on the wire: embedded object or bare ID string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductRefDto {
    /// Expanded product object.
    Full(Box<Product>),
    /// Bare product ID.
    Id(ProductId),
}

/// Body of `POST /cart`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    /// Product to add.
    pub product_id: ProductId,
    /// Quantity to add (merged into an existing matching line server-side).
    pub quantity: u32,
    /// Selected size, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    /// Selected variant. Wire name is `color`.
    #[serde(rename = "color", skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

/// Body of `PUT /cart/{productId}`.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateQuantityRequest {
    /// New absolute quantity for the line.
    pub quantity: u32,
}

/// Body of `POST /comments`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    /// Post being commented on.
    pub post_id: PostId,
    /// Comment text.
    pub content: String,
}

/// A post pending publication via `POST /post/create` (multipart).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    /// Post caption.
    pub caption: String,
    /// Path to a locally stored image to upload, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
}
