//! Cart line types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::id::ProductId;
use super::product::Product;

/// Reference to a product from a cart line.
///
/// Lines created optimistically hold the full snapshot; lines coming back
/// from the server may carry only the bare ID until hydrated from the
/// catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductRef {
    /// Fully hydrated product snapshot.
    Full(Box<Product>),
    /// Bare product ID, not yet hydrated.
    Id(ProductId),
}

impl ProductRef {
    /// The product ID regardless of hydration state.
    #[must_use]
    pub fn id(&self) -> &ProductId {
        match self {
            Self::Full(product) => &product.id,
            Self::Id(id) => id,
        }
    }

    /// The hydrated product, if present.
    #[must_use]
    pub const fn product(&self) -> Option<&Product> {
        match self {
            Self::Full(product) => Some(product),
            Self::Id(_) => None,
        }
    }
}

impl From<Product> for ProductRef {
    fn from(product: Product) -> Self {
        Self::Full(Box::new(product))
    }
}

/// A single cart line.
///
/// Merge identity is the `(product_id, size, variant)` tuple. `local_id`
/// exists only to key transient optimistic entries before server
/// confirmation and never participates in merging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Product reference (snapshot or bare ID).
    pub product: ProductRef,
    /// Quantity, always at least 1.
    pub quantity: u32,
    /// Selected size, if the product has sizes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    /// Selected variant (color), if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    /// Client-local line ID for optimistic entries.
    pub local_id: Uuid,
}

impl CartItem {
    /// Create a new line from a full product snapshot.
    #[must_use]
    pub fn new(
        product: Product,
        quantity: u32,
        size: Option<String>,
        variant: Option<String>,
    ) -> Self {
        Self {
            product: product.into(),
            quantity,
            size,
            variant,
            local_id: Uuid::new_v4(),
        }
    }

    /// The product ID of this line.
    #[must_use]
    pub fn product_id(&self) -> &ProductId {
        self.product.id()
    }

    /// Whether this line matches the given merge identity.
    #[must_use]
    pub fn matches(
        &self,
        product_id: &ProductId,
        size: Option<&str>,
        variant: Option<&str>,
    ) -> bool {
        self.product_id() == product_id
            && self.size.as_deref() == size
            && self.variant.as_deref() == variant
    }

    /// Line total: quantity × effective unit price.
    ///
    /// A line whose product is still a bare ID contributes zero; totals
    /// never fail on unhydrated lines.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product
            .product()
            .map_or(Decimal::ZERO, |p| p.effective_price() * Decimal::from(self.quantity))
    }
}
