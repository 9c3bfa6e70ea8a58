//! Product catalog types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// A product as returned by the catalog API.
///
/// The wishlist holds these snapshots directly (keyed by [`ProductId`]);
/// no per-entry metadata is attached to wishlist membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Backend product ID.
    pub id: ProductId,
    /// Display title.
    pub title: String,
    /// Undiscounted unit price.
    pub price: Decimal,
    /// Discount as a percentage of the price (0 means no discount).
    #[serde(default)]
    pub discount_percent: Decimal,
    /// Primary image URL, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Optional long-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Product {
    /// Unit price after applying the discount percentage.
    ///
    /// `effective = discount > 0 ? price × (1 − discount/100) : price`.
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        if self.discount_percent > Decimal::ZERO {
            self.price * (Decimal::ONE - self.discount_percent / Decimal::from(100))
        } else {
            self.price
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(price: i64, discount: i64) -> Product {
        Product {
            id: ProductId::new("p1"),
            title: "Linen shirt".to_string(),
            price: Decimal::from(price),
            discount_percent: Decimal::from(discount),
            image_url: None,
            description: None,
        }
    }

    #[test]
    fn test_effective_price_no_discount() {
        assert_eq!(product(50, 0).effective_price(), Decimal::from(50));
    }

    #[test]
    fn test_effective_price_with_discount() {
        // 100 at 10% off = 90
        assert_eq!(product(100, 10).effective_price(), Decimal::from(90));
    }

    #[test]
    fn test_product_serde_camel_case() {
        let json = serde_json::to_value(product(100, 10)).expect("serialize");
        assert!(json.get("discountPercent").is_some());
        assert!(json.get("discount_percent").is_none());
    }
}
