//! Conversions from wire DTOs to domain types.

use uuid::Uuid;

use wildflower_core::{CartItem, ProductRef};

use super::types::{CartLineDto, ProductRefDto};

/// Convert a server cart line into a domain [`CartItem`].
///
/// Server lines carry no client-local IDs; a fresh one is minted since the
/// line is authoritative and any optimistic predecessor is being replaced.
pub fn convert_cart_line(line: CartLineDto) -> CartItem {
    CartItem {
        product: match line.product {
            ProductRefDto::Full(product) => ProductRef::Full(product),
            ProductRefDto::Id(id) => ProductRef::Id(id),
        },
        quantity: line.quantity,
        size: line.size,
        variant: line.variant,
        local_id: Uuid::new_v4(),
    }
}

/// Convert a full server cart.
pub fn convert_cart(lines: Vec<CartLineDto>) -> Vec<CartItem> {
    lines.into_iter().map(convert_cart_line).collect()
}
