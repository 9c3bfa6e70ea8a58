//! Read-through product cache.
//!
//! Catalog reads are memoized with `moka` (5-minute TTL) so that screens
//! re-rendering the same products do not refetch them. Mutable state (cart,
//! wishlist) is never cached here.

use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, instrument};

use wildflower_core::{CartItem, Product, ProductId};

use crate::api::{ApiError, CommerceApi};

const CATALOG_TTL: Duration = Duration::from_secs(300);
const CATALOG_CAPACITY: u64 = 1000;

/// Cached catalog reader over a [`CommerceApi`].
pub struct Catalog<A> {
    api: A,
    products: Cache<String, Product>,
    listing: Cache<(), Vec<Product>>,
}

impl<A: CommerceApi> Catalog<A> {
    /// Create a catalog reader with the default cache policy.
    #[must_use]
    pub fn new(api: A) -> Self {
        Self {
            api,
            products: Cache::builder()
                .max_capacity(CATALOG_CAPACITY)
                .time_to_live(CATALOG_TTL)
                .build(),
            listing: Cache::builder()
                .max_capacity(1)
                .time_to_live(CATALOG_TTL)
                .build(),
        }
    }

    /// Get a product by ID, from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the API request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get_product(&self, product_id: &ProductId) -> Result<Product, ApiError> {
        if let Some(product) = self.products.get(product_id.as_str()).await {
            debug!("Cache hit for product");
            return Ok(product);
        }

        let product = self.api.get_product(product_id).await?;
        self.products
            .insert(product_id.as_str().to_string(), product.clone())
            .await;
        Ok(product)
    }

    /// Get the product listing, from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_products(&self) -> Result<Vec<Product>, ApiError> {
        if let Some(products) = self.listing.get(&()).await {
            debug!("Cache hit for product listing");
            return Ok(products);
        }

        let products = self.api.get_products().await?;
        self.listing.insert((), products.clone()).await;
        for product in &products {
            self.products
                .insert(product.id.as_str().to_string(), product.clone())
                .await;
        }
        Ok(products)
    }

    /// Hydrate bare product references in cart lines from the catalog.
    ///
    /// Lines whose product cannot be fetched keep their bare reference and
    /// keep contributing zero to totals.
    pub async fn hydrate_cart(&self, cart: &mut [CartItem]) {
        for line in cart.iter_mut() {
            if line.product.product().is_some() {
                continue;
            }
            let id = line.product.id().clone();
            match self.get_product(&id).await {
                Ok(product) => line.product = product.into(),
                Err(e) => debug!(error = %e, product_id = %id, "Could not hydrate cart line"),
            }
        }
    }

    /// Invalidate a cached product.
    pub async fn invalidate_product(&self, product_id: &ProductId) {
        self.products.invalidate(product_id.as_str()).await;
    }

    /// Invalidate all cached catalog data.
    pub async fn invalidate_all(&self) {
        self.products.invalidate_all();
        self.listing.invalidate_all();
        self.products.run_pending_tasks().await;
        self.listing.run_pending_tasks().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::MockApi;
    use rust_decimal::Decimal;

    fn product(id: &str) -> Product {
        Product {
            id: ProductId::new(id),
            title: format!("Product {id}"),
            price: Decimal::from(10),
            discount_percent: Decimal::ZERO,
            image_url: None,
            description: None,
        }
    }

    #[tokio::test]
    async fn test_get_product_hits_cache_on_second_read() {
        let api = MockApi::new();
        api.set_products(vec![product("p1")]);
        let catalog = Catalog::new(api.clone());

        let id = ProductId::new("p1");
        let first = catalog.get_product(&id).await.unwrap();
        let second = catalog.get_product(&id).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(api.calls().get_product, 1);
    }

    #[tokio::test]
    async fn test_hydrate_fills_bare_refs() {
        use wildflower_core::ProductRef;

        let api = MockApi::new();
        api.set_products(vec![product("p1")]);
        let catalog = Catalog::new(api);

        let mut cart = vec![CartItem {
            product: ProductRef::Id(ProductId::new("p1")),
            quantity: 2,
            size: None,
            variant: None,
            local_id: uuid::Uuid::new_v4(),
        }];
        assert_eq!(cart.first().unwrap().line_total(), Decimal::ZERO);

        catalog.hydrate_cart(&mut cart).await;
        assert_eq!(cart.first().unwrap().line_total(), Decimal::from(20));
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let api = MockApi::new();
        api.set_products(vec![product("p1")]);
        let catalog = Catalog::new(api.clone());

        let id = ProductId::new("p1");
        catalog.get_product(&id).await.unwrap();
        catalog.invalidate_product(&id).await;
        catalog.get_product(&id).await.unwrap();

        assert_eq!(api.calls().get_product, 2);
    }
}
