//! Cart service.

use thiserror::Error;
use tracing::instrument;

use aurelia_core::{ProductId, ShippingPolicy, UserId};

use crate::db::{CartStore, CatalogStore, RepositoryError};
use crate::models::CartView;
use crate::models::order::MAX_LINE_QUANTITY;

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("quantity must be between 1 and 99")]
    InvalidQuantity,

    #[error("product not found")]
    ProductNotFound,

    #[error("only {available} of {product} in stock")]
    InsufficientStock { product: String, available: i32 },

    #[error("item is not in the cart")]
    NotInCart,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Per-user cart operations with stock checks.
pub struct CartService<'a, S> {
    store: &'a S,
    shipping: &'a ShippingPolicy,
}

impl<'a, S: CartStore + CatalogStore> CartService<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S, shipping: &'a ShippingPolicy) -> Self {
        Self { store, shipping }
    }

    /// The user's cart with totals.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    pub async fn view(&self, user: UserId) -> Result<CartView, CartError> {
        let lines = self.store.cart_lines(user).await?;
        Ok(CartView::new(lines, self.shipping))
    }

    /// Add `quantity` of a product, on top of what the cart already holds.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` if the resulting line is outside 1..=99,
    /// `CartError::ProductNotFound` if the product is unknown or inactive, and
    /// `CartError::InsufficientStock` if the line would exceed available stock.
    #[instrument(skip(self))]
    pub async fn add(
        &self,
        user: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartView, CartError> {
        validate_quantity(quantity)?;

        let existing = self
            .store
            .cart_lines(user)
            .await?
            .into_iter()
            .find(|l| l.product_id == product_id)
            .map_or(0, |l| l.quantity);
        let combined = existing.saturating_add(quantity);
        validate_quantity(combined)?;

        self.check_stock(product_id, combined).await?;
        self.store.add_to_cart(user, product_id, quantity).await?;
        self.view(user).await
    }

    /// Replace the quantity of a line. Zero removes it.
    ///
    /// # Errors
    ///
    /// Same as [`Self::add`], plus `CartError::NotInCart` when removing a line
    /// that does not exist.
    #[instrument(skip(self))]
    pub async fn set_quantity(
        &self,
        user: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartView, CartError> {
        if quantity == 0 {
            return self.remove(user, product_id).await;
        }
        validate_quantity(quantity)?;
        self.check_stock(product_id, quantity).await?;
        self.store.set_cart_quantity(user, product_id, quantity).await?;
        self.view(user).await
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotInCart` if the product is not in the cart.
    pub async fn remove(&self, user: UserId, product_id: ProductId) -> Result<CartView, CartError> {
        if !self.store.remove_from_cart(user, product_id).await? {
            return Err(CartError::NotInCart);
        }
        self.view(user).await
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    pub async fn clear(&self, user: UserId) -> Result<(), CartError> {
        Ok(self.store.clear_cart(user).await?)
    }

    async fn check_stock(&self, product_id: ProductId, quantity: i32) -> Result<(), CartError> {
        let product = self
            .store
            .get_product(product_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or(CartError::ProductNotFound)?;

        if quantity > product.stock_quantity {
            return Err(CartError::InsufficientStock {
                product: product.name,
                available: product.stock_quantity,
            });
        }
        Ok(())
    }
}

fn validate_quantity(quantity: i32) -> Result<(), CartError> {
    if quantity < 1 || quantity > MAX_LINE_QUANTITY {
        return Err(CartError::InvalidQuantity);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::NewProduct;

    async fn setup(stock: i32) -> (MemoryStore, ProductId) {
        let store = MemoryStore::new();
        let product = store
            .create_product(NewProduct {
                slug: None,
                name: "Gold Cuff".to_owned(),
                description: String::new(),
                category: aurelia_core::ProductCategory::Bracelets,
                material: "18k Yellow Gold".to_owned(),
                gemstone: None,
                price: Decimal::new(20_000, 2),
                stock_quantity: stock,
                image_url: None,
                is_featured: false,
            })
            .await
            .unwrap();
        (store, product.id)
    }

    #[tokio::test]
    async fn add_accumulates_and_totals() {
        let (store, product) = setup(10).await;
        let shipping = ShippingPolicy::default();
        let cart = CartService::new(&store, &shipping);
        let user = UserId::new(1);

        cart.add(user, product, 1).await.unwrap();
        let view = cart.add(user, product, 2).await.unwrap();

        assert_eq!(view.lines.len(), 1);
        assert_eq!(view.lines[0].quantity, 3);
        assert_eq!(view.totals.subtotal, Decimal::new(60_000, 2));
        assert_eq!(view.totals.shipping_fee, Decimal::ZERO);
    }

    #[tokio::test]
    async fn add_beyond_stock_conflicts() {
        let (store, product) = setup(2).await;
        let shipping = ShippingPolicy::default();
        let cart = CartService::new(&store, &shipping);
        let user = UserId::new(1);

        cart.add(user, product, 2).await.unwrap();
        assert!(matches!(
            cart.add(user, product, 1).await,
            Err(CartError::InsufficientStock { available: 2, .. })
        ));
    }

    #[tokio::test]
    async fn quantity_bounds() {
        let (store, product) = setup(200).await;
        let shipping = ShippingPolicy::default();
        let cart = CartService::new(&store, &shipping);
        let user = UserId::new(1);

        assert!(matches!(cart.add(user, product, 0).await, Err(CartError::InvalidQuantity)));
        assert!(matches!(cart.add(user, product, 100).await, Err(CartError::InvalidQuantity)));
        cart.add(user, product, 99).await.unwrap();
        assert!(matches!(cart.add(user, product, 1).await, Err(CartError::InvalidQuantity)));
    }

    #[tokio::test]
    async fn set_zero_removes() {
        let (store, product) = setup(5).await;
        let shipping = ShippingPolicy::default();
        let cart = CartService::new(&store, &shipping);
        let user = UserId::new(1);

        cart.add(user, product, 2).await.unwrap();
        assert!(cart.set_quantity(user, product, 0).await.unwrap().is_empty());
        assert!(matches!(cart.remove(user, product).await, Err(CartError::NotInCart)));
    }

    #[tokio::test]
    async fn unknown_product() {
        let store = MemoryStore::new();
        let shipping = ShippingPolicy::default();
        let cart = CartService::new(&store, &shipping);
        assert!(matches!(
            cart.add(UserId::new(1), ProductId::new(42), 1).await,
            Err(CartError::ProductNotFound)
        ));
    }
}
