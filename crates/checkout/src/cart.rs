//! Cart operations and the snapshot taken at checkout.

use common::{CartItemId, ProductId, UserId};
use domain::{Cart, CartSnapshot, Product};
use store::{CartStore, InventoryStore};

use crate::error::{CheckoutError, Result};

/// Loads, mutates and saves carts.
///
/// Every mutation is load -> change -> save with the loaded version, so a
/// concurrent change for the same user surfaces as `Conflict`.
#[derive(Clone)]
pub struct CartService<S> {
    store: S,
}

impl<S> CartService<S>
where
    S: InventoryStore + CartStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the user's cart, creating an empty one on first access.
    pub async fn get_cart(&self, user_id: UserId) -> Result<Cart> {
        Ok(self.store.load_cart(user_id).await?)
    }

    /// Adds a product to the cart, merging with an existing line.
    #[tracing::instrument(skip_all, fields(%user_id, %product_id, quantity))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<Cart> {
        if quantity <= 0 {
            return Err(CheckoutError::InvalidQuantity { quantity });
        }

        let product = self.product(product_id).await?;
        let mut cart = self.store.load_cart(user_id).await?;
        cart.add(&product, quantity)?;
        Ok(self.store.save_cart(&cart).await?)
    }

    /// Sets a line's quantity. Zero or negative removes the line.
    #[tracing::instrument(skip_all, fields(%user_id, %item_id, quantity))]
    pub async fn update_item(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: i64,
    ) -> Result<Cart> {
        let mut cart = self.store.load_cart(user_id).await?;
        let product_id = cart
            .item(item_id)
            .map(|item| item.product_id.clone())
            .ok_or(CheckoutError::CartItemNotFound(item_id))?;

        let product = self.product(&product_id).await?;
        cart.set_quantity(item_id, quantity, &product)?;
        Ok(self.store.save_cart(&cart).await?)
    }

    #[tracing::instrument(skip_all, fields(%user_id, %item_id))]
    pub async fn remove_item(&self, user_id: UserId, item_id: CartItemId) -> Result<Cart> {
        let mut cart = self.store.load_cart(user_id).await?;
        cart.remove(item_id)?;
        Ok(self.store.save_cart(&cart).await?)
    }

    pub async fn clear_cart(&self, user_id: UserId) -> Result<()> {
        Ok(self.store.clear_cart(user_id).await?)
    }

    /// Takes an immutable priced copy of the user's cart.
    ///
    /// Fails with `EmptyCart` if there is nothing to check out.
    pub async fn snapshot(&self, user_id: UserId) -> Result<CartSnapshot> {
        let cart = self.store.load_cart(user_id).await?;
        Ok(cart.snapshot()?)
    }

    async fn product(&self, product_id: &ProductId) -> Result<Product> {
        self.store
            .product(product_id)
            .await?
            .ok_or_else(|| CheckoutError::ProductNotFound(product_id.clone()))
    }
}
