//! Read-side order queries.

use common::{ProductId, UserId};
use domain::{Order, Page, PageRequest};
use store::OrderLedger;

use crate::error::Result;

/// Order listings for customers and administrators.
#[derive(Clone)]
pub struct OrderQueries<S> {
    store: S,
}

impl<S: OrderLedger> OrderQueries<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The caller's own orders, oldest first.
    pub async fn my_orders(&self, user_id: UserId) -> Result<Vec<Order>> {
        self.orders_for_user(user_id).await
    }

    pub async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        Ok(self.store.orders_for_user(user_id).await?)
    }

    /// Distinct orders containing the product.
    pub async fn orders_for_product(&self, product_id: &ProductId) -> Result<Vec<Order>> {
        Ok(self.store.orders_for_product(product_id).await?)
    }

    pub async fn list_orders(&self, request: PageRequest) -> Result<Page<Order>> {
        Ok(self.store.list_orders(request).await?)
    }
}
