use async_trait::async_trait;
use common::{OrderId, ProductId, UserId};
use domain::{Cart, Order, Page, PageRequest, Product, StockLine};

use crate::Result;

/// Authoritative per-product stock.
///
/// Stock is the only state contended by concurrent orders. Every commit is a
/// linearizable check-and-decrement per product; no caller can ever observe
/// negative stock.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Reads a product's current price and stock.
    async fn product(&self, product_id: &ProductId) -> Result<Option<Product>>;

    /// Inserts or replaces a product. Used by the catalog collaborator and for seeding.
    async fn put_product(&self, product: Product) -> Result<()>;

    /// Decrements stock by `quantity` if at least that much is available.
    ///
    /// Fails with `InsufficientStock` without side effects otherwise.
    async fn try_commit(&self, product_id: &ProductId, quantity: u32) -> Result<()>;

    /// Commits a whole set of lines, all-or-nothing.
    ///
    /// Lines for the same product are merged. If any line cannot be
    /// satisfied, decrements already applied within the batch are rolled back
    /// before the error is returned.
    async fn try_commit_batch(&self, lines: &[StockLine]) -> Result<()>;
}

/// Per-user carts.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Loads the user's cart, creating an empty one on first access.
    ///
    /// Item names and prices are the products' current values.
    async fn load_cart(&self, user_id: UserId) -> Result<Cart>;

    /// Persists the cart's items and total.
    ///
    /// Fails with `CartConflict` if the stored version differs from
    /// `cart.version()`. Returns the cart at its new version.
    async fn save_cart(&self, cart: &Cart) -> Result<Cart>;

    /// Removes every item and resets the total, regardless of version.
    async fn clear_cart(&self, user_id: UserId) -> Result<()>;
}

/// Durable record of orders and their items.
#[async_trait]
pub trait OrderLedger: Send + Sync {
    /// Persists a new order together with all of its items as one unit.
    async fn create_order(&self, order: &Order) -> Result<()>;

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Records the gateway's payment intent ID on a pending order.
    async fn attach_payment_reference(&self, order_id: OrderId, reference: &str) -> Result<Order>;

    /// Orders placed by a user, oldest first.
    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>>;

    /// Distinct orders containing the product, oldest first.
    async fn orders_for_product(&self, product_id: &ProductId) -> Result<Vec<Order>>;

    /// A sorted page over all orders.
    async fn list_orders(&self, request: PageRequest) -> Result<Page<Order>>;
}

/// A store that can finalize a paid order atomically.
#[async_trait]
pub trait CheckoutStore: InventoryStore + CartStore + OrderLedger {
    /// Commits stock for every item of a pending order, marks it paid and
    /// clears the owner's cart, as one atomic unit.
    ///
    /// Fails with `AlreadyPaid` if another confirmation won the race and with
    /// `InsufficientStock` (order left pending, stock untouched) if any item
    /// cannot be satisfied. No reader ever sees the order paid without its
    /// stock committed, or stock committed for an order still pending.
    async fn finalize_paid_order(&self, order_id: OrderId) -> Result<Order>;
}
