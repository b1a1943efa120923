use common::{OrderId, ProductId, UserId};
use domain::OrderError;
use thiserror::Error;

/// Errors that can occur when interacting with a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The product does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// A stock commit would have driven the product's stock negative.
    #[error(
        "Not enough stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The order has already been marked paid.
    #[error("Order already paid: {0}")]
    AlreadyPaid(OrderId),

    /// The cart was saved by someone else since it was loaded.
    #[error("Concurrency conflict for cart of user {user_id}: expected version {expected}, found {actual}")]
    CartConflict {
        user_id: UserId,
        expected: u64,
        actual: u64,
    },

    /// An order with this ID already exists.
    #[error("Duplicate order: {0}")]
    DuplicateOrder(OrderId),

    /// The order violates its creation invariants or status machine.
    #[error("Invalid order: {0}")]
    InvalidOrder(#[from] OrderError),

    /// A persisted value could not be mapped back into the domain.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
