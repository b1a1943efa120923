//! Checkout error types.

use common::{CartItemId, OrderId, ProductId};
use domain::{CartError, OrderError};
use payment::{GatewayError, IntentStatus};
use store::StoreError;
use thiserror::Error;

/// Errors that can occur during checkout operations.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The cart has no items.
    #[error("Cart is empty")]
    EmptyCart,

    /// A cart quantity was zero or negative.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: i64 },

    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("Cart item not found: {0}")]
    CartItemNotFound(CartItemId),

    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// The order belongs to another user.
    #[error("Order {0} does not belong to the requesting user")]
    Forbidden(OrderId),

    #[error("Order already paid: {0}")]
    AlreadyPaid(OrderId),

    /// The gateway has not reported the payment as succeeded.
    #[error("Payment for order {order_id} is not complete (status: {status})")]
    PaymentNotComplete {
        order_id: OrderId,
        status: IntentStatus,
    },

    #[error(
        "Not enough stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The cart was modified concurrently.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The payment gateway failed.
    #[error("Payment gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// An order violated its own invariants.
    #[error("Invalid order: {0}")]
    InvalidOrder(#[from] OrderError),

    /// A storage fault.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl CheckoutError {
    /// Short label used for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::EmptyCart => "empty_cart",
            Self::InvalidQuantity { .. } => "invalid_quantity",
            Self::ProductNotFound(_) => "product_not_found",
            Self::CartItemNotFound(_) => "cart_item_not_found",
            Self::NotFound(_) => "not_found",
            Self::Forbidden(_) => "forbidden",
            Self::AlreadyPaid(_) => "already_paid",
            Self::PaymentNotComplete { .. } => "payment_not_complete",
            Self::InsufficientStock { .. } => "insufficient_stock",
            Self::Conflict(_) => "conflict",
            Self::Gateway(_) => "gateway",
            Self::InvalidOrder(_) => "invalid_order",
            Self::Store(_) => "store",
        }
    }
}

impl From<StoreError> for CheckoutError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ProductNotFound(product_id) => Self::ProductNotFound(product_id),
            StoreError::OrderNotFound(order_id) => Self::NotFound(order_id),
            StoreError::AlreadyPaid(order_id) => Self::AlreadyPaid(order_id),
            StoreError::InsufficientStock {
                product_id,
                requested,
                available,
            } => Self::InsufficientStock {
                product_id,
                requested,
                available,
            },
            StoreError::CartConflict { .. } => Self::Conflict(err.to_string()),
            StoreError::InvalidOrder(err) => Self::InvalidOrder(err),
            other => Self::Store(other),
        }
    }
}

impl From<CartError> for CheckoutError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::InvalidQuantity { quantity } => Self::InvalidQuantity { quantity },
            CartError::InsufficientStock {
                product_id,
                requested,
                available,
            } => Self::InsufficientStock {
                product_id,
                requested,
                available,
            },
            CartError::ItemNotFound { item_id } => Self::CartItemNotFound(item_id),
            CartError::EmptyCart => Self::EmptyCart,
        }
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
