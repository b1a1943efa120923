//! Domain error types.

use common::{CartItemId, ProductId};
use thiserror::Error;

use crate::money::Money;
use crate::order::OrderStatus;

/// Errors raised by cart mutations and snapshotting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// Quantity must be at least one.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: i64 },

    /// The requested quantity exceeds the product's current stock.
    #[error("Not enough stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The item is not part of this cart.
    #[error("Cart item not found: {item_id}")]
    ItemNotFound { item_id: CartItemId },

    /// Checkout was attempted on a cart without items.
    #[error("Cart is empty")]
    EmptyCart,
}

/// Errors raised by order construction and status transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// An order needs at least one line.
    #[error("Order has no items")]
    NoItems,

    /// A line was built with a zero quantity.
    #[error("Invalid quantity for product {product_id}: must be greater than 0")]
    InvalidQuantity { product_id: ProductId },

    /// The recorded total does not match the sum of the lines.
    #[error("Order total mismatch: recorded {recorded}, items sum to {computed}")]
    TotalMismatch { recorded: Money, computed: Money },

    /// The order is not in a state that allows the action.
    #[error("Invalid state transition: cannot {action} from {current} state")]
    InvalidStateTransition {
        current: OrderStatus,
        action: &'static str,
    },
}

/// Errors raised while parsing paging parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PagingError {
    #[error("Unknown sort field: {0}")]
    UnknownSortField(String),

    #[error("Unknown sort direction: {0} (expected asc or desc)")]
    UnknownSortDirection(String),

    #[error("Invalid page size: {0} (must be between 1 and {max})", max = crate::paging::MAX_PAGE_SIZE)]
    InvalidPageSize(u32),
}
