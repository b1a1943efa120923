//! Checkout workflow.
//!
//! Turns a user's cart into a pending order with a payment intent, and
//! confirms the order once the gateway reports the payment as succeeded:
//! - [`CheckoutCoordinator`] drives `place_order` and `confirm_order`
//! - [`CartService`] owns cart mutations and the snapshot taken at checkout
//! - [`OrderQueries`] serves order listings
//! - [`GatewayPolicy`] bounds every gateway call with a timeout and retries

pub mod cart;
pub mod coordinator;
pub mod error;
pub mod policy;
pub mod queries;

pub use cart::CartService;
pub use coordinator::{CheckoutCoordinator, PlacedOrder};
pub use error::{CheckoutError, Result};
pub use policy::GatewayPolicy;
pub use queries::OrderQueries;
