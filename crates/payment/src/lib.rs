//! Payment gateway adapter.
//!
//! A gateway creates payment intents for an amount and reports their status.
//! Adapters make exactly one call per operation; retry and timeout policy
//! belongs to the caller.

pub mod error;
pub mod gateway;
pub mod memory;
pub mod stripe;

pub use error::GatewayError;
pub use gateway::{IntentStatus, PaymentGateway, PaymentIntent};
pub use memory::InMemoryPaymentGateway;
pub use stripe::{StripeConfig, StripeGateway, map_status};
