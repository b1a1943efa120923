//! Storage for the checkout core.
//!
//! The core depends only on the narrow traits in [`store`]: an inventory
//! store with atomic check-and-decrement, a cart store with optimistic
//! versioning, and an order ledger. [`CheckoutStore`] adds the single
//! operation that must span all three atomically.
//!
//! Two engines implement them: [`InMemoryStore`] and [`PostgresStore`].

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::{CartStore, CheckoutStore, InventoryStore, OrderLedger};
