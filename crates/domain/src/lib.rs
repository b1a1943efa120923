//! Domain layer for the storefront checkout backend.
//!
//! Pure types with no I/O:
//! - `Money` and the settlement `Currency`
//! - `Cart` aggregate and the immutable `CartSnapshot` taken at checkout
//! - `Order` with its frozen `OrderItem`s and the `PENDING -> PAID` state machine
//! - Closed-enum paging and sorting for order listings

pub mod cart;
pub mod error;
pub mod money;
pub mod order;
pub mod paging;
pub mod product;

pub use cart::{Cart, CartItem, CartSnapshot, SnapshotLine};
pub use common::{CartItemId, OrderId, OrderItemId, ProductId, UserId};
pub use error::{CartError, OrderError, PagingError};
pub use money::{Currency, Money};
pub use order::{Order, OrderItem, OrderStatus};
pub use paging::{MAX_PAGE_SIZE, OrderSort, OrderSortField, Page, PageRequest, SortDirection};
pub use product::{Product, StockLine};
