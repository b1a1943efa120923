//! Order and order item types.

use chrono::{DateTime, Utc};
use common::{OrderId, OrderItemId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::cart::CartSnapshot;
use crate::error::OrderError;
use crate::money::Money;
use crate::product::StockLine;

use super::OrderStatus;

/// A line of an order with its unit price frozen at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_id: ProductId,
    /// Product name copied at order time for display.
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderItem {
    /// Returns quantity * unit_price.
    pub fn total_price(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// An order in the ledger.
///
/// Everything except `status` and `payment_reference` is fixed at creation.
/// `total_amount` is the contractual settlement amount and is never
/// recomputed from product prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    status: OrderStatus,
    total_amount: Money,
    created_at: DateTime<Utc>,
    payment_reference: Option<String>,
    items: Vec<OrderItem>,
}

impl Order {
    /// Builds a new pending order from a cart snapshot.
    pub fn place(snapshot: &CartSnapshot, created_at: DateTime<Utc>) -> Result<Self, OrderError> {
        let items = snapshot
            .lines
            .iter()
            .map(|line| OrderItem {
                id: OrderItemId::new(),
                product_id: line.product_id.clone(),
                product_name: line.product_name.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
            })
            .collect();

        let order = Self {
            id: OrderId::new(),
            user_id: snapshot.user_id,
            status: OrderStatus::Pending,
            total_amount: snapshot.total,
            created_at,
            payment_reference: None,
            items,
        };
        order.validate()?;
        Ok(order)
    }

    /// Rebuilds an order from persisted state.
    pub fn restore(
        id: OrderId,
        user_id: UserId,
        status: OrderStatus,
        total_amount: Money,
        created_at: DateTime<Utc>,
        payment_reference: Option<String>,
        items: Vec<OrderItem>,
    ) -> Self {
        Self {
            id,
            user_id,
            status,
            total_amount,
            created_at,
            payment_reference,
            items,
        }
    }

    /// Checks the creation invariants: at least one line, every quantity
    /// positive, and the recorded total equal to the sum of the lines.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.items.is_empty() {
            return Err(OrderError::NoItems);
        }

        if let Some(item) = self.items.iter().find(|item| item.quantity == 0) {
            return Err(OrderError::InvalidQuantity {
                product_id: item.product_id.clone(),
            });
        }

        let computed = self.items_total();
        if computed != self.total_amount {
            return Err(OrderError::TotalMismatch {
                recorded: self.total_amount,
                computed,
            });
        }

        Ok(())
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the gateway's payment intent ID, if one was attached.
    pub fn payment_reference(&self) -> Option<&str> {
        self.payment_reference.as_deref()
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    /// Returns true if the order belongs to the given user.
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    /// Returns true if any line references the product.
    pub fn contains_product(&self, product_id: &ProductId) -> bool {
        self.items.iter().any(|item| &item.product_id == product_id)
    }

    /// Sum of quantity * unit_price over all lines.
    pub fn items_total(&self) -> Money {
        self.items.iter().map(OrderItem::total_price).sum()
    }

    /// The stock to commit when this order is paid.
    pub fn stock_lines(&self) -> Vec<StockLine> {
        self.items
            .iter()
            .map(|item| StockLine::new(item.product_id.clone(), item.quantity))
            .collect()
    }

    /// Records the payment intent created for this order.
    pub fn attach_payment_reference(&mut self, reference: impl Into<String>) -> Result<(), OrderError> {
        if !self.status.accepts_payment_reference() {
            return Err(OrderError::InvalidStateTransition {
                current: self.status,
                action: "attach payment reference",
            });
        }
        self.payment_reference = Some(reference.into());
        Ok(())
    }

    /// Transitions `Pending -> Paid`.
    pub fn mark_paid(&mut self) -> Result<(), OrderError> {
        if !self.status.can_pay() {
            return Err(OrderError::InvalidStateTransition {
                current: self.status,
                action: "mark paid",
            });
        }
        self.status = OrderStatus::Paid;
        Ok(())
    }
}
