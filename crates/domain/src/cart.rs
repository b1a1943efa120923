//! Cart aggregate and the immutable snapshot taken at checkout.

use common::{CartItemId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::CartError;
use crate::money::Money;
use crate::product::Product;

/// A line in a user's cart.
///
/// `product_name` and `unit_price` reflect the product as it was when the
/// cart was loaded; they are never persisted with the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl CartItem {
    /// Returns quantity * unit_price.
    pub fn total_price(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// A user's cart.
///
/// Loaded and saved explicitly per request. `version` is the optimistic
/// concurrency token checked by the store on save; `total_price` is derived
/// and recomputed after every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    user_id: UserId,
    items: Vec<CartItem>,
    total_price: Money,
    version: u64,
}

impl Cart {
    /// Creates an empty, never-saved cart.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            items: Vec::new(),
            total_price: Money::zero(),
            version: 0,
        }
    }

    /// Rebuilds a cart from persisted state, recomputing the total.
    pub fn restore(user_id: UserId, items: Vec<CartItem>, version: u64) -> Self {
        let mut cart = Self {
            user_id,
            items,
            total_price: Money::zero(),
            version,
        };
        cart.recalculate_total();
        cart
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn total_price(&self) -> Money {
        self.total_price
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, item_id: CartItemId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id == item_id)
    }

    /// Adds `quantity` of `product`, merging into an existing line.
    ///
    /// The merged quantity must not exceed the product's current stock.
    pub fn add(&mut self, product: &Product, quantity: i64) -> Result<&CartItem, CartError> {
        let quantity = positive_quantity(quantity)?;

        let index = match self
            .items
            .iter()
            .position(|item| item.product_id == product.id)
        {
            Some(index) => {
                let requested = self.items[index].quantity.saturating_add(quantity);
                ensure_in_stock(product, requested)?;
                let item = &mut self.items[index];
                item.quantity = requested;
                item.unit_price = product.price;
                item.product_name = product.name.clone();
                index
            }
            None => {
                ensure_in_stock(product, quantity)?;
                self.items.push(CartItem {
                    id: CartItemId::new(),
                    product_id: product.id.clone(),
                    product_name: product.name.clone(),
                    unit_price: product.price,
                    quantity,
                });
                self.items.len() - 1
            }
        };

        self.recalculate_total();
        Ok(&self.items[index])
    }

    /// Sets a line's quantity; zero or negative removes the line.
    ///
    /// Returns the updated line, or `None` if it was removed.
    pub fn set_quantity(
        &mut self,
        item_id: CartItemId,
        quantity: i64,
        product: &Product,
    ) -> Result<Option<&CartItem>, CartError> {
        let index = self.position(item_id)?;

        if quantity <= 0 {
            self.items.remove(index);
            self.recalculate_total();
            return Ok(None);
        }

        let quantity = positive_quantity(quantity)?;
        ensure_in_stock(product, quantity)?;

        let item = &mut self.items[index];
        item.quantity = quantity;
        item.unit_price = product.price;
        item.product_name = product.name.clone();
        self.recalculate_total();
        Ok(Some(&self.items[index]))
    }

    /// Removes a line.
    pub fn remove(&mut self, item_id: CartItemId) -> Result<CartItem, CartError> {
        let index = self.position(item_id)?;
        let removed = self.items.remove(index);
        self.recalculate_total();
        Ok(removed)
    }

    /// Removes all lines and resets the total.
    pub fn clear(&mut self) {
        self.items.clear();
        self.recalculate_total();
    }

    /// Takes an immutable priced copy of the cart.
    pub fn snapshot(&self) -> Result<CartSnapshot, CartError> {
        if self.items.is_empty() {
            return Err(CartError::EmptyCart);
        }

        let lines = self
            .items
            .iter()
            .map(|item| SnapshotLine {
                product_id: item.product_id.clone(),
                product_name: item.product_name.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
            .collect();

        Ok(CartSnapshot::new(self.user_id, lines))
    }

    fn position(&self, item_id: CartItemId) -> Result<usize, CartError> {
        self.items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or(CartError::ItemNotFound { item_id })
    }

    fn recalculate_total(&mut self) {
        self.total_price = self.items.iter().map(CartItem::total_price).sum();
    }
}

fn positive_quantity(quantity: i64) -> Result<u32, CartError> {
    u32::try_from(quantity)
        .ok()
        .filter(|q| *q > 0)
        .ok_or(CartError::InvalidQuantity { quantity })
}

fn ensure_in_stock(product: &Product, requested: u32) -> Result<(), CartError> {
    if requested > product.stock {
        return Err(CartError::InsufficientStock {
            product_id: product.id.clone(),
            requested,
            available: product.stock,
        });
    }
    Ok(())
}

/// One priced line of a cart snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

/// Immutable, priced copy of a cart taken when an order is placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub user_id: UserId,
    pub lines: Vec<SnapshotLine>,
    pub total: Money,
}

impl CartSnapshot {
    /// Creates a snapshot, computing the total from the lines.
    pub fn new(user_id: UserId, lines: Vec<SnapshotLine>) -> Self {
        let total = lines
            .iter()
            .map(|line| line.unit_price.multiply(line.quantity))
            .sum();
        Self {
            user_id,
            lines,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget(stock: u32) -> Product {
        Product::new("SKU-001", "Widget", Money::from_cents(1000), stock)
    }

    #[test]
    fn test_add_merges_lines_and_recomputes_total() {
        let mut cart = Cart::new(UserId::new());
        let product = widget(5);

        cart.add(&product, 2).unwrap();
        cart.add(&product, 1).unwrap();

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 3);
        assert_eq!(cart.total_price(), Money::from_cents(3000));
    }

    #[test]
    fn test_add_rejects_non_positive_quantity() {
        let mut cart = Cart::new(UserId::new());
        assert_eq!(
            cart.add(&widget(5), 0).unwrap_err(),
            CartError::InvalidQuantity { quantity: 0 }
        );
        assert!(cart.add(&widget(5), -3).is_err());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_respects_current_stock() {
        let mut cart = Cart::new(UserId::new());
        let product = widget(3);
        cart.add(&product, 2).unwrap();

        let err = cart.add(&product, 2).unwrap_err();
        assert_eq!(
            err,
            CartError::InsufficientStock {
                product_id: ProductId::new("SKU-001"),
                requested: 4,
                available: 3,
            }
        );
        assert_eq!(cart.items()[0].quantity, 2);
    }

    #[test]
    fn test_set_quantity_zero_removes_line() {
        let mut cart = Cart::new(UserId::new());
        let product = widget(5);
        let item_id = cart.add(&product, 2).unwrap().id;

        assert!(cart.set_quantity(item_id, 0, &product).unwrap().is_none());
        assert!(cart.is_empty());
        assert!(cart.total_price().is_zero());
    }

    #[test]
    fn test_set_quantity_updates_total() {
        let mut cart = Cart::new(UserId::new());
        let product = widget(5);
        let item_id = cart.add(&product, 1).unwrap().id;

        cart.set_quantity(item_id, 4, &product).unwrap();
        assert_eq!(cart.total_price(), Money::from_cents(4000));

        assert!(cart.set_quantity(item_id, 6, &product).is_err());
        assert_eq!(cart.item(item_id).unwrap().quantity, 4);
    }

    #[test]
    fn test_unknown_item_is_reported() {
        let mut cart = Cart::new(UserId::new());
        let missing = CartItemId::new();
        assert_eq!(
            cart.remove(missing).unwrap_err(),
            CartError::ItemNotFound { item_id: missing }
        );
    }

    #[test]
    fn test_snapshot_of_empty_cart_fails() {
        let cart = Cart::new(UserId::new());
        assert_eq!(cart.snapshot().unwrap_err(), CartError::EmptyCart);
    }

    #[test]
    fn test_snapshot_is_independent_of_later_mutation() {
        let mut cart = Cart::new(UserId::new());
        let product = widget(5);
        cart.add(&product, 2).unwrap();

        let snapshot = cart.snapshot().unwrap();
        cart.clear();

        assert_eq!(snapshot.total, Money::from_cents(2000));
        assert_eq!(snapshot.lines.len(), 1);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_restore_recomputes_total() {
        let items = vec![CartItem {
            id: CartItemId::new(),
            product_id: ProductId::new("SKU-001"),
            product_name: "Widget".to_string(),
            unit_price: Money::from_cents(250),
            quantity: 4,
        }];
        let cart = Cart::restore(UserId::new(), items, 7);
        assert_eq!(cart.total_price(), Money::from_cents(1000));
        assert_eq!(cart.version(), 7);
    }
}
