//! Product view consumed by the checkout core.

use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// A product as seen by the checkout core.
///
/// Product CRUD belongs to the catalog; here only price and stock matter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub stock: u32,
}

impl Product {
    /// Creates a product.
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, price: Money, stock: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            stock,
        }
    }
}

/// A (product, quantity) pair to commit against inventory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StockLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl StockLine {
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }

    /// Merges lines for the same product and sorts them by product ID.
    ///
    /// Stores lock products in this order so concurrent batches cannot deadlock.
    pub fn normalize(lines: &[StockLine]) -> Vec<StockLine> {
        let mut merged: std::collections::BTreeMap<ProductId, u32> = Default::default();
        for line in lines {
            *merged.entry(line.product_id.clone()).or_default() += line.quantity;
        }
        merged
            .into_iter()
            .map(|(product_id, quantity)| StockLine {
                product_id,
                quantity,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_merges_and_sorts() {
        let lines = vec![
            StockLine::new("SKU-B", 1),
            StockLine::new("SKU-A", 2),
            StockLine::new("SKU-B", 3),
        ];

        let normalized = StockLine::normalize(&lines);
        assert_eq!(
            normalized,
            vec![StockLine::new("SKU-A", 2), StockLine::new("SKU-B", 4)]
        );
    }
}
