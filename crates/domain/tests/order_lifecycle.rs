//! Integration tests for the cart to order lifecycle.
//!
//! These tests drive a cart through checkout into a paid order using only the
//! public domain API.

use chrono::Utc;
use domain::{
    Cart, CartError, Money, Order, OrderError, OrderStatus, Page, PageRequest, Product, ProductId,
    StockLine, UserId,
};

fn catalog() -> (Product, Product) {
    (
        Product::new("SKU-001", "Widget A", Money::from_cents(1000), 5),
        Product::new("SKU-002", "Widget B", Money::from_cents(250), 100),
    )
}

mod order_lifecycle {
    use super::*;

    #[test]
    fn cart_to_paid_order() {
        let (widget_a, widget_b) = catalog();
        let user_id = UserId::new();
        let mut cart = Cart::new(user_id);

        cart.add(&widget_a, 2).unwrap();
        cart.add(&widget_b, 4).unwrap();
        assert_eq!(cart.total_price(), Money::from_cents(3000));

        let snapshot = cart.snapshot().unwrap();
        let mut order = Order::place(&snapshot, Utc::now()).unwrap();
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.total_amount(), Money::from_cents(3000));
        assert!(order.is_owned_by(user_id));
        assert_eq!(order.items().len(), 2);

        order.attach_payment_reference("pi_123").unwrap();
        order.mark_paid().unwrap();

        assert_eq!(order.status(), OrderStatus::Paid);
        assert_eq!(order.payment_reference(), Some("pi_123"));
    }

    #[test]
    fn prices_are_frozen_at_placement() {
        let (mut widget_a, _) = catalog();
        let mut cart = Cart::new(UserId::new());
        cart.add(&widget_a, 1).unwrap();

        let order = Order::place(&cart.snapshot().unwrap(), Utc::now()).unwrap();
        widget_a.price = Money::from_cents(9999);

        assert_eq!(order.items()[0].unit_price, Money::from_cents(1000));
        assert_eq!(order.total_amount(), Money::from_cents(1000));
    }

    #[test]
    fn paid_order_rejects_second_payment() {
        let (widget_a, _) = catalog();
        let mut cart = Cart::new(UserId::new());
        cart.add(&widget_a, 1).unwrap();
        let mut order = Order::place(&cart.snapshot().unwrap(), Utc::now()).unwrap();
        order.mark_paid().unwrap();

        let err = order.mark_paid().unwrap_err();
        assert!(matches!(
            err,
            OrderError::InvalidStateTransition {
                current: OrderStatus::Paid,
                ..
            }
        ));
        assert!(order.attach_payment_reference("pi_late").is_err());
    }

    #[test]
    fn stock_lines_follow_order_items() {
        let (widget_a, widget_b) = catalog();
        let mut cart = Cart::new(UserId::new());
        cart.add(&widget_b, 3).unwrap();
        cart.add(&widget_a, 1).unwrap();
        let order = Order::place(&cart.snapshot().unwrap(), Utc::now()).unwrap();

        let lines = StockLine::normalize(&order.stock_lines());

        assert_eq!(
            lines,
            vec![StockLine::new("SKU-001", 1), StockLine::new("SKU-002", 3)]
        );
    }
}

mod cart_rules {
    use super::*;

    #[test]
    fn empty_cart_cannot_be_checked_out() {
        let cart = Cart::new(UserId::new());
        assert_eq!(cart.snapshot().unwrap_err(), CartError::EmptyCart);
    }

    #[test]
    fn merged_quantity_is_checked_against_stock() {
        let (widget_a, _) = catalog();
        let mut cart = Cart::new(UserId::new());
        cart.add(&widget_a, 4).unwrap();

        let err = cart.add(&widget_a, 2).unwrap_err();

        assert_eq!(
            err,
            CartError::InsufficientStock {
                product_id: ProductId::new("SKU-001"),
                requested: 6,
                available: 5,
            }
        );
        assert_eq!(cart.items()[0].quantity, 4);
    }

    #[test]
    fn cleared_cart_has_zero_total() {
        let (widget_a, widget_b) = catalog();
        let mut cart = Cart::new(UserId::new());
        cart.add(&widget_a, 1).unwrap();
        cart.add(&widget_b, 1).unwrap();

        cart.clear();

        assert!(cart.is_empty());
        assert_eq!(cart.total_price(), Money::zero());
    }
}

mod paging {
    use super::*;

    #[test]
    fn page_reports_totals() {
        let request = PageRequest::new(1, 2, Default::default()).unwrap();
        let page = Page::new(vec!["c", "d"], &request, 5);

        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total_elements, 5);
        assert!(!page.last);
        assert_eq!(request.offset(), 2);
    }
}
