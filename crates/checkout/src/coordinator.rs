//! Order placement and confirmation.

use chrono::Utc;
use common::{OrderId, UserId};
use domain::{Currency, Money, Order, OrderStatus};
use payment::{IntentStatus, PaymentGateway};
use serde::{Deserialize, Serialize};
use store::{CheckoutStore, StoreError};

use crate::cart::CartService;
use crate::error::{CheckoutError, Result};
use crate::policy::GatewayPolicy;

/// What the client needs to complete payment for a freshly placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub client_secret: String,
    pub order_id: OrderId,
    pub total_amount: Money,
}

/// Drives an order from cart to `PAID`.
///
/// Placement freezes the cart into a pending order and opens a payment
/// intent; stock is untouched. Confirmation checks the gateway and, only if
/// the payment succeeded, commits stock, marks the order paid and clears the
/// cart in one atomic store operation.
pub struct CheckoutCoordinator<S, G>
where
    S: CheckoutStore,
    G: PaymentGateway,
{
    store: S,
    carts: CartService<S>,
    gateway: G,
    policy: GatewayPolicy,
    currency: Currency,
}

impl<S, G> CheckoutCoordinator<S, G>
where
    S: CheckoutStore + Clone,
    G: PaymentGateway,
{
    /// Creates a coordinator with the default gateway policy, settling in EUR.
    pub fn new(store: S, gateway: G) -> Self {
        Self {
            carts: CartService::new(store.clone()),
            store,
            gateway,
            policy: GatewayPolicy::default(),
            currency: Currency::default(),
        }
    }

    pub fn with_policy(mut self, policy: GatewayPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    /// Turns the user's cart into a pending order and opens a payment intent.
    ///
    /// If the gateway fails, the order stays `PENDING` without a payment
    /// reference and the gateway error is returned.
    #[tracing::instrument(skip_all, fields(%user_id))]
    pub async fn place_order(&self, user_id: UserId) -> Result<PlacedOrder> {
        let snapshot = self.carts.snapshot(user_id).await?;
        let order = Order::place(&snapshot, Utc::now())?;
        let order_id = order.id();

        self.store.create_order(&order).await?;
        metrics::counter!("orders_placed_total").increment(1);
        tracing::info!(%order_id, total = %order.total_amount(), "order placed");

        let idempotency_key = order_id.to_string();
        let (gateway, currency, key) = (&self.gateway, &self.currency, idempotency_key.as_str());
        let amount = order.total_amount();
        let intent = self
            .policy
            .run("create_intent", move || gateway.create_intent(amount, currency, key))
            .await
            .inspect_err(|err| {
                tracing::warn!(%order_id, error = %err, "payment intent creation failed, order left pending");
            })?;

        self.store
            .attach_payment_reference(order_id, &intent.id)
            .await?;

        Ok(PlacedOrder {
            client_secret: intent.client_secret,
            order_id,
            total_amount: order.total_amount(),
        })
    }

    /// Marks a pending order paid once the gateway reports success.
    ///
    /// Always consults the gateway's current status and the current stock.
    #[tracing::instrument(skip_all, fields(%user_id, %order_id))]
    pub async fn confirm_order(&self, user_id: UserId, order_id: OrderId) -> Result<Order> {
        let result = self.try_confirm(user_id, order_id).await;

        match &result {
            Ok(_) => {
                metrics::counter!("orders_confirmed_total").increment(1);
                tracing::info!("order confirmed");
            }
            Err(err) => {
                metrics::counter!("order_confirmation_failures_total", "reason" => err.reason())
                    .increment(1);
            }
        }

        result
    }

    async fn try_confirm(&self, user_id: UserId, order_id: OrderId) -> Result<Order> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(CheckoutError::NotFound(order_id))?;

        if !order.is_owned_by(user_id) {
            return Err(CheckoutError::Forbidden(order_id));
        }

        if order.status() == OrderStatus::Paid {
            return Err(CheckoutError::AlreadyPaid(order_id));
        }

        let status = self.payment_status(&order).await;
        if !status.is_succeeded() {
            return Err(CheckoutError::PaymentNotComplete { order_id, status });
        }

        match self.store.finalize_paid_order(order_id).await {
            Ok(order) => Ok(order),
            Err(StoreError::InsufficientStock {
                product_id,
                requested,
                available,
            }) => {
                tracing::error!(
                    %order_id,
                    %product_id,
                    requested,
                    available,
                    payment_reference = order.payment_reference().unwrap_or_default(),
                    "payment succeeded but stock could not be committed; order left pending for reconciliation"
                );
                Err(CheckoutError::InsufficientStock {
                    product_id,
                    requested,
                    available,
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Current gateway status of the order's payment. Fails closed: no
    /// reference or a gateway error reads as `Unknown`.
    async fn payment_status(&self, order: &Order) -> IntentStatus {
        let Some(reference) = order.payment_reference() else {
            return IntentStatus::Unknown;
        };

        let gateway = &self.gateway;
        match self
            .policy
            .run("get_status", move || gateway.get_status(reference))
            .await
        {
            Ok(status) => status,
            Err(err) => {
                tracing::warn!(order_id = %order.id(), error = %err, "payment status unavailable");
                IntentStatus::Unknown
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ProductId;
    use domain::Product;
    use payment::{GatewayError, InMemoryPaymentGateway};
    use std::time::Duration;
    use store::{InMemoryStore, InventoryStore, OrderLedger};

    type Coordinator = CheckoutCoordinator<InMemoryStore, InMemoryPaymentGateway>;

    fn fast_policy() -> GatewayPolicy {
        GatewayPolicy {
            timeout: Duration::from_millis(100),
            max_attempts: 2,
            backoff: Duration::from_millis(1),
        }
    }

    async fn setup(stock: u32) -> (Coordinator, InMemoryStore, InMemoryPaymentGateway) {
        let store = InMemoryStore::with_products([Product::new(
            "SKU-A",
            "Product A",
            Money::from_cents(1000),
            stock,
        )])
        .await;
        let gateway = InMemoryPaymentGateway::new();
        let coordinator =
            CheckoutCoordinator::new(store.clone(), gateway.clone()).with_policy(fast_policy());
        (coordinator, store, gateway)
    }

    async fn fill_cart(store: &InMemoryStore, user: UserId, quantity: i64) {
        CartService::new(store.clone())
            .add_item(user, &ProductId::new("SKU-A"), quantity)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_place_order_creates_pending_order_with_intent() {
        let (coordinator, store, gateway) = setup(5).await;
        let user = UserId::new();
        fill_cart(&store, user, 2).await;

        let placed = coordinator.place_order(user).await.unwrap();
        assert_eq!(placed.total_amount, Money::from_cents(2000));

        let order = store.get_order(placed.order_id).await.unwrap().unwrap();
        assert_eq!(order.status(), OrderStatus::Pending);
        let reference = order.payment_reference().unwrap();
        assert_eq!(
            gateway.intent(reference).await.unwrap().client_secret,
            placed.client_secret
        );
        assert_eq!(
            gateway.charged(reference).await,
            Some((Money::from_cents(2000), Currency::eur()))
        );

        // placement never touches stock
        assert_eq!(store.stock(&ProductId::new("SKU-A")).await, Some(5));
    }

    #[tokio::test]
    async fn test_place_order_on_empty_cart() {
        let (coordinator, store, gateway) = setup(5).await;

        let err = coordinator.place_order(UserId::new()).await.unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));
        assert_eq!(store.order_count().await, 0);
        assert_eq!(gateway.create_calls().await, 0);
    }

    #[tokio::test]
    async fn test_gateway_failure_leaves_pending_order_without_reference() {
        let (coordinator, store, gateway) = setup(5).await;
        let user = UserId::new();
        fill_cart(&store, user, 1).await;
        gateway
            .push_create_failure(GatewayError::Processor {
                status: 400,
                message: "bad currency".into(),
            })
            .await;

        let err = coordinator.place_order(user).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Gateway(_)));

        let orders = store.orders_for_user(user).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status(), OrderStatus::Pending);
        assert_eq!(orders[0].payment_reference(), None);
    }

    #[tokio::test]
    async fn test_transient_create_failure_is_retried_with_same_key() {
        let (coordinator, store, gateway) = setup(5).await;
        let user = UserId::new();
        fill_cart(&store, user, 1).await;
        gateway
            .push_create_failure(GatewayError::Transport("reset".into()))
            .await;

        coordinator.place_order(user).await.unwrap();
        assert_eq!(gateway.create_calls().await, 2);
        assert_eq!(gateway.intent_count().await, 1);
    }

    #[tokio::test]
    async fn test_confirm_checks_ownership_before_payment() {
        let (coordinator, store, gateway) = setup(5).await;
        let user = UserId::new();
        fill_cart(&store, user, 1).await;
        let placed = coordinator.place_order(user).await.unwrap();

        let err = coordinator
            .confirm_order(UserId::new(), placed.order_id)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Forbidden(_)));
        assert_eq!(gateway.status_calls().await, 0);

        let err = coordinator
            .confirm_order(user, OrderId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_confirm_without_reference_fails_closed() {
        let (coordinator, store, gateway) = setup(5).await;
        let user = UserId::new();
        fill_cart(&store, user, 1).await;
        gateway
            .push_create_failure(GatewayError::InvalidResponse("{}".into()))
            .await;
        coordinator.place_order(user).await.unwrap_err();
        let order_id = store.orders_for_user(user).await.unwrap()[0].id();

        let err = coordinator.confirm_order(user, order_id).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::PaymentNotComplete {
                status: IntentStatus::Unknown,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_status_timeout_fails_closed() {
        let (coordinator, store, gateway) = setup(5).await;
        let user = UserId::new();
        fill_cart(&store, user, 1).await;
        let placed = coordinator.place_order(user).await.unwrap();
        let reference = store
            .get_order(placed.order_id)
            .await
            .unwrap()
            .unwrap()
            .payment_reference()
            .unwrap()
            .to_string();
        gateway.set_status(&reference, IntentStatus::Succeeded).await;
        gateway.set_latency(Some(Duration::from_millis(500))).await;

        let err = coordinator
            .confirm_order(user, placed.order_id)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::PaymentNotComplete {
                status: IntentStatus::Unknown,
                ..
            }
        ));
        assert_eq!(store.stock(&ProductId::new("SKU-A")).await, Some(5));
    }
}
