//! In-memory payment gateway for tests and local development.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use domain::{Currency, Money};
use tokio::sync::RwLock;

use crate::error::GatewayError;
use crate::gateway::{IntentStatus, PaymentGateway, PaymentIntent};

#[derive(Debug, Clone)]
struct IntentRecord {
    intent: PaymentIntent,
    amount: Money,
    currency: Currency,
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    intents: HashMap<String, IntentRecord>,
    by_idempotency_key: HashMap<String, String>,
    next_id: u32,
    initial_status: IntentStatus,
    create_failures: VecDeque<GatewayError>,
    status_failures: VecDeque<GatewayError>,
    latency: Option<Duration>,
    create_calls: usize,
    status_calls: usize,
}

/// In-memory payment gateway.
///
/// Intents start in a configurable status and can be moved by hand with
/// [`set_status`](Self::set_status). Failures are scripted per call.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a gateway whose intents start out pending.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a gateway whose intents succeed as soon as they are created.
    pub fn settling() -> Self {
        let state = InMemoryGatewayState {
            initial_status: IntentStatus::Succeeded,
            ..Default::default()
        };
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Sets the status given to intents created from now on.
    pub async fn set_initial_status(&self, status: IntentStatus) {
        self.state.write().await.initial_status = status;
    }

    /// Moves an existing intent to a new status. Returns false if unknown.
    pub async fn set_status(&self, intent_id: &str, status: IntentStatus) -> bool {
        match self.state.write().await.intents.get_mut(intent_id) {
            Some(record) => {
                record.intent.status = status;
                true
            }
            None => false,
        }
    }

    /// Makes the next `create_intent` call fail with `err`.
    pub async fn push_create_failure(&self, err: GatewayError) {
        self.state.write().await.create_failures.push_back(err);
    }

    /// Makes the next `get_status` call fail with `err`.
    pub async fn push_status_failure(&self, err: GatewayError) {
        self.state.write().await.status_failures.push_back(err);
    }

    /// Delays every call by `latency`.
    pub async fn set_latency(&self, latency: Option<Duration>) {
        self.state.write().await.latency = latency;
    }

    /// Returns the number of intents created.
    pub async fn intent_count(&self) -> usize {
        self.state.read().await.intents.len()
    }

    /// Returns an intent by ID.
    pub async fn intent(&self, intent_id: &str) -> Option<PaymentIntent> {
        self.state
            .read()
            .await
            .intents
            .get(intent_id)
            .map(|record| record.intent.clone())
    }

    /// Returns the amount and currency an intent was created for.
    pub async fn charged(&self, intent_id: &str) -> Option<(Money, Currency)> {
        self.state
            .read()
            .await
            .intents
            .get(intent_id)
            .map(|record| (record.amount, record.currency.clone()))
    }

    /// Number of `create_intent` calls seen, including failed ones.
    pub async fn create_calls(&self) -> usize {
        self.state.read().await.create_calls
    }

    /// Number of `get_status` calls seen, including failed ones.
    pub async fn status_calls(&self) -> usize {
        self.state.read().await.status_calls
    }

    async fn simulate_latency(&self) {
        let latency = self.state.read().await.latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn create_intent(
        &self,
        amount: Money,
        currency: &Currency,
        idempotency_key: &str,
    ) -> Result<PaymentIntent, GatewayError> {
        self.simulate_latency().await;
        let mut state = self.state.write().await;
        state.create_calls += 1;

        if let Some(err) = state.create_failures.pop_front() {
            return Err(err);
        }

        if let Some(existing) = state.by_idempotency_key.get(idempotency_key)
            && let Some(record) = state.intents.get(existing)
        {
            return Ok(record.intent.clone());
        }

        state.next_id += 1;
        let id = format!("pi_{:04}", state.next_id);
        let intent = PaymentIntent {
            client_secret: format!("{id}_secret"),
            id: id.clone(),
            status: state.initial_status,
        };

        state
            .by_idempotency_key
            .insert(idempotency_key.to_string(), id.clone());
        state.intents.insert(
            id,
            IntentRecord {
                intent: intent.clone(),
                amount,
                currency: currency.clone(),
            },
        );

        Ok(intent)
    }

    async fn get_status(&self, intent_id: &str) -> Result<IntentStatus, GatewayError> {
        self.simulate_latency().await;
        let mut state = self.state.write().await;
        state.status_calls += 1;

        if let Some(err) = state.status_failures.pop_front() {
            return Err(err);
        }

        state
            .intents
            .get(intent_id)
            .map(|record| record.intent.status)
            .ok_or_else(|| GatewayError::Processor {
                status: 404,
                message: format!("No such payment_intent: '{intent_id}'"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_settle_intent() {
        let gateway = InMemoryPaymentGateway::new();
        let intent = gateway
            .create_intent(Money::from_cents(2000), &Currency::eur(), "order-1")
            .await
            .unwrap();

        assert_eq!(intent.id, "pi_0001");
        assert!(intent.client_secret.starts_with("pi_0001"));
        assert_eq!(
            gateway.get_status(&intent.id).await.unwrap(),
            IntentStatus::Pending
        );

        assert!(gateway.set_status(&intent.id, IntentStatus::Succeeded).await);
        assert_eq!(
            gateway.get_status(&intent.id).await.unwrap(),
            IntentStatus::Succeeded
        );
        assert_eq!(
            gateway.charged(&intent.id).await,
            Some((Money::from_cents(2000), Currency::eur()))
        );
    }

    #[tokio::test]
    async fn test_idempotency_key_reuses_intent() {
        let gateway = InMemoryPaymentGateway::new();
        let first = gateway
            .create_intent(Money::from_cents(100), &Currency::eur(), "order-1")
            .await
            .unwrap();
        let second = gateway
            .create_intent(Money::from_cents(100), &Currency::eur(), "order-1")
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(gateway.intent_count().await, 1);
        assert_eq!(gateway.create_calls().await, 2);
    }

    #[tokio::test]
    async fn test_settling_gateway() {
        let gateway = InMemoryPaymentGateway::settling();
        let intent = gateway
            .create_intent(Money::from_cents(100), &Currency::eur(), "order-1")
            .await
            .unwrap();
        assert_eq!(intent.status, IntentStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_scripted_failures_are_consumed_in_order() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.push_create_failure(GatewayError::Timeout).await;

        let err = gateway
            .create_intent(Money::from_cents(100), &Currency::eur(), "order-1")
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::Timeout);
        assert_eq!(gateway.intent_count().await, 0);

        gateway
            .create_intent(Money::from_cents(100), &Currency::eur(), "order-1")
            .await
            .unwrap();
        assert_eq!(gateway.intent_count().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_intent_is_processor_error() {
        let gateway = InMemoryPaymentGateway::new();
        let err = gateway.get_status("pi_missing").await.unwrap_err();
        assert!(matches!(err, GatewayError::Processor { status: 404, .. }));
    }
}
