use async_trait::async_trait;
use domain::{Currency, Money};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// A payment intent as created by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Gateway-assigned intent ID, stored as the order's payment reference.
    pub id: String,
    /// Secret handed to the client so it can complete payment.
    pub client_secret: String,
    pub status: IntentStatus,
}

/// Status of a payment intent, collapsed to what checkout needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    /// The customer has not finished paying yet.
    #[default]
    Pending,
    /// Funds are captured.
    Succeeded,
    /// The intent was canceled or otherwise cannot succeed.
    Failed,
    /// The gateway reported a status we do not recognize.
    Unknown,
}

impl IntentStatus {
    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payment processor that creates intents and reports their status.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates an intent for `amount` in `currency`.
    ///
    /// The idempotency key makes repeated calls for the same order return
    /// the same intent instead of charging twice.
    async fn create_intent(
        &self,
        amount: Money,
        currency: &Currency,
        idempotency_key: &str,
    ) -> Result<PaymentIntent, GatewayError>;

    /// Fetches the current status of an intent.
    async fn get_status(&self, intent_id: &str) -> Result<IntentStatus, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_succeeded_is_succeeded() {
        assert!(IntentStatus::Succeeded.is_succeeded());
        assert!(!IntentStatus::Pending.is_succeeded());
        assert!(!IntentStatus::Failed.is_succeeded());
        assert!(!IntentStatus::Unknown.is_succeeded());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&IntentStatus::Succeeded).unwrap();
        assert_eq!(json, "\"succeeded\"");
        assert_eq!(IntentStatus::Pending.to_string(), "pending");
    }
}
