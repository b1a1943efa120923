//! Stripe-compatible payment intents client.

use async_trait::async_trait;
use domain::{Currency, Money};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;

use crate::error::GatewayError;
use crate::gateway::{IntentStatus, PaymentGateway, PaymentIntent};

/// Configuration for connecting to a Stripe-compatible API.
#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// API base URL, e.g. `"https://api.stripe.com"`.
    pub api_base: String,

    /// Secret API key, sent as a bearer token.
    pub secret_key: String,
}

/// HTTP client for the `/v1/payment_intents` endpoints.
#[derive(Debug, Clone)]
pub struct StripeGateway {
    config: StripeConfig,
    http: Client,
}

impl StripeGateway {
    /// Create a new client from the given configuration.
    #[must_use]
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    /// Turns a non-2xx response into a gateway error.
    ///
    /// Rate limiting and server errors are transport-level; any other
    /// rejection is reported by the processor.
    async fn reject(response: Response) -> GatewayError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&text)
            .map(|envelope| envelope.error.message)
            .unwrap_or(text);

        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            GatewayError::Transport(format!("status {status}: {message}"))
        } else {
            GatewayError::Processor {
                status: status.as_u16(),
                message,
            }
        }
    }
}

/// Maps a Stripe payment intent status onto [`IntentStatus`].
pub fn map_status(status: &str) -> IntentStatus {
    match status {
        "succeeded" => IntentStatus::Succeeded,
        "processing"
        | "requires_payment_method"
        | "requires_confirmation"
        | "requires_action"
        | "requires_capture" => IntentStatus::Pending,
        "canceled" => IntentStatus::Failed,
        _ => IntentStatus::Unknown,
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[tracing::instrument(skip(self, amount, currency), fields(amount_cents = amount.cents()))]
    async fn create_intent(
        &self,
        amount: Money,
        currency: &Currency,
        idempotency_key: &str,
    ) -> Result<PaymentIntent, GatewayError> {
        let form = [
            ("amount", amount.cents().to_string()),
            ("currency", currency.code().to_string()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
        ];

        let response = self
            .http
            .post(self.url("/v1/payment_intents"))
            .bearer_auth(&self.config.secret_key)
            .header("Idempotency-Key", idempotency_key)
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::reject(response).await);
        }

        let parsed: IntentResponse = response.json().await?;
        let client_secret = parsed.client_secret.ok_or_else(|| {
            GatewayError::InvalidResponse("payment intent without client_secret".to_string())
        })?;

        Ok(PaymentIntent {
            id: parsed.id,
            client_secret,
            status: map_status(&parsed.status),
        })
    }

    #[tracing::instrument(skip(self))]
    async fn get_status(&self, intent_id: &str) -> Result<IntentStatus, GatewayError> {
        let response = self
            .http
            .get(self.url(&format!("/v1/payment_intents/{intent_id}")))
            .bearer_auth(&self.config.secret_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::reject(response).await);
        }

        let parsed: IntentResponse = response.json().await?;
        Ok(map_status(&parsed.status))
    }
}

#[derive(Debug, Deserialize)]
struct IntentResponse {
    id: String,
    status: String,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(map_status("succeeded"), IntentStatus::Succeeded);
        assert_eq!(map_status("processing"), IntentStatus::Pending);
        assert_eq!(map_status("requires_payment_method"), IntentStatus::Pending);
        assert_eq!(map_status("requires_action"), IntentStatus::Pending);
        assert_eq!(map_status("requires_capture"), IntentStatus::Pending);
        assert_eq!(map_status("canceled"), IntentStatus::Failed);
        assert_eq!(map_status("something_new"), IntentStatus::Unknown);
    }

    #[test]
    fn test_url_joins_base_without_double_slash() {
        let gateway = StripeGateway::new(StripeConfig {
            api_base: "http://localhost:12111/".to_string(),
            secret_key: "sk_test".to_string(),
        });
        assert_eq!(
            gateway.url("/v1/payment_intents"),
            "http://localhost:12111/v1/payment_intents"
        );
    }
}
