//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use checkout::GatewayPolicy;
use domain::Currency;
use payment::StripeConfig;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DATABASE_URL`: PostgreSQL URL; unset runs on the in-memory store
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `10`)
/// - `STRIPE_SECRET_KEY`: gateway key; unset runs on the in-memory gateway
/// - `PAYMENT_API_BASE`: gateway base URL (default: `"https://api.stripe.com"`)
/// - `SETTLEMENT_CURRENCY`: ISO currency code (default: `eur`)
/// - `GATEWAY_TIMEOUT_MS`, `GATEWAY_MAX_ATTEMPTS`, `GATEWAY_BACKOFF_MS`:
///   gateway call policy (defaults: `5000`, `3`, `200`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub stripe_secret_key: Option<String>,
    pub payment_api_base: String,
    pub settlement_currency: Currency,
    pub gateway_timeout_ms: u64,
    pub gateway_max_attempts: u32,
    pub gateway_backoff_ms: u64,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let text = |key: &str| non_empty(&lookup, key);

        Self {
            host: text("HOST").unwrap_or(defaults.host),
            port: parsed(&lookup, "PORT").unwrap_or(defaults.port),
            log_level: text("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match text("LOG_FORMAT") {
                Some(format) if format.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => defaults.log_format,
            },
            database_url: text("DATABASE_URL"),
            database_max_connections: parsed(&lookup, "DATABASE_MAX_CONNECTIONS")
                .unwrap_or(defaults.database_max_connections),
            stripe_secret_key: text("STRIPE_SECRET_KEY"),
            payment_api_base: text("PAYMENT_API_BASE").unwrap_or(defaults.payment_api_base),
            settlement_currency: parsed(&lookup, "SETTLEMENT_CURRENCY")
                .unwrap_or(defaults.settlement_currency),
            gateway_timeout_ms: parsed(&lookup, "GATEWAY_TIMEOUT_MS")
                .unwrap_or(defaults.gateway_timeout_ms),
            gateway_max_attempts: parsed(&lookup, "GATEWAY_MAX_ATTEMPTS")
                .unwrap_or(defaults.gateway_max_attempts),
            gateway_backoff_ms: parsed(&lookup, "GATEWAY_BACKOFF_MS")
                .unwrap_or(defaults.gateway_backoff_ms),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn gateway_policy(&self) -> GatewayPolicy {
        GatewayPolicy {
            timeout: Duration::from_millis(self.gateway_timeout_ms),
            max_attempts: self.gateway_max_attempts,
            backoff: Duration::from_millis(self.gateway_backoff_ms),
        }
    }

    /// Gateway client settings, if a secret key is configured.
    pub fn stripe_config(&self) -> Option<StripeConfig> {
        self.stripe_secret_key.as_ref().map(|secret_key| StripeConfig {
            api_base: self.payment_api_base.clone(),
            secret_key: secret_key.clone(),
        })
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|value| !value.trim().is_empty())
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    non_empty(lookup, key).and_then(|value| value.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            database_max_connections: 10,
            stripe_secret_key: None,
            payment_api_base: "https://api.stripe.com".to_string(),
            settlement_currency: Currency::eur(),
            gateway_timeout_ms: 5000,
            gateway_max_attempts: 3,
            gateway_backoff_ms: 200,
        }
    }
}
