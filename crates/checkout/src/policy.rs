//! Timeout and retry policy for payment gateway calls.

use std::future::Future;
use std::time::{Duration, Instant};

use payment::GatewayError;

/// Bounds every gateway call.
///
/// Each attempt runs under `timeout`. Transient failures (`Transport`,
/// `Timeout`) are retried up to `max_attempts` total attempts, sleeping
/// `backoff * attempt` between them. Other errors return immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayPolicy {
    pub timeout: Duration,
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for GatewayPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            max_attempts: 3,
            backoff: Duration::from_millis(200),
        }
    }
}

impl GatewayPolicy {
    /// Runs `call` under this policy, recording per-attempt metrics.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut call: F) -> Result<T, GatewayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let started = Instant::now();
            let result = match tokio::time::timeout(self.timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(GatewayError::Timeout),
            };

            metrics::histogram!("gateway_request_duration_seconds", "operation" => operation)
                .record(started.elapsed().as_secs_f64());
            let outcome = match &result {
                Ok(_) => "ok",
                Err(err) => err.kind(),
            };
            metrics::counter!("gateway_requests_total", "operation" => operation, "outcome" => outcome)
                .increment(1);

            match result {
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    tracing::warn!(operation, attempt, error = %err, "gateway call failed, retrying");
                    tokio::time::sleep(self.backoff * attempt).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> GatewayPolicy {
        GatewayPolicy {
            timeout: Duration::from_millis(50),
            max_attempts,
            backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_retries_transient_errors_until_success() {
        let calls = Arc::new(AtomicU32::new(0));

        let result = fast_policy(3)
            .run("get_status", || {
                let calls = calls.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(GatewayError::Transport("connection reset".into()))
                    } else {
                        Ok(7)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), _> = fast_policy(2)
            .run("get_status", || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(GatewayError::Transport("down".into()))
                }
            })
            .await;

        assert!(matches!(result, Err(GatewayError::Transport(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_processor_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), _> = fast_policy(3)
            .run("create_intent", || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(GatewayError::Processor {
                        status: 402,
                        message: "card declined".into(),
                    })
                }
            })
            .await;

        assert!(matches!(result, Err(GatewayError::Processor { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_slow_calls_time_out() {
        let result: Result<(), _> = fast_policy(1)
            .run("get_status", || async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Ok(())
            })
            .await;

        assert_eq!(result, Err(GatewayError::Timeout));
    }
}
