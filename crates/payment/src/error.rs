use thiserror::Error;

/// Errors returned by a payment gateway.
///
/// Transport-level failures and processor-reported failures are distinct;
/// neither says anything about whether a payment succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The request could not be sent or the connection failed.
    #[error("gateway transport error: {0}")]
    Transport(String),

    /// The gateway did not answer in time.
    #[error("gateway request timed out")]
    Timeout,

    /// The gateway answered with a body we could not understand.
    #[error("invalid gateway response: {0}")]
    InvalidResponse(String),

    /// The payment processor rejected the request.
    #[error("payment processor rejected request ({status}): {message}")]
    Processor { status: u16, message: String },
}

impl GatewayError {
    /// Returns true for failures worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout)
    }

    /// Short label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Timeout => "timeout",
            Self::InvalidResponse(_) => "invalid_response",
            Self::Processor { .. } => "processor",
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}
