//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;
use domain::PagingError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// No usable caller identity on the request.
    Unauthorized(String),
    /// The caller may not use this endpoint.
    Forbidden(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Checkout workflow error.
    Checkout(CheckoutError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Checkout(err) => checkout_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, String) {
    let status = match &err {
        CheckoutError::EmptyCart | CheckoutError::InvalidQuantity { .. } => StatusCode::BAD_REQUEST,
        CheckoutError::Forbidden(_) => StatusCode::FORBIDDEN,
        CheckoutError::NotFound(_)
        | CheckoutError::ProductNotFound(_)
        | CheckoutError::CartItemNotFound(_) => StatusCode::NOT_FOUND,
        CheckoutError::AlreadyPaid(_)
        | CheckoutError::InsufficientStock { .. }
        | CheckoutError::Conflict(_) => StatusCode::CONFLICT,
        CheckoutError::PaymentNotComplete { .. } => StatusCode::PAYMENT_REQUIRED,
        CheckoutError::Gateway(_) => StatusCode::BAD_GATEWAY,
        CheckoutError::InvalidOrder(_) | CheckoutError::Store(_) => {
            tracing::error!(error = %err, "internal server error");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            );
        }
    };
    (status, err.to_string())
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

impl From<PagingError> for ApiError {
    fn from(err: PagingError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}
