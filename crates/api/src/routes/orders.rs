//! Order placement, confirmation and history for the calling user.

use std::str::FromStr;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::OrderId;
use payment::PaymentGateway;
use serde::Serialize;
use store::CheckoutStore;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::routes::views::{OrderResponse, order_list};
use crate::state::AppState;

#[derive(Serialize)]
pub struct PlaceOrderResponse {
    pub client_secret: String,
    pub order_id: String,
    pub total_amount_cents: i64,
}

/// POST /api/user/orders/place: turn the cart into a pending order.
#[tracing::instrument(skip(state))]
pub async fn place<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<(StatusCode, Json<PlaceOrderResponse>), ApiError>
where
    S: CheckoutStore + Clone + 'static,
    G: PaymentGateway + 'static,
{
    let placed = state.checkout.place_order(user_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(PlaceOrderResponse {
            client_secret: placed.client_secret,
            order_id: placed.order_id.to_string(),
            total_amount_cents: placed.total_amount.cents(),
        }),
    ))
}

/// POST /api/user/orders/confirm/{order_id}: mark the order paid once the
/// payment has succeeded.
#[tracing::instrument(skip(state))]
pub async fn confirm<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    CurrentUser(user_id): CurrentUser,
    Path(order_id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError>
where
    S: CheckoutStore + Clone + 'static,
    G: PaymentGateway + 'static,
{
    let order_id = OrderId::from_str(&order_id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order ID: {e}")))?;

    let order = state.checkout.confirm_order(user_id, order_id).await?;
    Ok(Json(order.into()))
}

/// GET /api/user/orders
#[tracing::instrument(skip(state))]
pub async fn mine<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Vec<OrderResponse>>, ApiError>
where
    S: CheckoutStore + Clone + 'static,
    G: PaymentGateway + 'static,
{
    let orders = state.orders.my_orders(user_id).await?;
    Ok(Json(order_list(orders)))
}
