//! Cart endpoints for the calling user.

use std::str::FromStr;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{CartItemId, ProductId};
use payment::PaymentGateway;
use serde::Deserialize;
use store::CheckoutStore;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::routes::views::CartResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct QuantityQuery {
    pub quantity: i64,
}

/// GET /api/user/cart
#[tracing::instrument(skip(state))]
pub async fn get<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<CartResponse>, ApiError>
where
    S: CheckoutStore + Clone + 'static,
    G: PaymentGateway + 'static,
{
    let cart = state.carts.get_cart(user_id).await?;
    Ok(Json(cart.into()))
}

/// POST /api/user/cart/items
#[tracing::instrument(skip(state, req))]
pub async fn add_item<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<CartResponse>), ApiError>
where
    S: CheckoutStore + Clone + 'static,
    G: PaymentGateway + 'static,
{
    let product_id = ProductId::new(req.product_id);
    let cart = state
        .carts
        .add_item(user_id, &product_id, req.quantity)
        .await?;
    Ok((StatusCode::CREATED, Json(cart.into())))
}

/// PUT /api/user/cart/items/{item_id}?quantity=n
#[tracing::instrument(skip(state))]
pub async fn update_item<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    CurrentUser(user_id): CurrentUser,
    Path(item_id): Path<String>,
    Query(query): Query<QuantityQuery>,
) -> Result<Json<CartResponse>, ApiError>
where
    S: CheckoutStore + Clone + 'static,
    G: PaymentGateway + 'static,
{
    let item_id = parse_item_id(&item_id)?;
    let cart = state
        .carts
        .update_item(user_id, item_id, query.quantity)
        .await?;
    Ok(Json(cart.into()))
}

/// DELETE /api/user/cart/items/{item_id}
#[tracing::instrument(skip(state))]
pub async fn remove_item<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    CurrentUser(user_id): CurrentUser,
    Path(item_id): Path<String>,
) -> Result<Json<CartResponse>, ApiError>
where
    S: CheckoutStore + Clone + 'static,
    G: PaymentGateway + 'static,
{
    let item_id = parse_item_id(&item_id)?;
    let cart = state.carts.remove_item(user_id, item_id).await?;
    Ok(Json(cart.into()))
}

/// DELETE /api/user/cart/clear
#[tracing::instrument(skip(state))]
pub async fn clear<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<StatusCode, ApiError>
where
    S: CheckoutStore + Clone + 'static,
    G: PaymentGateway + 'static,
{
    state.carts.clear_cart(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn parse_item_id(id: &str) -> Result<CartItemId, ApiError> {
    CartItemId::from_str(id).map_err(|e| ApiError::BadRequest(format!("Invalid item ID: {e}")))
}
