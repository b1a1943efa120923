//! Administrative order listings.

use std::str::FromStr;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use common::{ProductId, UserId};
use domain::{OrderSort, Page, PageRequest};
use payment::PaymentGateway;
use serde::Deserialize;
use store::CheckoutStore;

use crate::auth::AdminUser;
use crate::error::ApiError;
use crate::routes::views::{OrderResponse, order_list};
use crate::state::AppState;

/// Paging parameters as sent by clients.
#[derive(Debug, Default, Deserialize)]
pub struct ListOrdersQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl ListOrdersQuery {
    pub fn to_page_request(&self) -> Result<PageRequest, ApiError> {
        let defaults = PageRequest::default();
        let mut sort = OrderSort::default();
        if let Some(field) = &self.sort_by {
            sort.field = field.parse()?;
        }
        if let Some(direction) = &self.sort_order {
            sort.direction = direction.parse()?;
        }

        Ok(PageRequest::new(
            self.page.unwrap_or(defaults.page()),
            self.size.unwrap_or(defaults.size()),
            sort,
        )?)
    }
}

/// GET /api/admin/orders?page&size&sort_by&sort_order
#[tracing::instrument(skip(state))]
pub async fn list<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    _admin: AdminUser,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Page<OrderResponse>>, ApiError>
where
    S: CheckoutStore + Clone + 'static,
    G: PaymentGateway + 'static,
{
    let request = query.to_page_request()?;
    let page = state.orders.list_orders(request).await?;
    Ok(Json(page.map(OrderResponse::from)))
}

/// GET /api/admin/orders/user/{user_id}
#[tracing::instrument(skip(state))]
pub async fn by_user<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    _admin: AdminUser,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<OrderResponse>>, ApiError>
where
    S: CheckoutStore + Clone + 'static,
    G: PaymentGateway + 'static,
{
    let user_id = UserId::from_str(&user_id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid user ID: {e}")))?;
    let orders = state.orders.orders_for_user(user_id).await?;
    Ok(Json(order_list(orders)))
}

/// GET /api/admin/orders/product/{product_id}
#[tracing::instrument(skip(state))]
pub async fn by_product<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    _admin: AdminUser,
    Path(product_id): Path<String>,
) -> Result<Json<Vec<OrderResponse>>, ApiError>
where
    S: CheckoutStore + Clone + 'static,
    G: PaymentGateway + 'static,
{
    let orders = state
        .orders
        .orders_for_product(&ProductId::new(product_id))
        .await?;
    Ok(Json(order_list(orders)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{OrderSortField, SortDirection};

    #[test]
    fn test_defaults() {
        let request = ListOrdersQuery::default().to_page_request().unwrap();
        assert_eq!(request, PageRequest::default());
    }

    #[test]
    fn test_parses_sort() {
        let query = ListOrdersQuery {
            page: Some(2),
            size: Some(20),
            sort_by: Some("createdAt".to_string()),
            sort_order: Some("DESC".to_string()),
        };
        let request = query.to_page_request().unwrap();

        assert_eq!(request.page(), 2);
        assert_eq!(request.size(), 20);
        assert_eq!(request.sort().field, OrderSortField::CreatedAt);
        assert_eq!(request.sort().direction, SortDirection::Desc);
    }

    #[test]
    fn test_rejects_unknown_sort_and_oversized_pages() {
        let unknown = ListOrdersQuery {
            sort_by: Some("price; DROP TABLE orders".to_string()),
            ..Default::default()
        };
        assert!(matches!(unknown.to_page_request(), Err(ApiError::BadRequest(_))));

        let oversized = ListOrdersQuery {
            size: Some(1000),
            ..Default::default()
        };
        assert!(matches!(oversized.to_page_request(), Err(ApiError::BadRequest(_))));
    }
}
