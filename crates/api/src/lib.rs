//! HTTP API server with observability for the storefront checkout backend.
//!
//! Provides REST endpoints for carts, order placement and confirmation, and
//! admin order listings, with structured logging (tracing) and Prometheus
//! metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use domain::{Money, Product};
use metrics_exporter_prometheus::PrometheusHandle;
use payment::PaymentGateway;
use store::CheckoutStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, G>(state: Arc<AppState<S, G>>, metrics_handle: PrometheusHandle) -> Router
where
    S: CheckoutStore + Clone + 'static,
    G: PaymentGateway + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/api/user/cart", get(routes::cart::get::<S, G>))
        .route("/api/user/cart/items", post(routes::cart::add_item::<S, G>))
        .route(
            "/api/user/cart/items/{item_id}",
            put(routes::cart::update_item::<S, G>).delete(routes::cart::remove_item::<S, G>),
        )
        .route("/api/user/cart/clear", delete(routes::cart::clear::<S, G>))
        .route("/api/user/orders", get(routes::orders::mine::<S, G>))
        .route("/api/user/orders/place", post(routes::orders::place::<S, G>))
        .route(
            "/api/user/orders/confirm/{order_id}",
            post(routes::orders::confirm::<S, G>),
        )
        .route("/api/admin/orders", get(routes::admin::list::<S, G>))
        .route(
            "/api/admin/orders/user/{user_id}",
            get(routes::admin::by_user::<S, G>),
        )
        .route(
            "/api/admin/orders/product/{product_id}",
            get(routes::admin::by_product::<S, G>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Catalog used when running without a database.
pub fn demo_products() -> Vec<Product> {
    vec![
        Product::new("SKU-1001", "Espresso Beans 1kg", Money::from_cents(2490), 40),
        Product::new("SKU-1002", "Ceramic Pour-Over Dripper", Money::from_cents(1850), 15),
        Product::new("SKU-1003", "Gooseneck Kettle", Money::from_cents(5900), 8),
        Product::new("SKU-1004", "Paper Filters (100)", Money::from_cents(450), 120),
        Product::new("SKU-1005", "Hand Grinder", Money::from_cents(8900), 3),
    ]
}
