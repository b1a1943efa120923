//! Shared application state.

use checkout::{CartService, CheckoutCoordinator, GatewayPolicy, OrderQueries};
use domain::Currency;
use payment::PaymentGateway;
use store::CheckoutStore;

/// Shared application state accessible from all handlers.
pub struct AppState<S, G>
where
    S: CheckoutStore,
    G: PaymentGateway,
{
    pub checkout: CheckoutCoordinator<S, G>,
    pub carts: CartService<S>,
    pub orders: OrderQueries<S>,
}

impl<S, G> AppState<S, G>
where
    S: CheckoutStore + Clone,
    G: PaymentGateway,
{
    pub fn new(store: S, gateway: G, policy: GatewayPolicy, currency: Currency) -> Self {
        Self {
            checkout: CheckoutCoordinator::new(store.clone(), gateway)
                .with_policy(policy)
                .with_currency(currency),
            carts: CartService::new(store.clone()),
            orders: OrderQueries::new(store),
        }
    }
}
