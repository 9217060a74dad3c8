pub mod auth;
pub mod commerce;
pub mod common;

use crate::{
    auth::AuthService,
    config::AppConfig,
    db::DbPool,
    events::EventSender,
    services::{
        accounts::AccountService,
        commerce::{CartService, CheckoutService, ProductCatalogService},
        payments::{PaymentConfirmationService, PaymentGateway},
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub accounts: Arc<AccountService>,
    pub catalog: Arc<ProductCatalogService>,
    pub cart: Arc<CartService>,
    pub checkout: Arc<CheckoutService>,
    pub payments: Arc<PaymentConfirmationService>,
}

impl AppServices {
    /// Wires every service against one pool, event channel and gateway.
    /// `gateway` is `None` when no provider could be configured.
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
        auth_service: Arc<AuthService>,
        gateway: Option<Arc<dyn PaymentGateway>>,
    ) -> Self {
        let accounts = Arc::new(AccountService::new(
            db_pool.clone(),
            event_sender.clone(),
            auth_service,
        ));
        let catalog = Arc::new(ProductCatalogService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let cart = Arc::new(CartService::new(db_pool.clone(), event_sender.clone()));
        let checkout = Arc::new(CheckoutService::new(
            db_pool.clone(),
            event_sender.clone(),
            config.clone(),
            gateway.clone(),
        ));
        let payments = Arc::new(PaymentConfirmationService::new(
            db_pool,
            event_sender,
            gateway,
            config.payments_simulated,
        ));

        Self {
            accounts,
            catalog,
            cart,
            checkout,
            payments,
        }
    }
}
