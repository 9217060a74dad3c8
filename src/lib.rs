//! Storefront API Library
//!
//! Cart, checkout and payment confirmation for a storefront, served over axum.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod health;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{extract::FromRef, routing::get, Router};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<config::AppConfig>,
    pub event_sender: Arc<events::EventSender>,
    pub auth: Arc<auth::AuthService>,
    pub services: handlers::AppServices,
    pub gateway_configured: bool,
}

impl AppState {
    /// Builds the shared state and every service from one pool and gateway choice.
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: Arc<config::AppConfig>,
        event_sender: Arc<events::EventSender>,
        gateway: Option<Arc<dyn services::payments::PaymentGateway>>,
    ) -> Self {
        let auth = Arc::new(auth::AuthService::new(auth::AuthConfig::from(&*config)));
        let gateway_configured = gateway.is_some();
        let services = handlers::AppServices::new(
            db.clone(),
            event_sender.clone(),
            config.clone(),
            auth.clone(),
            gateway,
        );

        Self {
            db,
            config,
            event_sender,
            auth,
            services,
            gateway_configured,
        }
    }
}

impl FromRef<AppState> for Arc<auth::AuthService> {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

/// Routes mounted under `/api/v1`
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", handlers::auth::auth_routes())
        .nest("/products", handlers::commerce::products_routes())
        .nest("/cart", handlers::commerce::carts_routes())
        .merge(handlers::commerce::checkout_routes())
}

/// Full application router with request ids and HTTP tracing applied.
/// CORS and compression are added by the server binary.
pub fn app_router(state: AppState) -> Router {
    let health = health::health_routes(state.db.clone(), state.gateway_configured);

    Router::new()
        .route("/", get(|| async { "storefront-api up" }))
        .nest("/api/v1", api_v1_routes().with_state(state))
        .nest("/health", health)
        .merge(openapi::openapi_routes())
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
}
