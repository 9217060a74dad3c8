use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use rust_decimal::Decimal;
use serde_json::Value;
use tempfile::TempDir;
use storefront_api::{
    config::AppConfig,
    db,
    entities::commerce::product,
    errors::ServiceError,
    events::{self, EventSender},
    services::{
        accounts::{LoginInput, RegisterInput, UserProfile},
        commerce::{CreateProductInput, PaymentOrderIntent},
        payments::{compute_signature, verify_signature, PaymentGateway, ProviderOrder, SimulatedGateway},
    },
    AppState,
};
use tokio::sync::mpsc;
use tower::ServiceExt;

pub const JWT_SECRET: &str = "test_secret_key_for_testing_purposes_only_64_characters_long_xx";
pub const GATEWAY_SECRET: &str = "gateway_test_secret";
pub const DEFAULT_PASSWORD: &str = "correct-horse-battery";

/// Provider double that records how often an order was requested.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    calls: AtomicUsize,
}

impl RecordingGateway {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for RecordingGateway {
    async fn create_order(&self, intent: &PaymentOrderIntent) -> Result<ProviderOrder, ServiceError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ProviderOrder {
            provider_order_id: format!("order_test_{}", n),
            amount_minor: intent.amount_minor,
            currency: intent.currency.clone(),
        })
    }

    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        verify_signature(order_id, payment_id, signature, GATEWAY_SECRET)
    }

    fn key_id(&self) -> &str {
        "rzp_test_key"
    }
}

/// Which payment gateway the harness wires in.
#[allow(dead_code)]
pub enum GatewayMode {
    Recording,
    Simulated,
    Missing,
}

/// Helper harness for spinning up an application backed by a SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    #[allow(dead_code)]
    pub gateway: Arc<RecordingGateway>,
    _event_task: tokio::task::JoinHandle<()>,
    _db_dir: Option<TempDir>,
}

#[allow(dead_code)]
impl TestApp {
    /// Application with the recording gateway and simulated payments disabled.
    pub async fn new() -> Self {
        Self::with_gateway(GatewayMode::Recording).await
    }

    pub async fn with_gateway(mode: GatewayMode) -> Self {
        // One connection keeps every query on the same in-memory database
        Self::build(mode, "sqlite::memory:".to_string(), 1, None).await
    }

    /// Application on a file-backed database with a pool of several
    /// connections, so concurrent requests really run side by side.
    pub async fn with_connection_pool() -> Self {
        let dir = tempfile::tempdir().expect("temp dir for test database");
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("storefront.db").display());
        Self::build(GatewayMode::Recording, url, 4, Some(dir)).await
    }

    async fn build(
        mode: GatewayMode,
        database_url: String,
        max_connections: u32,
        db_dir: Option<TempDir>,
    ) -> Self {
        let mut cfg = AppConfig::new(
            database_url,
            JWT_SECRET.to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = max_connections;
        cfg.db_min_connections = 1;
        cfg.db_idle_timeout_secs = 3600;
        cfg.payments_simulated = matches!(mode, GatewayMode::Simulated);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations");

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));
        let event_sender = Arc::new(EventSender::new(event_tx));

        let recording = Arc::new(RecordingGateway::default());
        let gateway: Option<Arc<dyn PaymentGateway>> = match mode {
            GatewayMode::Recording => Some(recording.clone() as Arc<dyn PaymentGateway>),
            GatewayMode::Simulated => Some(Arc::new(SimulatedGateway::with_secret(GATEWAY_SECRET))),
            GatewayMode::Missing => None,
        };

        let state = AppState::new(Arc::new(pool), Arc::new(cfg), event_sender, gateway);
        let router = storefront_api::app_router(state.clone());

        Self {
            router,
            state,
            gateway: recording,
            _event_task: event_task,
            _db_dir: db_dir,
        }
    }

    /// Registers a shopper and returns their profile with a fresh token.
    pub async fn seed_user(&self, email: &str) -> (UserProfile, String) {
        let accounts = self.state.services.accounts.clone();
        accounts
            .register(RegisterInput {
                name: "Test Shopper".to_string(),
                email: email.to_string(),
                password: DEFAULT_PASSWORD.to_string(),
            })
            .await
            .expect("seed user for tests");

        let session = accounts
            .login(LoginInput {
                email: email.to_string(),
                password: DEFAULT_PASSWORD.to_string(),
            })
            .await
            .expect("login seeded user");

        (session.user, session.token)
    }

    pub async fn seed_product(&self, title: &str, price: Decimal) -> product::Model {
        self.state
            .services
            .catalog
            .create_product(CreateProductInput {
                title: title.to_string(),
                price,
                description: "Seeded for integration tests".to_string(),
                category: "electronics".to_string(),
                image: "https://images.storefront.test/test.jpg".to_string(),
            })
            .await
            .expect("seed product for tests")
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let bearer = token.map(|tok| format!("Bearer {}", tok));
        let headers: Vec<(&str, &str)> = bearer
            .iter()
            .map(|value| ("authorization", value.as_str()))
            .collect();
        self.request_with_headers(method, uri, body, &headers).await
    }

    /// Send a body as-is with a JSON content type, for malformed payloads.
    pub async fn request_raw(&self, method: Method, uri: &str, body: &str, token: &str) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {}", token))
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

/// Signature the provider would hand the client for this order and payment.
#[allow(dead_code)]
pub fn provider_signature(order_id: &str, payment_id: &str) -> String {
    compute_signature(order_id, payment_id, GATEWAY_SECRET)
}

#[allow(dead_code)]
pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
