/*!
 * # Health Check Module
 *
 * - `/health` - database ping plus payment gateway presence
 * - `/health/live` - process liveness
 * - `/health/version` - build information
 */

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, error};

/// Basic health status
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
    Degraded,
}

/// Health check detail
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HealthDetail {
    pub status: HealthStatus,
    pub message: Option<String>,
}

/// Overall health information
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HealthInfo {
    pub status: HealthStatus,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub details: HashMap<String, HealthDetail>,
}

/// Health check state
#[derive(Clone)]
pub struct HealthState {
    pub db_pool: Arc<DatabaseConnection>,
    pub gateway_configured: bool,
    pub start_time: SystemTime,
}

impl HealthState {
    pub fn new(db_pool: Arc<DatabaseConnection>, gateway_configured: bool) -> Self {
        Self {
            db_pool,
            gateway_configured,
            start_time: SystemTime::now(),
        }
    }

    /// Calculate system uptime
    pub fn uptime(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.start_time)
            .unwrap_or(Duration::from_secs(0))
            .as_secs()
    }

    pub async fn check(&self) -> HealthInfo {
        let mut details = HashMap::new();

        details.insert(
            "database".to_string(),
            match crate::db::check_connection(&self.db_pool).await {
                Ok(_) => HealthDetail {
                    status: HealthStatus::Up,
                    message: None,
                },
                Err(e) => {
                    error!("Database health check failed: {}", e);
                    HealthDetail {
                        status: HealthStatus::Down,
                        message: Some("database unreachable".to_string()),
                    }
                }
            },
        );

        // Checkout cannot work without a gateway but the rest of the API can
        details.insert(
            "payment_gateway".to_string(),
            if self.gateway_configured {
                HealthDetail {
                    status: HealthStatus::Up,
                    message: None,
                }
            } else {
                HealthDetail {
                    status: HealthStatus::Degraded,
                    message: Some("Payment gateway not initialized".to_string()),
                }
            },
        );

        HealthInfo {
            status: overall_status(&details),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
            uptime_seconds: self.uptime(),
            details,
        }
    }
}

fn overall_status(details: &HashMap<String, HealthDetail>) -> HealthStatus {
    if details.values().any(|d| d.status == HealthStatus::Down) {
        HealthStatus::Down
    } else if details.values().any(|d| d.status == HealthStatus::Degraded) {
        HealthStatus::Degraded
    } else {
        HealthStatus::Up
    }
}

/// Returns build and version information
pub async fn version_info() -> impl IntoResponse {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "commit": option_env!("GIT_HASH").unwrap_or("unknown"),
    }))
}

pub async fn health_check(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    debug!("Health check endpoint called");

    let health = state.check().await;
    let status_code = match health.status {
        HealthStatus::Up | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

pub async fn liveness_check(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "alive": true,
            "uptime_seconds": state.uptime(),
            "timestamp": Utc::now(),
        })),
    )
}

/// Creates router with health check endpoints
pub fn health_routes(db_pool: Arc<DatabaseConnection>, gateway_configured: bool) -> Router {
    let health_state = Arc::new(HealthState::new(db_pool, gateway_configured));

    Router::new()
        .route("/", get(health_check))
        .route("/live", get(liveness_check))
        .route("/version", get(version_info))
        .with_state(health_state)
}
