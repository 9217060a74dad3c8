use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Always `false`; lets clients branch on one field for every response shape
    pub success: bool,
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    #[schema(example = "Bad Request")]
    pub error: String,
    /// Human-readable error description
    #[schema(example = "Payment verification failed")]
    pub message: String,
    /// Unique request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "req-abc123xyz")]
    pub request_id: Option<String>,
    /// RFC 3339 timestamp when the error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    fn new(status: StatusCode, message: String) -> Self {
        Self {
            success: false,
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message,
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        sea_orm::error::DbErr,
    ),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Invalid or expired token")]
    InvalidCredential,

    #[error("Invalid email or password")]
    InvalidLogin,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Payment gateway not initialized")]
    GatewayUnavailable,

    #[error("Failed to create order: {0}")]
    GatewayError(String),

    #[error("Payment verification failed")]
    SignatureMismatch,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Hash error: {0}")]
    HashError(String),

    #[error("JWT error: {0}")]
    JwtError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_)
            | Self::InvalidOperation(_)
            | Self::EmptyCart
            | Self::InvalidAmount(_)
            | Self::SignatureMismatch => StatusCode::BAD_REQUEST,
            Self::Unauthenticated | Self::InvalidCredential | Self::InvalidLogin => {
                StatusCode::UNAUTHORIZED
            }
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::DatabaseError(_)
            | Self::GatewayUnavailable
            | Self::GatewayError(_)
            | Self::HashError(_)
            | Self::JwtError(_)
            | Self::InternalError(_)
            | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            // Provider responses stay in the logs
            Self::GatewayError(_) => "Failed to create order".to_string(),
            Self::HashError(_) | Self::JwtError(_) | Self::InternalError(_) | Self::Other(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let err = ErrorResponse::new(status, self.response_message());
        (status, Json(err)).into_response()
    }
}

/// API Error type for HTTP responses
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Service error: {0}")]
    ServiceError(#[from] ServiceError),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Body or path that could not be extracted; keeps the extractor's status
    #[error("Rejected request: {1}")]
    Rejected(StatusCode, String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Rejected(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Delegate to ServiceError's unified status/message methods when applicable
        let (status, error_message) = match self {
            ApiError::ServiceError(service_error) => return service_error.into_response(),
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Rejected(status, msg) => (status, msg),
        };

        (status, Json(ErrorResponse::new(status, error_message))).into_response()
    }
}
