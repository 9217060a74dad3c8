use crate::errors::{ApiError, ServiceError};
use axum::{
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Path, Request},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ApiError> {
    input
        .validate()
        .map_err(|e| ApiError::ValidationError(format!("Validation failed: {}", e)))
}

/// Map service errors to API errors
pub fn map_service_error(err: ServiceError) -> ApiError {
    ApiError::ServiceError(err)
}

/// JSON body extractor whose rejections use the standard error body.
pub struct AppJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// Path extractor whose rejections use the standard error body.
pub struct AppPath<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for AppPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// `{ success, message }` body for operations with nothing else to return
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Validate)]
    struct Named {
        #[validate(length(min = 1))]
        name: String,
    }

    #[test]
    fn validate_input_maps_to_validation_error() {
        let err = validate_input(&Named {
            name: String::new(),
        })
        .unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(msg) if msg.starts_with("Validation failed")));
    }

    #[test]
    fn success_and_created_status() {
        assert_eq!(success_response(MessageResponse::ok("x")).status(), StatusCode::OK);
        assert_eq!(
            created_response(MessageResponse::ok("x")).status(),
            StatusCode::CREATED
        );
    }
}
