use crate::{
    auth::AuthUser,
    errors::ApiError,
    handlers::common::{
        created_response, map_service_error, success_response, AppJson, MessageResponse,
    },
    services::accounts::{LoginInput, RegisterInput, UpdateProfileInput, UserProfile},
    AppState,
};
use axum::{
    extract::{Json, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub user: UserProfile,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub user: UserProfile,
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me).put(update_me))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterInput,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::errors::ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterInput>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .services
        .accounts
        .register(payload)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(UserResponse {
        success: true,
        message: Some("User registered successfully".to_string()),
        user,
    }))
}

/// Issues a token in the body and as the `token` cookie
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginInput,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Invalid email or password", body = crate::errors::ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginInput>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .services
        .accounts
        .login(payload)
        .await
        .map_err(map_service_error)?;

    let cookie = state.auth.session_cookie(&session.token);

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            success: true,
            message: "Login successful".to_string(),
            token: session.token,
            user: session.user,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses((status = 200, description = "Session cookie cleared", body = MessageResponse)),
    tag = "Auth"
)]
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    info!("Logout requested");
    (
        [(header::SET_COOKIE, state.auth.clear_session_cookie())],
        Json(MessageResponse::ok("Logged out successfully")),
    )
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state
        .services
        .accounts
        .profile(user.user_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(UserResponse {
        success: true,
        message: None,
        user: profile,
    }))
}

#[utoipa::path(
    put,
    path = "/api/v1/auth/me",
    request_body = UpdateProfileInput,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn update_me(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<UpdateProfileInput>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state
        .services
        .accounts
        .update_profile(user.user_id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(UserResponse {
        success: true,
        message: Some("Profile updated successfully".to_string()),
        user: profile,
    }))
}
