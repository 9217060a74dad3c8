/*!
 * # Authentication Module
 *
 * Credential verification for the storefront. A shopper proves identity with
 * an HS256 JWT carried either as `Authorization: Bearer <token>` or as the
 * `token` cookie set at login. The bearer header wins when both are present.
 *
 * Protected handlers take an [`AuthUser`] argument; the extractor rejects the
 * request before the handler runs:
 *
 * - no credential: 401 "Authentication required"
 * - bad signature, expired, wrong issuer/audience: 401 "Invalid or expired token"
 * - verifier misconfigured: 500
 */

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};
use uuid::Uuid;

use crate::errors::ServiceError;

pub mod user;

/// Name of the cookie carrying the session token
pub const TOKEN_COOKIE: &str = "token";

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,   // Subject (user ID)
    pub name: String,  // User's display name
    pub email: String, // User's email
    pub jti: String,   // JWT ID
    pub iat: i64,      // Issued at time
    pub exp: i64,      // Expiration time
    pub nbf: i64,      // Not valid before time
    pub iss: String,   // Issuer
    pub aud: String,   // Audience
}

/// Authenticated shopper resolved from a verified credential
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub token_id: String,
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub token_expiration: Duration,
    pub cookie_secure: bool,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        jwt_issuer: String,
        jwt_audience: String,
        token_expiration: Duration,
    ) -> Self {
        Self {
            jwt_secret,
            jwt_issuer,
            jwt_audience,
            token_expiration,
            cookie_secure: false,
        }
    }

    pub fn with_secure_cookie(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }
}

impl From<&crate::config::AppConfig> for AuthConfig {
    fn from(cfg: &crate::config::AppConfig) -> Self {
        AuthConfig::new(
            cfg.jwt_secret.clone(),
            cfg.auth_issuer.clone(),
            cfg.auth_audience.clone(),
            Duration::from_secs(cfg.jwt_expiration as u64),
        )
        .with_secure_cookie(cfg.cookie_secure)
    }
}

/// Issues and validates session tokens
#[derive(Debug, Clone)]
pub struct AuthService {
    config: AuthConfig,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Generate a JWT token for a user
    pub fn generate_token(&self, user: &user::Model) -> Result<String, ServiceError> {
        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(self.config.token_expiration)
                .map_err(|_| ServiceError::InternalError("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::JwtError(e.to_string()))
    }

    /// Validate a JWT token and extract the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, ServiceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);
        validation.set_audience(&[self.config.jwt_audience.as_str()]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| {
            use jsonwebtoken::errors::ErrorKind;
            match e.kind() {
                ErrorKind::InvalidToken
                | ErrorKind::InvalidSignature
                | ErrorKind::ExpiredSignature
                | ErrorKind::ImmatureSignature
                | ErrorKind::InvalidIssuer
                | ErrorKind::InvalidAudience
                | ErrorKind::InvalidSubject
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::MissingAlgorithm
                | ErrorKind::MissingRequiredClaim(_)
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_) => {
                    debug!("Rejected token: {}", e);
                    ServiceError::InvalidCredential
                }
                _ => {
                    error!("Token verification failed unexpectedly: {}", e);
                    ServiceError::InternalError(format!("token verification: {}", e))
                }
            }
        })
    }

    /// Resolve a raw credential into the authenticated user
    pub fn authenticate(&self, token: &str) -> Result<AuthUser, ServiceError> {
        let claims = self.validate_token(token)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| ServiceError::InvalidCredential)?;

        Ok(AuthUser {
            user_id,
            name: claims.name,
            email: claims.email,
            token_id: claims.jti,
        })
    }

    /// `Set-Cookie` value that stores the token for the session lifetime
    pub fn session_cookie(&self, token: &str) -> String {
        build_cookie(
            token,
            self.config.token_expiration.as_secs(),
            self.config.cookie_secure,
        )
    }

    /// `Set-Cookie` value that removes the token cookie
    pub fn clear_session_cookie(&self) -> String {
        build_cookie("", 0, self.config.cookie_secure)
    }
}

fn build_cookie(value: &str, max_age_secs: u64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; Path=/; Max-Age={}; SameSite=Lax",
        TOKEN_COOKIE, value, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Pull the raw credential out of the request: bearer header first, then the `token` cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == TOKEN_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<AuthService>: FromRef<S>,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers).ok_or(ServiceError::Unauthenticated)?;
        let auth_service = Arc::<AuthService>::from_ref(state);
        auth_service.authenticate(&token)
    }
}

/// Hash a password using Argon2id.
pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::HashError(e.to_string()))
}

/// Verify a password against a stored hash.
pub fn verify_password(password: &str, hash: &str) -> Result<(), ServiceError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| ServiceError::InvalidLogin)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| ServiceError::InvalidLogin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "k8Jq2vN7xR4tW9zL3mP6sY1bH5gF0cV8nQ2wE7rT4yU9iO3pA6sD1fG5hJ8kL2zX";

    fn service() -> AuthService {
        AuthService::new(AuthConfig::new(
            SECRET.to_string(),
            "storefront-api".to_string(),
            "storefront-web".to_string(),
            Duration::from_secs(3600),
        ))
    }

    fn user() -> user::Model {
        user::Model {
            id: Uuid::new_v4(),
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            password_hash: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn token_roundtrip_resolves_user() {
        let svc = service();
        let user = user();
        let token = svc.generate_token(&user).unwrap();

        let auth = svc.authenticate(&token).unwrap();
        assert_eq!(auth.user_id, user.id);
        assert_eq!(auth.email, "asha@example.com");
    }

    #[test]
    fn token_signed_with_other_secret_is_invalid() {
        let other = AuthService::new(AuthConfig::new(
            format!("{}Z", SECRET),
            "storefront-api".to_string(),
            "storefront-web".to_string(),
            Duration::from_secs(3600),
        ));
        let token = other.generate_token(&user()).unwrap();

        assert!(matches!(
            service().authenticate(&token),
            Err(ServiceError::InvalidCredential)
        ));
    }

    #[test]
    fn expired_token_is_invalid() {
        let svc = service();
        let now = Utc::now();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            name: "x".into(),
            email: "x@example.com".into(),
            jti: Uuid::new_v4().to_string(),
            iat: (now - ChronoDuration::hours(3)).timestamp(),
            exp: (now - ChronoDuration::hours(2)).timestamp(),
            nbf: (now - ChronoDuration::hours(3)).timestamp(),
            iss: "storefront-api".into(),
            aud: "storefront-web".into(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            svc.validate_token(&token),
            Err(ServiceError::InvalidCredential)
        ));
    }

    #[test]
    fn garbage_token_is_invalid() {
        assert!(matches!(
            service().authenticate("not-a-jwt"),
            Err(ServiceError::InvalidCredential)
        ));
    }

    #[test]
    fn bearer_header_takes_precedence_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        headers.insert(header::COOKIE, HeaderValue::from_static("token=from-cookie"));

        assert_eq!(extract_token(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn cookie_is_used_without_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; token=abc.def.ghi; other=1"),
        );

        assert_eq!(extract_token(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn missing_or_empty_credentials_yield_none() {
        let mut headers = HeaderMap::new();
        assert!(extract_token(&headers).is_none());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        headers.insert(header::COOKIE, HeaderValue::from_static("token="));
        assert!(extract_token(&headers).is_none());
    }

    #[test]
    fn session_cookie_attributes() {
        let svc = AuthService::new(
            AuthConfig::new(
                SECRET.into(),
                "i".into(),
                "a".into(),
                Duration::from_secs(86400),
            )
            .with_secure_cookie(true),
        );

        let cookie = svc.session_cookie("tok");
        assert!(cookie.starts_with("token=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=86400"));
        assert!(cookie.ends_with("; Secure"));

        assert!(svc.clear_session_cookie().contains("Max-Age=0"));
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password("correct horse battery staple", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong", &hash),
            Err(ServiceError::InvalidLogin)
        ));
    }
}
