use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_PAYMENT_API_BASE_URL: &str = "https://api.razorpay.com/v1";
pub const DEV_DEFAULT_JWT_SECRET: &str =
    "this_is_a_development_secret_key_that_is_at_least_64_characters_long_for_testing";

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// JWT secret key (minimum 64 characters for enhanced security)
    #[validate(length(min = 64), custom = "validate_jwt_secret")]
    pub jwt_secret: String,

    /// JWT expiration time in seconds; also the `token` cookie max-age
    #[validate(range(min = 300, max = 604800))]
    pub jwt_expiration: usize,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// CORS: allow credentials (needed for the `token` cookie cross-origin)
    #[serde(default)]
    pub cors_allow_credentials: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Event channel capacity for async event processing
    #[serde(default = "default_event_channel_capacity")]
    #[validate(range(min = 1))]
    pub event_channel_capacity: usize,

    /// Currency used for provider orders (ISO 4217)
    #[serde(default = "default_currency")]
    #[validate(custom = "validate_currency")]
    pub default_currency: String,

    /// Payment provider publishable key id
    #[serde(default)]
    pub payment_key_id: Option<String>,

    /// Payment provider secret; also the HMAC key for payment signatures
    #[serde(default)]
    pub payment_key_secret: Option<String>,

    /// Payment provider REST base URL
    #[serde(default = "default_payment_api_base_url")]
    pub payment_api_base_url: String,

    /// Timeout for provider calls (seconds)
    #[serde(default = "default_payment_request_timeout_secs")]
    pub payment_request_timeout_secs: u64,

    /// Enables the simulated gateway and simulated confirmations
    #[serde(default)]
    pub payments_simulated: bool,

    /// Adds `Secure` to the `token` cookie
    #[serde(default)]
    pub cookie_secure: bool,

    /// JWT issuer name
    #[serde(default = "default_auth_issuer")]
    pub auth_issuer: String,

    /// JWT audience
    #[serde(default = "default_auth_audience")]
    pub auth_audience: String,
}

impl AppConfig {
    /// Creates a new configuration
    pub fn new(
        database_url: String,
        jwt_secret: String,
        jwt_expiration: usize,
        host: String,
        port: u16,
        environment: String,
    ) -> Self {
        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            cors_allow_credentials: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
            default_currency: default_currency(),
            payment_key_id: None,
            payment_key_secret: None,
            payment_api_base_url: default_payment_api_base_url(),
            payment_request_timeout_secs: default_payment_request_timeout_secs(),
            payments_simulated: false,
            cookie_secure: false,
            auth_issuer: default_auth_issuer(),
            auth_audience: default_auth_audience(),
        }
    }

    /// Gets database URL reference
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Returns true if explicit CORS origins are configured
    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_ref()
            .map(|raw| raw.split(',').any(|origin| !origin.trim().is_empty()))
            .unwrap_or(false)
    }

    /// Whether we should fall back to permissive CORS
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    /// Both provider credentials, if present and non-blank
    pub fn payment_credentials(&self) -> Option<(&str, &str)> {
        match (
            self.payment_key_id.as_deref().map(str::trim),
            self.payment_key_secret.as_deref().map(str::trim),
        ) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => Some((id, secret)),
            _ => None,
        }
    }

    pub(crate) fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.should_allow_permissive_cors() && !self.has_cors_allowed_origins() {
            let mut err = ValidationError::new("cors_allowed_origins_required");
            err.message = Some(
                "Set APP__CORS_ALLOWED_ORIGINS for non-development environments or explicitly opt-in via APP__CORS_ALLOW_ANY_ORIGIN=true".into(),
            );
            errors.add("cors_allowed_origins", err);
        }

        if !self.is_development() && self.jwt_secret.trim() == DEV_DEFAULT_JWT_SECRET {
            let mut err = ValidationError::new("jwt_secret_default_dev");
            err.message = Some(
                "The bundled development JWT secret must not be used outside development. Set APP__JWT_SECRET to a unique, secure value."
                    .into(),
            );
            errors.add("jwt_secret", err);
        }

        if self.payments_simulated && self.is_production() {
            let mut err = ValidationError::new("payments_simulated_production");
            err.message = Some("Simulated payments cannot be enabled in production".into());
            errors.add("payments_simulated", err);
        }

        if self.payments_simulated && self.payment_credentials().is_some() {
            let mut err = ValidationError::new("payments_simulated_with_credentials");
            err.message = Some(
                "Simulated payments cannot be enabled while real provider credentials are configured"
                    .into(),
            );
            errors.add("payments_simulated", err);
        }

        if self.payment_key_id.is_some() != self.payment_key_secret.is_some() {
            let mut err = ValidationError::new("payment_credentials_incomplete");
            err.message =
                Some("APP__PAYMENT_KEY_ID and APP__PAYMENT_KEY_SECRET must be set together".into());
            errors.add("payment_key_id", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_db_max_connections() -> u32 {
    16
}
fn default_db_min_connections() -> u32 {
    2
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_event_channel_capacity() -> usize {
    1024
}

fn default_currency() -> String {
    "INR".to_string()
}

fn default_payment_api_base_url() -> String {
    DEFAULT_PAYMENT_API_BASE_URL.to_string()
}

fn default_payment_request_timeout_secs() -> u64 {
    10
}

fn default_auth_issuer() -> String {
    "storefront-api".to_string()
}

fn default_auth_audience() -> String {
    "storefront-web".to_string()
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_currency(code: &str) -> Result<(), ValidationError> {
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("default_currency");
        err.message = Some("Currency must be a three-letter uppercase ISO 4217 code".into());
        Err(err)
    }
}

fn validate_jwt_secret(secret: &str) -> Result<(), ValidationError> {
    let trimmed = secret.trim();

    if trimmed.len() < 64 {
        let mut err = ValidationError::new("jwt_secret");
        err.message =
            Some("JWT secret must be at least 64 characters for adequate security".into());
        return Err(err);
    }

    // Reject trivially weak secrets (all identical characters or common patterns)
    if let Some(first) = trimmed.chars().next() {
        if trimmed.chars().all(|c| c == first) {
            let mut err = ValidationError::new("jwt_secret");
            err.message = Some("JWT secret cannot be a repeated character sequence".into());
            return Err(err);
        }
    }

    let lower = trimmed.to_ascii_lowercase();
    let weak_fragments = ["changeme", "password", "default", "12345", "abcdef"];
    if weak_fragments.iter().any(|pattern| lower.contains(pattern)) {
        let mut err = ValidationError::new("jwt_secret");
        err.message = Some(
            "JWT secret appears to be weak; use a cryptographically strong random string".into(),
        );
        return Err(err);
    }

    let unique_chars: std::collections::HashSet<char> = trimmed.chars().collect();
    if unique_chars.len() < 10 {
        let mut err = ValidationError::new("jwt_secret");
        err.message =
            Some("JWT secret must have at least 10 unique characters for adequate entropy".into());
        return Err(err);
    }

    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("storefront_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    load_config_from(Path::new(CONFIG_DIR))
}

/// Same as [`load_config`] with an explicit config directory.
pub fn load_config_from(config_dir: &Path) -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !config_dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            config_dir.display()
        );
    }

    // jwt_secret has no default; it must come from a file or APP__JWT_SECRET
    let config = Config::builder()
        .set_default("database_url", "sqlite://storefront.db?mode=rwc")?
        .set_default("jwt_expiration", 86400)?
        .set_default("host", "0.0.0.0")?
        .set_default("port", 8080)?
        .set_default("environment", run_env.as_str())?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::from(config_dir.join("default")).required(false))
        .add_source(File::from(config_dir.join(&run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    if config.get_string("jwt_secret").is_err() {
        error!("JWT secret is not configured. Set APP__JWT_SECRET environment variable with a secure random string (minimum 64 characters).");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "jwt_secret is required but not configured. Set APP__JWT_SECRET environment variable."
                .into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration security validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    if app_config.payments_simulated {
        warn!("Simulated payments are enabled; no money will move");
    } else if app_config.payment_credentials().is_none() {
        warn!("Payment credentials are not configured; checkout will be unavailable");
    }

    info!("Configuration loaded successfully");
    Ok(app_config)
}
