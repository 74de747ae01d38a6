//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CAFE_BASE_URL` - Public URL of the site, used to resolve product image
//!   paths and to build the checkout success/cancel redirects
//! - `STRIPE_SECRET_KEY` - Stripe API secret key (`sk_...`)
//! - `STRIPE_WEBHOOK_SECRET` - Stripe webhook signing secret (`whsec_...`)
//!
//! ## Optional
//! - `CAFE_HOST` - Bind address (default: 127.0.0.1)
//! - `CAFE_PORT` - Listen port (default: 3000)
//! - `CAFE_DATA_DIR` - Catalog and order storage root (default: data)
//! - `CAFE_CURRENCY` - ISO currency code for the whole cart (default: eur)
//! - `CAFE_ALLOWED_SHIPPING_COUNTRIES` - Comma-separated ISO country codes
//!   offered on the hosted checkout page (default: FI,SE,NO,DK,EE)
//! - `CAFE_CORS_ORIGIN` - Extra allowed browser origin for the API
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use fluffy_bites_core::CurrencyCode;

/// Shipping destinations offered when nothing is configured.
const DEFAULT_SHIPPING_COUNTRIES: &str = "FI,SE,NO,DK,EE";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Application configuration for the ordering API.
#[derive(Debug, Clone)]
pub struct CafeConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the site
    pub base_url: String,
    /// Root directory for the catalog file and order storage
    pub data_dir: PathBuf,
    /// Currency applied to every line item
    pub currency: CurrencyCode,
    /// Countries offered for shipping address collection
    pub allowed_shipping_countries: Vec<String>,
    /// Extra allowed browser origin, if the menu is served from elsewhere
    pub cors_origin: Option<String>,
    /// Stripe API configuration
    pub stripe: StripeConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Stripe API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct StripeConfig {
    /// API secret key (`sk_...`), server-side only
    pub secret_key: SecretString,
    /// Webhook signing secret (`whsec_...`)
    pub webhook_secret: SecretString,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .finish()
    }
}

impl CafeConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the Stripe secrets fail their format checks.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("CAFE_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("CAFE_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("CAFE_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("CAFE_PORT".to_string(), e.to_string()))?;
        let base_url = parse_base_url(&get_required_env("CAFE_BASE_URL")?)?;
        let data_dir = PathBuf::from(get_env_or_default("CAFE_DATA_DIR", "data"));
        let currency = get_env_or_default("CAFE_CURRENCY", "eur")
            .parse::<CurrencyCode>()
            .map_err(|e| ConfigError::InvalidEnvVar("CAFE_CURRENCY".to_string(), e.to_string()))?;
        let allowed_shipping_countries = parse_country_list(&get_env_or_default(
            "CAFE_ALLOWED_SHIPPING_COUNTRIES",
            DEFAULT_SHIPPING_COUNTRIES,
        ))?;
        let cors_origin = get_optional_env("CAFE_CORS_ORIGIN");

        let stripe = StripeConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            host,
            port,
            base_url,
            data_dir,
            currency,
            allowed_shipping_countries,
            cors_origin,
            stripe,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Path of the catalog file inside the data directory.
    #[must_use]
    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join("products.json")
    }

    /// Root directory of the per-order JSON files.
    #[must_use]
    pub fn orders_dir(&self) -> PathBuf {
        self.data_dir.join("orders")
    }
}

impl StripeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            secret_key: get_prefixed_secret("STRIPE_SECRET_KEY", "sk_")?,
            webhook_secret: get_prefixed_secret("STRIPE_WEBHOOK_SECRET", "whsec_")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Load a secret and check it carries the expected Stripe key prefix.
///
/// The prefixes are stable across Stripe accounts; anything else in these
/// variables is a swapped or placeholder value.
fn get_prefixed_secret(key: &str, prefix: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_key_prefix(key, &value, prefix)?;
    Ok(SecretString::from(value))
}

/// Check that a Stripe credential carries the expected prefix.
fn validate_key_prefix(key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
    if value.starts_with(prefix) {
        Ok(())
    } else {
        Err(ConfigError::InsecureSecret(
            key.to_string(),
            format!("expected a value starting with {prefix:?}"),
        ))
    }
}

/// Validate the public base URL and normalize away any trailing slash.
fn parse_base_url(raw: &str) -> Result<String, ConfigError> {
    let url = Url::parse(raw).map_err(|e| {
        ConfigError::InvalidEnvVar("CAFE_BASE_URL".to_string(), e.to_string())
    })?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidEnvVar(
            "CAFE_BASE_URL".to_string(),
            format!("unsupported scheme {:?}", url.scheme()),
        ));
    }
    if url.host_str().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            "CAFE_BASE_URL".to_string(),
            "URL must have a host".to_string(),
        ));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

/// Parse and validate the comma-separated shipping country allow-list.
fn parse_country_list(raw: &str) -> Result<Vec<String>, ConfigError> {
    let countries: Vec<String> = raw
        .split(',')
        .map(|code| code.trim().to_ascii_uppercase())
        .filter(|code| !code.is_empty())
        .collect();

    if countries.is_empty() {
        return Err(ConfigError::InvalidEnvVar(
            "CAFE_ALLOWED_SHIPPING_COUNTRIES".to_string(),
            "at least one country code is required".to_string(),
        ));
    }
    for code in &countries {
        if code.len() != 2 || !code.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(ConfigError::InvalidEnvVar(
                "CAFE_ALLOWED_SHIPPING_COUNTRIES".to_string(),
                format!("{code:?} is not a two-letter ISO country code"),
            ));
        }
    }
    Ok(countries)
}
