//! Fluffy Bites ordering API library.
//!
//! This crate provides the server functionality as a library, allowing it to
//! be tested and reused. The binary in `main.rs` only wires configuration
//! and startup around [`app`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

use axum::extract::State;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::{Router, routing::get};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(state.config());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes())
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS policy: the public site origin plus one optional extra origin for
/// local development of the menu pages.
fn cors_layer(config: &config::CafeConfig) -> CorsLayer {
    let mut origins: Vec<HeaderValue> = Vec::new();
    if let Ok(origin) = config.base_url.parse() {
        origins.push(origin);
    }
    if let Some(extra) = config
        .cors_origin
        .as_ref()
        .and_then(|o| o.parse::<HeaderValue>().ok())
    {
        origins.push(extra);
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies the order directory is writable before returning OK.
/// Returns 503 Service Unavailable otherwise.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match tempfile::NamedTempFile::new_in(state.orders().dir()) {
        Ok(_) => StatusCode::OK,
        Err(error) => {
            tracing::warn!(%error, "Order storage not writable");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
