//! HTTP route handlers for the ordering API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health               - Liveness check
//! GET  /health/ready         - Readiness check (order storage writable)
//!
//! # Catalog
//! GET  /api/products         - Full catalog document
//! GET  /api/products/{id}    - Single product
//!
//! # Ordering
//! POST /api/checkout         - Create a hosted checkout session from a cart
//! POST /api/webhooks/stripe  - Payment-provider webhook (raw body, signed)
//! ```

pub mod checkout;
pub mod products;
pub mod webhook;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the API routes router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(products::index))
        .route("/api/products/{id}", get(products::show))
        .route("/api/checkout", post(checkout::create))
        .route("/api/webhooks/stripe", post(webhook::stripe))
}
