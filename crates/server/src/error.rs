//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`.
//! Response bodies are JSON of the shape `{"error": "..."}`, which the menu
//! and cart pages rely on.
//!
//! Storage failures are intentionally absent here: after a webhook delivery
//! is verified, persistence problems are logged and captured but never turned
//! into an error response (see the webhook handler).

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use fluffy_bites_core::CartError;

use crate::services::stripe::{StripeError, WebhookError};

/// Application-level error type for the ordering API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or empty cart; the provider is never called.
    #[error("{0}")]
    InvalidInput(#[from] CartError),

    /// Stripe API failure during session creation.
    #[error("{0}")]
    Upstream(#[from] StripeError),

    /// Webhook delivery without a signature header.
    #[error("No signature found")]
    MissingSignature,

    /// Webhook delivery whose signature or payload did not verify.
    #[error("Webhook Error: {0}")]
    InvalidSignature(#[from] WebhookError),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture provider-side failures to Sentry; client mistakes and
        // signature rejections only reach the logs.
        if matches!(self, Self::Upstream(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::InvalidInput(_) | Self::MissingSignature | Self::InvalidSignature(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
