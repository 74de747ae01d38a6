//! Checkout route handler.
//!
//! Turns a client-supplied cart into a provider-hosted Checkout Session and
//! hands the redirect URL back to the menu page. Nothing is persisted
//! locally; the session - including the cart snapshot in its metadata - lives
//! entirely at the payment provider until the completion webhook arrives.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use fluffy_bites_core::{Cart, CartItem};

use crate::error::Result;
use crate::services::stripe::CheckoutSessionParams;
use crate::state::AppState;

/// Checkout request body.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    /// Absent and empty are equivalent: both are rejected before any
    /// provider call.
    #[serde(default)]
    pub cart: Vec<CartItem>,
}

/// Checkout response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: String,
}

/// Create a hosted checkout session from a cart.
#[instrument(skip(state, payload), fields(items = payload.cart.len()))]
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    let cart = Cart::new(payload.cart)?;

    let config = state.config();
    let success_url = format!(
        "{}/order/success?session_id={{CHECKOUT_SESSION_ID}}",
        config.base_url
    );
    let cancel_url = format!("{}/menu", config.base_url);

    let session = state
        .stripe()
        .create_checkout_session(&CheckoutSessionParams {
            cart: &cart,
            currency: config.currency,
            image_base_url: &config.base_url,
            success_url: &success_url,
            cancel_url: &cancel_url,
            allowed_shipping_countries: &config.allowed_shipping_countries,
        })
        .await?;

    tracing::info!(session_id = %session.id, total = %cart.total(), "Checkout session created");

    Ok(Json(CheckoutResponse {
        session_id: session.id,
        url: session.url,
    }))
}
