//! Payment-provider webhook handler.
//!
//! The only entry point through which money ever becomes an order. Input is
//! untrusted network data from a public endpoint: nothing is believed until
//! the signature over the exact raw body verifies against the signing
//! secret.
//!
//! After verification the handler fails soft: a storage outage or a gap in
//! the session metadata is logged (and captured by Sentry) but still
//! acknowledged with 200, because a non-2xx answer would put the provider
//! into a redelivery loop over a purely local problem.

use axum::{Json, body::Bytes, extract::State, http::HeaderMap};
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tracing::instrument;

use fluffy_bites_core::{Order, OrderStatus, from_minor_units};

use crate::error::{AppError, Result};
use crate::services::stripe::{CHECKOUT_SESSION_COMPLETED, CheckoutSessionObject, Event};
use crate::state::AppState;

/// Signature header set by the provider on every delivery.
const SIGNATURE_HEADER: &str = "stripe-signature";

/// Receive, verify, and dispatch one webhook delivery.
#[instrument(skip_all)]
pub async fn stripe(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(AppError::MissingSignature)?;

    let event = state.stripe().construct_event(&body, signature)?;

    match event.event_type.as_str() {
        CHECKOUT_SESSION_COMPLETED => handle_session_completed(&state, &event),
        "payment_intent.succeeded" => {
            tracing::info!(
                payment_intent = %event.data.object.get("id").and_then(|value| value.as_str()).unwrap_or("unknown"),
                "Payment succeeded"
            );
        }
        "payment_intent.payment_failed" => {
            tracing::info!(
                payment_intent = %event.data.object.get("id").and_then(|value| value.as_str()).unwrap_or("unknown"),
                "Payment failed"
            );
        }
        other => {
            tracing::debug!(event_type = %other, "Unhandled event type");
        }
    }

    // Every verified delivery is acknowledged, whatever the dispatch did.
    Ok(Json(json!({ "received": true })))
}

/// Persist a completed checkout session as an order.
fn handle_session_completed(state: &AppState, event: &Event) {
    let session: CheckoutSessionObject = match serde_json::from_value(event.data.object.clone()) {
        Ok(session) => session,
        Err(error) => {
            tracing::error!(event_id = %event.id, %error, "Undecodable checkout session payload");
            sentry::capture_error(&error);
            return;
        }
    };

    tracing::info!(session_id = %session.id, "Checkout session completed");

    let order = order_from_session(session, Utc::now());

    match state.orders().save(&order) {
        Ok(()) => {
            tracing::info!(order_id = %order.id, amount = %order.amount, "Order saved");
        }
        Err(error) => {
            // Fail soft: the payment is confirmed even if we could not
            // record it, and the provider must not keep redelivering.
            tracing::error!(order_id = %order.id, %error, "Error saving order");
            sentry::capture_error(&error);
        }
    }
}

/// Build the durable order record from a completed session.
///
/// All-or-nothing over the provider fields; the item list alone degrades to
/// empty when the metadata round trip failed, so the payment confirmation is
/// never lost to a data-quality defect.
fn order_from_session(session: CheckoutSessionObject, created_at: DateTime<Utc>) -> Order {
    let items = session.cart_snapshot().into_items();
    if items.is_empty() {
        tracing::warn!(session_id = %session.id, "Order stored without line items");
    }

    let (customer_email, customer_name) = session
        .customer_details
        .map_or((None, None), |details| (details.email, details.name));

    Order {
        id: session.id,
        customer_email,
        customer_name,
        amount: from_minor_units(session.amount_total),
        currency: session.currency,
        status: OrderStatus::Paid,
        items,
        shipping_address: session.shipping_details.and_then(|details| details.address),
        created_at,
        payment_intent: session.payment_intent,
    }
}
