//! Stripe API client for hosted checkout and webhook verification.
//!
//! Two responsibilities, one per handler:
//!
//! - creating Checkout Sessions from a validated cart (`POST
//!   /v1/checkout/sessions`, form-encoded like the rest of Stripe's API);
//! - verifying and decoding webhook deliveries against the signing secret,
//!   over the exact raw request bytes.
//!
//! One client instance is built at startup and shared read-only by every
//! request through the application state.

use std::collections::HashMap;

use hmac::{Hmac, Mac};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use fluffy_bites_core::{CART_METADATA_KEY, Cart, CartSnapshot, CurrencyCode, to_minor_units};

use crate::config::StripeConfig;

type HmacSha256 = Hmac<Sha256>;

/// Stripe API base URL.
const API_BASE: &str = "https://api.stripe.com";

/// Maximum accepted age of a webhook signature timestamp, in seconds.
///
/// Matches the tolerance applied by Stripe's own SDKs.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Event type that triggers order persistence.
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// Errors from the Stripe REST API.
#[derive(Debug, Error)]
pub enum StripeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// A cart amount does not fit the provider's integer minor units.
    #[error("Line item amount out of range for {0:?}")]
    AmountOutOfRange(String),

    /// Failed to assemble the request.
    #[error("Request error: {0}")]
    Request(String),
}

/// Webhook verification and decoding failures.
///
/// Everything here maps to a 400 response; none of it is retry-worthy.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The signature header does not have the `t=...,v1=...` shape.
    #[error("malformed signature header")]
    MalformedHeader,

    /// The HMAC did not match the payload.
    #[error("signature verification failed")]
    SignatureMismatch,

    /// The signature timestamp is outside the accepted tolerance.
    #[error("signature timestamp outside tolerance")]
    StaleTimestamp,

    /// Verified payload that is not a decodable event.
    #[error("undecodable event payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// A decoded webhook event.
///
/// `data.object` stays raw JSON until the event type is known; only
/// session-completed events are decoded further.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

/// Payload container of a webhook event.
#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

/// The fields of a completed Checkout Session this service consumes.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,
    /// Total in minor units.
    #[serde(default)]
    pub amount_total: i64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub shipping_details: Option<ShippingDetails>,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSessionObject {
    /// Recover the cart snapshot attached at session creation.
    #[must_use]
    pub fn cart_snapshot(&self) -> CartSnapshot {
        CartSnapshot::from_metadata_value(self.metadata.get(CART_METADATA_KEY).map(String::as_str))
    }
}

/// Customer details collected on the hosted checkout page.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Shipping details collected on the hosted checkout page.
#[derive(Debug, Clone, Deserialize)]
pub struct ShippingDetails {
    #[serde(default)]
    pub address: Option<fluffy_bites_core::ShippingAddress>,
}

/// A freshly created Checkout Session.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// Hosted payment page the client is redirected to.
    pub url: String,
}

/// Error envelope returned by the Stripe API.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Everything needed to create one checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutSessionParams<'a> {
    pub cart: &'a Cart,
    pub currency: CurrencyCode,
    /// Base URL product image paths are resolved against.
    pub image_base_url: &'a str,
    pub success_url: &'a str,
    pub cancel_url: &'a str,
    pub allowed_shipping_countries: &'a [String],
}

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    api_base: String,
    webhook_secret: SecretString,
}

impl StripeClient {
    /// Create a new Stripe API client against the production API.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StripeConfig) -> Result<Self, StripeError> {
        Self::with_api_base(config, API_BASE)
    }

    /// Create a client against a different API base URL.
    ///
    /// Used by tests to point the client at a local mock server.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn with_api_base(
        config: &StripeConfig,
        api_base: impl Into<String>,
    ) -> Result<Self, StripeError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.secret_key.expose_secret());
        let mut auth_header = HeaderValue::from_str(&auth_value)
            .map_err(|e| StripeError::Request(format!("Invalid API key format: {e}")))?;
        auth_header.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_header);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            webhook_secret: config.webhook_secret.clone(),
        })
    }

    /// Create a single-use hosted Checkout Session for a cart.
    ///
    /// The cart itself travels along as session metadata so the webhook
    /// handler can reconstruct the order later; the provider does not echo
    /// line items back on completion.
    ///
    /// # Errors
    ///
    /// Returns [`StripeError`] on transport failures, API rejections, or a
    /// cart amount that cannot be expressed in integer minor units.
    pub async fn create_checkout_session(
        &self,
        params: &CheckoutSessionParams<'_>,
    ) -> Result<CheckoutSession, StripeError> {
        let form = build_session_form(params)?;

        let url = format!("{}/v1/checkout/sessions", self.api_base);
        let response = self.client.post(&url).form(&form).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response
                .json::<ApiErrorResponse>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| "Failed to create checkout session".to_string());
            return Err(StripeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<CheckoutSession>().await?)
    }

    /// Verify a webhook delivery and decode it into an [`Event`].
    ///
    /// Verification runs over the exact raw body bytes, never a re-serialized
    /// form. The signature header carries `t=<unix ts>,v1=<hex hmac>` pairs;
    /// the HMAC-SHA256 is computed over `"<t>.<body>"` with the signing
    /// secret, compared in constant time, and the timestamp must be within
    /// [`SIGNATURE_TOLERANCE_SECS`] of `now`.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError`] on any header, signature, timestamp, or
    /// decoding failure. All of them are terminal for the delivery.
    pub fn construct_event(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<Event, WebhookError> {
        self.verify_signature(payload, signature_header, chrono::Utc::now().timestamp())?;
        Ok(serde_json::from_slice(payload)?)
    }

    /// Signature check with an injectable clock.
    fn verify_signature(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: i64,
    ) -> Result<(), WebhookError> {
        let (timestamp, signatures) = parse_signature_header(signature_header)?;

        if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
            return Err(WebhookError::StaleTimestamp);
        }

        // A delivery may carry several v1 signatures during secret rotation;
        // any match accepts it. Comparison is constant-time via `verify_slice`.
        for candidate in signatures {
            let Ok(bytes) = hex::decode(candidate) else {
                continue;
            };
            let mut mac =
                HmacSha256::new_from_slice(self.webhook_secret.expose_secret().as_bytes())
                    .map_err(|_| WebhookError::SignatureMismatch)?;
            mac.update(timestamp.to_string().as_bytes());
            mac.update(b".");
            mac.update(payload);
            if mac.verify_slice(&bytes).is_ok() {
                return Ok(());
            }
        }

        Err(WebhookError::SignatureMismatch)
    }
}

/// Split a `t=...,v1=...` header into its timestamp and v1 signatures.
fn parse_signature_header(header: &str) -> Result<(i64, Vec<&str>), WebhookError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let mut kv = part.trim().splitn(2, '=');
        match (kv.next(), kv.next()) {
            (Some("t"), Some(value)) => {
                timestamp = Some(
                    value
                        .parse::<i64>()
                        .map_err(|_| WebhookError::MalformedHeader)?,
                );
            }
            (Some("v1"), Some(value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(WebhookError::MalformedHeader);
    }
    Ok((timestamp, signatures))
}

/// Flatten a cart into Stripe's bracketed form-field encoding.
///
/// Line item `i` becomes `line_items[i][quantity]`,
/// `line_items[i][price_data][currency]`, and so on. Image paths resolve
/// against the public base URL; items without an image omit the field
/// entirely rather than sending null.
fn build_session_form(
    params: &CheckoutSessionParams<'_>,
) -> Result<Vec<(String, String)>, StripeError> {
    let mut form: Vec<(String, String)> = vec![
        ("mode".into(), "payment".into()),
        ("payment_method_types[0]".into(), "card".into()),
        ("success_url".into(), params.success_url.into()),
        ("cancel_url".into(), params.cancel_url.into()),
        ("allow_promotion_codes".into(), "true".into()),
    ];

    for (i, country) in params.allowed_shipping_countries.iter().enumerate() {
        form.push((
            format!("shipping_address_collection[allowed_countries][{i}]"),
            country.clone(),
        ));
    }

    for (i, item) in params.cart.items().iter().enumerate() {
        let unit_amount = to_minor_units(item.price)
            .ok_or_else(|| StripeError::AmountOutOfRange(item.id.clone()))?;

        form.push((format!("line_items[{i}][quantity]"), item.quantity.to_string()));
        form.push((
            format!("line_items[{i}][price_data][currency]"),
            params.currency.as_str().to_string(),
        ));
        form.push((
            format!("line_items[{i}][price_data][unit_amount]"),
            unit_amount.to_string(),
        ));
        form.push((
            format!("line_items[{i}][price_data][product_data][name]"),
            item.name.clone(),
        ));
        if let Some(image) = &item.image {
            form.push((
                format!("line_items[{i}][price_data][product_data][images][0]"),
                resolve_image_url(params.image_base_url, image),
            ));
        }
    }

    let snapshot = CartSnapshot::of(params.cart)
        .to_metadata_value()
        .map_err(|e| StripeError::Request(e.to_string()))?;
    form.push((format!("metadata[{CART_METADATA_KEY}]"), snapshot));

    Ok(form)
}

/// Resolve a catalog-relative image path to an absolute URL.
fn resolve_image_url(base_url: &str, image: &str) -> String {
    if image.starts_with("http://") || image.starts_with("https://") {
        return image.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        image.trim_start_matches('/')
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use fluffy_bites_core::CartItem;

    fn test_client() -> StripeClient {
        let config = StripeConfig {
            secret_key: SecretString::from("sk_test_xxx"),
            webhook_secret: SecretString::from("whsec_test123secret456"),
        };
        StripeClient::new(&config).unwrap()
    }

    fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{timestamp}.").as_bytes());
        mac.update(payload);
        format!(
            "t={timestamp},v1={}",
            hex::encode(mac.finalize().into_bytes())
        )
    }

    fn cart() -> Cart {
        Cart::new(vec![
            CartItem {
                id: "latte".to_string(),
                name: "Latte".to_string(),
                price: "4.50".parse().unwrap(),
                quantity: 2,
                image: Some("images/latte.jpg".to_string()),
            },
            CartItem {
                id: "croissant".to_string(),
                name: "Butter Croissant".to_string(),
                price: "3.20".parse().unwrap(),
                quantity: 1,
                image: None,
            },
        ])
        .unwrap()
    }

    static ALLOWED_SHIPPING_COUNTRIES: std::sync::LazyLock<Vec<String>> =
        std::sync::LazyLock::new(|| vec!["FI".to_string(), "SE".to_string()]);

    fn params(cart: &Cart) -> CheckoutSessionParams<'_> {
        CheckoutSessionParams {
            cart,
            currency: CurrencyCode::Eur,
            image_base_url: "https://fluffybites.net",
            success_url: "https://fluffybites.net/order/success?session_id={CHECKOUT_SESSION_ID}",
            cancel_url: "https://fluffybites.net/menu",
            allowed_shipping_countries: &ALLOWED_SHIPPING_COUNTRIES,
        }
    }

    fn field<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
        form.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_form_carries_session_settings() {
        let cart = cart();
        let form = build_session_form(&params(&cart)).unwrap();

        assert_eq!(field(&form, "mode"), Some("payment"));
        assert_eq!(field(&form, "allow_promotion_codes"), Some("true"));
        assert_eq!(
            field(&form, "success_url"),
            Some("https://fluffybites.net/order/success?session_id={CHECKOUT_SESSION_ID}")
        );
        assert_eq!(
            field(&form, "shipping_address_collection[allowed_countries][0]"),
            Some("FI")
        );
        assert_eq!(
            field(&form, "shipping_address_collection[allowed_countries][1]"),
            Some("SE")
        );
    }

    #[test]
    fn test_form_converts_prices_to_minor_units() {
        let cart = cart();
        let form = build_session_form(&params(&cart)).unwrap();

        assert_eq!(
            field(&form, "line_items[0][price_data][unit_amount]"),
            Some("450")
        );
        assert_eq!(field(&form, "line_items[0][quantity]"), Some("2"));
        assert_eq!(
            field(&form, "line_items[1][price_data][unit_amount]"),
            Some("320")
        );
        assert_eq!(
            field(&form, "line_items[0][price_data][currency]"),
            Some("eur")
        );
    }

    #[test]
    fn test_form_resolves_images_and_omits_absent_ones() {
        let cart = cart();
        let form = build_session_form(&params(&cart)).unwrap();

        assert_eq!(
            field(&form, "line_items[0][price_data][product_data][images][0]"),
            Some("https://fluffybites.net/images/latte.jpg")
        );
        assert!(field(&form, "line_items[1][price_data][product_data][images][0]").is_none());
    }

    #[test]
    fn test_form_attaches_cart_metadata() {
        let cart = cart();
        let form = build_session_form(&params(&cart)).unwrap();

        let metadata = field(&form, "metadata[cartItems]").unwrap();
        let items: Vec<CartItem> = serde_json::from_str(metadata).unwrap();
        assert_eq!(items, cart.items());
    }

    #[test]
    fn test_resolve_image_url() {
        assert_eq!(
            resolve_image_url("https://fluffybites.net/", "/images/a.jpg"),
            "https://fluffybites.net/images/a.jpg"
        );
        assert_eq!(
            resolve_image_url("https://fluffybites.net", "https://cdn.example.com/a.jpg"),
            "https://cdn.example.com/a.jpg"
        );
    }

    #[test]
    fn test_valid_signature_accepted() {
        let client = test_client();
        let payload = br#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{"id":"cs_1"}}}"#;
        let now = chrono::Utc::now().timestamp();
        let header = sign(payload, "whsec_test123secret456", now);

        let event = client.construct_event(payload, &header).unwrap();
        assert_eq!(event.event_type, CHECKOUT_SESSION_COMPLETED);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let client = test_client();
        let payload = br#"{"type":"checkout.session.completed","data":{"object":{}}}"#;
        let now = chrono::Utc::now().timestamp();
        let header = sign(payload, "whsec_wrong", now);

        let err = client.construct_event(payload, &header).unwrap_err();
        assert!(matches!(err, WebhookError::SignatureMismatch));
    }

    #[test]
    fn test_modified_payload_rejected() {
        let client = test_client();
        let payload = br#"{"type":"checkout.session.completed","data":{"object":{}}}"#;
        let now = chrono::Utc::now().timestamp();
        let header = sign(payload, "whsec_test123secret456", now);

        let tampered = br#"{"type":"checkout.session.completed","data":{"object":{"hacked":true}}}"#;
        let err = client.construct_event(tampered, &header).unwrap_err();
        assert!(matches!(err, WebhookError::SignatureMismatch));
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let client = test_client();
        let payload = br#"{"type":"checkout.session.completed","data":{"object":{}}}"#;
        let stale = chrono::Utc::now().timestamp() - 600;
        let header = sign(payload, "whsec_test123secret456", stale);

        let err = client.construct_event(payload, &header).unwrap_err();
        assert!(matches!(err, WebhookError::StaleTimestamp));
    }

    #[test]
    fn test_malformed_headers_rejected() {
        let client = test_client();
        let payload = b"{}";

        for header in ["", "garbage", "t=123", "v1=abcdef", "t=notanumber,v1=abc"] {
            let err = client.construct_event(payload, header).unwrap_err();
            assert!(
                matches!(err, WebhookError::MalformedHeader),
                "header {header:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_rotated_secret_second_signature_accepted() {
        let client = test_client();
        let payload = br#"{"type":"payment_intent.succeeded","data":{"object":{}}}"#;
        let now = chrono::Utc::now().timestamp();

        let good = sign(payload, "whsec_test123secret456", now);
        let good_sig = good.split("v1=").nth(1).unwrap();
        let header = format!("t={now},v1=deadbeef,v1={good_sig}");

        assert!(client.construct_event(payload, &header).is_ok());
    }

    #[test]
    fn test_undecodable_event_rejected() {
        let client = test_client();
        let payload = b"not json";
        let now = chrono::Utc::now().timestamp();
        let header = sign(payload, "whsec_test123secret456", now);

        let err = client.construct_event(payload, &header).unwrap_err();
        assert!(matches!(err, WebhookError::Json(_)));
    }

    #[test]
    fn test_session_object_decodes_completed_payload() {
        let json = serde_json::json!({
            "id": "cs_test_123",
            "amount_total": 900,
            "currency": "eur",
            "customer_details": { "email": "anna@example.com", "name": "Anna" },
            "payment_intent": "pi_789",
            "metadata": {
                "cartItems": "[{\"id\":\"latte\",\"name\":\"Latte\",\"price\":\"4.50\",\"quantity\":2}]"
            }
        });

        let session: CheckoutSessionObject = serde_json::from_value(json).unwrap();
        assert_eq!(session.amount_total, 900);
        let items = session.cart_snapshot().into_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 2);
    }
}
