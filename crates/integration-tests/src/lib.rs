//! Integration test harness for Fluffy Bites.
//!
//! Builds the real application router against a throwaway data directory,
//! plus a mock Stripe API server for exercising the checkout path without
//! network access. Webhook deliveries are signed with the same scheme the
//! provider uses, so the full verification path runs in tests.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Json, Router, routing::post};
use hmac::{Hmac, Mac};
use secrecy::SecretString;
use sha2::Sha256;

use fluffy_bites_core::{Catalog, CurrencyCode};
use fluffy_bites_server::catalog::CatalogStore;
use fluffy_bites_server::config::{CafeConfig, StripeConfig};
use fluffy_bites_server::services::stripe::StripeClient;
use fluffy_bites_server::state::AppState;
use fluffy_bites_server::store::OrderStore;

/// Webhook signing secret used throughout the tests.
pub const WEBHOOK_SECRET: &str = "whsec_test123secret456";

/// A fully wired application over a throwaway data directory.
pub struct TestApp {
    pub router: Router,
    data_dir: tempfile::TempDir,
}

impl TestApp {
    /// The order directory backing this app instance.
    #[must_use]
    pub fn orders_dir(&self) -> PathBuf {
        self.data_dir.path().join("orders")
    }

    /// Open the order store for post-hoc assertions.
    #[must_use]
    pub fn order_store(&self) -> OrderStore {
        OrderStore::open(self.orders_dir()).unwrap()
    }
}

fn test_config(data_dir: PathBuf) -> CafeConfig {
    CafeConfig {
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        base_url: "https://fluffybites.net".to_string(),
        data_dir,
        currency: CurrencyCode::Eur,
        allowed_shipping_countries: vec![
            "FI".to_string(),
            "SE".to_string(),
            "NO".to_string(),
            "DK".to_string(),
            "EE".to_string(),
        ],
        cors_origin: None,
        stripe: StripeConfig {
            secret_key: SecretString::from("sk_test_xxx"),
            webhook_secret: SecretString::from(WEBHOOK_SECRET),
        },
        sentry_dsn: None,
    }
}

fn test_catalog() -> Catalog {
    serde_json::from_value(serde_json::json!({
        "metadata": { "cafeName": "Fluffy Bites" },
        "products": [
            {
                "id": "latte",
                "name": "Latte",
                "description": "Espresso with steamed milk",
                "category": "coffee",
                "price": 4.50,
                "image": "images/latte.jpg"
            },
            {
                "id": "croissant",
                "name": "Butter Croissant",
                "category": "food",
                "price": 3.20
            }
        ]
    }))
    .unwrap()
}

/// Build the application against the production Stripe API base.
///
/// Good enough for every test that never reaches the provider (webhook and
/// validation paths).
#[must_use]
pub fn test_app() -> TestApp {
    test_app_with_api_base("https://api.stripe.com")
}

/// Build the application with the Stripe client pointed at `api_base`.
#[must_use]
pub fn test_app_with_api_base(api_base: &str) -> TestApp {
    let data_dir = tempfile::tempdir().unwrap();
    let config = test_config(data_dir.path().to_path_buf());

    let catalog = CatalogStore::from_catalog(test_catalog());
    let orders = OrderStore::open(config.orders_dir()).unwrap();
    let stripe = StripeClient::with_api_base(&config.stripe, api_base).unwrap();

    let state = AppState::new(config, catalog, stripe, orders);
    TestApp {
        router: fluffy_bites_server::app(state),
        data_dir,
    }
}

/// Sign a webhook payload the way the provider does.
#[must_use]
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(payload);
    format!(
        "t={timestamp},v1={}",
        hex::encode(mac.finalize().into_bytes())
    )
}

/// Sign a payload with the test secret and a current timestamp.
#[must_use]
pub fn sign_payload_now(payload: &[u8]) -> String {
    sign_payload(payload, WEBHOOK_SECRET, chrono::Utc::now().timestamp())
}

/// What the mock Stripe API observed.
#[derive(Debug, Default)]
pub struct MockStripeState {
    /// Form fields of the last session-creation request.
    pub last_form: Mutex<Option<Vec<(String, String)>>>,
}

impl MockStripeState {
    /// The `metadata[cartItems]` value of the last session created.
    #[must_use]
    pub fn last_cart_metadata(&self) -> Option<String> {
        self.last_form
            .lock()
            .unwrap()
            .as_ref()?
            .iter()
            .find(|(k, _)| k == "metadata[cartItems]")
            .map(|(_, v)| v.clone())
    }
}

/// A mock Stripe API server bound to a local port.
pub struct MockStripe {
    pub base_url: String,
    pub state: Arc<MockStripeState>,
}

async fn mock_create_session(
    State(state): State<Arc<MockStripeState>>,
    Form(form): Form<Vec<(String, String)>>,
) -> impl IntoResponse {
    *state.last_form.lock().unwrap() = Some(form);
    Json(serde_json::json!({
        "id": "cs_test_mock",
        "url": "https://checkout.stripe.com/c/pay/cs_test_mock"
    }))
}

async fn mock_create_session_declined() -> impl IntoResponse {
    (
        StatusCode::PAYMENT_REQUIRED,
        Json(serde_json::json!({
            "error": { "message": "Your card was declined.", "type": "card_error" }
        })),
    )
}

/// Spawn a mock Stripe API that accepts session creation.
pub async fn spawn_mock_stripe() -> MockStripe {
    let state = Arc::new(MockStripeState::default());
    let router = Router::new()
        .route("/v1/checkout/sessions", post(mock_create_session))
        .with_state(Arc::clone(&state));

    let base_url = serve_on_ephemeral_port(router).await;
    MockStripe { base_url, state }
}

/// Spawn a mock Stripe API that rejects every session creation.
pub async fn spawn_mock_stripe_declining() -> MockStripe {
    let router = Router::new().route("/v1/checkout/sessions", post(mock_create_session_declined));

    let base_url = serve_on_ephemeral_port(router).await;
    MockStripe {
        base_url,
        state: Arc::new(MockStripeState::default()),
    }
}

async fn serve_on_ephemeral_port(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{addr}")
}
