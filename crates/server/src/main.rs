//! Fluffy Bites ordering API - public backend for the cafe site.
//!
//! This binary serves the JSON ordering API on port 3000.
//!
//! # Architecture
//!
//! - Axum web framework, JSON request/response bodies
//! - Stripe hosted checkout for payments; the site never touches card data
//! - One JSON file per completed order, keyed by checkout session id
//! - Catalog read once at startup from `products.json`
//!
//! # Security
//!
//! This binary holds the Stripe secret key and the webhook signing secret.
//! Webhook deliveries are only trusted after their signature verifies over
//! the raw request bytes.

#![cfg_attr(not(test), forbid(unsafe_code))]

use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fluffy_bites_server::catalog::CatalogStore;
use fluffy_bites_server::config::CafeConfig;
use fluffy_bites_server::services::stripe::StripeClient;
use fluffy_bites_server::state::AppState;
use fluffy_bites_server::store::OrderStore;

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &CafeConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = CafeConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Initialize tracing with EnvFilter and Sentry integration
    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "fluffy_bites_server=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    // Load the catalog once; a menu typo should fail startup, not checkout
    let catalog =
        CatalogStore::load(&config.catalog_path()).expect("Failed to load product catalog");

    // Open the order directory
    let orders = OrderStore::open(config.orders_dir()).expect("Failed to open order storage");
    tracing::info!(dir = %orders.dir().display(), "Order storage ready");

    // One Stripe client for the lifetime of the process, shared by both the
    // checkout and webhook handlers through the application state
    let stripe = StripeClient::new(&config.stripe).expect("Failed to build Stripe client");

    // Build application state and router
    let state = AppState::new(config.clone(), catalog, stripe, orders);
    let app = fluffy_bites_server::app(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    // Start server
    let addr = config.socket_addr();
    tracing::info!("ordering API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
