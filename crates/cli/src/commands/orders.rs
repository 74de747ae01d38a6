//! Order inspection commands.
//!
//! # Usage
//!
//! ```bash
//! fb-cli orders list
//! fb-cli orders show cs_live_abc123
//! ```

use std::path::Path;

use thiserror::Error;

use fluffy_bites_server::store::{OrderStore, StoreError};

/// Errors that can occur during order inspection.
#[derive(Debug, Error)]
pub enum OrdersError {
    /// Order store could not be opened or read.
    #[error("Order store error: {0}")]
    Store(#[from] StoreError),

    /// Serialization error when printing.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// List stored orders, newest first.
///
/// # Errors
///
/// Returns [`OrdersError`] if the order directory cannot be read.
pub fn list(data_dir: &Path) -> Result<(), OrdersError> {
    let store = OrderStore::open(data_dir.join("orders"))?;
    let orders = store.list()?;

    if orders.is_empty() {
        tracing::info!("No orders stored in {}", store.dir().display());
        return Ok(());
    }

    tracing::info!("{} order(s) in {}", orders.len(), store.dir().display());
    for order in orders {
        tracing::info!(
            "  {}  {}  {} {}  {}",
            order.created_at.format("%Y-%m-%d %H:%M"),
            order.id,
            order.amount,
            order.currency,
            order.customer_email.as_deref().unwrap_or("-"),
        );
    }

    Ok(())
}

/// Print one order as pretty JSON.
///
/// # Errors
///
/// Returns [`OrdersError`] if the order cannot be loaded.
pub fn show(data_dir: &Path, id: &str) -> Result<(), OrdersError> {
    let store = OrderStore::open(data_dir.join("orders"))?;
    let order = store.load(id)?;

    tracing::info!("{}", serde_json::to_string_pretty(&order)?);
    Ok(())
}
