//! Catalog validation command.
//!
//! # Usage
//!
//! ```bash
//! fb-cli catalog validate
//! fb-cli catalog validate --file /srv/cafe/data/products.json
//! ```

use std::collections::HashSet;
use std::path::Path;

use rust_decimal::Decimal;
use thiserror::Error;

use fluffy_bites_core::Catalog;

/// Errors that can occur during catalog validation.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Catalog file could not be read.
    #[error("Failed to read {0}: {1}")]
    Io(String, std::io::Error),

    /// Catalog file could not be parsed.
    #[error("Failed to parse {0}: {1}")]
    Parse(String, serde_json::Error),

    /// Catalog parsed but contains defective products.
    #[error("Catalog has {0} problem(s)")]
    Invalid(usize),
}

/// Parse the catalog and report duplicate ids and non-positive prices.
///
/// # Errors
///
/// Returns [`CatalogError`] if the file is unreadable, unparseable, or
/// contains defective products.
pub fn validate(file: &Path) -> Result<(), CatalogError> {
    let raw = std::fs::read_to_string(file)
        .map_err(|e| CatalogError::Io(file.display().to_string(), e))?;
    let catalog: Catalog = serde_json::from_str(&raw)
        .map_err(|e| CatalogError::Parse(file.display().to_string(), e))?;

    let mut problems = 0usize;
    let mut seen = HashSet::new();

    for product in &catalog.products {
        if !seen.insert(product.id.as_str()) {
            tracing::warn!("Duplicate product id: {}", product.id);
            problems += 1;
        }
        if product.price <= Decimal::ZERO {
            tracing::warn!(
                "Product {} has non-positive price {}",
                product.id,
                product.price
            );
            problems += 1;
        }
        if product.name.trim().is_empty() {
            tracing::warn!("Product {} has an empty name", product.id);
            problems += 1;
        }
    }

    if problems > 0 {
        return Err(CatalogError::Invalid(problems));
    }

    tracing::info!(
        "Catalog OK: {} product(s), cafe {:?}",
        catalog.products.len(),
        catalog.metadata.cafe_name.as_deref().unwrap_or("unknown")
    );
    Ok(())
}
