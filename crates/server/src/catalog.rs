//! Catalog loading.
//!
//! The menu is a single hand-maintained `products.json`. It is read once at
//! startup and held in memory for the lifetime of the process; editing the
//! file means restarting the server, which the cafe does anyway when the
//! menu changes.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use fluffy_bites_core::Catalog;

/// Errors loading the catalog file.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// In-memory catalog shared across handlers.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    catalog: Arc<Catalog>,
}

impl CatalogStore {
    /// Load the catalog document from disk.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let catalog: Catalog =
            serde_json::from_str(&raw).map_err(|source| CatalogError::Parse {
                path: path.display().to_string(),
                source,
            })?;

        tracing::info!(
            products = catalog.products.len(),
            cafe = catalog.metadata.cafe_name.as_deref().unwrap_or("unknown"),
            "Catalog loaded"
        );

        Ok(Self {
            catalog: Arc::new(catalog),
        })
    }

    /// Wrap an already-built catalog (used by tests).
    #[must_use]
    pub fn from_catalog(catalog: Catalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
        }
    }

    /// The loaded document.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}
