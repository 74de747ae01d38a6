//! Catalog document types.
//!
//! The menu lives in a single `products.json` file maintained by hand. The
//! document keeps its free-form `categories` block as raw JSON - the API
//! serves it back verbatim and only the product list itself is typed.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A menu product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    /// Display price in major units.
    pub price: Decimal,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_image: Option<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default = "default_available")]
    pub available: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allergens: Vec<String>,
}

const fn default_available() -> bool {
    true
}

/// Header block of the catalog document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CatalogMetadata {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub last_update: Option<String>,
    #[serde(default)]
    pub cafe_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// The whole catalog document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub metadata: CatalogMetadata,
    /// Category tree, served back to the menu page untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<serde_json::Value>,
    pub products: Vec<Product>,
}

impl Catalog {
    /// Look up a product by id.
    #[must_use]
    pub fn product(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }
}
