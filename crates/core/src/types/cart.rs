//! Carts as submitted by the site and their round trip through session
//! metadata.
//!
//! The payment provider does not echo line items back in a usable form when a
//! checkout completes, so the cart is serialized into the session's metadata
//! at creation time and recovered from it by the webhook handler. That round
//! trip is the only persistence of cart contents between the two handlers;
//! [`CartSnapshot`] makes it an explicit contract instead of an ad-hoc
//! stringly field.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Metadata key under which the cart snapshot is stored on the session.
pub const CART_METADATA_KEY: &str = "cartItems";

/// A single cart line as submitted by the menu page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Catalog product id.
    pub id: String,
    /// Display name, shown on the provider's hosted checkout page.
    pub name: String,
    /// Unit price in major units (euros, two decimal places).
    pub price: Decimal,
    /// Number of units. Must be at least one.
    pub quantity: u32,
    /// Relative image path, resolved against the public base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Validation failures for client-supplied carts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    /// Cart missing or zero items. The response body text is load-bearing:
    /// the menu page matches on it.
    #[error("Cart is empty")]
    Empty,

    /// An item with a zero quantity.
    #[error("Item {0:?} has zero quantity")]
    ZeroQuantity(String),

    /// An item with a negative price.
    #[error("Item {0:?} has a negative price")]
    NegativePrice(String),
}

/// A validated, non-empty cart.
///
/// Deliberately not deserializable: the only way in is [`Cart::new`], so an
/// unvalidated item list cannot masquerade as a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Validate a client-supplied item list into a cart.
    ///
    /// Enforces the input schema at the boundary: non-empty, every quantity
    /// at least one, no negative prices. Zero prices are allowed so that
    /// fully discounted items can still check out.
    ///
    /// # Errors
    ///
    /// Returns [`CartError`] describing the first violation found.
    pub fn new(items: Vec<CartItem>) -> Result<Self, CartError> {
        if items.is_empty() {
            return Err(CartError::Empty);
        }
        for item in &items {
            if item.quantity == 0 {
                return Err(CartError::ZeroQuantity(item.id.clone()));
            }
            if item.price < Decimal::ZERO {
                return Err(CartError::NegativePrice(item.id.clone()));
            }
        }
        Ok(Self { items })
    }

    /// The validated items.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Cart total in major units.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.items
            .iter()
            .map(|item| item.price * Decimal::from(item.quantity))
            .sum()
    }
}

/// The cart as serialized into (and recovered from) session metadata.
///
/// Decoding never fails: missing or malformed metadata degrades to an empty
/// item list so a confirmed payment is always recorded, with the gap flagged
/// in logs as a data-quality problem rather than a transport error.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CartSnapshot {
    items: Vec<CartItem>,
}

impl CartSnapshot {
    /// Snapshot a validated cart for attachment to a checkout session.
    #[must_use]
    pub fn of(cart: &Cart) -> Self {
        Self {
            items: cart.items().to_vec(),
        }
    }

    /// Serialize for the session's metadata field.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if serialization fails, which only
    /// happens when a `Decimal` is not representable - not reachable from
    /// validated input.
    pub fn to_metadata_value(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.items)
    }

    /// Recover a snapshot from the metadata value on a completed session.
    ///
    /// `None` or unparseable input yields the empty snapshot.
    #[must_use]
    pub fn from_metadata_value(value: Option<&str>) -> Self {
        let Some(raw) = value else {
            tracing::warn!("completed session carries no cart metadata; storing empty item list");
            return Self::default();
        };

        match serde_json::from_str::<Vec<CartItem>>(raw) {
            Ok(items) => Self { items },
            Err(error) => {
                tracing::warn!(%error, "cart metadata is malformed; storing empty item list");
                Self::default()
            }
        }
    }

    /// The recovered items, possibly empty.
    #[must_use]
    pub fn into_items(self) -> Vec<CartItem> {
        self.items
    }
}
