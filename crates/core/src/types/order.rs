//! Persisted order records.
//!
//! An order is created exactly once per completed checkout session, by the
//! webhook handler, and never updated or deleted afterwards. Its id is the
//! provider's session id, which is also the storage key - redelivered
//! webhooks overwrite the same record with equivalent content.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::cart::CartItem;

/// Payment state of a persisted order.
///
/// Only `Paid` is ever produced: the intake handler reacts solely to the
/// provider's session-completed event. Pending and failed checkouts never
/// reach storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Paid,
}

/// Shipping address as collected on the hosted checkout page.
///
/// Field names follow the provider's wire format so the address block is
/// stored exactly as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ShippingAddress {
    #[serde(default)]
    pub line1: Option<String>,
    #[serde(default)]
    pub line2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// A completed, paid order.
///
/// Serialized with camelCase keys; one JSON document per order in the order
/// store, keyed by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Checkout session id, doubling as the storage key.
    pub id: String,
    /// Customer email from provider-collected checkout details.
    #[serde(default)]
    pub customer_email: Option<String>,
    /// Customer name from provider-collected checkout details.
    #[serde(default)]
    pub customer_name: Option<String>,
    /// Total charged, in major units.
    pub amount: Decimal,
    /// Lowercase ISO currency code as reported by the provider.
    pub currency: String,
    pub status: OrderStatus,
    /// The cart recovered from session metadata; empty when the metadata was
    /// missing or malformed.
    pub items: Vec<CartItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<ShippingAddress>,
    /// Persistence time, not purchase time.
    pub created_at: DateTime<Utc>,
    /// Provider payment-intent id, for cross-referencing in the dashboard.
    #[serde(default)]
    pub payment_intent: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_order() -> Order {
        Order {
            id: "cs_test_123".to_string(),
            customer_email: Some("anna@example.com".to_string()),
            customer_name: Some("Anna Virtanen".to_string()),
            amount: "9.00".parse().unwrap(),
            currency: "eur".to_string(),
            status: OrderStatus::Paid,
            items: vec![CartItem {
                id: "latte".to_string(),
                name: "Latte".to_string(),
                price: "4.50".parse().unwrap(),
                quantity: 2,
                image: None,
            }],
            shipping_address: Some(ShippingAddress {
                line1: Some("Mannerheimintie 1".to_string()),
                city: Some("Helsinki".to_string()),
                postal_code: Some("00100".to_string()),
                country: Some("FI".to_string()),
                ..ShippingAddress::default()
            }),
            created_at: "2025-06-01T10:30:00Z".parse().unwrap(),
            payment_intent: Some("pi_test_456".to_string()),
        }
    }

    #[test]
    fn test_order_serializes_camel_case() {
        let json = serde_json::to_value(sample_order()).unwrap();
        assert_eq!(json["customerEmail"], "anna@example.com");
        assert_eq!(json["paymentIntent"], "pi_test_456");
        assert_eq!(json["status"], "paid");
        assert_eq!(json["shippingAddress"]["postal_code"], "00100");
        assert!(json.get("customer_email").is_none());
    }

    #[test]
    fn test_order_round_trip() {
        let order = sample_order();
        let json = serde_json::to_string(&order).unwrap();
        let back: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(back, order);
    }

    #[test]
    fn test_order_optional_fields_deserialize_when_absent() {
        let json = serde_json::json!({
            "id": "cs_test_789",
            "amount": "4.50",
            "currency": "eur",
            "status": "paid",
            "items": [],
            "createdAt": "2025-06-01T10:30:00Z"
        });
        let order: Order = serde_json::from_value(json).unwrap();
        assert!(order.customer_email.is_none());
        assert!(order.shipping_address.is_none());
        assert!(order.payment_intent.is_none());
        assert!(order.items.is_empty());
    }
}
