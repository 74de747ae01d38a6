//! Money conversion between display prices and payment-provider minor units.
//!
//! Display prices are decimal major units (euros with cents). The payment
//! provider's API only accepts integer minor units (cents), so prices cross
//! that boundary exactly once, at checkout-session creation, via
//! [`to_minor_units`]. Webhook payloads come back in minor units and are
//! converted for storage via [`from_minor_units`].

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convert a major-unit amount to integer minor units (cents).
///
/// Rounds half-up. Display prices carry at most two decimal places, so the
/// rounding only matters for amounts produced by arithmetic (quantity
/// discounts and the like).
///
/// Returns `None` when the scaled amount does not fit in an `i64`, which no
/// real cart can reach.
#[must_use]
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// Convert integer minor units (cents) back to a major-unit decimal.
#[must_use]
pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, 2)
}

/// ISO 4217 currency codes accepted for checkout.
///
/// The provider wants lowercase codes on the wire; [`CurrencyCode::as_str`]
/// returns that form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CurrencyCode {
    #[default]
    Eur,
    Usd,
    Gbp,
    Sek,
    Nok,
    Dkk,
}

impl CurrencyCode {
    /// Lowercase ISO code as sent to the payment provider.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eur => "eur",
            Self::Usd => "usd",
            Self::Gbp => "gbp",
            Self::Sek => "sek",
            Self::Nok => "nok",
            Self::Dkk => "dkk",
        }
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a currency code from configuration.
#[derive(Debug, Error)]
#[error("unsupported currency code: {0}")]
pub struct CurrencyParseError(String);

impl std::str::FromStr for CurrencyCode {
    type Err = CurrencyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "eur" => Ok(Self::Eur),
            "usd" => Ok(Self::Usd),
            "gbp" => Ok(Self::Gbp),
            "sek" => Ok(Self::Sek),
            "nok" => Ok(Self::Nok),
            "dkk" => Ok(Self::Dkk),
            _ => Err(CurrencyParseError(s.to_string())),
        }
    }
}
