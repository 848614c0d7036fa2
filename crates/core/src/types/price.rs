//! Service price represented with decimal arithmetic.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Base price of a tailoring service.
///
/// Shops quote a single currency, so only the amount is stored. Documents
/// carry prices as JSON numbers; [`Price::to_wire`] produces that form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Create a price, rejecting negative amounts.
    #[must_use]
    pub fn new(amount: Decimal) -> Option<Self> {
        (!amount.is_sign_negative()).then_some(Self(amount))
    }

    /// A zero price, shown for services without a quote.
    #[must_use]
    pub const fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// The decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// JSON number written to documents.
    #[must_use]
    pub fn to_wire(&self) -> serde_json::Value {
        self.0
            .to_f64()
            .and_then(serde_json::Number::from_f64)
            .map_or(serde_json::Value::Null, serde_json::Value::Number)
    }

    /// Format for display, e.g. `$20.00`.
    #[must_use]
    pub fn display(&self) -> String {
        format!("${:.2}", self.0)
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display())
    }
}

impl std::str::FromStr for Price {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount: Decimal = s
            .trim()
            .parse()
            .map_err(|e| format!("invalid price '{s}': {e}"))?;
        Self::new(amount).ok_or_else(|| format!("price cannot be negative: {s}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_uses_two_decimals() {
        let price: Price = "20".parse().unwrap();
        assert_eq!(price.display(), "$20.00");
        let price: Price = "12.5".parse().unwrap();
        assert_eq!(price.to_string(), "$12.50");
    }

    #[test]
    fn test_negative_price_rejected() {
        assert!("-1".parse::<Price>().is_err());
        assert!("abc".parse::<Price>().is_err());
    }

    #[test]
    fn test_to_wire_is_a_number() {
        let price: Price = "19.99".parse().unwrap();
        assert_eq!(price.to_wire(), serde_json::json!(19.99));
    }
}
