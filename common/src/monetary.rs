//! Monetary types for kursbot.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::RateId;

/// Number of fractional digits kept for rates and converted amounts.
pub const RATE_SCALE: u32 = 6;

/// Round half-up to [`RATE_SCALE`] fractional digits.
///
/// Values here are always non-negative, where "away from zero" is half-up.
pub fn round_rate(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(RATE_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(RATE_SCALE);
    rounded
}

/// Parse a user- or feed-supplied decimal, accepting `,` as the separator.
pub fn parse_decimal(input: &str) -> Result<Decimal, rust_decimal::Error> {
    let normalized = input.trim().replace(',', ".");
    Decimal::from_str(&normalized)
}

/// ISO 4217 currency code, always uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Create a new currency code, canonicalized to uppercase.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_uppercase())
    }

    /// Get the currency code.
    pub fn code(&self) -> &str {
        &self.0
    }

    /// Check the code looks like an ISO 4217 alpha code.
    pub fn is_valid(&self) -> bool {
        self.0.len() == 3 && self.0.chars().all(|c| c.is_ascii_uppercase())
    }

    pub fn rub() -> Self {
        Self::new("RUB")
    }

    pub fn usd() -> Self {
        Self::new("USD")
    }

    pub fn eur() -> Self {
        Self::new("EUR")
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CurrencyCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A stored currency rate relative to the base currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyRate {
    /// Row identity, preserved across updates.
    pub id: RateId,
    /// Currency code (unique).
    pub code: CurrencyCode,
    /// Display name.
    pub name: String,
    /// Units of base currency per one unit of this currency.
    pub rate: Decimal,
    /// When the row was last written.
    pub updated_at: DateTime<Utc>,
}

impl CurrencyRate {
    /// Create a fresh rate row.
    pub fn new(code: CurrencyCode, name: impl Into<String>, rate: Decimal) -> Self {
        Self {
            id: RateId::new(),
            code,
            name: name.into(),
            rate,
            updated_at: Utc::now(),
        }
    }
}

impl fmt::Display for CurrencyRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.code, self.name, self.rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_currency_code_canonical() {
        assert_eq!(CurrencyCode::new(" usd ").code(), "USD");
        assert_eq!(CurrencyCode::from("eur"), CurrencyCode::eur());
        assert!(CurrencyCode::new("rub").is_valid());
        assert!(!CurrencyCode::new("US").is_valid());
        assert!(!CurrencyCode::new("U5D").is_valid());
    }

    #[test]
    fn test_round_rate_half_up() {
        assert_eq!(round_rate(dec!(1.0000005)), dec!(1.000001));
        assert_eq!(round_rate(dec!(1.0000004)), dec!(1.000000));
        assert_eq!(round_rate(dec!(90.5)).to_string(), "90.500000");
    }

    #[test]
    fn test_parse_decimal_separators() {
        assert_eq!(parse_decimal("90,5").unwrap(), dec!(90.5));
        assert_eq!(parse_decimal(" 1.25 ").unwrap(), dec!(1.25));
        assert!(parse_decimal("ten").is_err());
        assert!(parse_decimal("").is_err());
    }

    proptest! {
        #[test]
        fn prop_round_rate_keeps_scale(mantissa in 1i64..1_000_000_000_000, scale in 0u32..12) {
            let value = Decimal::new(mantissa, scale);
            let rounded = round_rate(value);
            prop_assert_eq!(rounded.scale(), RATE_SCALE);
            prop_assert!((rounded - value).abs() <= dec!(0.0000005));
        }
    }
}
