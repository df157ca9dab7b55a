//! Conversion records, the immutable entries of the ledger.

use chrono::{DateTime, NaiveDate, Utc};
use kursbot_common::{CurrencyCode, RecordId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A completed conversion. Never mutated once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRecord {
    /// Unique record ID.
    pub id: RecordId,
    /// User who requested the conversion.
    pub user_id: UserId,
    /// Currency converted from.
    pub source: CurrencyCode,
    /// Currency converted to.
    pub target: CurrencyCode,
    /// Input amount in the source currency.
    pub amount: Decimal,
    /// Output amount in the target currency, after the fee.
    pub result_amount: Decimal,
    /// Cross rate used, before the fee.
    pub rate: Decimal,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl ConversionRecord {
    /// Create a new conversion record stamped with the current time.
    pub fn new(
        user_id: UserId,
        source: CurrencyCode,
        target: CurrencyCode,
        amount: Decimal,
        result_amount: Decimal,
        rate: Decimal,
    ) -> Self {
        Self {
            id: RecordId::new(),
            user_id,
            source,
            target,
            amount,
            result_amount,
            rate,
            created_at: Utc::now(),
        }
    }

    /// Check whether the record touches the currency on either side.
    pub fn involves(&self, code: &CurrencyCode) -> bool {
        &self.source == code || &self.target == code
    }

    /// Calendar date (UTC) the record was created on.
    pub fn created_on(&self) -> NaiveDate {
        self.created_at.date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record() -> ConversionRecord {
        ConversionRecord::new(
            UserId::new(),
            CurrencyCode::usd(),
            CurrencyCode::rub(),
            dec!(100),
            dec!(8145),
            dec!(90.5),
        )
    }

    #[test]
    fn test_involves_either_side() {
        let record = record();
        assert!(record.involves(&CurrencyCode::usd()));
        assert!(record.involves(&CurrencyCode::rub()));
        assert!(!record.involves(&CurrencyCode::eur()));
    }
}
