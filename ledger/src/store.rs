//! Conversion ledger storage.

use async_trait::async_trait;
use chrono::NaiveDate;
use kursbot_common::{CurrencyCode, StoreResult, UserId};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::debug;

use crate::record::ConversionRecord;

/// Append-only store of conversion records.
#[async_trait]
pub trait ConversionLedger: Send + Sync {
    /// Durably append a record.
    async fn save(&self, record: ConversionRecord) -> StoreResult<ConversionRecord>;

    /// Records for a user, in insertion order.
    async fn find_by_user_id(&self, user_id: UserId) -> StoreResult<Vec<ConversionRecord>>;

    /// Records whose input amount lies within `[min, max]`.
    async fn find_by_amount_range(
        &self,
        min: Decimal,
        max: Decimal,
    ) -> StoreResult<Vec<ConversionRecord>>;

    /// Records touching `code` on either side, created on `date` (UTC).
    async fn find_by_currency_and_date(
        &self,
        code: &CurrencyCode,
        date: NaiveDate,
    ) -> StoreResult<Vec<ConversionRecord>>;
}

/// In-process ledger keeping records in insertion order.
pub struct InMemoryLedger {
    records: RwLock<Vec<ConversionRecord>>,
}

impl InMemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Check if the ledger is empty.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn select(&self, predicate: impl Fn(&ConversionRecord) -> bool) -> Vec<ConversionRecord> {
        self.records
            .read()
            .iter()
            .filter(|r| predicate(r))
            .cloned()
            .collect()
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversionLedger for InMemoryLedger {
    async fn save(&self, record: ConversionRecord) -> StoreResult<ConversionRecord> {
        debug!(record_id = %record.id, user_id = %record.user_id, "Appending conversion record");
        self.records.write().push(record.clone());
        Ok(record)
    }

    async fn find_by_user_id(&self, user_id: UserId) -> StoreResult<Vec<ConversionRecord>> {
        Ok(self.select(|r| r.user_id == user_id))
    }

    async fn find_by_amount_range(
        &self,
        min: Decimal,
        max: Decimal,
    ) -> StoreResult<Vec<ConversionRecord>> {
        Ok(self.select(|r| r.amount >= min && r.amount <= max))
    }

    async fn find_by_currency_and_date(
        &self,
        code: &CurrencyCode,
        date: NaiveDate,
    ) -> StoreResult<Vec<ConversionRecord>> {
        Ok(self.select(|r| r.involves(code) && r.created_on() == date))
    }
}
