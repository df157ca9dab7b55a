//! Currency rate storage with an explicit unit of work.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kursbot_common::{CurrencyCode, CurrencyRate, RateId, StoreError, StoreResult};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::debug;

/// Key-value persistence for currency rate rows, keyed by code.
#[async_trait]
pub trait RateStore: Send + Sync {
    async fn find_by_code(&self, code: &CurrencyCode) -> StoreResult<Option<CurrencyRate>>;

    /// Two rows read from the same committed state.
    async fn find_pair(
        &self,
        first: &CurrencyCode,
        second: &CurrencyCode,
    ) -> StoreResult<(Option<CurrencyRate>, Option<CurrencyRate>)>;

    /// All rows ordered by code.
    async fn find_all(&self) -> StoreResult<Vec<CurrencyRate>>;

    /// Open a transaction. Writes become visible only on commit.
    async fn begin(&self) -> StoreResult<Box<dyn RateTransaction>>;
}

/// A pending set of rate upserts.
///
/// Dropping a transaction without committing discards every staged write.
#[async_trait]
pub trait RateTransaction: Send {
    /// Stage an insert-or-update of one row.
    async fn upsert(
        &mut self,
        code: CurrencyCode,
        name: String,
        rate: Decimal,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Apply every staged write atomically, returning the rows as stored.
    async fn commit(self: Box<Self>) -> StoreResult<Vec<CurrencyRate>>;
}

type RateTable = BTreeMap<CurrencyCode, CurrencyRate>;

/// In-process rate store. Commits swap rows under one write lock.
#[derive(Clone)]
pub struct InMemoryRateStore {
    rows: Arc<RwLock<RateTable>>,
}

impl InMemoryRateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Write a row directly, bypassing transactions. Intended for seeding.
    pub fn insert(&self, rate: CurrencyRate) {
        self.rows.write().insert(rate.code.clone(), rate);
    }
}

impl Default for InMemoryRateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateStore for InMemoryRateStore {
    async fn find_by_code(&self, code: &CurrencyCode) -> StoreResult<Option<CurrencyRate>> {
        Ok(self.rows.read().get(code).cloned())
    }

    async fn find_pair(
        &self,
        first: &CurrencyCode,
        second: &CurrencyCode,
    ) -> StoreResult<(Option<CurrencyRate>, Option<CurrencyRate>)> {
        let rows = self.rows.read();
        Ok((rows.get(first).cloned(), rows.get(second).cloned()))
    }

    async fn find_all(&self) -> StoreResult<Vec<CurrencyRate>> {
        Ok(self.rows.read().values().cloned().collect())
    }

    async fn begin(&self) -> StoreResult<Box<dyn RateTransaction>> {
        Ok(Box::new(InMemoryRateTransaction {
            rows: Arc::clone(&self.rows),
            staged: Vec::new(),
        }))
    }
}

struct StagedRow {
    code: CurrencyCode,
    name: String,
    rate: Decimal,
    updated_at: DateTime<Utc>,
}

struct InMemoryRateTransaction {
    rows: Arc<RwLock<RateTable>>,
    staged: Vec<StagedRow>,
}

#[async_trait]
impl RateTransaction for InMemoryRateTransaction {
    async fn upsert(
        &mut self,
        code: CurrencyCode,
        name: String,
        rate: Decimal,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        if rate <= Decimal::ZERO {
            return Err(StoreError::Conflict(format!(
                "rate for {} must be positive, got {}",
                code, rate
            )));
        }

        self.staged.push(StagedRow {
            code,
            name,
            rate,
            updated_at,
        });
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<Vec<CurrencyRate>> {
        let this = *self;
        let mut rows = this.rows.write();
        let mut applied = Vec::with_capacity(this.staged.len());

        for staged in this.staged {
            // Existing rows keep their identity.
            let id = rows
                .get(&staged.code)
                .map(|existing| existing.id)
                .unwrap_or_else(RateId::new);

            let row = CurrencyRate {
                id,
                code: staged.code.clone(),
                name: staged.name,
                rate: staged.rate,
                updated_at: staged.updated_at,
            };
            rows.insert(staged.code, row.clone());
            applied.push(row);
        }

        debug!(rows = applied.len(), "Committed rate transaction");
        Ok(applied)
    }
}
