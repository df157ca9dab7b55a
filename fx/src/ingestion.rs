//! Rate ingestion: fetch, parse, reconcile and upsert as one unit.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use kursbot_common::{round_rate, CurrencyCode, CurrencyRate};
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use crate::conversion::unit_rate;
use crate::error::{IngestionError, RateUpdateFailed};
use crate::feed::{self, FeedSnapshot};
use crate::provider::FeedFetcher;
use crate::store::RateStore;

/// Configuration for rate ingestion.
#[derive(Debug, Clone)]
pub struct IngestionConfig {
    /// Local base currency; always stored with rate 1.
    pub base_currency: CurrencyCode,
    /// Display name of the base currency.
    pub base_currency_name: String,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            base_currency: CurrencyCode::rub(),
            base_currency_name: "Российский рубль".to_string(),
        }
    }
}

/// Reconciled rates ready to be written, keyed by code.
pub type RateTable = BTreeMap<CurrencyCode, (String, Decimal)>;

/// Pulls the external feed into the rate store.
pub struct RateIngestionEngine {
    fetcher: Arc<dyn FeedFetcher>,
    store: Arc<dyn RateStore>,
    config: IngestionConfig,
}

impl RateIngestionEngine {
    /// Create a new ingestion engine.
    pub fn new(
        fetcher: Arc<dyn FeedFetcher>,
        store: Arc<dyn RateStore>,
        config: IngestionConfig,
    ) -> Self {
        Self {
            fetcher,
            store,
            config,
        }
    }

    /// Fetch the feed and replace stored rates with it.
    ///
    /// Either every row of the refresh is stored or none is; on failure the
    /// previously stored rates are left exactly as they were.
    #[instrument(skip(self), fields(fetcher = self.fetcher.name()))]
    pub async fn refresh(&self) -> Result<Vec<CurrencyRate>, RateUpdateFailed> {
        match self.run_unit().await {
            Ok(rates) => {
                info!(rates = rates.len(), "Rates refreshed");
                Ok(rates)
            }
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "Rate refresh failed");
                Err(RateUpdateFailed::new(e))
            }
        }
    }

    async fn run_unit(&self) -> Result<Vec<CurrencyRate>, IngestionError> {
        // The transaction spans the whole unit; an early return drops it uncommitted.
        let mut tx = self.store.begin().await?;

        let raw = self.fetcher.fetch_raw().await?;
        let snapshot = feed::parse(&raw)?;
        debug!(entries = snapshot.len(), date = ?snapshot.date, "Parsed feed");

        let table = self.reconcile(&snapshot)?;

        let now = Utc::now();
        for (code, (name, rate)) in table {
            tx.upsert(code, name, rate, now).await?;
        }

        Ok(tx.commit().await?)
    }

    /// Build the code→rate table, always including the base currency at 1.
    pub fn reconcile(&self, snapshot: &FeedSnapshot) -> Result<RateTable, IngestionError> {
        let mut table = RateTable::new();

        for entry in &snapshot.entries {
            if entry.code == self.config.base_currency {
                continue;
            }
            let rate = unit_rate(&entry.code, entry.nominal, entry.value)?;
            table.insert(entry.code.clone(), (entry.name.clone(), rate));
        }

        table.insert(
            self.config.base_currency.clone(),
            (
                self.config.base_currency_name.clone(),
                round_rate(Decimal::ONE),
            ),
        );

        Ok(table)
    }
}
