//! Conversion engine.

use std::sync::Arc;

use chrono::NaiveDate;
use kursbot_common::{parse_decimal, CurrencyCode, CurrencyRate, UserDirectory, UserId};
use kursbot_ledger::{ConversionLedger, ConversionRecord};
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use crate::conversion::quote;
use crate::error::{ConversionError, ConversionResult};
use crate::fee::FeeSettings;
use crate::ingestion::RateIngestionEngine;
use crate::store::RateStore;

/// Date format accepted by [`ConversionEngine::by_currency_and_date`].
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Converts amounts between stored currencies and keeps the conversion ledger.
pub struct ConversionEngine {
    ingestion: Arc<RateIngestionEngine>,
    rates: Arc<dyn RateStore>,
    users: Arc<dyn UserDirectory>,
    ledger: Arc<dyn ConversionLedger>,
    fees: Arc<dyn FeeSettings>,
}

impl ConversionEngine {
    /// Create a new conversion engine.
    pub fn new(
        ingestion: Arc<RateIngestionEngine>,
        rates: Arc<dyn RateStore>,
        users: Arc<dyn UserDirectory>,
        ledger: Arc<dyn ConversionLedger>,
        fees: Arc<dyn FeeSettings>,
    ) -> Self {
        Self {
            ingestion,
            rates,
            users,
            ledger,
            fees,
        }
    }

    /// Convert `amount` of `from` into `to` for a user.
    ///
    /// Rates are refreshed from the feed first; a failed refresh fails the
    /// conversion. The stored record carries the pre-fee cross rate and the
    /// post-fee amount.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn convert(
        &self,
        user_id: UserId,
        from: &str,
        to: &str,
        amount: Decimal,
    ) -> ConversionResult<ConversionRecord> {
        if amount <= Decimal::ZERO {
            return Err(ConversionError::InvalidAmount(amount));
        }

        self.ingestion.refresh().await?;

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(ConversionError::UserNotFound(user_id))?;

        let (source, target) = self.require_pair(from, to).await?;

        let fee = self.fees.current().await?;
        let (result_amount, rate) = quote(amount, &source, &target, fee).map_err(|e| {
            warn!(source = %source.code, target = %target.code, error = %e, "Quote rejected");
            e
        })?;

        let record = ConversionRecord::new(
            user.id,
            source.code,
            target.code,
            amount,
            result_amount,
            rate,
        );
        let record = self.ledger.save(record).await?;

        info!(
            record_id = %record.id,
            source = %record.source,
            target = %record.target,
            amount = %record.amount,
            result = %record.result_amount,
            rate = %record.rate,
            fee = %fee,
            "Conversion completed"
        );

        Ok(record)
    }

    /// Conversion history for a user, in insertion order.
    pub async fn history(&self, user_id: UserId) -> ConversionResult<Vec<ConversionRecord>> {
        Ok(self.ledger.find_by_user_id(user_id).await?)
    }

    /// Records whose input amount is within `[min, max]`; `None` when nothing matches.
    pub async fn by_amount_range(
        &self,
        min: Decimal,
        max: Decimal,
    ) -> ConversionResult<Option<Vec<ConversionRecord>>> {
        if min > max {
            return Err(ConversionError::InvalidAmountRange { min, max });
        }

        let records = self.ledger.find_by_amount_range(min, max).await?;
        Ok(if records.is_empty() { None } else { Some(records) })
    }

    /// Records touching `code` on either side, created on `date` (`yyyy-MM-dd`, UTC).
    pub async fn by_currency_and_date(
        &self,
        code: &str,
        date: &str,
    ) -> ConversionResult<Vec<ConversionRecord>> {
        let day = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT)
            .map_err(|_| ConversionError::InvalidDateFormat(date.to_string()))?;
        let currency = self.require_currency(code).await?;

        Ok(self
            .ledger
            .find_by_currency_and_date(&currency.code, day)
            .await?)
    }

    /// Refresh from the feed, then list every stored rate ordered by code.
    pub async fn rates(&self) -> ConversionResult<Vec<CurrencyRate>> {
        self.ingestion.refresh().await?;
        Ok(self.rates.find_all().await?)
    }

    /// Stored rates ordered by code, without refreshing.
    pub async fn currencies(&self) -> ConversionResult<Vec<CurrencyRate>> {
        Ok(self.rates.find_all().await?)
    }

    /// Look up a stored currency without refreshing.
    pub async fn find_currency(&self, code: &str) -> ConversionResult<Option<CurrencyRate>> {
        Ok(self.rates.find_by_code(&CurrencyCode::new(code)).await?)
    }

    /// Parse a user-typed amount, accepting `.` or `,` as separator.
    pub fn parse_amount(input: &str) -> ConversionResult<Decimal> {
        match parse_decimal(input) {
            Ok(amount) if amount > Decimal::ZERO => Ok(amount),
            Ok(amount) => Err(ConversionError::InvalidAmount(amount)),
            Err(_) => Err(ConversionError::InvalidAmount(Decimal::ZERO)),
        }
    }

    /// Resolve both sides from one consistent view of the store.
    async fn require_pair(
        &self,
        from: &str,
        to: &str,
    ) -> ConversionResult<(CurrencyRate, CurrencyRate)> {
        let from = CurrencyCode::new(from);
        let to = CurrencyCode::new(to);
        let (source, target) = self.rates.find_pair(&from, &to).await?;
        let source = source.ok_or(ConversionError::CurrencyNotFound(from))?;
        let target = target.ok_or(ConversionError::CurrencyNotFound(to))?;
        Ok((source, target))
    }

    async fn require_currency(&self, code: &str) -> ConversionResult<CurrencyRate> {
        let code = CurrencyCode::new(code);
        debug!(code = %code, "Resolving currency");
        self.rates
            .find_by_code(&code)
            .await?
            .ok_or(ConversionError::CurrencyNotFound(code))
    }
}
