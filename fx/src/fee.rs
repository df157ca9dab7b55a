//! Global conversion fee setting.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kursbot_common::UserId;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{FeeError, FeeResult};

/// The single global fee row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalFeeSetting {
    /// Fee percentage in `[0, 100]`.
    pub percent: Decimal,
    /// Always `None`: the fee is global, not per user.
    pub owner: Option<UserId>,
    pub updated_at: DateTime<Utc>,
}

impl GlobalFeeSetting {
    pub fn new(percent: Decimal) -> Self {
        Self {
            percent,
            owner: None,
            updated_at: Utc::now(),
        }
    }
}

/// Validate a fee percentage.
pub fn validate_percent(percent: Decimal) -> FeeResult<Decimal> {
    if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
        return Err(FeeError::OutOfRange(percent));
    }
    Ok(percent)
}

/// Store for the global fee percentage.
#[async_trait]
pub trait FeeSettings: Send + Sync {
    /// The stored setting, if it was ever written.
    async fn get(&self) -> FeeResult<Option<GlobalFeeSetting>>;

    /// Replace the global fee. Values outside `[0, 100]` are rejected.
    async fn set(&self, percent: Decimal) -> FeeResult<GlobalFeeSetting>;

    /// Current fee percentage, `0` when never set.
    async fn current(&self) -> FeeResult<Decimal> {
        Ok(self
            .get()
            .await?
            .map(|setting| setting.percent)
            .unwrap_or(Decimal::ZERO))
    }
}

/// In-process fee setting, created lazily on first write.
pub struct InMemoryFeeSettings {
    setting: RwLock<Option<GlobalFeeSetting>>,
}

impl InMemoryFeeSettings {
    pub fn new() -> Self {
        Self {
            setting: RwLock::new(None),
        }
    }

    /// Start with a fee already set.
    pub fn with_percent(percent: Decimal) -> FeeResult<Self> {
        Ok(Self {
            setting: RwLock::new(Some(GlobalFeeSetting::new(validate_percent(percent)?))),
        })
    }
}

impl Default for InMemoryFeeSettings {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeeSettings for InMemoryFeeSettings {
    async fn get(&self) -> FeeResult<Option<GlobalFeeSetting>> {
        Ok(self.setting.read().clone())
    }

    async fn set(&self, percent: Decimal) -> FeeResult<GlobalFeeSetting> {
        let percent = validate_percent(percent)?;
        let setting = GlobalFeeSetting::new(percent);
        *self.setting.write() = Some(setting.clone());

        info!(percent = %percent, "Global fee updated");
        Ok(setting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_defaults_to_zero() {
        let fees = InMemoryFeeSettings::new();
        assert!(fees.get().await.unwrap().is_none());
        assert_eq!(fees.current().await.unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_set_is_global() {
        let fees = InMemoryFeeSettings::new();
        let setting = fees.set(dec!(2.5)).await.unwrap();

        assert_eq!(setting.owner, None);
        assert_eq!(fees.current().await.unwrap(), dec!(2.5));
    }

    #[tokio::test]
    async fn test_bounds() {
        let fees = InMemoryFeeSettings::with_percent(dec!(1)).unwrap();

        assert!(fees.set(dec!(0)).await.is_ok());
        assert!(fees.set(dec!(100)).await.is_ok());
        assert_eq!(fees.set(dec!(150)).await, Err(FeeError::OutOfRange(dec!(150))));
        assert_eq!(fees.set(dec!(-0.1)).await, Err(FeeError::OutOfRange(dec!(-0.1))));
        assert_eq!(fees.current().await.unwrap(), dec!(100));
    }
}
