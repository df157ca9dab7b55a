//! Bot configuration.

use std::str::FromStr;

use kursbot_common::{parse_decimal, ChatId, CurrencyCode};
use kursbot_fx::{IngestionConfig, DEFAULT_FEED_URL};
use rust_decimal::Decimal;

/// Main bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Central bank feed URL.
    pub feed_url: String,
    /// Local base currency.
    pub base_currency: CurrencyCode,
    /// Display name of the base currency.
    pub base_currency_name: String,
    /// Chats that register with the admin role.
    pub admin_chat_ids: Vec<ChatId>,
    /// Fee values offered as one-tap buttons.
    pub fee_quick_picks: Vec<Decimal>,
    /// Minimum password length.
    pub min_password_len: usize,
    /// Log verification codes at `debug`. Development only.
    pub reveal_codes: bool,
    /// Log level.
    pub log_level: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        let ingestion = IngestionConfig::default();
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            base_currency: ingestion.base_currency,
            base_currency_name: ingestion.base_currency_name,
            admin_chat_ids: Vec::new(),
            fee_quick_picks: [0, 5, 10, 20, 50]
                .into_iter()
                .map(|tenths| Decimal::new(tenths, 1))
                .collect(),
            min_password_len: 6,
            reveal_codes: false,
            log_level: "info".to_string(),
        }
    }
}

/// Parse a comma separated list; `None` if any item is malformed.
fn parse_list<T>(raw: &str, parse: impl Fn(&str) -> Option<T>) -> Option<Vec<T>> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(parse)
        .collect()
}

impl BotConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup, over the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("KURSBOT_FEED_URL") {
            config.feed_url = url;
        }

        if let Some(code) = lookup("KURSBOT_BASE_CURRENCY") {
            config.base_currency = CurrencyCode::new(code);
        }

        if let Some(ids) = lookup("KURSBOT_ADMIN_CHAT_IDS") {
            if let Some(ids) = parse_list(&ids, |id| ChatId::parse(id).ok()) {
                config.admin_chat_ids = ids;
            }
        }

        if let Some(picks) = lookup("KURSBOT_FEE_QUICK_PICKS") {
            if let Some(picks) = parse_list(&picks, |p| parse_decimal(p).ok()) {
                config.fee_quick_picks = picks;
            }
        }

        if let Some(len) = lookup("KURSBOT_MIN_PASSWORD_LEN") {
            if let Ok(len) = usize::from_str(len.trim()) {
                config.min_password_len = len;
            }
        }

        if let Some(reveal) = lookup("KURSBOT_REVEAL_CODES") {
            config.reveal_codes = matches!(reveal.trim(), "1" | "true" | "yes");
        }

        if let Some(level) = lookup("LOG_LEVEL") {
            config.log_level = level;
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.feed_url.trim().is_empty() {
            return Err("Feed URL cannot be empty".to_string());
        }

        if !self.base_currency.is_valid() {
            return Err(format!(
                "Base currency {:?} is not a 3-letter code",
                self.base_currency.code()
            ));
        }

        if let Some(bad) = self
            .fee_quick_picks
            .iter()
            .find(|p| **p < Decimal::ZERO || **p > Decimal::ONE_HUNDRED)
        {
            return Err(format!("Fee quick pick {bad} is outside [0, 100]"));
        }

        if self.min_password_len == 0 {
            return Err("Minimum password length must be at least 1".to_string());
        }

        Ok(())
    }

    /// Rate ingestion settings derived from this config.
    pub fn ingestion(&self) -> IngestionConfig {
        IngestionConfig {
            base_currency: self.base_currency.clone(),
            base_currency_name: self.base_currency_name.clone(),
        }
    }
}
