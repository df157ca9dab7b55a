//! Kursbot FX Engine
//!
//! Currency rate ingestion and conversion.
//!
//! # Features
//!
//! - Central bank `XML_daily` feed fetching and parsing
//! - Atomic rate refresh through an explicit store transaction
//! - Cross-rate conversion with a global percentage fee
//! - Conversion history queries over the ledger
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use kursbot_fx::{HttpFeedFetcher, InMemoryRateStore, IngestionConfig, RateIngestionEngine};
//!
//! let store = Arc::new(InMemoryRateStore::new());
//! let ingestion = RateIngestionEngine::new(
//!     Arc::new(HttpFeedFetcher::new(kursbot_fx::DEFAULT_FEED_URL)),
//!     store.clone(),
//!     IngestionConfig::default(),
//! );
//!
//! let rates = ingestion.refresh().await?;
//! ```

pub mod conversion;
pub mod engine;
pub mod error;
pub mod fee;
pub mod feed;
pub mod ingestion;
pub mod provider;
pub mod store;

pub use conversion::{apply_fee, cross_rate, quote, unit_rate};
pub use engine::ConversionEngine;
pub use error::{
    ArithmeticError, ConversionError, ConversionResult, FeeError, FeeResult, FetchError,
    IngestionError, ParsingError, RateUpdateFailed,
};
pub use fee::{FeeSettings, GlobalFeeSetting, InMemoryFeeSettings};
pub use feed::{FeedEntry, FeedSnapshot};
pub use ingestion::{IngestionConfig, RateIngestionEngine};
pub use provider::{FeedFetcher, HttpFeedFetcher, DEFAULT_FEED_URL};
pub use store::{InMemoryRateStore, RateStore, RateTransaction};

#[cfg(any(test, feature = "test-utils"))]
pub use provider::MockFeedFetcher;
