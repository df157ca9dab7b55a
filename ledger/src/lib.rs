//! Kursbot Conversion Ledger
//!
//! Append-only record of every completed currency conversion.

pub mod record;
pub mod store;

pub use record::ConversionRecord;
pub use store::{ConversionLedger, InMemoryLedger};
