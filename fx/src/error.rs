//! FX engine error types.

use kursbot_common::{CurrencyCode, DirectoryError, StoreError, UserId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Feed could not be retrieved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Connection, DNS or TLS failure.
    #[error("Feed transport error: {0}")]
    Transport(String),

    /// Feed answered with a non-2xx status.
    #[error("Feed returned HTTP {0}")]
    Status(u16),

    /// Response body could not be read.
    #[error("Feed body unreadable: {0}")]
    Body(String),
}

/// Feed payload is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParsingError {
    #[error("Feed is not valid UTF-8")]
    Encoding,

    #[error("Malformed feed document: {0}")]
    Document(String),

    #[error("Invalid currency code {0:?}")]
    InvalidCode(String),

    #[error("Invalid nominal {value:?} for {code}")]
    InvalidNominal { code: String, value: String },

    #[error("Invalid value {value:?} for {code}")]
    InvalidValue { code: String, value: String },

    #[error("Non-positive value {value} for {code}")]
    NonPositiveValue { code: String, value: Decimal },
}

/// Rate computation failed for a feed row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    #[error("Zero nominal for {0}")]
    ZeroNominal(CurrencyCode),

    #[error("Computed rate for {0} is not positive")]
    NonPositiveRate(CurrencyCode),

    #[error("Rate computation overflowed for {0}")]
    Overflow(CurrencyCode),
}

/// One failed step of a rate refresh.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestionError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parsing(#[from] ParsingError),

    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),

    #[error("Failed to save rates: {0}")]
    Save(#[from] StoreError),
}

impl IngestionError {
    /// Get error code for logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            IngestionError::Fetch(_) => "FETCH_ERROR",
            IngestionError::Parsing(_) => "PARSING_ERROR",
            IngestionError::Arithmetic(_) => "ARITHMETIC_ERROR",
            IngestionError::Save(_) => "SAVE_ERROR",
        }
    }
}

/// The only error a rate refresh reports. Prior rates are untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Rate update failed: {source}")]
pub struct RateUpdateFailed {
    #[source]
    pub source: IngestionError,
}

impl RateUpdateFailed {
    pub fn new(source: IngestionError) -> Self {
        Self { source }
    }

    /// The step that failed.
    pub fn cause(&self) -> &IngestionError {
        &self.source
    }
}

impl From<IngestionError> for RateUpdateFailed {
    fn from(err: IngestionError) -> Self {
        Self::new(err)
    }
}

impl From<FetchError> for RateUpdateFailed {
    fn from(err: FetchError) -> Self {
        Self::new(err.into())
    }
}

impl From<ParsingError> for RateUpdateFailed {
    fn from(err: ParsingError) -> Self {
        Self::new(err.into())
    }
}

impl From<ArithmeticError> for RateUpdateFailed {
    fn from(err: ArithmeticError) -> Self {
        Self::new(err.into())
    }
}

impl From<StoreError> for RateUpdateFailed {
    fn from(err: StoreError) -> Self {
        Self::new(err.into())
    }
}

/// Errors from the global fee setting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeeError {
    #[error("Fee {0}% is outside [0, 100]")]
    OutOfRange(Decimal),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Result type for fee operations.
pub type FeeResult<T> = Result<T, FeeError>;

/// Errors that can occur in the conversion engine.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error(transparent)]
    RateUpdate(#[from] RateUpdateFailed),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Currency not found: {0}")]
    CurrencyNotFound(CurrencyCode),

    #[error("Invalid rate for {0}")]
    InvalidRate(CurrencyCode),

    #[error("Invalid date {0:?}, expected yyyy-MM-dd")]
    InvalidDateFormat(String),

    #[error("Invalid amount {0}")]
    InvalidAmount(Decimal),

    #[error("Invalid amount range [{min}, {max}]")]
    InvalidAmountRange { min: Decimal, max: Decimal },

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Fee(#[from] FeeError),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl ConversionError {
    /// Whether the caller supplied bad input, as opposed to a runtime failure.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ConversionError::UserNotFound(_)
                | ConversionError::CurrencyNotFound(_)
                | ConversionError::InvalidDateFormat(_)
                | ConversionError::InvalidAmount(_)
                | ConversionError::InvalidAmountRange { .. }
        )
    }

    /// Get error code for logs and replies.
    pub fn error_code(&self) -> &'static str {
        match self {
            ConversionError::RateUpdate(_) => "RATE_UPDATE_FAILED",
            ConversionError::UserNotFound(_) => "USER_NOT_FOUND",
            ConversionError::CurrencyNotFound(_) => "CURRENCY_NOT_FOUND",
            ConversionError::InvalidRate(_) => "INVALID_RATE",
            ConversionError::InvalidDateFormat(_) => "INVALID_DATE_FORMAT",
            ConversionError::InvalidAmount(_) => "INVALID_AMOUNT",
            ConversionError::InvalidAmountRange { .. } => "INVALID_AMOUNT_RANGE",
            ConversionError::Directory(e) => e.error_code(),
            ConversionError::Fee(_) => "FEE_ERROR",
            ConversionError::Storage(e) => e.error_code(),
        }
    }
}

/// Result type for conversion operations.
pub type ConversionResult<T> = Result<T, ConversionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_step_folds_into_rate_update_failed() {
        let fetch: RateUpdateFailed = FetchError::Status(503).into();
        assert_eq!(fetch.cause().error_code(), "FETCH_ERROR");

        let parse: RateUpdateFailed = ParsingError::Encoding.into();
        assert_eq!(parse.cause().error_code(), "PARSING_ERROR");

        let arith: RateUpdateFailed = ArithmeticError::ZeroNominal(CurrencyCode::usd()).into();
        assert_eq!(arith.cause().error_code(), "ARITHMETIC_ERROR");

        let save: RateUpdateFailed = StoreError::Io("disk".into()).into();
        assert_eq!(save.cause().error_code(), "SAVE_ERROR");
    }

    #[test]
    fn test_user_error_classification() {
        assert!(ConversionError::CurrencyNotFound(CurrencyCode::usd()).is_user_error());
        assert!(!ConversionError::InvalidRate(CurrencyCode::usd()).is_user_error());
        let refresh = ConversionError::from(RateUpdateFailed::from(FetchError::Status(500)));
        assert!(!refresh.is_user_error());
        assert_eq!(refresh.error_code(), "RATE_UPDATE_FAILED");
    }
}
