//! Inline keyboard callback data.

use std::fmt;

use kursbot_common::{parse_decimal, CurrencyCode};
use rust_decimal::Decimal;

/// A decoded button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callback {
    /// `fee:pick:<percent>`
    FeePick(Decimal),
    /// `fee:manual`
    FeeManual,
    /// `fee:confirm`
    FeeConfirm,
    /// `conv:from:<CODE>`
    ConvertFrom(CurrencyCode),
    /// `conv:to:<FROM>:<TO>`
    ConvertTo(CurrencyCode, CurrencyCode),
}

impl Callback {
    /// Decode callback data. Unknown or malformed data yields `None`.
    pub fn parse(data: &str) -> Option<Self> {
        let parts: Vec<&str> = data.trim().split(':').collect();
        match parts.as_slice() {
            ["fee", "pick", value] => parse_decimal(value).ok().map(Callback::FeePick),
            ["fee", "manual"] => Some(Callback::FeeManual),
            ["fee", "confirm"] => Some(Callback::FeeConfirm),
            ["conv", "from", code] if !code.is_empty() => {
                Some(Callback::ConvertFrom(CurrencyCode::new(*code)))
            }
            ["conv", "to", from, to] if !from.is_empty() && !to.is_empty() => Some(
                Callback::ConvertTo(CurrencyCode::new(*from), CurrencyCode::new(*to)),
            ),
            _ => None,
        }
    }
}

impl fmt::Display for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callback::FeePick(value) => write!(f, "fee:pick:{}", value.normalize()),
            Callback::FeeManual => write!(f, "fee:manual"),
            Callback::FeeConfirm => write!(f, "fee:confirm"),
            Callback::ConvertFrom(code) => write!(f, "conv:from:{code}"),
            Callback::ConvertTo(from, to) => write!(f, "conv:to:{from}:{to}"),
        }
    }
}
