//! Central bank daily rate feed (`XML_daily`) model and parser.
//!
//! The document looks like:
//!
//! ```xml
//! <ValCurs Date="19.10.2026" name="Foreign Currency Market">
//!   <Valute ID="R01235">
//!     <NumCode>840</NumCode>
//!     <CharCode>USD</CharCode>
//!     <Nominal>1</Nominal>
//!     <Name>Доллар США</Name>
//!     <Value>90,5000</Value>
//!   </Valute>
//! </ValCurs>
//! ```

use chrono::NaiveDate;
use kursbot_common::{parse_decimal, CurrencyCode};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::ParsingError;

#[derive(Debug, Deserialize)]
struct ValCurs {
    #[serde(rename = "@Date", default)]
    date: Option<String>,
    #[serde(rename = "Valute", default)]
    valute: Vec<Valute>,
}

#[derive(Debug, Deserialize)]
struct Valute {
    #[serde(rename = "CharCode")]
    char_code: String,
    #[serde(rename = "Nominal")]
    nominal: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Value")]
    value: String,
}

/// One currency quoted by the feed: `nominal` units cost `value` base units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub code: CurrencyCode,
    pub name: String,
    pub nominal: u32,
    pub value: Decimal,
}

/// A decoded feed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSnapshot {
    /// Date the feed says the rates are effective for, when present and readable.
    pub date: Option<NaiveDate>,
    pub entries: Vec<FeedEntry>,
}

impl FeedSnapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse a raw feed body.
pub fn parse(raw: &[u8]) -> Result<FeedSnapshot, ParsingError> {
    let text = std::str::from_utf8(raw).map_err(|_| ParsingError::Encoding)?;
    let doc: ValCurs =
        quick_xml::de::from_str(text).map_err(|e| ParsingError::Document(e.to_string()))?;

    let entries = doc
        .valute
        .into_iter()
        .map(parse_entry)
        .collect::<Result<Vec<_>, _>>()?;

    let date = doc
        .date
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%d.%m.%Y").ok());

    Ok(FeedSnapshot { date, entries })
}

fn parse_entry(valute: Valute) -> Result<FeedEntry, ParsingError> {
    let code = CurrencyCode::new(&valute.char_code);
    if !code.is_valid() {
        return Err(ParsingError::InvalidCode(valute.char_code));
    }

    let nominal = valute
        .nominal
        .trim()
        .parse::<u32>()
        .map_err(|_| ParsingError::InvalidNominal {
            code: code.to_string(),
            value: valute.nominal.clone(),
        })?;

    let value = parse_decimal(&valute.value).map_err(|_| ParsingError::InvalidValue {
        code: code.to_string(),
        value: valute.value.clone(),
    })?;
    if value <= Decimal::ZERO {
        return Err(ParsingError::NonPositiveValue {
            code: code.to_string(),
            value,
        });
    }

    Ok(FeedEntry {
        code,
        name: valute.name.trim().to_string(),
        nominal,
        value,
    })
}
