//! Receipt extraction result, shaped after the service's JSON contract.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::ser::{Serialize, Serializer};

/// Format of `transaction_date` in the JSON contract.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A detected total: the string as printed and its exact value.
///
/// Both halves live in one value so a raw string can never be reported
/// without its parsed amount, or the other way round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotalAmount {
    /// Matched text, untouched (e.g. `"Rp 150.000"`).
    pub raw: String,
    /// Normalized amount.
    pub value: Decimal,
}

/// Structured fields extracted from one receipt.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtractionResult {
    /// Merchant name from the receipt header.
    pub merchant_name: Option<String>,

    /// Transaction date.
    pub transaction_date: Option<NaiveDate>,

    /// Total amount.
    pub total_amount: Option<TotalAmount>,

    /// Mean confidence over the fields that were found (0.0 - 1.0).
    pub confidence_score: f32,
}

impl ExtractionResult {
    /// Raw total string, if a total was found.
    pub fn total_amount_raw(&self) -> Option<&str> {
        self.total_amount.as_ref().map(|t| t.raw.as_str())
    }

    /// Parsed total value, if a total was found.
    pub fn total_amount_value(&self) -> Option<Decimal> {
        self.total_amount.as_ref().map(|t| t.value)
    }

    /// Transaction date as `YYYY-MM-DD`.
    pub fn transaction_date_string(&self) -> Option<String> {
        self.transaction_date
            .map(|d| d.format(DATE_FORMAT).to_string())
    }

    /// Whether no field was found at all.
    pub fn is_empty(&self) -> bool {
        self.merchant_name.is_none()
            && self.transaction_date.is_none()
            && self.total_amount.is_none()
    }
}

#[derive(serde::Serialize)]
struct WireResult<'a> {
    merchant_name: Option<&'a str>,
    transaction_date: Option<String>,
    total_amount_raw: Option<&'a str>,
    #[serde(with = "rust_decimal::serde::float_option")]
    total_amount_value: Option<Decimal>,
    confidence_score: f32,
}

impl Serialize for ExtractionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireResult {
            merchant_name: self.merchant_name.as_deref(),
            transaction_date: self.transaction_date_string(),
            total_amount_raw: self.total_amount_raw(),
            total_amount_value: self.total_amount_value(),
            confidence_score: self.confidence_score,
        }
        .serialize(serializer)
    }
}
