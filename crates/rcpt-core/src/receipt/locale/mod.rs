//! Locale normalization of numeric and date tokens.
//!
//! Receipts mix conventions freely (`1.234,56` next to `1,234.56`, `Rp`
//! next to `$`), so separator roles are inferred from the token itself rather
//! than from a configured country.

mod date;
mod number;

pub use date::{date_spans, NormalizedDate};
pub use number::{format_amount, AmountSpan, NormalizedAmount};

use crate::models::config::LocaleConfig;

/// Canonicalizes number and date tokens.
///
/// Built once from configuration and shared read-only by the detectors.
#[derive(Debug, Clone)]
pub struct LocaleNormalizer {
    /// Lowercased currency markers, longest first.
    markers: Vec<String>,
    day_first: bool,
}

impl LocaleNormalizer {
    pub fn new(config: &LocaleConfig) -> Self {
        let mut markers: Vec<String> = config
            .currency_markers
            .iter()
            .map(|m| m.trim().to_lowercase())
            .filter(|m| !m.is_empty())
            .collect();
        markers.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        markers.dedup();

        Self {
            markers,
            day_first: config.day_first,
        }
    }

    /// Whether ambiguous numeric dates are read day-first.
    pub fn day_first(&self) -> bool {
        self.day_first
    }
}

impl Default for LocaleNormalizer {
    fn default() -> Self {
        Self::new(&LocaleConfig::default())
    }
}
