//! Configuration structures for the extraction pipeline.
//!
//! Loaded once at startup and shared read-only between requests; nothing in
//! the pipeline mutates it after construction.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{RcptError, Result};

/// Main configuration for the rcpt pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RcptConfig {
    /// Receipt field extraction configuration.
    pub extraction: ExtractionConfig,
}

/// Field extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Reading-order reconstruction.
    pub layout: LayoutConfig,

    /// Number and date normalization.
    pub locale: LocaleConfig,

    /// Merchant name detection.
    pub merchant: MerchantConfig,

    /// Total amount detection.
    pub amount: AmountConfig,

    /// Run the three field detectors on separate threads.
    pub parallel_detectors: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            locale: LocaleConfig::default(),
            merchant: MerchantConfig::default(),
            amount: AmountConfig::default(),
            parallel_detectors: false,
        }
    }
}

/// Reading-order configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Maximum vertical-center distance, as a fraction of the median fragment
    /// height, for two fragments to share a line.
    pub line_tolerance: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            line_tolerance: 0.5,
        }
    }
}

/// Locale normalization configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocaleConfig {
    /// Currency symbols and codes stripped before parsing a number.
    pub currency_markers: Vec<String>,

    /// Read ambiguous numeric dates (both fields <= 12) as day-first.
    pub day_first: bool,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            currency_markers: strings(&[
                "rp", "idr", "usd", "us$", "s$", "sgd", "rm", "myr", "eur", "gbp", "$", "€", "£",
                "¥",
            ]),
            day_first: true,
        }
    }
}

/// Merchant detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MerchantConfig {
    /// Number of fragments, in reading order, considered as merchant names.
    pub top_n: usize,

    /// Minimum content length that earns the length bonus.
    pub min_length: usize,

    /// Leading keywords marking address, contact, or document-label lines.
    pub excluded_prefixes: Vec<String>,
}

impl Default for MerchantConfig {
    fn default() -> Self {
        Self {
            top_n: 5,
            min_length: 3,
            excluded_prefixes: strings(&[
                "jl", "jln", "jalan", "alamat", "address", "addr", "street", "telp", "tel",
                "phone", "hp", "fax", "whatsapp", "email", "npwp", "nik", "struk", "receipt",
                "invoice", "nota", "kwitansi", "kasir", "cashier",
            ]),
        }
    }
}

/// Total amount detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AmountConfig {
    /// Labels of the full, final total.
    pub grand_total_labels: Vec<String>,

    /// Labels of a bare total.
    pub total_labels: Vec<String>,

    /// Labels of a subtotal.
    pub subtotal_labels: Vec<String>,

    /// Labels of an amount due or tendered; used only as a fallback.
    pub amount_due_labels: Vec<String>,

    /// Keywords that disqualify a line from total consideration.
    pub excluded_keywords: Vec<String>,

    /// Confidence of the largest-number fallback. Always capped below any
    /// labeled match.
    pub fallback_confidence: f32,

    /// Separator-free digit runs longer than this are treated as identifiers
    /// (phone numbers, transaction ids) by the fallback.
    pub fallback_max_plain_digits: usize,
}

impl Default for AmountConfig {
    fn default() -> Self {
        Self {
            grand_total_labels: strings(&[
                "grand total",
                "total bayar",
                "total belanja",
                "total pembayaran",
                "total harga",
                "jumlah total",
                "total amount",
            ]),
            total_labels: strings(&["total", "jumlah", "tagihan"]),
            subtotal_labels: strings(&["subtotal", "sub total", "sub-total"]),
            amount_due_labels: strings(&[
                "amount due",
                "balance due",
                "total due",
                "bayar",
                "pembayaran",
                "tunai",
                "cash",
            ]),
            excluded_keywords: strings(&[
                "tax",
                "pajak",
                "ppn",
                "vat",
                "discount",
                "diskon",
                "kembalian",
                "change",
                "qty",
                "item",
                "kasir",
                "cashier",
            ]),
            fallback_confidence: 0.5,
            fallback_max_plain_digits: 8,
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

impl RcptConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        let extraction = &self.extraction;

        let tolerance = extraction.layout.line_tolerance;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(RcptError::Config(format!(
                "layout.line_tolerance must be a non-negative number, got {tolerance}"
            )));
        }

        if extraction.merchant.top_n == 0 {
            return Err(RcptError::Config("merchant.top_n must be at least 1".to_string()));
        }

        let fallback = extraction.amount.fallback_confidence;
        if !(0.0..=1.0).contains(&fallback) {
            return Err(RcptError::Config(format!(
                "amount.fallback_confidence must be within [0, 1], got {fallback}"
            )));
        }

        let amount = &extraction.amount;
        let no_labels = amount.grand_total_labels.is_empty()
            && amount.total_labels.is_empty()
            && amount.subtotal_labels.is_empty()
            && amount.amount_due_labels.is_empty();
        if no_labels {
            return Err(RcptError::Config("amount needs at least one label".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RcptConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "extraction": { "merchant": { "top_n": 3 } } }"#;
        let config: RcptConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.extraction.merchant.top_n, 3);
        assert_eq!(config.extraction.merchant.min_length, 3);
        assert!(config.extraction.locale.day_first);
        assert!(config
            .extraction
            .amount
            .total_labels
            .contains(&"total".to_string()));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = RcptConfig::default();
        config.extraction.merchant.top_n = 0;
        assert!(matches!(config.validate(), Err(RcptError::Config(_))));

        let mut config = RcptConfig::default();
        config.extraction.layout.line_tolerance = -1.0;
        assert!(config.validate().is_err());

        let mut config = RcptConfig::default();
        config.extraction.amount.fallback_confidence = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = RcptConfig::default();
        config.extraction.locale.day_first = false;

        config.save(&path).unwrap();
        let loaded = RcptConfig::from_file(&path).unwrap();

        assert!(!loaded.extraction.locale.day_first);
    }
}
