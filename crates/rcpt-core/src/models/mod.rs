//! Data models: configuration and the extraction result.

pub mod config;
pub mod receipt;

pub use config::{AmountConfig, ExtractionConfig, LayoutConfig, LocaleConfig, MerchantConfig, RcptConfig};
pub use receipt::{ExtractionResult, TotalAmount};
