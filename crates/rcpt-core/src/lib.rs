//! Core library for receipt field extraction.
//!
//! This crate provides:
//! - OCR output model (fragments, bounding boxes, reading order)
//! - Locale normalization of amounts and dates
//! - Merchant, date and total detectors with confidence aggregation
//! - The extraction pipeline producing the service's JSON record

pub mod error;
pub mod models;
pub mod ocr;
pub mod receipt;

pub use error::{NormalizeError, OcrError, RcptError, Result};
pub use models::{ExtractionConfig, ExtractionResult, RcptConfig, TotalAmount};
pub use ocr::{FragmentSet, OcrDetection, OcrOutput, TextFragment, TextRecognizer};
pub use receipt::{Diagnostics, ExtractOptions, Extraction, LocaleNormalizer, ReceiptParser};
