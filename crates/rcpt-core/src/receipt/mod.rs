//! Receipt field extraction module.

pub mod confidence;
pub mod locale;
mod parser;
pub mod patterns;
pub mod rules;

pub use confidence::FieldConfidence;
pub use locale::{format_amount, LocaleNormalizer, NormalizedAmount, NormalizedDate};
pub use parser::{
    DetectorTimings, Diagnostics, ExtractOptions, Extraction, ExtractionStage, ReceiptParser,
    StageTiming,
};
pub use rules::{Candidate, Detection, FieldDetector};
