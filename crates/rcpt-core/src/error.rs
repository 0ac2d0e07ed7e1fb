//! Error types for the rcpt-core library.

use thiserror::Error;

/// Main error type for the rcpt library.
#[derive(Error, Debug)]
pub enum RcptError {
    /// Error reported by the OCR collaborator.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors surfaced by the OCR collaborator.
///
/// The extraction core never interprets these; they are handed back to the
/// caller unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OcrError {
    /// The input could not be decoded as an image.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),
}

/// Per-token normalization failures.
///
/// Raised by the locale normalizer and consumed by the detectors, which treat
/// them as a rejected candidate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    /// The token is not a number, or its separators fit no known convention.
    #[error("ambiguous number {input:?}: {reason}")]
    AmbiguousNumber { input: String, reason: String },

    /// The token matches no supported date shape or is out of calendar range.
    #[error("unparseable date {input:?}: {reason}")]
    UnparseableDate { input: String, reason: String },
}

impl NormalizeError {
    pub(crate) fn number(input: &str, reason: impl Into<String>) -> Self {
        Self::AmbiguousNumber {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn date(input: &str, reason: impl Into<String>) -> Self {
        Self::UnparseableDate {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for the rcpt library.
pub type Result<T> = std::result::Result<T, RcptError>;
