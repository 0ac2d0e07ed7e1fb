//! Rule-based field detectors for receipts.

pub mod amounts;
pub mod dates;
pub mod merchant;

pub use amounts::{AmountDetector, LabelKind};
pub use dates::DateDetector;
pub use merchant::MerchantDetector;

use crate::ocr::ReadingOrder;

/// Trait for field detectors.
///
/// Detectors are pure: the same reading order always yields the same
/// detection, and no detector depends on another's output.
pub trait FieldDetector {
    /// The type of value this detector produces.
    type Output;

    /// Short name used in logs and timings.
    fn name(&self) -> &'static str;

    /// Detect the field, resolving to at most one candidate.
    fn detect(&self, order: &ReadingOrder<'_>) -> Detection<Self::Output>;
}

/// A detector's proposed value with its backing fragments.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate<T> {
    /// Detected value.
    pub value: T,
    /// Structural confidence (0.0 - 1.0), before OCR confidence is applied.
    pub confidence: f32,
    /// Emission indices of the fragments the value was read from.
    pub fragments: Vec<usize>,
    /// Source text that was matched.
    pub source: String,
}

impl<T> Candidate<T> {
    pub fn new(value: T, confidence: f32, source: impl Into<String>) -> Self {
        Self {
            value,
            confidence: confidence.clamp(0.0, 1.0),
            fragments: Vec::new(),
            source: source.into(),
        }
    }

    pub fn with_fragments(mut self, fragments: Vec<usize>) -> Self {
        self.fragments = fragments;
        self
    }
}

/// Outcome of one detector run.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection<T> {
    /// Best candidate, or `None` when the field is absent.
    pub candidate: Option<Candidate<T>>,
    /// Rejected candidates worth reporting.
    pub warnings: Vec<String>,
}

impl<T> Detection<T> {
    pub fn found(candidate: Candidate<T>) -> Self {
        Self {
            candidate: Some(candidate),
            warnings: Vec::new(),
        }
    }

    pub fn none() -> Self {
        Self {
            candidate: None,
            warnings: Vec::new(),
        }
    }
}
