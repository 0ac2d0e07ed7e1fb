//! Confidence aggregation.
//!
//! A field's confidence is the mean OCR confidence of its backing fragments
//! times the detector's structural confidence. The report score is the mean
//! over the fields that were found; absent fields do not pull it down.

use serde::Serialize;

use super::rules::Candidate;
use crate::ocr::FragmentSet;

/// Per-field confidences, `None` for fields that were not found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FieldConfidence {
    pub merchant: Option<f32>,
    pub date: Option<f32>,
    pub total: Option<f32>,
}

impl FieldConfidence {
    /// Mean over found fields, rounded to three decimals; 0.0 if none.
    pub fn score(&self) -> f32 {
        let found: Vec<f32> = [self.merchant, self.date, self.total]
            .into_iter()
            .flatten()
            .collect();

        if found.is_empty() {
            return 0.0;
        }

        let mean = found.iter().sum::<f32>() / found.len() as f32;
        ((mean * 1000.0).round() / 1000.0).clamp(0.0, 1.0)
    }
}

/// Confidence of one found field.
///
/// A candidate without backing fragments has no OCR evidence and scores 0.0.
pub fn field_confidence<T>(set: &FragmentSet, candidate: &Candidate<T>) -> f32 {
    let ocr = set.mean_confidence(&candidate.fragments).unwrap_or(0.0);
    (ocr * candidate.confidence).clamp(0.0, 1.0)
}
