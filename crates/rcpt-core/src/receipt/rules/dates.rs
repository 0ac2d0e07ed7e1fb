//! Transaction date detection.

use chrono::NaiveDate;
use tracing::debug;

use super::{Candidate, Detection, FieldDetector};
use crate::ocr::ReadingOrder;
use crate::receipt::locale::{date_spans, LocaleNormalizer};

/// Confidence factor for dates only found after joining a line's fragments.
const JOINED_LINE_FACTOR: f32 = 0.9;

/// Finds the transaction date anywhere on the receipt, preferring the topmost.
#[derive(Debug, Clone, Default)]
pub struct DateDetector {
    normalizer: LocaleNormalizer,
}

impl DateDetector {
    pub fn new(normalizer: LocaleNormalizer) -> Self {
        Self { normalizer }
    }

    /// All dates in `text` that normalize, with their raw strings.
    fn dates_in(&self, text: &str) -> Vec<(NaiveDate, f32, String)> {
        date_spans(text)
            .into_iter()
            .filter_map(|span| {
                let raw = &text[span];
                match self.normalizer.normalize_date(raw) {
                    Ok(date) => Some((date.date, date.confidence, date.raw)),
                    Err(e) => {
                        debug!("Rejected date candidate: {}", e);
                        None
                    }
                }
            })
            .collect()
    }
}

/// Earlier line wins, then higher confidence.
fn better(line: usize, confidence: f32, best: &Option<(usize, Candidate<NaiveDate>)>) -> bool {
    match best {
        None => true,
        Some((best_line, best)) => {
            line < *best_line || (line == *best_line && confidence > best.confidence)
        }
    }
}

impl FieldDetector for DateDetector {
    type Output = NaiveDate;

    fn name(&self) -> &'static str {
        "date"
    }

    fn detect(&self, order: &ReadingOrder<'_>) -> Detection<NaiveDate> {
        let mut best: Option<(usize, Candidate<NaiveDate>)> = None;

        for (line, fragment) in order.iter_with_line() {
            for (date, confidence, raw) in self.dates_in(fragment.content()) {
                if better(line, confidence, &best) {
                    let candidate =
                        Candidate::new(date, confidence, raw).with_fragments(vec![fragment.index()]);
                    best = Some((line, candidate));
                }
            }
        }

        // Dates split over several fragments only show up in the joined line.
        if best.is_none() {
            for (n, line) in order.lines().iter().enumerate() {
                for (date, confidence, raw) in self.dates_in(&line.text()) {
                    let confidence = confidence * JOINED_LINE_FACTOR;
                    if better(n, confidence, &best) {
                        let candidate =
                            Candidate::new(date, confidence, raw).with_fragments(line.indices());
                        best = Some((n, candidate));
                    }
                }
            }
        }

        match best {
            Some((line, candidate)) => {
                debug!("Date {} from {:?} on line {}", candidate.value, candidate.source, line);
                Detection::found(candidate)
            }
            None => Detection::none(),
        }
    }
}
