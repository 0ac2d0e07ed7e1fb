//! Total amount detection.
//!
//! Two passes over reconstructed lines. The first classifies each line as a
//! label line (grand total, total, subtotal, amount due) or not, and reads the
//! label's value from the same line or, failing that, from the line below.
//! The best label tier wins; within a tier the bottom-most line wins, since
//! receipts print running totals above the final one.
//!
//! When no label yields a value, the largest number on the receipt is taken
//! at a confidence below any labeled result.

use tracing::{debug, warn};

use super::{Candidate, Detection, FieldDetector};
use crate::models::{AmountConfig, TotalAmount};
use crate::ocr::{Line, ReadingOrder};
use crate::receipt::locale::{AmountSpan, LocaleNormalizer, NormalizedAmount};
use crate::receipt::patterns::{CONTACT_LINE, PHONE};

/// Confidence factor for a value read from the line below its label.
const NEXT_LINE_FACTOR: f32 = 0.95;

/// Upper bound for the largest-number fallback; below every labeled result.
const MAX_FALLBACK_CONFIDENCE: f32 = 0.6;

/// Semantic role of a label line, best tier first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LabelKind {
    /// Full, final total ("grand total", "total bayar").
    GrandTotal,
    /// Bare "total".
    Total,
    /// Subtotal before tax or service.
    Subtotal,
    /// Amount due or tendered; may reflect a partial payment.
    AmountDue,
}

impl LabelKind {
    /// Order in which labels are matched against a line, most specific
    /// first so that "subtotal" and "total due" are not read as "total".
    /// Matching is by substring, so "grand total" must come before "total".
    const MATCH_ORDER: [LabelKind; 4] = [
        LabelKind::GrandTotal,
        LabelKind::Subtotal,
        LabelKind::AmountDue,
        LabelKind::Total,
    ];

    /// Structural confidence of a value read next to this label.
    pub fn confidence(self) -> f32 {
        match self {
            LabelKind::GrandTotal => 0.95,
            LabelKind::Total => 0.9,
            LabelKind::Subtotal => 0.75,
            LabelKind::AmountDue => 0.7,
        }
    }
}

/// Detects the receipt total.
#[derive(Debug, Clone)]
pub struct AmountDetector {
    normalizer: LocaleNormalizer,
    labels: Vec<(LabelKind, Vec<String>)>,
    excluded_keywords: Vec<String>,
    fallback_confidence: f32,
    fallback_max_plain_digits: usize,
}

/// A label line that produced a value.
struct LabeledValue {
    kind: LabelKind,
    line: usize,
    candidate: Candidate<TotalAmount>,
}

impl AmountDetector {
    pub fn new(config: &AmountConfig, normalizer: LocaleNormalizer) -> Self {
        let compacted = |labels: &[String]| -> Vec<String> {
            labels
                .iter()
                .map(|l| compact(&l.to_lowercase()))
                .filter(|l| !l.is_empty())
                .collect()
        };
        let lowered = |labels: &[String]| -> Vec<String> {
            labels
                .iter()
                .map(|l| l.trim().to_lowercase())
                .filter(|l| !l.is_empty())
                .collect()
        };

        let labels = LabelKind::MATCH_ORDER
            .iter()
            .map(|kind| {
                let words = match kind {
                    LabelKind::GrandTotal => compacted(&config.grand_total_labels),
                    LabelKind::Total => compacted(&config.total_labels),
                    LabelKind::Subtotal => compacted(&config.subtotal_labels),
                    LabelKind::AmountDue => compacted(&config.amount_due_labels),
                };
                (*kind, words)
            })
            .collect();

        Self {
            normalizer,
            labels,
            excluded_keywords: lowered(&config.excluded_keywords),
            fallback_confidence: config.fallback_confidence.min(MAX_FALLBACK_CONFIDENCE),
            fallback_max_plain_digits: config.fallback_max_plain_digits,
        }
    }

    /// Label tier of a lowercased line.
    ///
    /// Spaces and hyphens are ignored on both sides, so OCR-merged labels
    /// such as "grandtotal" or "totalbayar" still match.
    pub fn classify(&self, lower: &str) -> Option<LabelKind> {
        let line = compact(lower);
        self.labels
            .iter()
            .find(|(_, words)| words.iter().any(|w| line.contains(w.as_str())))
            .map(|(kind, _)| *kind)
    }

    /// Whether a lowercased line mentions tax, discounts, change or the like.
    pub fn is_excluded(&self, lower: &str) -> bool {
        self.excluded_keywords.iter().any(|k| lower.contains(k.as_str()))
    }

    /// Rightmost token of `text` that normalizes, with the rejected tokens.
    fn rightmost_amount(&self, text: &str) -> (Option<NormalizedAmount>, Vec<String>) {
        let mut rejected = Vec::new();
        for span in self.normalizer.find_amounts(text).into_iter().rev() {
            match self.normalizer.normalize_number(&span.raw) {
                Ok(amount) => return (Some(amount), rejected),
                Err(e) => rejected.push(e.to_string()),
            }
        }
        (None, rejected)
    }

    fn labeled(
        &self,
        lines: &[Line<'_>],
        texts: &[String],
        kinds: &[Option<LabelKind>],
        excluded: &[bool],
        warnings: &mut Vec<String>,
    ) -> Option<LabeledValue> {
        let mut best: Option<LabeledValue> = None;

        for (n, kind) in kinds.iter().enumerate() {
            let Some(kind) = *kind else { continue };

            let (same_line, rejected) = self.rightmost_amount(&texts[n]);
            let found = match same_line {
                Some(amount) => Some((amount, kind.confidence(), lines[n].indices())),
                None => {
                    let next = n + 1;
                    let usable = next < lines.len() && kinds[next].is_none() && !excluded[next];
                    let below = if usable {
                        self.rightmost_amount(&texts[next]).0
                    } else {
                        None
                    };
                    below.map(|amount| {
                        let mut fragments = lines[n].indices();
                        fragments.extend(lines[next].indices());
                        (amount, kind.confidence() * NEXT_LINE_FACTOR, fragments)
                    })
                }
            };

            let Some((amount, confidence, fragments)) = found else {
                if !rejected.is_empty() {
                    let message = format!(
                        "{:?} label on line {} has no usable value: {}",
                        kind,
                        n,
                        rejected.join("; ")
                    );
                    warn!("{}", message);
                    warnings.push(message);
                }
                continue;
            };

            debug!("{:?} label on line {}: {} = {}", kind, n, amount.raw, amount.value);

            let replaces = best
                .as_ref()
                .map_or(true, |b| kind < b.kind || (kind == b.kind && n > b.line));
            if replaces {
                let candidate = Candidate::new(
                    TotalAmount {
                        raw: amount.raw.clone(),
                        value: amount.value,
                    },
                    confidence,
                    amount.raw,
                )
                .with_fragments(fragments);
                best = Some(LabeledValue {
                    kind,
                    line: n,
                    candidate,
                });
            }
        }

        best
    }

    fn largest(
        &self,
        lines: &[Line<'_>],
        texts: &[String],
        excluded: &[bool],
    ) -> Option<Candidate<TotalAmount>> {
        let mut best: Option<Candidate<TotalAmount>> = None;

        for (n, text) in texts.iter().enumerate() {
            if excluded[n] || CONTACT_LINE.is_match(text) || PHONE.is_match(text) {
                continue;
            }

            for span in self.normalizer.find_amounts(text) {
                if self.is_identifier(&span) {
                    continue;
                }
                let Ok(amount) = self.normalizer.normalize_number(&span.raw) else {
                    continue;
                };
                if best.as_ref().map_or(true, |b| amount.value > b.value.value) {
                    best = Some(
                        Candidate::new(
                            TotalAmount {
                                raw: amount.raw.clone(),
                                value: amount.value,
                            },
                            self.fallback_confidence,
                            amount.raw,
                        )
                        .with_fragments(lines[n].indices()),
                    );
                }
            }
        }

        best
    }

    fn is_identifier(&self, span: &AmountSpan) -> bool {
        span.plain_digits()
            .is_some_and(|digits| digits > self.fallback_max_plain_digits)
    }
}

impl Default for AmountDetector {
    fn default() -> Self {
        Self::new(&AmountConfig::default(), LocaleNormalizer::default())
    }
}

impl FieldDetector for AmountDetector {
    type Output = TotalAmount;

    fn name(&self) -> &'static str {
        "total"
    }

    fn detect(&self, order: &ReadingOrder<'_>) -> Detection<TotalAmount> {
        let lines = order.lines();
        let texts: Vec<String> = lines.iter().map(Line::text).collect();
        let lowers: Vec<String> = texts.iter().map(|t| t.to_lowercase()).collect();
        let excluded: Vec<bool> = lowers.iter().map(|l| self.is_excluded(l)).collect();
        let kinds: Vec<Option<LabelKind>> = lowers
            .iter()
            .zip(&excluded)
            .map(|(lower, &skip)| if skip { None } else { self.classify(lower) })
            .collect();

        let mut warnings = Vec::new();

        let candidate = match self.labeled(lines, &texts, &kinds, &excluded, &mut warnings) {
            Some(labeled) => {
                debug!(
                    "Total {} from {:?} label on line {}",
                    labeled.candidate.source, labeled.kind, labeled.line
                );
                Some(labeled.candidate)
            }
            None => {
                let fallback = self.largest(lines, &texts, &excluded);
                if let Some(c) = &fallback {
                    debug!("No labeled total, using largest amount {}", c.source);
                }
                fallback
            }
        };

        Detection {
            candidate,
            warnings,
        }
    }
}

fn compact(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}
