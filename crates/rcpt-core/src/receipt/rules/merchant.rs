//! Merchant name detection from the receipt header.

use tracing::debug;

use super::{Candidate, Detection, FieldDetector};
use crate::models::MerchantConfig;
use crate::ocr::ReadingOrder;
use crate::receipt::patterns::{looks_like_date, HOUSE_NUMBER, PHONE, SEPARATOR_LINE, TIME};

/// Length bonus per character above the minimum, and its cap.
const LENGTH_BONUS_STEP: f32 = 0.02;
const LENGTH_BONUS_MAX_CHARS: usize = 10;

/// Score multiplier for candidates shorter than the minimum length.
const SHORT_PENALTY: f32 = 0.5;

/// Picks the merchant name among the first fragments in reading order.
#[derive(Debug, Clone)]
pub struct MerchantDetector {
    top_n: usize,
    min_length: usize,
    excluded_prefixes: Vec<String>,
}

impl MerchantDetector {
    pub fn new(config: &MerchantConfig) -> Self {
        Self {
            top_n: config.top_n,
            min_length: config.min_length,
            excluded_prefixes: config
                .excluded_prefixes
                .iter()
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Reason a fragment cannot be a merchant name, if any.
    fn exclusion(&self, text: &str) -> Option<&'static str> {
        if text.chars().count() < 2 {
            return Some("single character");
        }
        if !text.chars().any(char::is_alphabetic) {
            return Some("no letters");
        }
        if looks_like_date(text) || TIME.is_match(text) {
            return Some("date or time");
        }
        if PHONE.is_match(text) {
            return Some("phone number");
        }
        if HOUSE_NUMBER.is_match(text) {
            return Some("address");
        }
        if SEPARATOR_LINE.is_match(text) {
            return Some("separator");
        }

        let lower = text.to_lowercase();
        let keyword = self.excluded_prefixes.iter().any(|prefix| {
            lower.starts_with(prefix.as_str())
                && lower[prefix.len()..]
                    .chars()
                    .next()
                    .map_or(true, |c| !c.is_alphanumeric())
        });
        if keyword {
            return Some("excluded keyword");
        }

        None
    }

    fn length_factor(&self, len: usize) -> f32 {
        if len < self.min_length {
            SHORT_PENALTY
        } else {
            let extra = (len - self.min_length).min(LENGTH_BONUS_MAX_CHARS);
            1.0 + LENGTH_BONUS_STEP * extra as f32
        }
    }
}

impl Default for MerchantDetector {
    fn default() -> Self {
        Self::new(&MerchantConfig::default())
    }
}

/// Letters over non-whitespace characters.
fn alphabetic_ratio(text: &str) -> f32 {
    let visible = text.chars().filter(|c| !c.is_whitespace()).count();
    if visible == 0 {
        return 0.0;
    }
    let letters = text.chars().filter(|c| c.is_alphabetic()).count();
    letters as f32 / visible as f32
}

impl FieldDetector for MerchantDetector {
    type Output = String;

    fn name(&self) -> &'static str {
        "merchant"
    }

    fn detect(&self, order: &ReadingOrder<'_>) -> Detection<String> {
        let mut best: Option<(f32, Candidate<String>)> = None;

        for fragment in order.iter().take(self.top_n) {
            let text = fragment.content();

            if let Some(reason) = self.exclusion(text) {
                debug!("Merchant candidate {:?} excluded: {}", text, reason);
                continue;
            }

            let ratio = alphabetic_ratio(text);
            let score = fragment.confidence() * ratio * self.length_factor(text.chars().count());

            // Strictly greater keeps the earliest fragment on ties.
            if best.as_ref().map_or(true, |(top, _)| score > *top) {
                let candidate = Candidate::new(text.to_string(), ratio, text)
                    .with_fragments(vec![fragment.index()]);
                best = Some((score, candidate));
            }
        }

        match best {
            Some((score, candidate)) => {
                debug!("Merchant {:?} (score {:.3})", candidate.value, score);
                Detection::found(candidate)
            }
            None => Detection::none(),
        }
    }
}
