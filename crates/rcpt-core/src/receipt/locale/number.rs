//! Amount normalization.
//!
//! Separator roles are decided per token:
//! - one separator followed by 1-2 trailing digits is the decimal point,
//!   followed by exactly 3 digits it groups thousands;
//! - repeated occurrences of a single separator group thousands;
//! - with two distinct separators the last one is the decimal point.
//!
//! Spaces, no-break spaces and apostrophes only ever group.

use std::ops::Range;
use std::str::FromStr;

use regex::Match;
use rust_decimal::Decimal;

use super::date::date_spans;
use super::LocaleNormalizer;
use crate::error::NormalizeError;
use crate::receipt::patterns::{AMOUNT_TOKEN, PLAIN_AMOUNT_TOKEN, TIME};

/// A normalized amount paired with the untouched source string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedAmount {
    pub raw: String,
    pub value: Decimal,
}

/// A numeric-shaped token found in free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountSpan {
    /// Byte offsets in the searched text, including any currency marker.
    pub start: usize,
    pub end: usize,
    /// The token as printed, e.g. `"Rp. 27.500"`.
    pub raw: String,
}

impl AmountSpan {
    /// Number of digits when the token has no separators at all.
    pub fn plain_digits(&self) -> Option<usize> {
        self.raw
            .chars()
            .all(|c| c.is_ascii_digit())
            .then(|| self.raw.len())
    }
}

fn is_separator(c: char) -> bool {
    matches!(c, '.' | ',' | ' ' | '\u{00a0}' | '\'')
}

fn is_decimal_capable(c: char) -> bool {
    matches!(c, '.' | ',')
}

impl LocaleNormalizer {
    /// Normalize a numeric token such as `"Rp 1.234,56"` into an exact decimal.
    pub fn normalize_number(&self, raw: &str) -> Result<NormalizedAmount, NormalizeError> {
        let body = self.strip_currency(raw);

        if !body.chars().any(|c| c.is_ascii_digit()) {
            return Err(NormalizeError::number(raw, "no digits"));
        }

        if let Some(c) = body.chars().find(|c| !c.is_ascii_digit() && !is_separator(*c)) {
            return Err(NormalizeError::number(
                raw,
                format!("unexpected character {c:?}"),
            ));
        }

        let starts_with_digit = body.chars().next().is_some_and(|c| c.is_ascii_digit());
        let ends_with_digit = body.chars().next_back().is_some_and(|c| c.is_ascii_digit());
        if !starts_with_digit {
            return Err(NormalizeError::number(raw, "leading separator"));
        }
        if !ends_with_digit {
            return Err(NormalizeError::number(raw, "separator not followed by a digit"));
        }

        let groups: Vec<&str> = body.split(is_separator).collect();
        if groups.iter().any(|g| g.is_empty()) {
            return Err(NormalizeError::number(raw, "consecutive separators"));
        }
        let separators: Vec<char> = body.chars().filter(|c| is_separator(*c)).collect();

        let mut distinct: Vec<char> = Vec::new();
        for c in &separators {
            if !distinct.contains(c) {
                distinct.push(*c);
            }
        }

        let (integer, fraction) = match distinct.as_slice() {
            [] => (body.to_string(), None),
            [sep] if separators.len() == 1 => {
                let tail = groups[1].len();
                if is_decimal_capable(*sep) && tail <= 2 {
                    (groups[0].to_string(), Some(groups[1]))
                } else if tail == 3 {
                    (groups.concat(), None)
                } else {
                    return Err(NormalizeError::number(
                        raw,
                        format!("{tail} digits after a lone {sep:?}"),
                    ));
                }
            }
            [_] => {
                check_thousands(raw, &groups[1..])?;
                (groups.concat(), None)
            }
            [_, _] => {
                let decimal = separators[separators.len() - 1];
                if !is_decimal_capable(decimal) {
                    return Err(NormalizeError::number(
                        raw,
                        format!("{decimal:?} cannot be a decimal separator"),
                    ));
                }
                if separators.iter().filter(|c| **c == decimal).count() > 1 {
                    return Err(NormalizeError::number(
                        raw,
                        format!("decimal separator {decimal:?} repeated"),
                    ));
                }
                let last = groups.len() - 1;
                check_thousands(raw, &groups[1..last])?;
                (groups[..last].concat(), Some(groups[last]))
            }
            _ => {
                return Err(NormalizeError::number(
                    raw,
                    "three or more distinct separators",
                ));
            }
        };

        let canonical = match fraction {
            Some(fraction) => format!("{integer}.{fraction}"),
            None => integer,
        };

        let value = Decimal::from_str(&canonical)
            .map_err(|e| NormalizeError::number(raw, e.to_string()))?;

        Ok(NormalizedAmount {
            raw: raw.to_string(),
            value,
        })
    }

    /// Find numeric-shaped tokens in free text.
    ///
    /// Tokens inside dates or times, or followed by `%` (rates), are skipped.
    /// A currency marker directly before a token becomes part of its raw
    /// string, as does an Indonesian trailing `,-`.
    pub fn find_amounts(&self, text: &str) -> Vec<AmountSpan> {
        let skipped: Vec<Range<usize>> = date_spans(text)
            .into_iter()
            .chain(TIME.find_iter(text).map(|m| m.range()))
            .collect();
        let mut spans = Vec::new();
        let mut pos = 0;

        while let Some(mut m) = AMOUNT_TOKEN.find_at(text, pos) {
            // "3 150.000" is a quantity column next to a price, not 3 150.
            if runs_into_grouped_number(text, &m) {
                match PLAIN_AMOUNT_TOKEN.find_at(text, m.start()) {
                    Some(plain) => m = plain,
                    None => break,
                }
            }
            pos = m.end();

            if skipped.iter().any(|r| r.start < m.end() && m.start() < r.end) {
                continue;
            }
            if text[m.end()..].starts_with('%') {
                continue;
            }

            let mut start = m.start();
            let head = text[..start].trim_end();
            let head = head.strip_suffix('.').unwrap_or(head).trim_end();
            if let Some(len) = self.marker_at_end(head) {
                start = head.len() - len;
            }

            let mut end = m.end();
            let rest = &text[end..];
            if rest.starts_with(",-") || rest.starts_with(".-") {
                end += 2;
            }

            spans.push(AmountSpan {
                start,
                end,
                raw: text[start..end].to_string(),
            });
        }

        spans
    }

    fn strip_currency<'s>(&self, raw: &'s str) -> &'s str {
        let mut s = raw.trim();

        loop {
            let before = s.len();

            if let Some(len) = self.marker_at_start(s) {
                let alphabetic = s[..len].chars().all(char::is_alphabetic);
                s = s[len..].trim_start_matches(|c: char| {
                    c.is_whitespace() || c == ':' || (alphabetic && c == '.')
                });
            }
            if let Some(len) = self.marker_at_end(s) {
                s = s[..s.len() - len].trim_end();
            }

            if s.len() == before {
                break;
            }
        }

        if let Some(stripped) = s.strip_suffix('-') {
            let stripped = stripped.trim_end();
            s = stripped
                .strip_suffix([',', '.'])
                .unwrap_or(stripped);
        }

        s
    }

    fn marker_at_start(&self, s: &str) -> Option<usize> {
        self.markers.iter().find_map(|m| {
            let len = m.len();
            if s.len() < len || !s.is_char_boundary(len) || !s[..len].eq_ignore_ascii_case(m) {
                return None;
            }
            let glued_word = m.ends_with(char::is_alphabetic)
                && s[len..].chars().next().is_some_and(char::is_alphabetic);
            (!glued_word).then_some(len)
        })
    }

    fn marker_at_end(&self, s: &str) -> Option<usize> {
        self.markers.iter().find_map(|m| {
            let len = m.len();
            if s.len() < len {
                return None;
            }
            let at = s.len() - len;
            if !s.is_char_boundary(at) || !s[at..].eq_ignore_ascii_case(m) {
                return None;
            }
            let glued_word = m.starts_with(char::is_alphabetic)
                && s[..at].chars().next_back().is_some_and(char::is_alphabetic);
            (!glued_word).then_some(len)
        })
    }
}

/// A space-grouped token that stops right before a `.` or `,` group.
fn runs_into_grouped_number(text: &str, m: &Match<'_>) -> bool {
    if !m.as_str().contains([' ', '\u{00a0}']) {
        return false;
    }
    let mut rest = text[m.end()..].chars();
    matches!(rest.next(), Some('.' | ','))
        && rest.next().is_some_and(|c| c.is_ascii_digit())
}

fn check_thousands(raw: &str, groups: &[&str]) -> Result<(), NormalizeError> {
    if groups.iter().all(|g| g.len() == 3) {
        Ok(())
    } else {
        Err(NormalizeError::number(raw, "irregular digit grouping"))
    }
}

/// Render an amount with the given separators, e.g. `30.000` or `1,234.56`.
///
/// The decimal's scale is kept, so `30.00` renders its two fraction digits.
pub fn format_amount(value: Decimal, grouping: char, decimal: char) -> String {
    let negative = value.is_sign_negative() && !value.is_zero();
    let s = value.abs().to_string();
    let (integer, fraction) = match s.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (s.as_str(), None),
    };

    let digits: Vec<char> = integer.chars().collect();
    let mut formatted = String::new();
    if negative {
        formatted.push('-');
    }
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            formatted.push(grouping);
        }
        formatted.push(*c);
    }

    if let Some(fraction) = fraction {
        formatted.push(decimal);
        formatted.push_str(fraction);
    }

    formatted
}
