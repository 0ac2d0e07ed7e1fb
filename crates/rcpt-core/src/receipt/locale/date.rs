//! Date normalization.

use std::ops::Range;

use chrono::NaiveDate;
use regex::{Captures, Regex};

use super::LocaleNormalizer;
use crate::error::NormalizeError;
use crate::receipt::patterns::{DATE_DAY_MONTH_NAME, DATE_MONTH_NAME_DAY, DATE_NUMERIC, DATE_YMD};

/// Penalty for a day/month order chosen by preference alone.
const AMBIGUOUS_ORDER_PENALTY: f32 = 0.3;

/// Penalty for a century inferred from a two-digit year.
const SHORT_YEAR_PENALTY: f32 = 0.1;

/// A calendar date read from a token.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedDate {
    pub date: NaiveDate,
    /// 1.0 for unambiguous shapes, lowered when the reading involved a guess.
    pub confidence: f32,
    pub raw: String,
}

impl LocaleNormalizer {
    /// Normalize a date token such as `"24/06/2023"` or `"Jun 24, 2023"`.
    ///
    /// The whole token must be a date; use [`date_spans`] to locate dates in
    /// longer text first.
    pub fn normalize_date(&self, token: &str) -> Result<NormalizedDate, NormalizeError> {
        let text = token.trim();

        let (year, month, day, confidence) = if let Some(caps) = full_match(&DATE_YMD, text) {
            let (year, _) = parse_year(token, &caps[1])?;
            (year, number(token, &caps[2])?, number(token, &caps[3])?, 1.0)
        } else if let Some(caps) = full_match(&DATE_NUMERIC, text) {
            let first = number(token, &caps[1])?;
            let second = number(token, &caps[2])?;
            let (year, short_year) = parse_year(token, &caps[3])?;

            let (day, month, ambiguous) = if first > 12 {
                (first, second, false)
            } else if second > 12 {
                (second, first, false)
            } else if first == second {
                (first, second, false)
            } else if self.day_first() {
                (first, second, true)
            } else {
                (second, first, true)
            };

            let mut confidence = 1.0;
            if ambiguous {
                confidence -= AMBIGUOUS_ORDER_PENALTY;
            }
            if short_year {
                confidence -= SHORT_YEAR_PENALTY;
            }
            (year, month, day, confidence)
        } else if let Some(caps) = full_match(&DATE_DAY_MONTH_NAME, text) {
            let (year, _) = parse_year(token, &caps[3])?;
            (year, month_name(token, &caps[2])?, number(token, &caps[1])?, 1.0)
        } else if let Some(caps) = full_match(&DATE_MONTH_NAME_DAY, text) {
            let (year, _) = parse_year(token, &caps[3])?;
            (year, month_name(token, &caps[1])?, number(token, &caps[2])?, 1.0)
        } else {
            return Err(NormalizeError::date(token, "no supported date shape"));
        };

        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
            NormalizeError::date(
                token,
                format!("{year:04}-{month:02}-{day:02} is out of calendar range"),
            )
        })?;

        Ok(NormalizedDate {
            date,
            confidence,
            raw: token.to_string(),
        })
    }
}

/// Byte ranges of date-shaped substrings, left to right, non-overlapping.
///
/// Shapes are matched without validating the calendar, so every range is
/// only a candidate for [`LocaleNormalizer::normalize_date`].
pub fn date_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans: Vec<Range<usize>> = [
        &*DATE_YMD,
        &*DATE_NUMERIC,
        &*DATE_DAY_MONTH_NAME,
        &*DATE_MONTH_NAME_DAY,
    ]
    .iter()
    .flat_map(|re| re.find_iter(text).map(|m| m.range()))
    .collect();

    spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut kept: Vec<Range<usize>> = Vec::with_capacity(spans.len());
    for span in spans {
        if kept.last().map_or(true, |last| span.start >= last.end) {
            kept.push(span);
        }
    }
    kept
}

fn full_match<'t>(re: &Regex, text: &'t str) -> Option<Captures<'t>> {
    re.captures(text)
        .filter(|caps| caps.get(0).is_some_and(|m| m.start() == 0 && m.end() == text.len()))
}

fn number(token: &str, digits: &str) -> Result<u32, NormalizeError> {
    digits
        .parse()
        .map_err(|_| NormalizeError::date(token, format!("{digits:?} is not a number")))
}

/// Two-digit years pivot at 50: `23` is 2023, `87` is 1987.
fn parse_year(token: &str, digits: &str) -> Result<(i32, bool), NormalizeError> {
    let year: i32 = digits
        .parse()
        .map_err(|_| NormalizeError::date(token, format!("{digits:?} is not a year")))?;

    if digits.len() == 2 {
        let century = if year < 50 { 2000 } else { 1900 };
        Ok((century + year, true))
    } else {
        Ok((year, false))
    }
}

fn month_name(token: &str, name: &str) -> Result<u32, NormalizeError> {
    let month = match name.to_lowercase().as_str() {
        "jan" | "january" | "januari" => 1,
        "feb" | "february" | "februari" | "pebruari" => 2,
        "mar" | "march" | "maret" => 3,
        "apr" | "april" => 4,
        "may" | "mei" => 5,
        "jun" | "june" | "juni" => 6,
        "jul" | "july" | "juli" => 7,
        "aug" | "august" | "agu" | "agt" | "agustus" => 8,
        "sep" | "sept" | "september" => 9,
        "oct" | "october" | "okt" | "oktober" => 10,
        "nov" | "november" | "nopember" => 11,
        "dec" | "december" | "des" | "desember" => 12,
        _ => {
            return Err(NormalizeError::date(
                token,
                format!("unknown month name {name:?}"),
            ))
        }
    };
    Ok(month)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn normalize(token: &str) -> NormalizedDate {
        LocaleNormalizer::default().normalize_date(token).unwrap()
    }

    #[test]
    fn test_numeric_shapes() {
        assert_eq!(normalize("2023-06-24").date, ymd(2023, 6, 24));
        assert_eq!(normalize("2023-06-24").confidence, 1.0);
        assert_eq!(normalize("24/06/2023").date, ymd(2023, 6, 24));
        assert_eq!(normalize("24-06-2023").date, ymd(2023, 6, 24));
        assert_eq!(normalize("24.06.2023").date, ymd(2023, 6, 24));
        assert_eq!(normalize("06/24/2023").date, ymd(2023, 6, 24));
    }

    #[test]
    fn test_day_month_disambiguation() {
        let forced = normalize("13/02/2023");
        assert_eq!(forced.date, ymd(2023, 2, 13));
        assert_eq!(forced.confidence, 1.0);

        let guessed = normalize("05/06/2023");
        assert_eq!(guessed.date, ymd(2023, 6, 5));
        assert!((guessed.confidence - 0.7).abs() < 1e-6);

        assert_eq!(normalize("07/07/2023").confidence, 1.0);
    }

    #[test]
    fn test_month_first_preference() {
        let config = crate::models::LocaleConfig {
            day_first: false,
            ..Default::default()
        };
        let normalizer = LocaleNormalizer::new(&config);

        let date = normalizer.normalize_date("05/06/2023").unwrap();
        assert_eq!(date.date, ymd(2023, 5, 6));

        // Unambiguous inputs ignore the preference.
        let date = normalizer.normalize_date("24/06/2023").unwrap();
        assert_eq!(date.date, ymd(2023, 6, 24));
    }

    #[test]
    fn test_textual_months() {
        assert_eq!(normalize("24 Jun 2023").date, ymd(2023, 6, 24));
        assert_eq!(normalize("Jun 24, 2023").date, ymd(2023, 6, 24));
        assert_eq!(normalize("June 24 2023").date, ymd(2023, 6, 24));
        assert_eq!(normalize("25 Desember 2025").date, ymd(2025, 12, 25));
        assert_eq!(normalize("17-Agu-2024").date, ymd(2024, 8, 17));
        assert_eq!(normalize("1st Mei 2024").date, ymd(2024, 5, 1));
    }

    #[test]
    fn test_two_digit_years() {
        let date = normalize("24/06/23");
        assert_eq!(date.date, ymd(2023, 6, 24));
        assert!((date.confidence - 0.9).abs() < 1e-6);

        assert_eq!(normalize("24/06/87").date, ymd(1987, 6, 24));
    }

    #[test]
    fn test_unparseable_dates() {
        let normalizer = LocaleNormalizer::default();
        for token in ["32/01/2023", "13/13/2023", "2023-13-01", "31 Feb 2023", "24 Jun", "24/06", "Total", "24 Foo 2023"] {
            assert!(
                matches!(
                    normalizer.normalize_date(token),
                    Err(NormalizeError::UnparseableDate { .. })
                ),
                "{token}"
            );
        }
    }

    #[test]
    fn test_date_spans() {
        let text = "Tgl 11/01/2026 14:30 No.8812";
        let spans = date_spans(text);
        assert_eq!(spans.len(), 1);
        assert_eq!(&text[spans[0].clone()], "11/01/2026");

        let text = "2023-06-24 / 24 Jun 2023";
        let found: Vec<&str> = date_spans(text).into_iter().map(|r| &text[r]).collect();
        assert_eq!(found, vec!["2023-06-24", "24 Jun 2023"]);
    }
}
