//! Common regex patterns for receipt extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Numeric dates
    pub static ref DATE_YMD: Regex = Regex::new(
        r"\b(\d{4})[-/.](\d{1,2})[-/.](\d{1,2})\b"
    ).unwrap();

    pub static ref DATE_NUMERIC: Regex = Regex::new(
        r"\b(\d{1,2})[-/.](\d{1,2})[-/.](\d{4}|\d{2})\b"
    ).unwrap();

    // Textual months: "24 Jun 2023", "24-Jun-2023", "25 Desember 2025"
    pub static ref DATE_DAY_MONTH_NAME: Regex = Regex::new(
        r"(?i)\b(\d{1,2})(?:st|nd|rd|th)?[\s\-]+([a-z]{3,9})\.?,?[\s\-]+(\d{4})\b"
    ).unwrap();

    // "Jun 24, 2023", "June 24 2023"
    pub static ref DATE_MONTH_NAME_DAY: Regex = Regex::new(
        r"(?i)\b([a-z]{3,9})\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})\b"
    ).unwrap();

    pub static ref TIME: Regex = Regex::new(
        r"\b\d{1,2}:\d{2}(?::\d{2})?\b"
    ).unwrap();

    // Numeric-shaped tokens. Space grouping is only taken with full 3-digit
    // groups so "2 items" does not swallow a following number.
    pub static ref AMOUNT_TOKEN: Regex = Regex::new(
        r"\d{1,3}(?:[ \u{00a0}]\d{3})+(?:[.,]\d{1,2})?\b|\d(?:[\d.,']*\d)?"
    ).unwrap();

    // The unspaced branch of AMOUNT_TOKEN on its own.
    pub static ref PLAIN_AMOUNT_TOKEN: Regex = Regex::new(
        r"\d(?:[\d.,']*\d)?"
    ).unwrap();

    // Merchant exclusions
    pub static ref PHONE: Regex = Regex::new(
        r"^\+?\(?\d[\d\s\-().]{7,}$"
    ).unwrap();

    pub static ref HOUSE_NUMBER: Regex = Regex::new(
        r"(?i)\b(?:no|nomor|blok|rt|rw|km|kav)\.?\s*\d"
    ).unwrap();

    pub static ref SEPARATOR_LINE: Regex = Regex::new(
        r"^[\-=_*#.~]{3,}$"
    ).unwrap();

    // Contact and identifier lines, skipped by the amount fallback
    pub static ref CONTACT_LINE: Regex = Regex::new(
        r"(?i)\b(?:telp?|phone|hp|fax|wa|whatsapp|npwp|nik|no\.?\s*(?:trx|transaksi|struk|ref))\b"
    ).unwrap();
}

/// Whether `text` contains something shaped like a date, valid or not.
pub fn looks_like_date(text: &str) -> bool {
    DATE_YMD.is_match(text)
        || DATE_NUMERIC.is_match(text)
        || DATE_DAY_MONTH_NAME.is_match(text)
        || DATE_MONTH_NAME_DAY.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_shapes() {
        assert!(looks_like_date("24/06/2023"));
        assert!(looks_like_date("Tgl 2023-06-24 14:30"));
        assert!(looks_like_date("24 Jun 2023"));
        assert!(looks_like_date("Jun 24, 2023"));
        assert!(!looks_like_date("Rp 1.234.567"));
        assert!(!looks_like_date("14:30"));
    }

    #[test]
    fn test_amount_tokens() {
        let found: Vec<&str> = AMOUNT_TOKEN
            .find_iter("Total 2 items 1 234,56 and 27,500.")
            .map(|m| m.as_str())
            .collect();
        assert_eq!(found, vec!["2", "1 234,56", "27,500"]);
    }

    #[test]
    fn test_time() {
        assert!(TIME.is_match("14:30"));
        assert!(TIME.is_match("11/01/2026 14:30"));
        assert!(!TIME.is_match("27.500"));
        assert!(!TIME.is_match("12.50"));
    }

    #[test]
    fn test_merchant_exclusions() {
        assert!(PHONE.is_match("+62 812 3456 7890"));
        assert!(PHONE.is_match("(021) 555-1234"));
        assert!(!PHONE.is_match("INDOMARET"));
        assert!(HOUSE_NUMBER.is_match("Jl. Sudirman No.1"));
        assert!(SEPARATOR_LINE.is_match("-----------"));
    }
}
