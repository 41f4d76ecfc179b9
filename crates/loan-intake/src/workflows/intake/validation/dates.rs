use chrono::{Datelike, NaiveDate};

/// Accepted layouts, tried in order. US forms win over EU forms when both parse.
const DATE_FORMATS: [&str; 12] = [
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%Y/%m/%d",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d-%b-%Y",
    "%d-%B-%Y",
];

const MIN_YEAR: i32 = 1000;

/// Parses a loosely formatted date. Two-digit years are rejected.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let cleaned = clean(raw);
    if cleaned.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .filter_map(|format| NaiveDate::parse_from_str(&cleaned, format).ok())
        .find(|date| date.year() >= MIN_YEAR)
}

/// Drops punctuation other than separators and commas, collapses whitespace.
fn clean(raw: &str) -> String {
    let kept: String = raw
        .chars()
        .filter(|ch| ch.is_alphanumeric() || ch.is_whitespace() || matches!(ch, '/' | '-' | ',' | '_'))
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn parses_iso_us_and_eu_forms() {
        assert_eq!(parse_date("2025-01-31"), Some(ymd(2025, 1, 31)));
        assert_eq!(parse_date("01/31/2025"), Some(ymd(2025, 1, 31)));
        assert_eq!(parse_date("31/01/2025"), Some(ymd(2025, 1, 31)));
        assert_eq!(parse_date("2025/01/31"), Some(ymd(2025, 1, 31)));
        assert_eq!(parse_date("31-01-2025"), Some(ymd(2025, 1, 31)));
    }

    #[test]
    fn ambiguous_day_month_prefers_us_order() {
        assert_eq!(parse_date("03/04/2025"), Some(ymd(2025, 3, 4)));
    }

    #[test]
    fn parses_month_names() {
        assert_eq!(parse_date("5 March 2025"), Some(ymd(2025, 3, 5)));
        assert_eq!(parse_date("05 Mar 2025."), Some(ymd(2025, 3, 5)));
        assert_eq!(parse_date("March 5, 2025"), Some(ymd(2025, 3, 5)));
        assert_eq!(parse_date("05-Mar-2025"), Some(ymd(2025, 3, 5)));
    }

    #[test]
    fn rejects_two_digit_years_and_noise() {
        assert_eq!(parse_date("03/04/25"), None);
        assert_eq!(parse_date("25-02-01"), None);
        assert_eq!(parse_date("   "), None);
        assert_eq!(parse_date("pay period"), None);
    }
}
