use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use crate::workflows::intake::domain::{DocumentType, FieldName, StructuredData};

static DATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\d{1,2}[-/]\d{1,2}[-/]\d{2,4}",
        r"\d{2,4}[-/]\d{1,2}[-/]\d{1,2}",
        r"\b\d{1,2}\s+(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)\w*\s+\d{2,4}\b",
    ]
    .into_iter()
    .map(|pattern| {
        RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .expect("valid date regex")
    })
    .collect()
});

static AMOUNT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\$\s*\d{1,3}(?:,\d{3})*(?:\.\d{2})?",
        r"\d{1,3}(?:,\d{3})*(?:\.\d{2})?\s*\$",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("valid amount regex"))
    .collect()
});

static ACCOUNT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b(\d{8,12})\b",
        r"account.*?(\d{8,12})",
        r"a/c.*?(\d{8,12})",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("valid account regex"))
    .collect()
});

/// Keyword, canonical field. Searched in this order.
const PAYSLIP_KEYWORDS: [(&str, FieldName); 4] = [
    ("gross pay", FieldName::GrossSalary),
    ("net pay", FieldName::NetSalary),
    ("basic salary", FieldName::BasicSalary),
    ("total earnings", FieldName::TotalEarnings),
];

const WINDOW_BEFORE: usize = 50;
const WINDOW_AFTER: usize = 100;

/// Recovers dates, amounts and type-specific fields from raw text.
pub fn extract_fields(text: &str, document_type: DocumentType) -> StructuredData {
    let mut data = StructuredData {
        dates_found: find_dates(text),
        amounts_found: find_amounts(text),
        ..StructuredData::default()
    };

    match document_type {
        DocumentType::Payslip => payslip_amounts(text, &mut data),
        DocumentType::BankStatement => {
            if let Some(account) = account_number(text) {
                data.insert(FieldName::AccountNumber, account, None);
            }
        }
        _ => {}
    }

    data
}

/// All date-looking substrings, grouped by pattern in pattern order.
pub fn find_dates(text: &str) -> Vec<String> {
    collect_matches(&DATE_PATTERNS, text)
}

/// All currency amounts, grouped by pattern in pattern order.
pub fn find_amounts(text: &str) -> Vec<String> {
    collect_matches(&AMOUNT_PATTERNS, text)
}

fn collect_matches(patterns: &[Regex], text: &str) -> Vec<String> {
    patterns
        .iter()
        .flat_map(|pattern| pattern.find_iter(text).map(|found| found.as_str().to_string()))
        .collect()
}

fn payslip_amounts(text: &str, data: &mut StructuredData) {
    let lowered = text.to_ascii_lowercase();
    for (keyword, field) in PAYSLIP_KEYWORDS {
        let Some(position) = lowered.find(keyword) else {
            continue;
        };
        let start = floor_boundary(text, position.saturating_sub(WINDOW_BEFORE));
        let end = floor_boundary(text, (position + WINDOW_AFTER).min(text.len()));
        let window = &text[start..end];
        if let Some(amount) = find_amounts(window).into_iter().next() {
            data.insert(field, amount, None);
        }
    }
}

/// First pattern with any match wins; its first match is returned.
fn account_number(text: &str) -> Option<String> {
    let lowered = text.to_ascii_lowercase();
    ACCOUNT_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(&lowered)
            .and_then(|captures| captures.get(1))
            .map(|found| found.as_str().to_string())
    })
}

fn floor_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_dates_in_every_supported_shape() {
        let text = "Issued 03/15/2025, period 2025-02-01 to 28 Feb 2025.";
        let dates = find_dates(text);
        for expected in ["03/15/2025", "2025-02-01", "28 Feb 2025"] {
            assert!(dates.iter().any(|date| date == expected), "missing {expected}");
        }
    }

    #[test]
    fn finds_leading_and_trailing_currency_marks() {
        let amounts = find_amounts("Total $ 1,250.00 then 300.50$ later");
        assert_eq!(amounts, vec!["$ 1,250.00", "300.50$"]);
    }

    #[test]
    fn payslip_keywords_pick_the_nearest_amount() {
        let text = "ACME LTD\nGross Pay: $5,000.00\nTaxes and statutory deductions withheld this period\nNet Pay: $4,100.00";
        let data = extract_fields(text, DocumentType::Payslip);
        assert_eq!(data.text(FieldName::GrossSalary), Some("$5,000.00"));
        assert_eq!(data.text(FieldName::NetSalary), Some("$4,100.00"));
        assert!(data.get(FieldName::BasicSalary).is_none());
    }

    #[test]
    fn payslip_window_respects_multibyte_text() {
        let text = format!("{}gross pay €€ $900", "é".repeat(40));
        let data = extract_fields(&text, DocumentType::Payslip);
        assert_eq!(data.text(FieldName::GrossSalary), Some("$900"));
    }

    #[test]
    fn bank_statement_recovers_account_number() {
        let text = "Account No: 123456789\nClosing balance $2,000.00";
        let data = extract_fields(text, DocumentType::BankStatement);
        assert_eq!(data.text(FieldName::AccountNumber), Some("123456789"));
    }

    #[test]
    fn other_types_only_collect_generic_buckets() {
        let data = extract_fields("Bill date 01/02/2025 amount $40.00", DocumentType::UtilityBill);
        assert!(data.fields.is_empty());
        assert!(data.dates_found.iter().any(|date| date == "01/02/2025"));
        assert_eq!(data.amounts_found, vec!["$40.00"]);
    }
}
