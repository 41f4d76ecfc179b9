use std::sync::LazyLock;

use chrono::{Datelike, Duration, NaiveDate};
use regex::Regex;

use super::dates::parse_date;
use crate::workflows::intake::domain::{
    DocumentType, ExtractionResult, FieldKind, FieldName, StructuredData, ValidationResult,
};
use crate::workflows::intake::registry;

/// Minimum score, in hundredths, for a document to count as valid.
pub const VALIDITY_THRESHOLD_POINTS: i64 = 70;
const ISSUE_PENALTY: i64 = 20;
const WARNING_PENALTY: i64 = 10;
const MISSING_FIELD_PENALTY: i64 = 15;

const MIN_SALARY: f64 = 100.0;
const MAX_SALARY: f64 = 1_000_000.0;
const TAX_YEAR_LOOKBACK: i32 = 3;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid number regex"));

const SALARY_FIELDS: [FieldName; 3] = [
    FieldName::GrossSalary,
    FieldName::NetSalary,
    FieldName::BasicSalary,
];

/// Accumulated rule outcomes, in the order the checks appended them.
#[derive(Debug, Default)]
pub(crate) struct Findings {
    issues: Vec<String>,
    warnings: Vec<String>,
    missing_fields: Vec<FieldName>,
    recommendations: Vec<String>,
}

impl Findings {
    pub(crate) fn failed(message: String) -> Self {
        Self {
            issues: vec![format!("Validation error: {message}")],
            ..Self::default()
        }
    }

    fn score_points(&self) -> i64 {
        let penalty = ISSUE_PENALTY * self.issues.len() as i64
            + WARNING_PENALTY * self.warnings.len() as i64
            + MISSING_FIELD_PENALTY * self.missing_fields.len() as i64;
        (100 - penalty).max(0)
    }

    pub(crate) fn into_result(self) -> ValidationResult {
        let points = self.score_points();
        ValidationResult {
            is_valid: self.issues.is_empty() && points >= VALIDITY_THRESHOLD_POINTS,
            validation_score: points as f64 / 100.0,
            issues: self.issues,
            warnings: self.warnings,
            missing_fields: self.missing_fields,
            recommendations: self.recommendations,
        }
    }
}

/// Runs every check for `document_type` against `today`.
pub(crate) fn evaluate(
    extraction: &ExtractionResult,
    document_type: DocumentType,
    today: NaiveDate,
) -> Findings {
    let data = &extraction.structured_data;
    let mut findings = Findings::default();

    required_fields(data, document_type, &mut findings);
    recency(data, document_type, today, &mut findings);
    contact_formats(data, &mut findings);

    match document_type {
        DocumentType::Payslip => payslip(data, &mut findings),
        DocumentType::BankStatement => bank_statement(data, &mut findings),
        DocumentType::IdProof => id_proof(data, today, &mut findings),
        DocumentType::TaxDocument => tax_document(data, today, &mut findings),
        _ => {}
    }

    findings
}

fn required_fields(data: &StructuredData, document_type: DocumentType, findings: &mut Findings) {
    let Some(profile) = registry::profile(document_type) else {
        return;
    };
    for field in profile.required_fields {
        if !data.has(*field) {
            findings.missing_fields.push(*field);
            findings
                .issues
                .push(format!("Missing required field: {}", field.label()));
        }
    }
}

/// Every date-looking value: date fields, date-named vendor keys, then the
/// pattern bucket.
fn candidate_dates(data: &StructuredData) -> Vec<&str> {
    let typed = data
        .fields
        .iter()
        .filter(|(name, _)| name.kind() == FieldKind::Date)
        .map(|(_, field)| field.as_str());
    let vendor = data
        .unmapped
        .iter()
        .filter(|(key, _)| key.contains("date"))
        .map(|(_, field)| field.as_str());
    typed
        .chain(vendor)
        .chain(data.dates_found.iter().map(String::as_str))
        .filter(|value| !value.trim().is_empty())
        .collect()
}

fn recency(
    data: &StructuredData,
    document_type: DocumentType,
    today: NaiveDate,
    findings: &mut Findings,
) {
    let Some(max_age_days) = registry::max_age_days(document_type) else {
        return;
    };

    let parsed: Vec<NaiveDate> = candidate_dates(data)
        .into_iter()
        .filter_map(parse_date)
        .collect();
    if parsed.is_empty() {
        findings.warnings.push(format!(
            "No date found in {}. Manual verification required.",
            document_type.label()
        ));
        return;
    }

    let cutoff = today - Duration::days(i64::from(max_age_days));
    if parsed.iter().any(|date| *date >= cutoff) {
        return;
    }

    findings.issues.push(format!(
        "{} is older than {max_age_days} days. Please provide a more recent document.",
        registry::title_case(&document_type.words())
    ));
    findings.recommendations.push(format!(
        "Upload a {} from the last {} month(s)",
        document_type.words(),
        max_age_days / 30
    ));
}

fn contact_formats(data: &StructuredData, findings: &mut Findings) {
    let typed = data
        .fields
        .iter()
        .map(|(name, field)| (name.label(), field.as_str()));
    let vendor = data
        .unmapped
        .iter()
        .map(|(key, field)| (key.as_str(), field.as_str()));

    for (key, value) in typed.chain(vendor) {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        let key = key.to_lowercase();
        if key.contains("email") {
            if !EMAIL.is_match(value) {
                findings
                    .warnings
                    .push(format!("Invalid email format: {value}"));
            }
        } else if key.contains("phone") && !is_valid_phone(value) {
            findings
                .warnings
                .push(format!("Invalid phone format: {value}"));
        }
    }
}

fn is_valid_phone(value: &str) -> bool {
    let digits = value.chars().filter(char::is_ascii_digit).count();
    (10..=15).contains(&digits)
}

fn payslip(data: &StructuredData, findings: &mut Findings) {
    if !data.has_any(&SALARY_FIELDS) {
        findings
            .issues
            .push("No salary information found in payslip".to_string());
    }

    if !data.has(FieldName::EmployerName) && !has_vendor_key(data, &["company", "company_name"]) {
        findings
            .warnings
            .push("Employer information not clearly identified".to_string());
    }

    for field in SALARY_FIELDS {
        let Some(raw) = data.text(field) else {
            continue;
        };
        match numeric_value(raw) {
            Some(amount) if amount > 0.0 && amount < MIN_SALARY => findings
                .warnings
                .push(format!("Salary amount seems unusually low: {raw}")),
            Some(amount) if amount > MAX_SALARY => findings
                .warnings
                .push(format!("Salary amount seems unusually high: {raw}")),
            _ => {}
        }
    }
}

fn bank_statement(data: &StructuredData, findings: &mut Findings) {
    if !data.has(FieldName::AccountNumber) && !has_vendor_key(data, &["account"]) {
        findings
            .issues
            .push("Account number not found in bank statement".to_string());
    }

    if !data.has_any(&[FieldName::AccountBalance, FieldName::ClosingBalance])
        && !has_vendor_key(data, &["balance"])
    {
        findings
            .warnings
            .push("Account balance information not clearly identified".to_string());
    }

    if !data.has(FieldName::BankName) && !has_vendor_key(data, &["bank", "financial_institution"]) {
        findings
            .warnings
            .push("Bank name not clearly identified".to_string());
    }
}

fn id_proof(data: &StructuredData, today: NaiveDate, findings: &mut Findings) {
    if !data.has(FieldName::FullName) && !has_vendor_key(data, &["name", "first_name", "last_name"]) {
        findings
            .issues
            .push("Name not found in ID document".to_string());
    }

    let id_fields = [
        FieldName::IdNumber,
        FieldName::LicenseNumber,
        FieldName::PassportNumber,
    ];
    if !data.has_any(&id_fields) && !has_vendor_key(data, &["ssn"]) {
        findings
            .issues
            .push("ID number not found in document".to_string());
    }

    let expired = data
        .text(FieldName::ExpiryDate)
        .and_then(parse_date)
        .is_some_and(|expiry| expiry < today);
    if expired {
        findings.issues.push("ID document has expired".to_string());
    }
}

fn tax_document(data: &StructuredData, today: NaiveDate, findings: &mut Findings) {
    let earliest_year = today.year() - TAX_YEAR_LOOKBACK;
    let recent = candidate_dates(data)
        .into_iter()
        .filter_map(parse_date)
        .any(|date| date.year() >= earliest_year);
    if !recent {
        findings
            .warnings
            .push("Tax document year could not be verified".to_string());
    }
}

fn has_vendor_key(data: &StructuredData, keys: &[&str]) -> bool {
    keys.iter().any(|key| {
        data.unmapped
            .get(*key)
            .is_some_and(|field| !field.is_blank())
    })
}

/// First number in `raw` after currency marks and separators are removed.
fn numeric_value(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|ch| !matches!(ch, '$' | ',' | '€' | '£' | '¥'))
        .collect();
    NUMBER
        .find(&cleaned)
        .and_then(|found| found.as_str().parse().ok())
}
