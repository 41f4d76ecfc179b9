use serde::Serialize;

use super::domain::{DocumentType, FieldName};

/// Grouping used when presenting and prioritising documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    Identity,
    Income,
    Employment,
    Financial,
    AddressProof,
    Property,
}

impl DocumentCategory {
    pub const fn display_name(self) -> &'static str {
        match self {
            DocumentCategory::Identity => "Identity Verification",
            DocumentCategory::Income => "Income Verification",
            DocumentCategory::Employment => "Employment Verification",
            DocumentCategory::Financial => "Financial Documents",
            DocumentCategory::AddressProof => "Address Verification",
            DocumentCategory::Property => "Property Documents",
        }
    }

    pub const fn priority(self) -> u8 {
        match self {
            DocumentCategory::Identity => 1,
            DocumentCategory::Income => 2,
            DocumentCategory::Employment => 3,
            DocumentCategory::Financial => 4,
            DocumentCategory::AddressProof => 5,
            DocumentCategory::Property => 6,
        }
    }
}

/// Structured-service processor families.
pub const FORM_PARSER_PROCESSOR: &str = "FORM_PARSER_PROCESSOR";
pub const BANK_STATEMENT_PROCESSOR: &str = "BANK_STATEMENT_PROCESSOR";
pub const ID_PROCESSOR: &str = "ID_PROCESSOR";

const ACCEPTED_FORMATS: &[&str] = &["pdf", "jpg", "jpeg", "png"];

/// Static reference data for one document type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentProfile {
    pub document_type: DocumentType,
    pub display_name: &'static str,
    pub description: &'static str,
    pub category: DocumentCategory,
    pub required: bool,
    pub max_age_days: Option<u32>,
    pub accepted_formats: &'static [&'static str],
    pub required_fields: &'static [FieldName],
    pub optional_fields: &'static [FieldName],
    pub min_confidence: f32,
    pub processor_hint: &'static str,
    pub priority: u8,
    pub filename_keywords: &'static [&'static str],
}

const PROFILES: [DocumentProfile; 10] = [
    DocumentProfile {
        document_type: DocumentType::IdProof,
        display_name: "ID Proof",
        description: "Government-issued identification document",
        category: DocumentCategory::Identity,
        required: true,
        max_age_days: None,
        accepted_formats: ACCEPTED_FORMATS,
        required_fields: &[FieldName::FullName, FieldName::IdNumber],
        optional_fields: &[
            FieldName::DateOfBirth,
            FieldName::Address,
            FieldName::ExpiryDate,
        ],
        min_confidence: 0.7,
        processor_hint: ID_PROCESSOR,
        priority: 10,
        filename_keywords: &["id", "passport", "license"],
    },
    DocumentProfile {
        document_type: DocumentType::Payslip,
        display_name: "Payslip",
        description: "Recent salary statement from employer",
        category: DocumentCategory::Income,
        required: true,
        max_age_days: Some(90),
        accepted_formats: ACCEPTED_FORMATS,
        required_fields: &[
            FieldName::GrossSalary,
            FieldName::EmployerName,
            FieldName::PayDate,
        ],
        optional_fields: &[
            FieldName::EmployeeName,
            FieldName::NetSalary,
            FieldName::Deductions,
            FieldName::EmployeeId,
            FieldName::PayPeriod,
        ],
        min_confidence: 0.6,
        processor_hint: FORM_PARSER_PROCESSOR,
        priority: 9,
        filename_keywords: &["payslip", "salary", "pay"],
    },
    DocumentProfile {
        document_type: DocumentType::BankStatement,
        display_name: "Bank Statement",
        description: "Recent bank account statement",
        category: DocumentCategory::Financial,
        required: true,
        max_age_days: Some(90),
        accepted_formats: ACCEPTED_FORMATS,
        required_fields: &[
            FieldName::AccountHolderName,
            FieldName::AccountNumber,
            FieldName::StatementDate,
        ],
        optional_fields: &[
            FieldName::BankName,
            FieldName::AccountBalance,
            FieldName::Transactions,
            FieldName::OpeningBalance,
            FieldName::ClosingBalance,
        ],
        min_confidence: 0.6,
        processor_hint: BANK_STATEMENT_PROCESSOR,
        priority: 7,
        filename_keywords: &["bank", "statement"],
    },
    DocumentProfile {
        document_type: DocumentType::EmploymentLetter,
        display_name: "Employment Letter",
        description: "Letter from employer confirming employment",
        category: DocumentCategory::Employment,
        required: true,
        max_age_days: Some(180),
        accepted_formats: ACCEPTED_FORMATS,
        required_fields: &[
            FieldName::EmployeeName,
            FieldName::EmployerName,
            FieldName::JobTitle,
            FieldName::EmploymentDate,
        ],
        optional_fields: &[
            FieldName::SalaryInfo,
            FieldName::EmploymentType,
            FieldName::SupervisorContact,
        ],
        min_confidence: 0.7,
        processor_hint: FORM_PARSER_PROCESSOR,
        priority: 8,
        filename_keywords: &["employment", "job"],
    },
    DocumentProfile {
        document_type: DocumentType::TaxDocument,
        display_name: "Tax Document",
        description: "Tax return or tax assessment document",
        category: DocumentCategory::Financial,
        required: false,
        max_age_days: Some(365),
        accepted_formats: ACCEPTED_FORMATS,
        required_fields: &[
            FieldName::TaxpayerName,
            FieldName::TaxYear,
            FieldName::TotalIncome,
        ],
        optional_fields: &[
            FieldName::FilingStatus,
            FieldName::Deductions,
            FieldName::TaxOwed,
            FieldName::RefundAmount,
        ],
        min_confidence: 0.7,
        processor_hint: FORM_PARSER_PROCESSOR,
        priority: 6,
        filename_keywords: &["tax", "w2", "1099"],
    },
    DocumentProfile {
        document_type: DocumentType::UtilityBill,
        display_name: "Utility Bill",
        description: "Recent utility bill for address verification",
        category: DocumentCategory::AddressProof,
        required: false,
        max_age_days: Some(90),
        accepted_formats: ACCEPTED_FORMATS,
        required_fields: &[
            FieldName::AccountHolderName,
            FieldName::ServiceAddress,
            FieldName::BillDate,
        ],
        optional_fields: &[
            FieldName::UtilityCompany,
            FieldName::AccountNumber,
            FieldName::AmountDue,
            FieldName::ServicePeriod,
        ],
        min_confidence: 0.6,
        processor_hint: FORM_PARSER_PROCESSOR,
        priority: 4,
        filename_keywords: &["utility", "bill", "electric"],
    },
    DocumentProfile {
        document_type: DocumentType::PropertyDocument,
        display_name: "Property Document",
        description: "Property-related documentation",
        category: DocumentCategory::Property,
        required: false,
        max_age_days: Some(365),
        accepted_formats: ACCEPTED_FORMATS,
        required_fields: &[
            FieldName::PropertyAddress,
            FieldName::OwnerName,
            FieldName::DeedType,
        ],
        optional_fields: &[
            FieldName::PropertyValue,
            FieldName::DeedNumber,
            FieldName::RegistrationDate,
        ],
        min_confidence: 0.8,
        processor_hint: FORM_PARSER_PROCESSOR,
        priority: 3,
        filename_keywords: &[],
    },
    DocumentProfile {
        document_type: DocumentType::CreditReport,
        display_name: "Credit Report",
        description: "Credit history and score report",
        category: DocumentCategory::Financial,
        required: false,
        max_age_days: Some(30),
        accepted_formats: ACCEPTED_FORMATS,
        required_fields: &[
            FieldName::ReportHolderName,
            FieldName::ReportDate,
            FieldName::CreditScore,
        ],
        optional_fields: &[
            FieldName::CreditHistory,
            FieldName::AccountDetails,
            FieldName::InquiryHistory,
        ],
        min_confidence: 0.7,
        processor_hint: FORM_PARSER_PROCESSOR,
        priority: 5,
        filename_keywords: &[],
    },
    DocumentProfile {
        document_type: DocumentType::InvestmentStatement,
        display_name: "Investment Statement",
        description: "Investment portfolio or asset statement",
        category: DocumentCategory::Financial,
        required: false,
        max_age_days: Some(90),
        accepted_formats: ACCEPTED_FORMATS,
        required_fields: &[
            FieldName::AccountHolderName,
            FieldName::StatementDate,
            FieldName::AccountValue,
        ],
        optional_fields: &[
            FieldName::InvestmentDetails,
            FieldName::GainsLosses,
            FieldName::AccountNumber,
        ],
        min_confidence: 0.6,
        processor_hint: FORM_PARSER_PROCESSOR,
        priority: 2,
        filename_keywords: &[],
    },
    DocumentProfile {
        document_type: DocumentType::SelfEmploymentProof,
        display_name: "Self-Employment Proof",
        description: "Documentation proving self-employment income",
        category: DocumentCategory::Income,
        required: false,
        max_age_days: Some(365),
        accepted_formats: ACCEPTED_FORMATS,
        required_fields: &[
            FieldName::BusinessName,
            FieldName::OwnerName,
            FieldName::IncomeAmount,
        ],
        optional_fields: &[
            FieldName::BusinessAddress,
            FieldName::LicenseNumber,
            FieldName::BusinessType,
        ],
        min_confidence: 0.7,
        processor_hint: FORM_PARSER_PROCESSOR,
        priority: 1,
        filename_keywords: &[],
    },
];

/// Types an application must contain to be complete.
pub const REQUIRED_DOCUMENT_TYPES: [DocumentType; 4] = [
    DocumentType::IdProof,
    DocumentType::Payslip,
    DocumentType::BankStatement,
    DocumentType::EmploymentLetter,
];

/// Recommended but not mandatory types.
pub const OPTIONAL_DOCUMENT_TYPES: [DocumentType; 3] = [
    DocumentType::TaxDocument,
    DocumentType::UtilityBill,
    DocumentType::PropertyDocument,
];

/// Filename keyword table in match order. The first table entry whose
/// keyword occurs in the lowercased filename wins.
pub const FILENAME_KEYWORDS: [DocumentType; 6] = [
    DocumentType::Payslip,
    DocumentType::BankStatement,
    DocumentType::IdProof,
    DocumentType::TaxDocument,
    DocumentType::EmploymentLetter,
    DocumentType::UtilityBill,
];

/// Looks up the static profile for a type. `Unknown` has no profile.
pub fn profile(document_type: DocumentType) -> Option<&'static DocumentProfile> {
    PROFILES
        .iter()
        .find(|profile| profile.document_type == document_type)
}

pub fn all_profiles() -> &'static [DocumentProfile] {
    &PROFILES
}

pub fn processor_hint(document_type: DocumentType) -> &'static str {
    profile(document_type)
        .map(|profile| profile.processor_hint)
        .unwrap_or(FORM_PARSER_PROCESSOR)
}

pub fn max_age_days(document_type: DocumentType) -> Option<u32> {
    profile(document_type).and_then(|profile| profile.max_age_days)
}

pub fn display_name(document_type: DocumentType) -> String {
    match profile(document_type) {
        Some(profile) => profile.display_name.to_string(),
        None => title_case(&document_type.words()),
    }
}

pub fn types_in_category(category: DocumentCategory) -> Vec<DocumentType> {
    PROFILES
        .iter()
        .filter(|profile| profile.category == category)
        .map(|profile| profile.document_type)
        .collect()
}

pub fn processing_priority(document_type: DocumentType) -> u8 {
    profile(document_type)
        .map(|profile| profile.priority)
        .unwrap_or(0)
}

/// Highest priority first; ties keep their input order.
pub fn sort_by_priority(types: &mut [DocumentType]) {
    types.sort_by(|left, right| processing_priority(*right).cmp(&processing_priority(*left)));
}

pub(crate) fn title_case(words: &str) -> String {
    words
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
