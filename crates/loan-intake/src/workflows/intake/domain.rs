use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enrichment::{ApplicationAnalysis, DocumentAnalysis};

/// Identifier wrapper for loan applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

impl ApplicationId {
    /// `APP-{MMDD}-{8 upper hex}`.
    pub fn generate(now: DateTime<Utc>) -> Self {
        let random = uuid::Uuid::new_v4().simple().to_string();
        Self(format!(
            "APP-{}-{}",
            now.format("%m%d"),
            random[..8].to_ascii_uppercase()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Closed vocabulary of supported document categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    IdProof,
    Payslip,
    BankStatement,
    EmploymentLetter,
    TaxDocument,
    UtilityBill,
    PropertyDocument,
    CreditReport,
    InvestmentStatement,
    SelfEmploymentProof,
    Unknown,
}

impl DocumentType {
    /// Every classifiable type, excluding `Unknown`.
    pub const KNOWN: [DocumentType; 10] = [
        DocumentType::IdProof,
        DocumentType::Payslip,
        DocumentType::BankStatement,
        DocumentType::EmploymentLetter,
        DocumentType::TaxDocument,
        DocumentType::UtilityBill,
        DocumentType::PropertyDocument,
        DocumentType::CreditReport,
        DocumentType::InvestmentStatement,
        DocumentType::SelfEmploymentProof,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            DocumentType::IdProof => "id_proof",
            DocumentType::Payslip => "payslip",
            DocumentType::BankStatement => "bank_statement",
            DocumentType::EmploymentLetter => "employment_letter",
            DocumentType::TaxDocument => "tax_document",
            DocumentType::UtilityBill => "utility_bill",
            DocumentType::PropertyDocument => "property_document",
            DocumentType::CreditReport => "credit_report",
            DocumentType::InvestmentStatement => "investment_statement",
            DocumentType::SelfEmploymentProof => "self_employment_proof",
            DocumentType::Unknown => "unknown",
        }
    }

    /// Exact match against the vocabulary, after trimming and lowercasing.
    pub fn from_label(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        if normalized == DocumentType::Unknown.label() {
            return Some(DocumentType::Unknown);
        }
        DocumentType::KNOWN
            .into_iter()
            .find(|kind| kind.label() == normalized)
    }

    /// Label with underscores replaced by spaces, e.g. "bank statement".
    pub fn words(self) -> String {
        self.label().replace('_', " ")
    }

    pub fn is_known(self) -> bool {
        self != DocumentType::Unknown
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized document type '{0}'")]
pub struct UnrecognizedDocumentType(pub String);

impl FromStr for DocumentType {
    type Err = UnrecognizedDocumentType;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        DocumentType::from_label(raw).ok_or_else(|| UnrecognizedDocumentType(raw.to_string()))
    }
}

/// Shape of the value a field carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Amount,
    Date,
}

/// Canonical field vocabulary shared by every document type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    FullName,
    IdNumber,
    LicenseNumber,
    PassportNumber,
    DateOfBirth,
    Address,
    ExpiryDate,
    EmployeeName,
    EmployerName,
    EmployeeId,
    PayDate,
    PayPeriod,
    GrossSalary,
    NetSalary,
    BasicSalary,
    TotalEarnings,
    Deductions,
    AccountHolderName,
    AccountNumber,
    StatementDate,
    BankName,
    AccountBalance,
    OpeningBalance,
    ClosingBalance,
    Transactions,
    JobTitle,
    EmploymentDate,
    EmploymentType,
    SalaryInfo,
    SupervisorContact,
    TaxpayerName,
    TaxYear,
    TotalIncome,
    FilingStatus,
    TaxOwed,
    RefundAmount,
    ServiceAddress,
    BillDate,
    UtilityCompany,
    AmountDue,
    ServicePeriod,
    PropertyAddress,
    OwnerName,
    DeedType,
    PropertyValue,
    DeedNumber,
    RegistrationDate,
    ReportHolderName,
    ReportDate,
    CreditScore,
    CreditHistory,
    AccountDetails,
    InquiryHistory,
    AccountValue,
    InvestmentDetails,
    GainsLosses,
    BusinessName,
    IncomeAmount,
    BusinessAddress,
    BusinessType,
    Email,
    Phone,
}

impl FieldName {
    pub const ALL: [FieldName; 62] = [
        FieldName::FullName,
        FieldName::IdNumber,
        FieldName::LicenseNumber,
        FieldName::PassportNumber,
        FieldName::DateOfBirth,
        FieldName::Address,
        FieldName::ExpiryDate,
        FieldName::EmployeeName,
        FieldName::EmployerName,
        FieldName::EmployeeId,
        FieldName::PayDate,
        FieldName::PayPeriod,
        FieldName::GrossSalary,
        FieldName::NetSalary,
        FieldName::BasicSalary,
        FieldName::TotalEarnings,
        FieldName::Deductions,
        FieldName::AccountHolderName,
        FieldName::AccountNumber,
        FieldName::StatementDate,
        FieldName::BankName,
        FieldName::AccountBalance,
        FieldName::OpeningBalance,
        FieldName::ClosingBalance,
        FieldName::Transactions,
        FieldName::JobTitle,
        FieldName::EmploymentDate,
        FieldName::EmploymentType,
        FieldName::SalaryInfo,
        FieldName::SupervisorContact,
        FieldName::TaxpayerName,
        FieldName::TaxYear,
        FieldName::TotalIncome,
        FieldName::FilingStatus,
        FieldName::TaxOwed,
        FieldName::RefundAmount,
        FieldName::ServiceAddress,
        FieldName::BillDate,
        FieldName::UtilityCompany,
        FieldName::AmountDue,
        FieldName::ServicePeriod,
        FieldName::PropertyAddress,
        FieldName::OwnerName,
        FieldName::DeedType,
        FieldName::PropertyValue,
        FieldName::DeedNumber,
        FieldName::RegistrationDate,
        FieldName::ReportHolderName,
        FieldName::ReportDate,
        FieldName::CreditScore,
        FieldName::CreditHistory,
        FieldName::AccountDetails,
        FieldName::InquiryHistory,
        FieldName::AccountValue,
        FieldName::InvestmentDetails,
        FieldName::GainsLosses,
        FieldName::BusinessName,
        FieldName::IncomeAmount,
        FieldName::BusinessAddress,
        FieldName::BusinessType,
        FieldName::Email,
        FieldName::Phone,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            FieldName::FullName => "full_name",
            FieldName::IdNumber => "id_number",
            FieldName::LicenseNumber => "license_number",
            FieldName::PassportNumber => "passport_number",
            FieldName::DateOfBirth => "date_of_birth",
            FieldName::Address => "address",
            FieldName::ExpiryDate => "expiry_date",
            FieldName::EmployeeName => "employee_name",
            FieldName::EmployerName => "employer_name",
            FieldName::EmployeeId => "employee_id",
            FieldName::PayDate => "pay_date",
            FieldName::PayPeriod => "pay_period",
            FieldName::GrossSalary => "gross_salary",
            FieldName::NetSalary => "net_salary",
            FieldName::BasicSalary => "basic_salary",
            FieldName::TotalEarnings => "total_earnings",
            FieldName::Deductions => "deductions",
            FieldName::AccountHolderName => "account_holder_name",
            FieldName::AccountNumber => "account_number",
            FieldName::StatementDate => "statement_date",
            FieldName::BankName => "bank_name",
            FieldName::AccountBalance => "account_balance",
            FieldName::OpeningBalance => "opening_balance",
            FieldName::ClosingBalance => "closing_balance",
            FieldName::Transactions => "transactions",
            FieldName::JobTitle => "job_title",
            FieldName::EmploymentDate => "employment_date",
            FieldName::EmploymentType => "employment_type",
            FieldName::SalaryInfo => "salary_info",
            FieldName::SupervisorContact => "supervisor_contact",
            FieldName::TaxpayerName => "taxpayer_name",
            FieldName::TaxYear => "tax_year",
            FieldName::TotalIncome => "total_income",
            FieldName::FilingStatus => "filing_status",
            FieldName::TaxOwed => "tax_owed",
            FieldName::RefundAmount => "refund_amount",
            FieldName::ServiceAddress => "service_address",
            FieldName::BillDate => "bill_date",
            FieldName::UtilityCompany => "utility_company",
            FieldName::AmountDue => "amount_due",
            FieldName::ServicePeriod => "service_period",
            FieldName::PropertyAddress => "property_address",
            FieldName::OwnerName => "owner_name",
            FieldName::DeedType => "deed_type",
            FieldName::PropertyValue => "property_value",
            FieldName::DeedNumber => "deed_number",
            FieldName::RegistrationDate => "registration_date",
            FieldName::ReportHolderName => "report_holder_name",
            FieldName::ReportDate => "report_date",
            FieldName::CreditScore => "credit_score",
            FieldName::CreditHistory => "credit_history",
            FieldName::AccountDetails => "account_details",
            FieldName::InquiryHistory => "inquiry_history",
            FieldName::AccountValue => "account_value",
            FieldName::InvestmentDetails => "investment_details",
            FieldName::GainsLosses => "gains_losses",
            FieldName::BusinessName => "business_name",
            FieldName::IncomeAmount => "income_amount",
            FieldName::BusinessAddress => "business_address",
            FieldName::BusinessType => "business_type",
            FieldName::Email => "email",
            FieldName::Phone => "phone",
        }
    }

    pub const fn kind(self) -> FieldKind {
        match self {
            FieldName::DateOfBirth
            | FieldName::ExpiryDate
            | FieldName::PayDate
            | FieldName::StatementDate
            | FieldName::EmploymentDate
            | FieldName::BillDate
            | FieldName::RegistrationDate
            | FieldName::ReportDate => FieldKind::Date,
            FieldName::GrossSalary
            | FieldName::NetSalary
            | FieldName::BasicSalary
            | FieldName::TotalEarnings
            | FieldName::Deductions
            | FieldName::AccountBalance
            | FieldName::OpeningBalance
            | FieldName::ClosingBalance
            | FieldName::SalaryInfo
            | FieldName::TotalIncome
            | FieldName::TaxOwed
            | FieldName::RefundAmount
            | FieldName::AmountDue
            | FieldName::PropertyValue
            | FieldName::AccountValue
            | FieldName::GainsLosses
            | FieldName::IncomeAmount => FieldKind::Amount,
            _ => FieldKind::Text,
        }
    }

    pub fn from_label(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        FieldName::ALL
            .into_iter()
            .find(|field| field.label() == normalized)
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Tagged field value; the tag follows the field's [`FieldKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Amount(String),
    Date(String),
}

impl FieldValue {
    pub fn for_kind(kind: FieldKind, raw: String) -> Self {
        match kind {
            FieldKind::Text => FieldValue::Text(raw),
            FieldKind::Amount => FieldValue::Amount(raw),
            FieldKind::Date => FieldValue::Date(raw),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FieldValue::Text(raw) | FieldValue::Amount(raw) | FieldValue::Date(raw) => raw,
        }
    }
}

/// A recovered value and, when a scoring extractor produced it, its confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedField {
    pub value: FieldValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl ExtractedField {
    pub fn as_str(&self) -> &str {
        self.value.as_str()
    }

    pub fn is_blank(&self) -> bool {
        self.value.as_str().trim().is_empty()
    }
}

/// Typed key/value data recovered from a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredData {
    pub fields: BTreeMap<FieldName, ExtractedField>,
    /// Vendor entities whose type is outside the canonical vocabulary.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub unmapped: BTreeMap<String, ExtractedField>,
    /// Every date-looking string the pattern pass found.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dates_found: Vec<String>,
    /// Every currency amount the pattern pass found.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub amounts_found: Vec<String>,
}

impl StructuredData {
    pub fn insert(&mut self, name: FieldName, raw: impl Into<String>, confidence: Option<f32>) {
        let value = FieldValue::for_kind(name.kind(), raw.into());
        self.fields
            .insert(name, ExtractedField { value, confidence });
    }

    pub fn insert_unmapped(
        &mut self,
        key: impl Into<String>,
        raw: impl Into<String>,
        confidence: Option<f32>,
    ) {
        self.unmapped.insert(
            key.into(),
            ExtractedField {
                value: FieldValue::Text(raw.into()),
                confidence,
            },
        );
    }

    pub fn get(&self, name: FieldName) -> Option<&ExtractedField> {
        self.fields.get(&name)
    }

    pub fn text(&self, name: FieldName) -> Option<&str> {
        self.get(name)
            .filter(|field| !field.is_blank())
            .map(ExtractedField::as_str)
    }

    /// Present with a non-blank value.
    pub fn has(&self, name: FieldName) -> bool {
        self.text(name).is_some()
    }

    pub fn has_any(&self, names: &[FieldName]) -> bool {
        names.iter().any(|name| self.has(*name))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
            && self.unmapped.is_empty()
            && self.dates_found.is_empty()
            && self.amounts_found.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    Primary,
    Fallback,
}

/// Immutable outcome of running the extractor over one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub text_content: String,
    pub structured_data: StructuredData,
    pub confidence: f32,
    /// `None` when no strategy produced the result.
    pub method: Option<ExtractionMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processor_hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExtractionResult {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            text_content: String::new(),
            structured_data: StructuredData::default(),
            confidence: 0.0,
            method: None,
            processor_hint: None,
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Rule-check outcome for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    pub missing_fields: Vec<FieldName>,
    pub validation_score: f64,
    pub recommendations: Vec<String>,
}

/// Per-document lifecycle. `Completed` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Queued,
    Processing,
    Completed,
    Error,
}

impl ProcessingStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ProcessingStatus::Queued => "queued",
            ProcessingStatus::Processing => "processing",
            ProcessingStatus::Completed => "completed",
            ProcessingStatus::Error => "error",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, ProcessingStatus::Completed | ProcessingStatus::Error)
    }
}

/// Opaque applicant metadata passed through to persistence untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicantInfo(pub BTreeMap<String, serde_json::Value>);

/// Flags gating the optional pipeline stages. All default to enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingOptions {
    #[serde(default = "enabled")]
    pub extract_entities: bool,
    #[serde(default = "enabled")]
    pub auto_validate: bool,
    #[serde(default = "enabled")]
    pub generate_summary: bool,
    #[serde(default = "enabled")]
    pub fraud_detection: bool,
}

fn enabled() -> bool {
    true
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            extract_entities: true,
            auto_validate: true,
            generate_summary: true,
            fraud_detection: true,
        }
    }
}

impl ProcessingOptions {
    pub fn enrichment_enabled(&self) -> bool {
        self.generate_summary || self.fraud_detection
    }
}

/// A file as submitted by the caller. Immutable once created.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub filename: String,
    pub content: Arc<[u8]>,
    pub declared_type: DocumentType,
    pub size_bytes: usize,
    pub submission_order: usize,
}

impl RawDocument {
    pub fn new(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        let content: Vec<u8> = content.into();
        Self {
            filename: filename.into(),
            size_bytes: content.len(),
            content: Arc::from(content),
            declared_type: DocumentType::Unknown,
            submission_order: 0,
        }
    }

    pub fn with_declared_type(mut self, declared_type: DocumentType) -> Self {
        self.declared_type = declared_type;
        self
    }

    /// Lowercased extension without the dot, if any.
    pub fn extension(&self) -> Option<String> {
        file_extension(&self.filename)
    }
}

pub(crate) fn file_extension(filename: &str) -> Option<String> {
    let (stem, extension) = filename.rsplit_once('.')?;
    if stem.is_empty() || extension.is_empty() {
        return None;
    }
    Some(extension.to_ascii_lowercase())
}

/// Opaque handle returned by the storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageHandle(pub String);

impl fmt::Display for StorageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A raw document after the store phase, owned by exactly one worker.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub raw: RawDocument,
    pub handle: StorageHandle,
    pub content_hash: String,
}

impl StoredDocument {
    pub fn filename(&self) -> &str {
        &self.raw.filename
    }

    pub fn submission_order(&self) -> usize {
        self.raw.submission_order
    }
}

/// Per-document envelope written back to the orchestrator by a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentProcessingResult {
    pub filename: String,
    pub document_type: DocumentType,
    pub declared_type: DocumentType,
    pub storage_handle: StorageHandle,
    pub content_hash: String,
    pub submission_order: usize,
    pub status: ProcessingStatus,
    pub extraction: Option<ExtractionResult>,
    pub validation: Option<ValidationResult>,
    pub enrichment: Option<DocumentAnalysis>,
    pub errors: Vec<String>,
    pub processed_at: DateTime<Utc>,
}

impl DocumentProcessingResult {
    pub fn queued(document: &StoredDocument, processed_at: DateTime<Utc>) -> Self {
        Self {
            filename: document.raw.filename.clone(),
            document_type: document.raw.declared_type,
            declared_type: document.raw.declared_type,
            storage_handle: document.handle.clone(),
            content_hash: document.content_hash.clone(),
            submission_order: document.raw.submission_order,
            status: ProcessingStatus::Queued,
            extraction: None,
            validation: None,
            enrichment: None,
            errors: Vec::new(),
            processed_at,
        }
    }

    /// Error envelope for a worker that failed before producing its own result.
    pub fn worker_failure(
        document: &StoredDocument,
        message: impl Into<String>,
        processed_at: DateTime<Utc>,
    ) -> Self {
        let mut result = Self::queued(document, processed_at);
        result.status = ProcessingStatus::Error;
        result
            .errors
            .push(format!("Processing error: {}", message.into()));
        result
    }
}

/// Application-level status of a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Processing,
    Completed,
    Error,
}

impl BatchStatus {
    pub const fn label(self) -> &'static str {
        match self {
            BatchStatus::Processing => "processing",
            BatchStatus::Completed => "completed",
            BatchStatus::Error => "error",
        }
    }
}

/// Required-type coverage over a whole application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletenessResult {
    pub is_complete: bool,
    pub missing_required: BTreeSet<DocumentType>,
    pub missing_optional: BTreeSet<DocumentType>,
    pub completeness_score: f64,
    pub recommendations: Vec<String>,
}

/// Aggregate of one `process_batch` invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub application_id: ApplicationId,
    pub total_documents: usize,
    pub processed_documents: usize,
    pub successful_documents: usize,
    pub failed_documents: usize,
    pub document_results: Vec<DocumentProcessingResult>,
    pub application_completeness: CompletenessResult,
    pub application_analysis: Option<ApplicationAnalysis>,
    pub status: BatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub elapsed_seconds: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_type_labels_round_trip_through_from_str() {
        for kind in DocumentType::KNOWN {
            assert_eq!(kind.label().parse::<DocumentType>(), Ok(kind));
        }
        assert_eq!(" Unknown ".parse::<DocumentType>(), Ok(DocumentType::Unknown));
        assert!("passport".parse::<DocumentType>().is_err());
    }

    #[test]
    fn field_values_follow_field_kind() {
        let mut data = StructuredData::default();
        data.insert(FieldName::PayDate, "2025-01-31", None);
        data.insert(FieldName::GrossSalary, "$5,000", Some(0.9));
        data.insert(FieldName::EmployerName, "  ", None);

        assert!(matches!(
            data.get(FieldName::PayDate).map(|field| &field.value),
            Some(FieldValue::Date(_))
        ));
        assert!(matches!(
            data.get(FieldName::GrossSalary).map(|field| &field.value),
            Some(FieldValue::Amount(_))
        ));
        assert!(!data.has(FieldName::EmployerName), "blank values count as absent");
    }

    #[test]
    fn generated_ids_carry_date_and_hex_suffix() {
        use chrono::TimeZone;

        let now = Utc.with_ymd_and_hms(2025, 7, 4, 8, 0, 0).unwrap();
        let id = ApplicationId::generate(now);
        let (prefix, suffix) = id.as_str().split_at("APP-0704-".len());

        assert_eq!(prefix, "APP-0704-");
        assert_eq!(suffix.len(), 8);
        assert!(suffix
            .chars()
            .all(|ch| ch.is_ascii_digit() || ('A'..='F').contains(&ch)));
    }

    #[test]
    fn extension_requires_a_stem() {
        assert_eq!(file_extension("scan.PDF").as_deref(), Some("pdf"));
        assert_eq!(file_extension(".bashrc"), None);
        assert_eq!(file_extension("README"), None);
    }
}
