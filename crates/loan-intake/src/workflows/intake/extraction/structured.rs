use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{ExtractionError, ExtractionStrategy};
use crate::workflows::intake::domain::{
    DocumentType, ExtractionMethod, ExtractionResult, FieldName, StoredDocument, StructuredData,
};
use crate::workflows::intake::registry;

/// Minimum vendor confidence for an entity to be kept as a generic field.
pub const ENTITY_CONFIDENCE_FLOOR: f32 = 0.5;

/// One entity as reported by the structured extraction service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorEntity {
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(rename = "mentionText", alias = "text")]
    pub mention_text: String,
    #[serde(default)]
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StructuredResponse {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub entities: Vec<VendorEntity>,
    #[serde(default)]
    pub confidence: f32,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("service unavailable")]
    Unavailable,
    #[error("service request failed: {0}")]
    Request(String),
    #[error("service returned an unusable response: {0}")]
    InvalidResponse(String),
}

/// External document-AI processor.
#[async_trait]
pub trait StructuredExtractionService: Send + Sync {
    /// Checked once when the extractor is built.
    fn is_available(&self) -> bool;

    async fn process(
        &self,
        document: &StoredDocument,
        processor_hint: &str,
    ) -> Result<StructuredResponse, ServiceError>;
}

/// Primary strategy backed by a [`StructuredExtractionService`].
pub struct StructuredStrategy {
    service: Arc<dyn StructuredExtractionService>,
}

impl StructuredStrategy {
    pub fn new(service: Arc<dyn StructuredExtractionService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl ExtractionStrategy for StructuredStrategy {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::Primary
    }

    async fn extract(
        &self,
        document: &StoredDocument,
        document_type: DocumentType,
    ) -> Result<ExtractionResult, ExtractionError> {
        let hint = registry::processor_hint(document_type);
        let response = self.service.process(document, hint).await?;

        Ok(ExtractionResult {
            structured_data: parse_entities(&response.entities, document_type),
            text_content: response.text,
            confidence: response.confidence.clamp(0.0, 1.0),
            method: Some(ExtractionMethod::Primary),
            processor_hint: Some(hint.to_string()),
            error: None,
        })
    }
}

/// Maps vendor entities into canonical fields. Confident entities are kept
/// under their own key first, then the document-type overlay is applied.
pub fn parse_entities(entities: &[VendorEntity], document_type: DocumentType) -> StructuredData {
    let mut data = StructuredData::default();

    for entity in entities
        .iter()
        .filter(|entity| entity.confidence > ENTITY_CONFIDENCE_FLOOR)
    {
        let key = normalize_entity_type(&entity.entity_type);
        match FieldName::from_label(&key) {
            Some(field) => data.insert(field, entity.mention_text.clone(), Some(entity.confidence)),
            None => data.insert_unmapped(key, entity.mention_text.clone(), Some(entity.confidence)),
        }
    }

    let overlay: fn(&str) -> Option<FieldName> = match document_type {
        DocumentType::Payslip => payslip_field,
        DocumentType::BankStatement => bank_statement_field,
        DocumentType::IdProof => id_field,
        DocumentType::EmploymentLetter => employment_field,
        _ => return data,
    };

    for entity in entities {
        let entity_type = entity.entity_type.to_lowercase();
        if let Some(field) = overlay(&entity_type) {
            data.insert(field, entity.mention_text.clone(), Some(entity.confidence));
        }
    }

    data
}

fn normalize_entity_type(raw: &str) -> String {
    raw.trim().to_lowercase().replace([' ', '-'], "_")
}

fn payslip_field(entity_type: &str) -> Option<FieldName> {
    if entity_type.contains("salary") || entity_type.contains("gross_pay") {
        Some(FieldName::GrossSalary)
    } else if entity_type.contains("net_pay") {
        Some(FieldName::NetSalary)
    } else if entity_type.contains("date") {
        Some(FieldName::PayDate)
    } else if entity_type.contains("employer") || entity_type.contains("company") {
        Some(FieldName::EmployerName)
    } else if entity_type.contains("employee") || entity_type.contains("name") {
        Some(FieldName::EmployeeName)
    } else {
        None
    }
}

fn bank_statement_field(entity_type: &str) -> Option<FieldName> {
    if entity_type.contains("account") && entity_type.contains("number") {
        Some(FieldName::AccountNumber)
    } else if entity_type.contains("balance") {
        Some(FieldName::AccountBalance)
    } else if entity_type.contains("bank") && entity_type.contains("name") {
        Some(FieldName::BankName)
    } else if entity_type.contains("statement_date") {
        Some(FieldName::StatementDate)
    } else {
        None
    }
}

fn id_field(entity_type: &str) -> Option<FieldName> {
    if entity_type.contains("name") {
        Some(FieldName::FullName)
    } else if entity_type.contains("id_number") || entity_type.contains("license_number") {
        Some(FieldName::IdNumber)
    } else if entity_type.contains("date_of_birth") {
        Some(FieldName::DateOfBirth)
    } else if entity_type.contains("expiry") || entity_type.contains("expiration") {
        Some(FieldName::ExpiryDate)
    } else if entity_type.contains("address") {
        Some(FieldName::Address)
    } else {
        None
    }
}

fn employment_field(entity_type: &str) -> Option<FieldName> {
    if entity_type.contains("title") || entity_type.contains("position") {
        Some(FieldName::JobTitle)
    } else if entity_type.contains("employer") || entity_type.contains("company") {
        Some(FieldName::EmployerName)
    } else if entity_type.contains("employee") || entity_type.contains("name") {
        Some(FieldName::EmployeeName)
    } else if entity_type.contains("date") {
        Some(FieldName::EmploymentDate)
    } else if entity_type.contains("salary") {
        Some(FieldName::SalaryInfo)
    } else {
        None
    }
}
