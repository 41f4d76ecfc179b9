//! Optional narrative analysis of documents and whole applications.
//!
//! Purely additive: nothing here feeds back into validation or completeness.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::{DocumentProcessingResult, DocumentType, ExtractionResult, ProcessingOptions};
use super::extraction::ServiceError;
use super::registry::{self, REQUIRED_DOCUMENT_TYPES};

const PROMPT_TEXT_LIMIT: usize = 1000;
const LIKELY_COVERAGE: f64 = 0.8;

/// Free-text generator behind the narrative analysis.
#[async_trait]
pub trait NarrativeService: Send + Sync {
    /// Checked once when the consumer is built.
    fn is_available(&self) -> bool;

    async fn summarize(&self, prompt: &str) -> Result<String, ServiceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    fn from_reply(raw: Option<&str>) -> Self {
        match raw.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
            Some("low") => RiskLevel::Low,
            Some("high") => RiskLevel::High,
            _ => RiskLevel::Medium,
        }
    }
}

/// Whether an analysis came from the narrative service or the local rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisSource {
    Narrative,
    Basic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentAnalysis {
    pub summary: String,
    pub risk_level: RiskLevel,
    pub risk_reason: String,
    pub recommendations: Vec<String>,
    pub fraud_indicators: Vec<String>,
    pub key_insights: Vec<String>,
    pub source: AnalysisSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationAnalysis {
    pub summary: String,
    pub risk_level: RiskLevel,
    pub risk_reason: String,
    pub recommendations: Vec<String>,
    pub missing_documents: Vec<DocumentType>,
    pub completeness_score: f64,
    pub approval_likelihood: String,
    pub source: AnalysisSource,
}

/// Produces analyses, preferring the narrative service when one is available.
#[derive(Clone, Default)]
pub struct Enricher {
    narrative: Option<Arc<dyn NarrativeService>>,
}

impl Enricher {
    pub fn new(narrative: Option<Arc<dyn NarrativeService>>) -> Self {
        let narrative = narrative.filter(|service| service.is_available());
        if narrative.is_none() {
            tracing::info!("narrative analysis unavailable, using basic analysis");
        }
        Self { narrative }
    }

    pub fn narrative(&self) -> Option<&Arc<dyn NarrativeService>> {
        self.narrative.as_ref()
    }

    pub async fn analyze_document(
        &self,
        document_type: DocumentType,
        extraction: Option<&ExtractionResult>,
        options: &ProcessingOptions,
    ) -> DocumentAnalysis {
        let Some(narrative) = &self.narrative else {
            return basic_document_analysis(document_type);
        };

        let prompt = document_prompt(document_type, extraction, options);
        match narrative.summarize(&prompt).await {
            Ok(reply) => parse_document_reply(&reply, document_type),
            Err(err) => {
                tracing::warn!(document_type = %document_type, error = %err, "document analysis failed");
                basic_document_analysis(document_type)
            }
        }
    }

    pub async fn analyze_application(
        &self,
        results: &[DocumentProcessingResult],
    ) -> ApplicationAnalysis {
        let Some(narrative) = &self.narrative else {
            return basic_application_analysis(results);
        };

        match narrative.summarize(&application_prompt(results)).await {
            Ok(reply) => parse_application_reply(&reply)
                .unwrap_or_else(|| basic_application_analysis(results)),
            Err(err) => {
                tracing::warn!(error = %err, "application analysis failed");
                basic_application_analysis(results)
            }
        }
    }
}

fn document_prompt(
    document_type: DocumentType,
    extraction: Option<&ExtractionResult>,
    options: &ProcessingOptions,
) -> String {
    let mut prompt = format!("Analyze this {} document:\n\n", document_type.words());

    if let Some(extraction) = extraction {
        if !extraction.text_content.is_empty() {
            let sample: String = extraction.text_content.chars().take(PROMPT_TEXT_LIMIT).collect();
            let _ = write!(prompt, "Text content: {sample}\n\n");
        }
        if !extraction.structured_data.is_empty() {
            if let Ok(data) = serde_json::to_string_pretty(&extraction.structured_data) {
                let _ = write!(prompt, "Extracted data: {data}\n\n");
            }
        }
    }

    if options.generate_summary {
        prompt.push_str("Provide a concise summary of this document.\n");
    }
    if options.fraud_detection {
        prompt.push_str("Analyze for potential fraud indicators.\n");
    }
    prompt.push_str(
        "\nProvide response in JSON format with fields: summary, risk_level, reason, \
         recommendations, fraud_indicators",
    );
    prompt
}

fn application_prompt(results: &[DocumentProcessingResult]) -> String {
    let mut prompt = String::from("Analyze this loan application:\n\n");
    for (index, result) in results.iter().enumerate() {
        let _ = writeln!(prompt, "Document {}: {}", index + 1, result.document_type);
        if let Some(validation) = &result.validation {
            let _ = writeln!(prompt, "- Valid: {}", validation.is_valid);
            if !validation.issues.is_empty() {
                let _ = writeln!(prompt, "- Issues: {}", validation.issues.join(", "));
            }
        }
    }
    prompt.push_str(
        "\nProvide analysis in JSON format with fields: summary, risk_level, reason, \
         recommendations, missing_documents, approval_likelihood",
    );
    prompt
}

/// The span from the first `{` to the last `}`, if it parses as an object.
fn first_json_object(reply: &str) -> Option<serde_json::Map<String, Value>> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end < start {
        return None;
    }
    match serde_json::from_str::<Value>(&reply[start..=end]).ok()? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

fn string_field(map: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

fn string_list(map: &serde_json::Map<String, Value>, key: &str) -> Vec<String> {
    match map.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(text) => Some(text.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Some(Value::String(text)) => vec![text.clone()],
        _ => Vec::new(),
    }
}

fn parse_document_reply(reply: &str, document_type: DocumentType) -> DocumentAnalysis {
    let Some(map) = first_json_object(reply) else {
        return DocumentAnalysis {
            summary: format!("AI analysis completed for {document_type}"),
            risk_level: RiskLevel::Medium,
            risk_reason: "Standard automated analysis".to_string(),
            recommendations: vec!["Document processed successfully".to_string()],
            fraud_indicators: Vec::new(),
            key_insights: vec!["Document analysis completed".to_string()],
            source: AnalysisSource::Narrative,
        };
    };

    DocumentAnalysis {
        summary: string_field(&map, "summary")
            .unwrap_or_else(|| format!("Analysis completed for {document_type}")),
        risk_level: RiskLevel::from_reply(map.get("risk_level").and_then(Value::as_str)),
        risk_reason: string_field(&map, "reason").unwrap_or_else(|| "Standard analysis".to_string()),
        recommendations: string_list(&map, "recommendations"),
        fraud_indicators: string_list(&map, "fraud_indicators"),
        key_insights: vec![format!("Document analysis completed for {document_type}")],
        source: AnalysisSource::Narrative,
    }
}

fn parse_application_reply(reply: &str) -> Option<ApplicationAnalysis> {
    let map = first_json_object(reply)?;
    let missing_documents = string_list(&map, "missing_documents")
        .iter()
        .filter_map(|label| DocumentType::from_label(label))
        .filter(|kind| kind.is_known())
        .collect();

    Some(ApplicationAnalysis {
        summary: string_field(&map, "summary")
            .unwrap_or_else(|| "Application analysis completed".to_string()),
        risk_level: RiskLevel::from_reply(map.get("risk_level").and_then(Value::as_str)),
        risk_reason: string_field(&map, "reason").unwrap_or_else(|| "Standard review".to_string()),
        recommendations: string_list(&map, "recommendations"),
        missing_documents,
        completeness_score: map
            .get("completeness_score")
            .and_then(Value::as_f64)
            .map(|score| score.clamp(0.0, 1.0))
            .unwrap_or(LIKELY_COVERAGE),
        approval_likelihood: string_field(&map, "approval_likelihood")
            .unwrap_or_else(|| "moderate".to_string()),
        source: AnalysisSource::Narrative,
    })
}

pub fn basic_document_analysis(document_type: DocumentType) -> DocumentAnalysis {
    DocumentAnalysis {
        summary: format!("Document processed: {}", registry::title_case(&document_type.words())),
        risk_level: RiskLevel::Medium,
        risk_reason: "Standard processing completed".to_string(),
        recommendations: vec!["Document uploaded successfully".to_string()],
        fraud_indicators: Vec::new(),
        key_insights: vec!["Document processing completed".to_string()],
        source: AnalysisSource::Basic,
    }
}

pub fn basic_application_analysis(results: &[DocumentProcessingResult]) -> ApplicationAnalysis {
    let present: BTreeSet<DocumentType> = results.iter().map(|result| result.document_type).collect();
    let missing_documents: Vec<DocumentType> = REQUIRED_DOCUMENT_TYPES
        .into_iter()
        .filter(|kind| !present.contains(kind))
        .collect();
    let coverage = (REQUIRED_DOCUMENT_TYPES.len() - missing_documents.len()) as f64
        / REQUIRED_DOCUMENT_TYPES.len() as f64;
    let likely = coverage > LIKELY_COVERAGE;

    ApplicationAnalysis {
        summary: format!("Application contains {} documents", results.len()),
        risk_level: if likely { RiskLevel::Low } else { RiskLevel::Medium },
        risk_reason: "Basic completeness check".to_string(),
        recommendations: vec!["Review all documents for completeness".to_string()],
        missing_documents,
        completeness_score: coverage,
        approval_likelihood: if likely { "good" } else { "moderate" }.to_string(),
        source: AnalysisSource::Basic,
    }
}
