use async_trait::async_trait;

use super::patterns;
use super::text::TextReader;
use super::{ExtractionError, ExtractionStrategy};
use crate::workflows::intake::domain::{
    DocumentType, ExtractionMethod, ExtractionResult, StoredDocument,
};

/// Fixed confidence for mechanically extracted, unverified results.
pub const FALLBACK_CONFIDENCE: f32 = 0.7;

/// Local text recovery followed by the pattern pass.
#[derive(Clone, Default)]
pub struct FallbackStrategy {
    reader: TextReader,
}

impl FallbackStrategy {
    pub fn new(reader: TextReader) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl ExtractionStrategy for FallbackStrategy {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::Fallback
    }

    async fn extract(
        &self,
        document: &StoredDocument,
        document_type: DocumentType,
    ) -> Result<ExtractionResult, ExtractionError> {
        let extension = document
            .raw
            .extension()
            .ok_or_else(|| ExtractionError::UnsupportedFormat(document.filename().to_string()))?;
        let reader = self.reader.clone();
        let content = document.raw.content.clone();

        // PDF parsing and OCR are CPU-bound.
        let text_content =
            tokio::task::spawn_blocking(move || reader.read(&content, &extension))
                .await
                .map_err(|err| ExtractionError::Task(err.to_string()))??;

        let structured_data = patterns::extract_fields(&text_content, document_type);
        tracing::debug!(
            filename = %document.filename(),
            fields = structured_data.fields.len(),
            dates = structured_data.dates_found.len(),
            amounts = structured_data.amounts_found.len(),
            "pattern extraction finished"
        );

        Ok(ExtractionResult {
            text_content,
            structured_data,
            confidence: FALLBACK_CONFIDENCE,
            method: Some(ExtractionMethod::Fallback),
            processor_hint: None,
            error: None,
        })
    }
}
