//! Multi-strategy document extraction.
//!
//! Strategies are tried in order and the first success wins. The primary
//! structured service is only enlisted when it reports itself available at
//! construction time.

pub mod fallback;
pub mod patterns;
pub mod structured;
pub mod text;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use super::domain::{DocumentType, ExtractionMethod, ExtractionResult, StoredDocument};

pub use fallback::{FallbackStrategy, FALLBACK_CONFIDENCE};
pub use structured::{
    ServiceError, StructuredExtractionService, StructuredResponse, StructuredStrategy,
    VendorEntity,
};
pub use text::{OcrEngine, PageRenderer, TextReader};

/// Extensions the extractor accepts, lowercased.
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["pdf", "jpg", "jpeg", "png", "tiff", "tif"];

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("PDF text extraction failed: {0}")]
    Pdf(String),
    #[error("OCR engine not configured")]
    OcrUnavailable,
    #[error("OCR failed: {0}")]
    Ocr(String),
    #[error("extraction task failed: {0}")]
    Task(String),
}

/// One way of turning a stored document into an [`ExtractionResult`].
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    fn method(&self) -> ExtractionMethod;

    async fn extract(
        &self,
        document: &StoredDocument,
        document_type: DocumentType,
    ) -> Result<ExtractionResult, ExtractionError>;
}

/// Ordered strategy chain. Never fails: errors become an error result.
#[derive(Clone)]
pub struct Extractor {
    strategies: Vec<Arc<dyn ExtractionStrategy>>,
}

impl Extractor {
    /// Enlists `primary` ahead of the fallback if it is available right now.
    pub fn new(
        primary: Option<Arc<dyn StructuredExtractionService>>,
        fallback: FallbackStrategy,
    ) -> Self {
        let mut strategies: Vec<Arc<dyn ExtractionStrategy>> = Vec::with_capacity(2);
        match primary {
            Some(service) if service.is_available() => {
                strategies.push(Arc::new(StructuredStrategy::new(service)));
            }
            Some(_) => tracing::info!("structured extraction unavailable, using local fallback"),
            None => tracing::info!("no structured extraction service configured"),
        }
        strategies.push(Arc::new(fallback));
        Self { strategies }
    }

    pub fn from_strategies(strategies: Vec<Arc<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn methods(&self) -> Vec<ExtractionMethod> {
        self.strategies.iter().map(|strategy| strategy.method()).collect()
    }

    pub async fn extract(
        &self,
        document: &StoredDocument,
        document_type: DocumentType,
    ) -> ExtractionResult {
        let supported = document
            .raw
            .extension()
            .is_some_and(|extension| SUPPORTED_EXTENSIONS.contains(&extension.as_str()));
        if !supported {
            return ExtractionResult::failed(
                ExtractionError::UnsupportedFormat(document.filename().to_string()).to_string(),
            );
        }

        let mut last_error = None;
        for strategy in &self.strategies {
            match strategy.extract(document, document_type).await {
                Ok(result) => return result,
                Err(err) => {
                    tracing::warn!(
                        filename = %document.filename(),
                        method = ?strategy.method(),
                        error = %err,
                        "extraction strategy failed"
                    );
                    last_error = Some(err);
                }
            }
        }

        let message = last_error
            .map(|err| err.to_string())
            .unwrap_or_else(|| "no extraction strategy configured".to_string());
        ExtractionResult::failed(message)
    }
}
