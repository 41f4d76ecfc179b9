//! Loan application document intake: storage, classification, extraction,
//! validation, enrichment, and batch orchestration.
//!
//! [`IntakeService`] owns a batch end to end. Each stored document is handed to
//! exactly one worker, which classifies, extracts, validates, and optionally
//! enriches it. The orchestrator then restores submission order, checks
//! application completeness, and persists the outcome.

pub mod cache;
pub mod classify;
pub mod clock;
pub mod domain;
pub mod enrichment;
pub mod extraction;
pub mod orchestrator;
pub mod registry;
pub mod repository;
pub mod router;
pub mod storage;
pub mod validation;

#[cfg(test)]
pub(crate) mod tests;

use std::any::Any;

pub use classify::{classify_filename, Classifier};
pub use clock::{Clock, FixedClock, SystemClock};
pub use domain::{
    ApplicantInfo, ApplicationId, BatchResult, BatchStatus, CompletenessResult,
    DocumentProcessingResult, DocumentType, ExtractedField, ExtractionMethod, ExtractionResult,
    FieldName, FieldValue, ProcessingOptions, ProcessingStatus, RawDocument, StorageHandle,
    StoredDocument, StructuredData, ValidationResult,
};
pub use enrichment::{
    AnalysisSource, ApplicationAnalysis, DocumentAnalysis, Enricher, NarrativeService, RiskLevel,
};
pub use extraction::{
    ExtractionError, ExtractionStrategy, Extractor, FallbackStrategy, OcrEngine, PageRenderer,
    ServiceError, StructuredExtractionService, StructuredResponse, TextReader, VendorEntity,
};
pub use orchestrator::{BatchRequest, IntakeService, IntakeServiceBuilder, IntakeServiceError};
pub use registry::{DocumentCategory, DocumentProfile};
pub use repository::{
    ApplicationProgress, IntakeRepository, ProcessingStatusView, RepositoryError,
};
pub use router::intake_router;
pub use storage::{DocumentStorage, LocalFileStorage, StorageError};
pub use validation::{validate_application_completeness, Validator};

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}
