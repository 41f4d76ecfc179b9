use serde::{Deserialize, Serialize};

use super::domain::{
    ApplicantInfo, ApplicationId, BatchResult, DocumentProcessingResult, ProcessingStatus,
};

/// Persistence abstraction for processed results, keyed by application.
pub trait IntakeRepository: Send + Sync {
    /// Upsert keyed by application and `submission_order`. A document is saved
    /// once as `queued` when the batch starts and again when its worker reports.
    fn save_document_result(
        &self,
        application_id: &ApplicationId,
        result: &DocumentProcessingResult,
        applicant: &ApplicantInfo,
    ) -> Result<(), RepositoryError>;

    fn save_batch_result(&self, batch: &BatchResult) -> Result<(), RepositoryError>;

    fn load_documents(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<DocumentProcessingResult>, RepositoryError>;

    fn load_batch(&self, application_id: &ApplicationId)
        -> Result<Option<BatchResult>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationProgress {
    Processing,
    Completed,
    Error,
}

/// Progress of an application as seen through its persisted document results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingStatusView {
    pub application_id: ApplicationId,
    pub total_documents: usize,
    pub completed_documents: usize,
    pub failed_documents: usize,
    pub progress_percentage: f64,
    pub status: ApplicationProgress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProcessingStatusView {
    /// Completed and errored documents both count towards progress. The
    /// application is finished once every document is terminal.
    pub fn from_documents(
        application_id: ApplicationId,
        documents: &[DocumentProcessingResult],
    ) -> Self {
        let total_documents = documents.len();
        let count = |status: ProcessingStatus| {
            documents
                .iter()
                .filter(|document| document.status == status)
                .count()
        };
        let completed_documents = count(ProcessingStatus::Completed);
        let failed_documents = count(ProcessingStatus::Error);
        let terminal_documents = completed_documents + failed_documents;

        let progress_percentage = if total_documents == 0 {
            0.0
        } else {
            terminal_documents as f64 / total_documents as f64 * 100.0
        };
        let status = if documents.iter().all(|document| document.status.is_terminal()) {
            ApplicationProgress::Completed
        } else {
            ApplicationProgress::Processing
        };

        Self {
            application_id,
            total_documents,
            completed_documents,
            failed_documents,
            progress_percentage,
            status,
            error: None,
        }
    }

    pub fn failed(application_id: ApplicationId, error: impl Into<String>) -> Self {
        Self {
            application_id,
            total_documents: 0,
            completed_documents: 0,
            failed_documents: 0,
            progress_percentage: 0.0,
            status: ApplicationProgress::Error,
            error: Some(error.into()),
        }
    }
}
