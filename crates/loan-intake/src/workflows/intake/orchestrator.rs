use std::collections::{BTreeSet, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::cache::ResultCache;
use super::classify::Classifier;
use super::clock::{Clock, SystemClock};
use super::domain::{
    ApplicantInfo, ApplicationId, BatchResult, BatchStatus, CompletenessResult,
    DocumentProcessingResult, DocumentType, ProcessingOptions, ProcessingStatus, RawDocument,
    StoredDocument,
};
use super::enrichment::{ApplicationAnalysis, Enricher, NarrativeService};
use super::extraction::{Extractor, FallbackStrategy, StructuredExtractionService, TextReader};
use super::panic_message;
use super::repository::{IntakeRepository, ProcessingStatusView, RepositoryError};
use super::storage::{content_hash, DocumentStorage};
use super::validation::{validate_application_completeness, Validator};
use crate::config::IntakeConfig;

pub const DEFAULT_WORKER_LIMIT: usize = 3;
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Everything a caller hands to [`IntakeService::process_batch`].
#[derive(Debug, Clone, Default)]
pub struct BatchRequest {
    /// Blank or absent ids are replaced with a generated one.
    pub application_id: Option<ApplicationId>,
    pub documents: Vec<RawDocument>,
    /// Filename to declared type. Missing entries keep the document's own type.
    pub declared_types: HashMap<String, DocumentType>,
    pub applicant_info: ApplicantInfo,
    pub options: ProcessingOptions,
}

/// Error raised by the intake service's read paths.
#[derive(Debug, thiserror::Error)]
pub enum IntakeServiceError {
    #[error("no results recorded for application {0}")]
    NotFound(ApplicationId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Failures outside per-document isolation.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("worker aborted: {0}")]
    Worker(String),
    #[error("aggregation failed: {0}")]
    Aggregation(String),
}

/// Final batch status. The first failure outside per-document isolation wins.
fn batch_outcome(
    worker_error: Option<BatchError>,
    aggregation_error: Option<BatchError>,
) -> (BatchStatus, Option<String>) {
    match worker_error.or(aggregation_error) {
        Some(error) => (BatchStatus::Error, Some(error.to_string())),
        None => (BatchStatus::Completed, None),
    }
}

/// Classify, extract, validate and enrich one document.
struct DocumentPipeline {
    classifier: Classifier,
    extractor: Extractor,
    validator: Validator,
    enricher: Enricher,
    clock: Arc<dyn Clock>,
}

impl DocumentPipeline {
    async fn process(
        &self,
        document: StoredDocument,
        options: ProcessingOptions,
    ) -> DocumentProcessingResult {
        let mut result = DocumentProcessingResult::queued(&document, self.clock.now());
        result.status = ProcessingStatus::Processing;

        if result.document_type == DocumentType::Unknown {
            result.document_type = self.classifier.classify(&document).await;
            tracing::debug!(
                filename = %document.filename(),
                document_type = %result.document_type,
                "classified document"
            );
        }
        let document_type = result.document_type;

        if options.extract_entities {
            let extraction = self.extractor.extract(&document, document_type).await;
            if let Some(error) = &extraction.error {
                result.errors.push(format!("Extraction error: {error}"));
            }
            result.extraction = Some(extraction);
        }

        if options.auto_validate {
            if let Some(extraction) = &result.extraction {
                result.validation = Some(self.validator.validate(extraction, document_type));
            }
        }

        if options.enrichment_enabled() {
            let analysis = self
                .enricher
                .analyze_document(document_type, result.extraction.as_ref(), &options)
                .await;
            result.enrichment = Some(analysis);
        }

        result.status = ProcessingStatus::Completed;
        result.processed_at = self.clock.now();
        result
    }
}

/// Batch orchestrator composing storage, the per-document pipeline, and persistence.
pub struct IntakeService<S, R> {
    storage: Arc<S>,
    repository: Arc<R>,
    pipeline: Arc<DocumentPipeline>,
    cache: ResultCache<BatchResult>,
    worker_limit: usize,
}

/// Assembles an [`IntakeService`] with optional external collaborators.
pub struct IntakeServiceBuilder<S, R> {
    storage: Arc<S>,
    repository: Arc<R>,
    clock: Arc<dyn Clock>,
    worker_limit: usize,
    cache_ttl: Duration,
    extraction_service: Option<Arc<dyn StructuredExtractionService>>,
    narrative_service: Option<Arc<dyn NarrativeService>>,
    text_reader: TextReader,
    extractor: Option<Extractor>,
}

impl<S, R> IntakeServiceBuilder<S, R>
where
    S: DocumentStorage + 'static,
    R: IntakeRepository + 'static,
{
    pub fn config(mut self, config: &IntakeConfig) -> Self {
        self.worker_limit = config.worker_limit;
        self.cache_ttl = config.cache_ttl;
        self
    }

    pub fn worker_limit(mut self, worker_limit: usize) -> Self {
        self.worker_limit = worker_limit.max(1);
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn extraction_service(mut self, service: Arc<dyn StructuredExtractionService>) -> Self {
        self.extraction_service = Some(service);
        self
    }

    pub fn narrative_service(mut self, service: Arc<dyn NarrativeService>) -> Self {
        self.narrative_service = Some(service);
        self
    }

    pub fn text_reader(mut self, reader: TextReader) -> Self {
        self.text_reader = reader;
        self
    }

    /// Replaces the default strategy chain entirely.
    pub fn extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn build(self) -> IntakeService<S, R> {
        let extractor = self.extractor.unwrap_or_else(|| {
            Extractor::new(
                self.extraction_service,
                FallbackStrategy::new(self.text_reader),
            )
        });
        let pipeline = DocumentPipeline {
            classifier: Classifier::new(self.narrative_service.clone()),
            extractor,
            validator: Validator::new(self.clock.clone()),
            enricher: Enricher::new(self.narrative_service),
            clock: self.clock.clone(),
        };

        IntakeService {
            storage: self.storage,
            repository: self.repository,
            pipeline: Arc::new(pipeline),
            cache: ResultCache::new(self.cache_ttl, self.clock),
            worker_limit: self.worker_limit.max(1),
        }
    }
}

impl<S, R> IntakeService<S, R>
where
    S: DocumentStorage + 'static,
    R: IntakeRepository + 'static,
{
    pub fn builder(storage: Arc<S>, repository: Arc<R>) -> IntakeServiceBuilder<S, R> {
        IntakeServiceBuilder {
            storage,
            repository,
            clock: Arc::new(SystemClock),
            worker_limit: DEFAULT_WORKER_LIMIT,
            cache_ttl: DEFAULT_CACHE_TTL,
            extraction_service: None,
            narrative_service: None,
            text_reader: TextReader::new(),
            extractor: None,
        }
    }

    pub fn worker_limit(&self) -> usize {
        self.worker_limit
    }

    /// Runs a whole batch. Per-document failures are reported in the result,
    /// never as an error.
    pub async fn process_batch(&self, request: BatchRequest) -> BatchResult {
        let started = Instant::now();
        let started_at = self.pipeline.clock.now();
        let BatchRequest {
            application_id,
            documents,
            declared_types,
            applicant_info,
            options,
        } = request;

        let application_id = application_id
            .filter(|id| !id.is_blank())
            .unwrap_or_else(|| ApplicationId::generate(started_at));
        let total_documents = documents.len();
        tracing::info!(
            application_id = %application_id,
            documents = total_documents,
            workers = self.worker_limit,
            "starting batch"
        );

        let stored = self
            .store_documents(&application_id, documents, &declared_types)
            .await;
        self.cache.invalidate(&application_id);
        self.record_queued(&application_id, &stored, &applicant_info);
        let (mut results, worker_error) = self
            .run_workers(&application_id, &applicant_info, &stored, options)
            .await;
        results.sort_by_key(|result| result.submission_order);

        let (application_completeness, application_analysis, aggregation_error) =
            self.aggregate(&results, options).await;

        let (status, error) = batch_outcome(worker_error, aggregation_error);
        let successful_documents = results
            .iter()
            .filter(|result| result.status == ProcessingStatus::Completed)
            .count();
        let failed_documents = results
            .iter()
            .filter(|result| result.status == ProcessingStatus::Error)
            .count();

        let batch = BatchResult {
            application_id: application_id.clone(),
            total_documents,
            processed_documents: results.len(),
            successful_documents,
            failed_documents,
            document_results: results,
            application_completeness,
            application_analysis,
            status,
            error,
            started_at,
            elapsed_seconds: started.elapsed().as_secs_f64(),
        };

        match &batch.error {
            Some(error) => tracing::error!(application_id = %application_id, error = %error, "batch failed"),
            None => tracing::info!(
                application_id = %application_id,
                successful = batch.successful_documents,
                failed = batch.failed_documents,
                elapsed_seconds = batch.elapsed_seconds,
                "batch completed"
            ),
        }

        if let Err(err) = self.repository.save_batch_result(&batch) {
            tracing::error!(application_id = %application_id, error = %err, "failed to persist batch result");
        }
        self.cache.insert(application_id, batch.clone());
        batch
    }

    async fn store_documents(
        &self,
        application_id: &ApplicationId,
        documents: Vec<RawDocument>,
        declared_types: &HashMap<String, DocumentType>,
    ) -> Vec<StoredDocument> {
        let mut stored = Vec::with_capacity(documents.len());

        for (index, mut raw) in documents.into_iter().enumerate() {
            raw.submission_order = index + 1;
            raw.size_bytes = raw.content.len();
            if let Some(declared) = declared_types.get(&raw.filename) {
                raw.declared_type = *declared;
            }

            let handle = match self
                .storage
                .store(&raw.content, application_id, &raw.filename)
                .await
            {
                Ok(handle) => handle,
                Err(err) => {
                    tracing::error!(
                        application_id = %application_id,
                        filename = %raw.filename,
                        error = %err,
                        "failed to store document, dropping it from the batch"
                    );
                    continue;
                }
            };

            let content_hash = match self.storage.hash(&handle).await {
                Ok(hash) => hash,
                Err(err) => {
                    tracing::warn!(filename = %raw.filename, error = %err, "hashing stored copy failed, hashing upload");
                    content_hash(&raw.content)
                }
            };

            tracing::info!(
                application_id = %application_id,
                filename = %raw.filename,
                submission_order = raw.submission_order,
                "stored document"
            );
            stored.push(StoredDocument {
                raw,
                handle,
                content_hash,
            });
        }

        stored
    }

    /// Every stored document is visible to status reads before any worker runs.
    fn record_queued(
        &self,
        application_id: &ApplicationId,
        stored: &[StoredDocument],
        applicant: &ApplicantInfo,
    ) {
        let now = self.pipeline.clock.now();
        for document in stored {
            let queued = DocumentProcessingResult::queued(document, now);
            self.persist_document(application_id, &queued, applicant);
        }
    }

    /// Fans documents out over a bounded pool. A panicking worker yields an
    /// error result for its own document only. Each result is persisted as
    /// soon as its worker reports.
    async fn run_workers(
        &self,
        application_id: &ApplicationId,
        applicant: &ApplicantInfo,
        stored: &[StoredDocument],
        options: ProcessingOptions,
    ) -> (Vec<DocumentProcessingResult>, Option<BatchError>) {
        let permits = Arc::new(Semaphore::new(self.worker_limit));
        let mut workers = JoinSet::new();

        for document in stored.iter().cloned() {
            let permits = permits.clone();
            let pipeline = self.pipeline.clone();
            workers.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                let filename = document.filename().to_string();
                let order = document.submission_order();
                let envelope = document.clone();

                match AssertUnwindSafe(pipeline.process(document, options))
                    .catch_unwind()
                    .await
                {
                    Ok(result) => result,
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        tracing::error!(
                            filename = %filename,
                            submission_order = order,
                            error = %message,
                            "document processing failed"
                        );
                        DocumentProcessingResult::worker_failure(
                            &envelope,
                            message,
                            pipeline.clock.now(),
                        )
                    }
                }
            });
        }

        let mut results = Vec::with_capacity(stored.len());
        let mut worker_error = None;
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(result) => {
                    self.persist_document(application_id, &result, applicant);
                    results.push(result);
                }
                Err(err) => {
                    tracing::error!(error = %err, "worker task aborted");
                    worker_error = Some(BatchError::Worker(err.to_string()));
                }
            }
        }

        // A task that never reported back still gets an envelope.
        let reported: BTreeSet<usize> = results.iter().map(|result| result.submission_order).collect();
        for document in stored {
            if !reported.contains(&document.submission_order()) {
                let failure = DocumentProcessingResult::worker_failure(
                    document,
                    "worker aborted before reporting",
                    self.pipeline.clock.now(),
                );
                self.persist_document(application_id, &failure, applicant);
                results.push(failure);
            }
        }

        (results, worker_error)
    }

    async fn aggregate(
        &self,
        results: &[DocumentProcessingResult],
        options: ProcessingOptions,
    ) -> (CompletenessResult, Option<ApplicationAnalysis>, Option<BatchError>) {
        let completeness = std::panic::catch_unwind(AssertUnwindSafe(|| {
            validate_application_completeness(results.iter().map(|result| result.document_type))
        }));
        let completeness = match completeness {
            Ok(completeness) => completeness,
            Err(payload) => {
                let error = BatchError::Aggregation(panic_message(payload.as_ref()));
                return (
                    validate_application_completeness(std::iter::empty()),
                    None,
                    Some(error),
                );
            }
        };

        if !options.generate_summary {
            return (completeness, None, None);
        }

        let analysis = AssertUnwindSafe(self.pipeline.enricher.analyze_application(results))
            .catch_unwind()
            .await;
        match analysis {
            Ok(analysis) => (completeness, Some(analysis), None),
            Err(payload) => {
                tracing::warn!(error = %panic_message(payload.as_ref()), "application analysis failed");
                (completeness, None, None)
            }
        }
    }

    /// Fire-and-forget: failures are logged and swallowed.
    fn persist_document(
        &self,
        application_id: &ApplicationId,
        result: &DocumentProcessingResult,
        applicant: &ApplicantInfo,
    ) {
        if let Err(err) = self
            .repository
            .save_document_result(application_id, result, applicant)
        {
            tracing::error!(
                application_id = %application_id,
                filename = %result.filename,
                status = ?result.status,
                error = %err,
                "failed to persist document result"
            );
        }
    }

    /// Progress for an application, served from the cache while fresh.
    pub fn processing_status(
        &self,
        application_id: &ApplicationId,
    ) -> Result<ProcessingStatusView, IntakeServiceError> {
        if let Some(batch) = self.cache.get(application_id) {
            return Ok(ProcessingStatusView::from_documents(
                application_id.clone(),
                &batch.document_results,
            ));
        }

        match self.repository.load_documents(application_id) {
            Ok(documents) if documents.is_empty() => {
                Err(IntakeServiceError::NotFound(application_id.clone()))
            }
            Ok(documents) => Ok(ProcessingStatusView::from_documents(
                application_id.clone(),
                &documents,
            )),
            Err(err) => {
                tracing::error!(application_id = %application_id, error = %err, "failed to load processing status");
                Ok(ProcessingStatusView::failed(application_id.clone(), err.to_string()))
            }
        }
    }

    pub fn documents(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<DocumentProcessingResult>, IntakeServiceError> {
        if let Some(batch) = self.cache.get(application_id) {
            return Ok(batch.document_results);
        }
        let documents = self.repository.load_documents(application_id)?;
        if documents.is_empty() {
            return Err(IntakeServiceError::NotFound(application_id.clone()));
        }
        Ok(documents)
    }

    pub fn batch(&self, application_id: &ApplicationId) -> Result<BatchResult, IntakeServiceError> {
        if let Some(batch) = self.cache.get(application_id) {
            return Ok(batch);
        }
        self.repository
            .load_batch(application_id)?
            .ok_or_else(|| IntakeServiceError::NotFound(application_id.clone()))
    }
}
