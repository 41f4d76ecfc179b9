use async_trait::async_trait;
use base64::Engine;
use loan_intake::config::IntakeConfig;
use loan_intake::workflows::intake::{
    ApplicantInfo, ApplicationId, BatchResult, DocumentProcessingResult, IntakeRepository,
    IntakeService, LocalFileStorage, NarrativeService, RepositoryError, ServiceError,
    StoredDocument, StructuredExtractionService, StructuredResponse, SystemClock, TextReader,
};
use metrics_exporter_prometheus::PrometheusHandle;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

pub(crate) type AppIntakeService = IntakeService<LocalFileStorage, InMemoryIntakeRepository>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryIntakeRepository {
    documents: Arc<Mutex<HashMap<ApplicationId, Vec<DocumentProcessingResult>>>>,
    batches: Arc<Mutex<HashMap<ApplicationId, BatchResult>>>,
    applicants: Arc<Mutex<HashMap<ApplicationId, ApplicantInfo>>>,
}

impl InMemoryIntakeRepository {
    fn unavailable<T>(_poisoned: T) -> RepositoryError {
        RepositoryError::Unavailable("repository lock poisoned".to_string())
    }
}

impl IntakeRepository for InMemoryIntakeRepository {
    fn save_document_result(
        &self,
        application_id: &ApplicationId,
        result: &DocumentProcessingResult,
        applicant: &ApplicantInfo,
    ) -> Result<(), RepositoryError> {
        let mut documents = self.documents.lock().map_err(Self::unavailable)?;
        let entries = documents.entry(application_id.clone()).or_default();
        // One row per slot: a later save for the same submission_order replaces the earlier one.
        entries.retain(|existing| existing.submission_order != result.submission_order);
        entries.push(result.clone());
        entries.sort_by_key(|entry| entry.submission_order);

        self.applicants
            .lock()
            .map_err(Self::unavailable)?
            .insert(application_id.clone(), applicant.clone());
        Ok(())
    }

    fn save_batch_result(&self, batch: &BatchResult) -> Result<(), RepositoryError> {
        self.batches
            .lock()
            .map_err(Self::unavailable)?
            .insert(batch.application_id.clone(), batch.clone());
        Ok(())
    }

    fn load_documents(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<DocumentProcessingResult>, RepositoryError> {
        let documents = self.documents.lock().map_err(Self::unavailable)?;
        Ok(documents.get(application_id).cloned().unwrap_or_default())
    }

    fn load_batch(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Option<BatchResult>, RepositoryError> {
        let batches = self.batches.lock().map_err(Self::unavailable)?;
        Ok(batches.get(application_id).cloned())
    }
}

#[derive(Debug, Serialize)]
struct ProcessRequest<'a> {
    processor: &'a str,
    filename: &'a str,
    mime_type: String,
    content_base64: String,
}

/// Structured extraction over a JSON HTTP endpoint.
pub(crate) struct HttpExtractionService {
    client: Client,
    endpoint: String,
}

impl HttpExtractionService {
    pub(crate) fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl StructuredExtractionService for HttpExtractionService {
    fn is_available(&self) -> bool {
        !self.endpoint.is_empty()
    }

    async fn process(
        &self,
        document: &StoredDocument,
        processor_hint: &str,
    ) -> Result<StructuredResponse, ServiceError> {
        let request = ProcessRequest {
            processor: processor_hint,
            filename: document.filename(),
            mime_type: mime_guess::from_path(document.filename())
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
            content_base64: base64::engine::general_purpose::STANDARD
                .encode(&document.raw.content),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|err| ServiceError::Request(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Request(format!(
                "extraction service returned {status}: {body}"
            )));
        }

        response
            .json::<StructuredResponse>()
            .await
            .map_err(|err| ServiceError::InvalidResponse(err.to_string()))
    }
}

#[derive(Debug, Serialize)]
struct NarrativeRequest<'a> {
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct NarrativeReply {
    text: String,
}

/// Narrative generation over a JSON HTTP endpoint: `{"prompt"}` in, `{"text"}` out.
pub(crate) struct HttpNarrativeService {
    client: Client,
    endpoint: String,
}

impl HttpNarrativeService {
    pub(crate) fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl NarrativeService for HttpNarrativeService {
    fn is_available(&self) -> bool {
        !self.endpoint.is_empty()
    }

    async fn summarize(&self, prompt: &str) -> Result<String, ServiceError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&NarrativeRequest { prompt })
            .send()
            .await
            .map_err(|err| ServiceError::Request(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Request(format!("narrative service returned {status}")));
        }

        response
            .json::<NarrativeReply>()
            .await
            .map(|reply| reply.text)
            .map_err(|err| ServiceError::InvalidResponse(err.to_string()))
    }
}

fn http_client() -> Client {
    Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .unwrap_or_else(|err| {
            tracing::warn!(error = %err, "falling back to default HTTP client");
            Client::new()
        })
}

#[cfg(feature = "tesseract")]
fn text_reader(config: &IntakeConfig) -> TextReader {
    use loan_intake::workflows::intake::extraction::text::TesseractEngine;

    TextReader::new().with_ocr(Arc::new(TesseractEngine::new(config.tessdata_dir.clone())))
}

#[cfg(not(feature = "tesseract"))]
fn text_reader(_config: &IntakeConfig) -> TextReader {
    TextReader::new()
}

/// Wires the intake service from configuration: local uploads, in-memory
/// results, and whichever external services have an endpoint configured.
pub(crate) fn build_intake_service(
    config: &IntakeConfig,
    repository: Arc<InMemoryIntakeRepository>,
) -> AppIntakeService {
    let clock = Arc::new(SystemClock);
    let storage = Arc::new(LocalFileStorage::new(config.storage_dir.clone(), clock.clone()));

    let mut builder = IntakeService::builder(storage, repository)
        .config(config)
        .clock(clock)
        .text_reader(text_reader(config));

    if config.extraction_url.is_some() || config.narrative_url.is_some() {
        let client = http_client();
        if let Some(url) = &config.extraction_url {
            builder = builder.extraction_service(Arc::new(HttpExtractionService::new(
                client.clone(),
                url.clone(),
            )));
        }
        if let Some(url) = &config.narrative_url {
            builder = builder
                .narrative_service(Arc::new(HttpNarrativeService::new(client, url.clone())));
        }
    }

    builder.build()
}
