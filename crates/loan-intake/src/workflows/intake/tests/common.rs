use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use chrono::{TimeZone, Utc};
use lopdf::{dictionary, Document, Object, Stream};
use serde_json::Value;

use crate::workflows::intake::clock::FixedClock;
use crate::workflows::intake::domain::{
    ApplicantInfo, ApplicationId, BatchResult, DocumentProcessingResult, DocumentType,
    ExtractionMethod, ExtractionResult, FieldName, RawDocument, StorageHandle, StoredDocument,
    StructuredData,
};
use crate::workflows::intake::enrichment::NarrativeService;
use crate::workflows::intake::extraction::{
    ExtractionError, ExtractionStrategy, Extractor, OcrEngine, PageRenderer, ServiceError,
    StructuredExtractionService, StructuredResponse, VendorEntity,
};
use crate::workflows::intake::repository::{IntakeRepository, RepositoryError};
use crate::workflows::intake::storage::{content_hash, DocumentStorage, StorageError};
use crate::workflows::intake::IntakeService;

/// 2025-06-15 12:00:00 UTC.
pub(crate) fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0)
            .single()
            .expect("valid timestamp"),
    ))
}

pub(crate) fn stored(filename: &str, bytes: &[u8]) -> StoredDocument {
    stored_as(filename, bytes, DocumentType::Unknown, 1)
}

pub(crate) fn stored_as(
    filename: &str,
    bytes: &[u8],
    declared_type: DocumentType,
    submission_order: usize,
) -> StoredDocument {
    let mut raw = RawDocument::new(filename, bytes.to_vec()).with_declared_type(declared_type);
    raw.submission_order = submission_order;
    StoredDocument {
        handle: StorageHandle(format!("mem://{filename}")),
        content_hash: content_hash(bytes),
        raw,
    }
}

/// Minimal PDF with one Helvetica text line per page.
pub(crate) fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = format!(
            "BT /F1 12 Tf 72 720 Td ({}) Tj ET",
            text.replace('\\', "\\\\")
                .replace('(', "\\(")
                .replace(')', "\\)")
        );
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("pdf serializes");
    buffer
}

pub(crate) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(crate) struct StaticOcr {
    text: String,
}

impl StaticOcr {
    pub(crate) fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
        }
    }
}

impl OcrEngine for StaticOcr {
    fn recognize(&self, _image: &[u8]) -> Result<String, ExtractionError> {
        Ok(self.text.clone())
    }
}

pub(crate) struct StaticRenderer {
    pub(crate) pages: usize,
}

impl PageRenderer for StaticRenderer {
    fn render_pages(&self, _pdf: &[u8]) -> Result<Vec<Vec<u8>>, ExtractionError> {
        Ok(vec![b"page".to_vec(); self.pages])
    }
}

fn entity(entity_type: &str, text: &str, confidence: f32) -> VendorEntity {
    VendorEntity {
        entity_type: entity_type.to_string(),
        mention_text: text.to_string(),
        confidence,
    }
}

/// Structured extraction service replaying a fixed response.
pub(crate) struct ScriptedStructuredService {
    available: bool,
    response: Result<StructuredResponse, String>,
    calls: AtomicUsize,
}

impl ScriptedStructuredService {
    pub(crate) fn unavailable() -> Self {
        Self {
            available: false,
            response: Err("not configured".to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            available: true,
            response: Err("processor quota exceeded".to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_entities(text: &str, entities: Vec<VendorEntity>) -> Self {
        Self {
            available: true,
            response: Ok(StructuredResponse {
                text: text.to_string(),
                entities,
                confidence: 0.92,
            }),
            calls: AtomicUsize::new(0),
        }
    }

    /// A clean payslip dated 2025-06-01.
    pub(crate) fn payslip() -> Self {
        Self::with_entities(
            "ACME CORP PAYSLIP Gross Pay $5,000.00 Pay Date 2025-06-01",
            vec![
                entity("gross_salary", "$5,000.00", 0.95),
                entity("employer_name", "Acme Corp", 0.9),
                entity("pay_date", "2025-06-01", 0.88),
            ],
        )
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StructuredExtractionService for ScriptedStructuredService {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn process(
        &self,
        _document: &StoredDocument,
        _processor_hint: &str,
    ) -> Result<StructuredResponse, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response
            .clone()
            .map_err(ServiceError::Request)
    }
}

/// Narrative service answering every prompt with the same reply.
pub(crate) struct ScriptedNarrative {
    reply: String,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedNarrative {
    pub(crate) fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompt mutex poisoned").clone()
    }
}

#[async_trait]
impl NarrativeService for ScriptedNarrative {
    fn is_available(&self) -> bool {
        true
    }

    async fn summarize(&self, prompt: &str) -> Result<String, ServiceError> {
        self.prompts
            .lock()
            .expect("prompt mutex poisoned")
            .push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

/// Extraction strategy with per-file latency and an optional file that panics.
#[derive(Default)]
pub(crate) struct ScriptedStrategy {
    delays: HashMap<String, Duration>,
    panic_on: Option<String>,
    fields: Vec<(FieldName, String)>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedStrategy {
    pub(crate) fn delay(mut self, filename: &str, millis: u64) -> Self {
        self.delays
            .insert(filename.to_string(), Duration::from_millis(millis));
        self
    }

    pub(crate) fn panic_on(mut self, filename: &str) -> Self {
        self.panic_on = Some(filename.to_string());
        self
    }

    pub(crate) fn field(mut self, name: FieldName, value: &str) -> Self {
        self.fields.push((name, value.to_string()));
        self
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn into_extractor(self: Arc<Self>) -> Extractor {
        let strategy: Arc<dyn ExtractionStrategy> = self;
        Extractor::from_strategies(vec![strategy])
    }
}

#[async_trait]
impl ExtractionStrategy for ScriptedStrategy {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::Fallback
    }

    async fn extract(
        &self,
        document: &StoredDocument,
        _document_type: DocumentType,
    ) -> Result<ExtractionResult, ExtractionError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(document.filename()) {
            tokio::time::sleep(*delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panic_on.as_deref() == Some(document.filename()) {
            panic!("simulated crash while reading {}", document.filename());
        }

        let mut structured_data = StructuredData::default();
        for (name, value) in &self.fields {
            structured_data.insert(*name, value.clone(), None);
        }
        Ok(ExtractionResult {
            text_content: format!("contents of {}", document.filename()),
            structured_data,
            confidence: 0.7,
            method: Some(ExtractionMethod::Fallback),
            processor_hint: None,
            error: None,
        })
    }
}

/// In-memory storage that can be told to reject particular filenames.
#[derive(Default)]
pub(crate) struct MemoryStorage {
    files: Mutex<HashMap<StorageHandle, Vec<u8>>>,
    reject: Vec<String>,
}

impl MemoryStorage {
    pub(crate) fn rejecting(filename: &str) -> Self {
        Self {
            reject: vec![filename.to_string()],
            ..Self::default()
        }
    }

    pub(crate) fn stored_count(&self) -> usize {
        self.files.lock().expect("storage mutex poisoned").len()
    }
}

#[async_trait]
impl DocumentStorage for MemoryStorage {
    async fn store(
        &self,
        content: &[u8],
        application_id: &ApplicationId,
        filename: &str,
    ) -> Result<StorageHandle, StorageError> {
        if self.reject.iter().any(|rejected| rejected == filename) {
            return Err(StorageError::Rejected(filename.to_string()));
        }
        let handle = StorageHandle(format!("mem://{application_id}/{filename}"));
        self.files
            .lock()
            .expect("storage mutex poisoned")
            .insert(handle.clone(), content.to_vec());
        Ok(handle)
    }

    async fn hash(&self, handle: &StorageHandle) -> Result<String, StorageError> {
        let files = self.files.lock().expect("storage mutex poisoned");
        files
            .get(handle)
            .map(|bytes| content_hash(bytes))
            .ok_or_else(|| StorageError::UnknownHandle(handle.0.clone()))
    }
}

#[derive(Default)]
pub(crate) struct MemoryRepository {
    pub(crate) documents: Mutex<HashMap<ApplicationId, Vec<DocumentProcessingResult>>>,
    pub(crate) batches: Mutex<HashMap<ApplicationId, BatchResult>>,
    pub(crate) applicants: Mutex<HashMap<ApplicationId, ApplicantInfo>>,
}

impl IntakeRepository for MemoryRepository {
    fn save_document_result(
        &self,
        application_id: &ApplicationId,
        result: &DocumentProcessingResult,
        applicant: &ApplicantInfo,
    ) -> Result<(), RepositoryError> {
        let mut documents = self.documents.lock().expect("repository mutex poisoned");
        let entries = documents.entry(application_id.clone()).or_default();
        entries.retain(|existing| existing.submission_order != result.submission_order);
        entries.push(result.clone());
        entries.sort_by_key(|entry| entry.submission_order);
        drop(documents);
        self.applicants
            .lock()
            .expect("repository mutex poisoned")
            .insert(application_id.clone(), applicant.clone());
        Ok(())
    }

    fn save_batch_result(&self, batch: &BatchResult) -> Result<(), RepositoryError> {
        self.batches
            .lock()
            .expect("repository mutex poisoned")
            .insert(batch.application_id.clone(), batch.clone());
        Ok(())
    }

    fn load_documents(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<DocumentProcessingResult>, RepositoryError> {
        let guard = self.documents.lock().expect("repository mutex poisoned");
        Ok(guard.get(application_id).cloned().unwrap_or_default())
    }

    fn load_batch(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Option<BatchResult>, RepositoryError> {
        let guard = self.batches.lock().expect("repository mutex poisoned");
        Ok(guard.get(application_id).cloned())
    }
}

pub(crate) struct UnavailableRepository;

impl IntakeRepository for UnavailableRepository {
    fn save_document_result(
        &self,
        _application_id: &ApplicationId,
        _result: &DocumentProcessingResult,
        _applicant: &ApplicantInfo,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn save_batch_result(&self, _batch: &BatchResult) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn load_documents(
        &self,
        _application_id: &ApplicationId,
    ) -> Result<Vec<DocumentProcessingResult>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn load_batch(
        &self,
        _application_id: &ApplicationId,
    ) -> Result<Option<BatchResult>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(crate) type MemoryService = IntakeService<MemoryStorage, MemoryRepository>;

/// Service over in-memory collaborators, a fixed clock, and the given strategy.
pub(crate) fn build_service(
    strategy: Arc<ScriptedStrategy>,
) -> (MemoryService, Arc<MemoryRepository>, Arc<FixedClock>) {
    let repository = Arc::new(MemoryRepository::default());
    let clock = fixed_clock();
    let service = IntakeService::builder(Arc::new(MemoryStorage::default()), repository.clone())
        .clock(clock.clone())
        .extractor(strategy.into_extractor())
        .build();
    (service, repository, clock)
}

pub(crate) fn raw(filename: &str) -> RawDocument {
    RawDocument::new(filename, format!("bytes of {filename}").into_bytes())
}
