//! End-to-end batch intake through the public service facade: real local file
//! storage, the local text extraction fallback, and an in-memory repository.

mod common {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use chrono::{TimeZone, Utc};
    use lopdf::{dictionary, Document, Object, Stream};

    use loan_intake::workflows::intake::{
        ApplicantInfo, ApplicationId, BatchResult, DocumentProcessingResult, ExtractionError,
        FixedClock, IntakeRepository, OcrEngine, RepositoryError,
    };

    pub(super) fn clock() -> Arc<FixedClock> {
        Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2025, 6, 15, 9, 0, 0)
                .single()
                .expect("valid timestamp"),
        ))
    }

    pub(super) fn single_page_pdf(text: &str) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::from(page_id)],
                "Count" => 1,
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

    pub(super) struct CannedOcr(pub(super) &'static str);

    impl OcrEngine for CannedOcr {
        fn recognize(&self, _image: &[u8]) -> Result<String, ExtractionError> {
            Ok(self.0.to_string())
        }
    }

    #[derive(Default)]
    pub(super) struct MemoryRepository {
        documents: Mutex<HashMap<ApplicationId, Vec<DocumentProcessingResult>>>,
        batches: Mutex<HashMap<ApplicationId, BatchResult>>,
    }

    impl IntakeRepository for MemoryRepository {
        fn save_document_result(
            &self,
            application_id: &ApplicationId,
            result: &DocumentProcessingResult,
            _applicant: &ApplicantInfo,
        ) -> Result<(), RepositoryError> {
            let mut documents = self.documents.lock().expect("repository mutex poisoned");
            let entries = documents.entry(application_id.clone()).or_default();
            entries.retain(|existing| existing.submission_order != result.submission_order);
            entries.push(result.clone());
            entries.sort_by_key(|entry| entry.submission_order);
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
}

use std::path::PathBuf;
use std::sync::Arc;

use common::*;
use loan_intake::workflows::intake::storage::content_hash;
use loan_intake::workflows::intake::{
    ApplicationId, BatchRequest, BatchStatus, DocumentType, ExtractionMethod, FieldName,
    IntakeService, LocalFileStorage, ProcessingOptions, ProcessingStatus, RawDocument, TextReader,
};

#[tokio::test]
async fn batch_stores_extracts_and_validates_documents() {
    let uploads = tempfile::tempdir().expect("tempdir");
    let clock = clock();
    let storage = Arc::new(LocalFileStorage::new(uploads.path(), clock.clone()));
    let repository = Arc::new(MemoryRepository::default());
    let reader = TextReader::new().with_ocr(Arc::new(CannedOcr(
        "DRIVER LICENSE Name Jane Doe License 0123456789 Expires 01/31/2030",
    )));
    let service = IntakeService::builder(storage, repository)
        .clock(clock)
        .worker_limit(2)
        .text_reader(reader)
        .build();

    let statement = single_page_pdf("Account number 123456789 Statement date 06/01/2025 Balance $1,200.00");
    let request = BatchRequest {
        application_id: Some(ApplicationId("APP-E2E".to_string())),
        documents: vec![
            RawDocument::new("bank_statement.pdf", statement.clone()),
            RawDocument::new("license.png", b"\x89PNG fake".to_vec()),
            RawDocument::new("cover_letter.docx", b"docx".to_vec()),
        ],
        options: ProcessingOptions {
            generate_summary: false,
            fraud_detection: false,
            ..ProcessingOptions::default()
        },
        ..BatchRequest::default()
    };

    let batch = service.process_batch(request).await;

    assert_eq!(batch.status, BatchStatus::Completed);
    assert_eq!(batch.total_documents, 3);
    assert_eq!(batch.successful_documents, 3);

    let bank = &batch.document_results[0];
    assert_eq!(bank.document_type, DocumentType::BankStatement);
    assert_eq!(bank.content_hash, content_hash(&statement));
    let stored_path = PathBuf::from(&bank.storage_handle.0);
    assert!(stored_path.starts_with(uploads.path().join("APP-E2E")));
    assert_eq!(
        std::fs::read(&stored_path).expect("stored file readable"),
        statement
    );

    let extraction = bank.extraction.as_ref().expect("extracted");
    assert_eq!(extraction.method, Some(ExtractionMethod::Fallback));
    assert_eq!(
        extraction.structured_data.text(FieldName::AccountNumber),
        Some("123456789")
    );
    assert!(bank.validation.is_some());

    let license = &batch.document_results[1];
    assert_eq!(license.document_type, DocumentType::IdProof);
    assert!(license
        .extraction
        .as_ref()
        .is_some_and(|extraction| extraction.text_content.contains("Jane Doe")));

    let letter = &batch.document_results[2];
    assert_eq!(letter.status, ProcessingStatus::Completed);
    assert!(letter.errors[0].starts_with("Extraction error: Unsupported file format"));

    let completeness = &batch.application_completeness;
    assert!(!completeness.is_complete);
    assert_eq!(completeness.completeness_score, 0.5);
}

#[tokio::test]
async fn status_is_queryable_after_the_batch() {
    let uploads = tempfile::tempdir().expect("tempdir");
    let clock = clock();
    let service = IntakeService::builder(
        Arc::new(LocalFileStorage::new(uploads.path(), clock.clone())),
        Arc::new(MemoryRepository::default()),
    )
    .clock(clock.clone())
    .build();

    let batch = service
        .process_batch(BatchRequest {
            documents: vec![RawDocument::new(
                "payslip.pdf",
                single_page_pdf("Gross Pay $4,200.00 Pay Date 06/01/2025"),
            )],
            ..BatchRequest::default()
        })
        .await;

    assert!(batch.application_id.as_str().starts_with("APP-0615-"));

    clock.advance(chrono::Duration::hours(1));
    let view = service
        .processing_status(&batch.application_id)
        .expect("persisted status");
    assert_eq!(view.total_documents, 1);
    assert_eq!(view.completed_documents, 1);
}
