use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{ApplicantInfo, ApplicationId, DocumentType, ProcessingOptions, RawDocument};
use super::orchestrator::{BatchRequest, IntakeService, IntakeServiceError};
use super::repository::IntakeRepository;
use super::storage::DocumentStorage;

/// JSON body of a batch submission. Document bytes travel base64 encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSubmission {
    #[serde(default)]
    pub application_id: Option<String>,
    pub documents: Vec<UploadedDocument>,
    #[serde(default)]
    pub applicant_info: ApplicantInfo,
    #[serde(default)]
    pub options: ProcessingOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedDocument {
    pub filename: String,
    pub content_base64: String,
    #[serde(default)]
    pub document_type: Option<DocumentType>,
}

impl BatchSubmission {
    fn into_request(self) -> Result<BatchRequest, String> {
        let mut documents = Vec::with_capacity(self.documents.len());
        let mut declared_types = std::collections::HashMap::new();

        for upload in self.documents {
            let content = base64::engine::general_purpose::STANDARD
                .decode(upload.content_base64.trim())
                .map_err(|err| format!("{}: invalid base64 content ({err})", upload.filename))?;
            if let Some(declared) = upload.document_type {
                declared_types.insert(upload.filename.clone(), declared);
            }
            documents.push(RawDocument::new(upload.filename, content));
        }

        Ok(BatchRequest {
            application_id: self.application_id.map(ApplicationId),
            documents,
            declared_types,
            applicant_info: self.applicant_info,
            options: self.options,
        })
    }
}

/// Router builder exposing batch intake and the read-side queries.
pub fn intake_router<S, R>(service: Arc<IntakeService<S, R>>) -> Router
where
    S: DocumentStorage + 'static,
    R: IntakeRepository + 'static,
{
    Router::new()
        .route("/api/v1/applications/batch", post(batch_handler::<S, R>))
        .route(
            "/api/v1/applications/:application_id/status",
            get(status_handler::<S, R>),
        )
        .route(
            "/api/v1/applications/:application_id/documents",
            get(documents_handler::<S, R>),
        )
        .route(
            "/api/v1/applications/:application_id/batch",
            get(batch_result_handler::<S, R>),
        )
        .with_state(service)
}

pub(crate) async fn batch_handler<S, R>(
    State(service): State<Arc<IntakeService<S, R>>>,
    axum::Json(submission): axum::Json<BatchSubmission>,
) -> Response
where
    S: DocumentStorage + 'static,
    R: IntakeRepository + 'static,
{
    if submission.documents.is_empty() {
        let payload = json!({
            "error": "at least one document is required",
        });
        return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
    }

    let request = match submission.into_request() {
        Ok(request) => request,
        Err(message) => {
            let payload = json!({
                "error": message,
            });
            return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
        }
    };

    let batch = service.process_batch(request).await;
    (StatusCode::OK, axum::Json(batch)).into_response()
}

pub(crate) async fn status_handler<S, R>(
    State(service): State<Arc<IntakeService<S, R>>>,
    Path(application_id): Path<String>,
) -> Response
where
    S: DocumentStorage + 'static,
    R: IntakeRepository + 'static,
{
    let id = ApplicationId(application_id);
    match service.processing_status(&id) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn documents_handler<S, R>(
    State(service): State<Arc<IntakeService<S, R>>>,
    Path(application_id): Path<String>,
) -> Response
where
    S: DocumentStorage + 'static,
    R: IntakeRepository + 'static,
{
    let id = ApplicationId(application_id);
    match service.documents(&id) {
        Ok(documents) => {
            let payload = json!({
                "application_id": id.0,
                "documents": documents,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn batch_result_handler<S, R>(
    State(service): State<Arc<IntakeService<S, R>>>,
    Path(application_id): Path<String>,
) -> Response
where
    S: DocumentStorage + 'static,
    R: IntakeRepository + 'static,
{
    let id = ApplicationId(application_id);
    match service.batch(&id) {
        Ok(batch) => (StatusCode::OK, axum::Json(batch)).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: IntakeServiceError) -> Response {
    let status = match &err {
        IntakeServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        IntakeServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({
        "error": err.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
