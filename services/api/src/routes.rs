use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use loan_intake::workflows::intake::{
    intake_router, registry, DocumentStorage, IntakeRepository, IntakeService,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub(crate) struct DocumentTypeEntry {
    pub(crate) document_type: &'static str,
    pub(crate) display_name: &'static str,
    pub(crate) category: &'static str,
    pub(crate) required: bool,
    pub(crate) max_age_days: Option<u32>,
    pub(crate) accepted_formats: &'static [&'static str],
}

pub(crate) fn with_intake_routes<S, R>(service: Arc<IntakeService<S, R>>) -> axum::Router
where
    S: DocumentStorage + 'static,
    R: IntakeRepository + 'static,
{
    intake_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/document-types",
            axum::routing::get(document_types_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Registry of accepted document types, in processing priority order.
pub(crate) async fn document_types_endpoint() -> Json<Vec<DocumentTypeEntry>> {
    let mut profiles: Vec<_> = registry::all_profiles().iter().collect();
    profiles.sort_by_key(|profile| std::cmp::Reverse(profile.priority));

    Json(
        profiles
            .into_iter()
            .map(|profile| DocumentTypeEntry {
                document_type: profile.document_type.label(),
                display_name: profile.display_name,
                category: profile.category.display_name(),
                required: profile.required,
                max_age_days: profile.max_age_days,
                accepted_formats: profile.accepted_formats,
            })
            .collect(),
    )
}
