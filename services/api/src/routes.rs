use crate::infra::{AppState, IntakeContext};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use bid_intake::error::AppError;
use bid_intake::workflows::fields::{CustomMappingStore, MappingStoreError};
use bid_intake::workflows::qa::{qa_router, QaBatch, QaServiceError};
use bid_intake::workflows::report::ImportReport;
use bid_intake::workflows::taxonomy::IntentTarget;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::Cursor;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub(crate) struct ImportRequest {
    pub(crate) csv: String,
    /// Re-import into an existing QA batch instead of opening a new one.
    #[serde(default)]
    pub(crate) batch_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ImportResponse {
    pub(crate) batch_id: String,
    pub(crate) report: ImportReport,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) dropped_decisions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConfirmMappingRequest {
    pub(crate) raw_key: String,
    pub(crate) target: IntentTarget,
}

pub(crate) fn with_intake_routes(context: Arc<IntakeContext>) -> Router {
    let intake = Router::new()
        .route("/api/v1/imports/fields", post(import_fields_endpoint))
        .route(
            "/api/v1/imports/classifications",
            post(import_classifications_endpoint),
        )
        .route(
            "/api/v1/mappings",
            get(list_mappings_endpoint).post(confirm_mapping_endpoint),
        )
        .with_state(context.clone());

    qa_router(context.qa.clone())
        .merge(intake)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
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

pub(crate) async fn import_fields_endpoint(
    State(context): State<Arc<IntakeContext>>,
    Json(payload): Json<ImportRequest>,
) -> Response {
    let snapshot = match context.mappings.snapshot() {
        Ok(snapshot) => snapshot,
        Err(err) => return store_error(err),
    };
    let reader = Cursor::new(payload.csv.into_bytes());
    match context.fields.from_reader(reader, &snapshot) {
        Ok(report) => record_batch(&context, payload.batch_id, report),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub(crate) async fn import_classifications_endpoint(
    State(context): State<Arc<IntakeContext>>,
    Json(payload): Json<ImportRequest>,
) -> Response {
    let reader = Cursor::new(payload.csv.into_bytes());
    match context.classifications.from_reader(reader) {
        Ok(report) => record_batch(&context, payload.batch_id, report),
        Err(err) => AppError::from(err).into_response(),
    }
}

fn record_batch(
    context: &IntakeContext,
    batch_id: Option<String>,
    report: ImportReport,
) -> Response {
    let outcome = match batch_id {
        Some(batch_id) => context
            .qa
            .reimport(&batch_id, report)
            .map(|(batch, dropped)| (StatusCode::OK, batch, dropped)),
        None => context
            .qa
            .open_batch(report)
            .map(|batch| (StatusCode::CREATED, batch, Vec::new())),
    };

    match outcome {
        Ok((status, QaBatch { batch_id, report, .. }, dropped_decisions)) => {
            let body = ImportResponse {
                batch_id,
                report,
                dropped_decisions,
            };
            (status, Json(body)).into_response()
        }
        Err(err) => qa_error(err),
    }
}

pub(crate) async fn list_mappings_endpoint(State(context): State<Arc<IntakeContext>>) -> Response {
    match context.mappings.list() {
        Ok(table) => (StatusCode::OK, Json(table)).into_response(),
        Err(err) => store_error(err),
    }
}

pub(crate) async fn confirm_mapping_endpoint(
    State(context): State<Arc<IntakeContext>>,
    Json(payload): Json<ConfirmMappingRequest>,
) -> Response {
    let ConfirmMappingRequest { raw_key, target } = payload;
    if target.is_existing_line() && !target.is_known() {
        let body = json!({ "error": format!("{target} is not a line of the bid form") });
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response();
    }

    match context.mappings.confirm(&raw_key, target.clone(), Utc::now()) {
        Ok(normalized_key) => {
            tracing::info!(%normalized_key, %target, "confirmed custom mapping");
            let body = json!({ "normalized_key": normalized_key, "target": target });
            (StatusCode::CREATED, Json(body)).into_response()
        }
        Err(err) => store_error(err),
    }
}

fn store_error(err: MappingStoreError) -> Response {
    let status = match err {
        MappingStoreError::EmptyKey(_) => StatusCode::UNPROCESSABLE_ENTITY,
        MappingStoreError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

fn qa_error(err: QaServiceError) -> Response {
    use bid_intake::workflows::qa::RepositoryError;

    let status = match err {
        QaServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}
