use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{QaAction, QaError, ResolveRequest};
use super::repository::{QaRepository, RepositoryError};
use super::service::{QaReviewService, QaServiceError};

#[derive(Debug, Deserialize)]
pub(crate) struct BatchResolveRequest {
    pub(crate) item_keys: Vec<String>,
    pub(crate) action: QaAction,
}

/// HTTP endpoints for reviewing one import batch.
pub fn qa_router<R>(service: Arc<QaReviewService<R>>) -> Router
where
    R: QaRepository + 'static,
{
    Router::new()
        .route("/api/v1/qa/batches/:batch_id", get(batch_handler::<R>))
        .route(
            "/api/v1/qa/batches/:batch_id/acknowledge",
            post(acknowledge_handler::<R>),
        )
        .route(
            "/api/v1/qa/batches/:batch_id/items/:item_key",
            post(resolve_handler::<R>).delete(undo_handler::<R>),
        )
        .route(
            "/api/v1/qa/batches/:batch_id/batch-resolve",
            post(batch_resolve_handler::<R>),
        )
        .route("/api/v1/qa/batches/:batch_id/gate", get(gate_handler::<R>))
        .with_state(service)
}

pub(crate) async fn batch_handler<R>(
    State(service): State<Arc<QaReviewService<R>>>,
    Path(batch_id): Path<String>,
) -> Response
where
    R: QaRepository + 'static,
{
    match service.get(&batch_id) {
        Ok(batch) => (StatusCode::OK, axum::Json(batch.view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn acknowledge_handler<R>(
    State(service): State<Arc<QaReviewService<R>>>,
    Path(batch_id): Path<String>,
) -> Response
where
    R: QaRepository + 'static,
{
    match service.acknowledge(&batch_id) {
        Ok(batch) => (StatusCode::OK, axum::Json(batch.view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn resolve_handler<R>(
    State(service): State<Arc<QaReviewService<R>>>,
    Path((batch_id, item_key)): Path<(String, String)>,
    axum::Json(request): axum::Json<ResolveRequest>,
) -> Response
where
    R: QaRepository + 'static,
{
    match service.resolve(&batch_id, &item_key, request) {
        Ok(decision) => {
            let payload = json!({
                "item_key": item_key,
                "decision": decision,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn undo_handler<R>(
    State(service): State<Arc<QaReviewService<R>>>,
    Path((batch_id, item_key)): Path<(String, String)>,
) -> Response
where
    R: QaRepository + 'static,
{
    match service.undo(&batch_id, &item_key) {
        Ok(removed) => {
            let payload = json!({
                "item_key": item_key,
                "removed": removed,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn batch_resolve_handler<R>(
    State(service): State<Arc<QaReviewService<R>>>,
    Path(batch_id): Path<String>,
    axum::Json(request): axum::Json<BatchResolveRequest>,
) -> Response
where
    R: QaRepository + 'static,
{
    match service.batch_resolve(&batch_id, &request.item_keys, request.action) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn gate_handler<R>(
    State(service): State<Arc<QaReviewService<R>>>,
    Path(batch_id): Path<String>,
) -> Response
where
    R: QaRepository + 'static,
{
    match service.gate(&batch_id) {
        Ok(gate) => (StatusCode::OK, axum::Json(gate)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: QaServiceError) -> Response {
    let status = match &error {
        QaServiceError::Repository(RepositoryError::NotFound)
        | QaServiceError::Qa(QaError::UnknownItem(_))
        | QaServiceError::Qa(QaError::NotResolved(_)) => StatusCode::NOT_FOUND,
        QaServiceError::Qa(_) => StatusCode::UNPROCESSABLE_ENTITY,
        QaServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        QaServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
