//! Route handlers. Each one validates/shapes its request, delegates to
//! `BatchScheduler`/`export`, and maps `CoreError` onto an HTTP status via
//! its `ErrorKind` — the same error-kind-to-status mapping idiom the
//! teacher uses in `server/handlers/helpers.rs`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::audit::{AuditEvent, AuditEventType, AuditStatus};
use crate::error::{CoreError, ErrorKind};
use crate::export::{export_batch, export_single, ExportFormat};
use crate::models::{Batch, DocumentType};
use crate::scheduler::SubmissionFile;

use super::AppState;

fn record_audit(state: &AppState, action: &str, actor: &str, status: AuditStatus, details: serde_json::Value) {
    let audit = state.audit.clone();
    let event = AuditEvent::new(AuditEventType::DataAccess, actor, action, status, "-", details);
    tokio::spawn(async move {
        if let Err(err) = audit.record(event).await {
            tracing::warn!(error = %err, "failed to record audit event");
        }
    });
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::UpstreamTransient | ErrorKind::UpstreamPermanent => StatusCode::BAD_GATEWAY,
        ErrorKind::ExtractorParse | ErrorKind::Resource => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Cancelled => StatusCode::CONFLICT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: CoreError) -> Response {
    let status = status_for(err.kind);
    (status, Json(serde_json::json!({ "error": err.user_message(), "kind": err.kind.as_str() }))).into_response()
}

#[derive(Deserialize)]
pub struct SubmitFileInput {
    pub filename: String,
    pub declared_type: String,
    pub bytes_base64: String,
}

#[derive(Deserialize)]
pub struct SubmitBatchInput {
    pub owner: String,
    pub files: Vec<SubmitFileInput>,
}

pub async fn submit_batch(State(state): State<AppState>, Json(input): Json<SubmitBatchInput>) -> Response {
    let mut files = Vec::with_capacity(input.files.len());
    for file in input.files {
        let Some(declared_type) = DocumentType::from_str(&file.declared_type) else {
            return error_response(CoreError::validation(format!("unknown document type {}", file.declared_type)));
        };
        let bytes = match base64::Engine::decode(&base64::engine::general_purpose::STANDARD, &file.bytes_base64) {
            Ok(bytes) => bytes,
            Err(e) => return error_response(CoreError::validation(format!("invalid base64 payload: {e}"))),
        };
        files.push(SubmissionFile {
            filename: file.filename,
            declared_type,
            bytes,
        });
    }

    match state.scheduler.submit(&input.owner, files).await {
        Ok(batch) => {
            record_audit(
                &state,
                "submit_batch",
                &input.owner,
                AuditStatus::Success,
                serde_json::json!({ "batch_id": batch.id }),
            );
            Json(batch).into_response()
        }
        Err(e) => error_response(e),
    }
}

pub async fn get_batch(State(state): State<AppState>, Path(batch_id): Path<String>) -> Response {
    match state.scheduler.status(&batch_id).await {
        Ok(Some(batch)) => Json(batch).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "batch not found" }))).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
pub struct ListBatchesQuery {
    pub owner: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

#[derive(Serialize)]
pub struct ListBatchesResponse {
    pub batches: Vec<Batch>,
}

pub async fn list_batches(State(state): State<AppState>, Query(query): Query<ListBatchesQuery>) -> Response {
    match state.scheduler.list_batches(&query.owner, query.limit, query.offset).await {
        Ok(batches) => Json(ListBatchesResponse { batches }).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn get_results(State(state): State<AppState>, Path(batch_id): Path<String>) -> Response {
    match state.scheduler.results(&batch_id).await {
        Ok(results) => Json(results).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn cancel_batch(State(state): State<AppState>, Path(batch_id): Path<String>) -> Response {
    match state.scheduler.cancel(&batch_id).await {
        Ok(()) => {
            record_audit(&state, "cancel_batch", &batch_id, AuditStatus::Success, serde_json::json!({}));
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: ExportFormatParam,
}

#[derive(Deserialize, Default, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormatParam {
    #[default]
    Xlsx,
    Html,
}

impl From<ExportFormatParam> for ExportFormat {
    fn from(param: ExportFormatParam) -> Self {
        match param {
            ExportFormatParam::Xlsx => ExportFormat::Xlsx,
            ExportFormatParam::Html => ExportFormat::Html,
        }
    }
}

pub async fn export_batch_handler(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Response {
    let results = match state.scheduler.results(&batch_id).await {
        Ok(results) => results,
        Err(e) => return error_response(e),
    };
    match export_batch(&results, query.format.into()) {
        Ok(bytes) => {
            record_audit(&state, "export_batch", &batch_id, AuditStatus::Success, serde_json::json!({}));
            content_response(query.format.into(), bytes)
        }
        Err(e) => error_response(CoreError::from(e)),
    }
}

pub async fn export_single_handler(
    State(state): State<AppState>,
    Path((batch_id, document_file_id)): Path<(String, String)>,
    Query(query): Query<ExportQuery>,
) -> Response {
    let results = match state.scheduler.results(&batch_id).await {
        Ok(results) => results,
        Err(e) => return error_response(e),
    };
    let Some(result) = results.into_iter().find(|r| r.document_file_id == document_file_id) else {
        return (StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "result not found" }))).into_response();
    };
    match export_single(&result, query.format.into()) {
        Ok(bytes) => content_response(query.format.into(), bytes),
        Err(e) => error_response(CoreError::from(e)),
    }
}

pub async fn update_result(
    State(state): State<AppState>,
    Path(result_id): Path<String>,
    Json(patch): Json<serde_json::Value>,
) -> Response {
    match state.scheduler.update_result(&result_id, patch).await {
        Ok(result) => {
            record_audit(
                &state,
                "update_result",
                &result_id,
                AuditStatus::Success,
                serde_json::json!({ "result_id": result.id }),
            );
            Json(result).into_response()
        }
        Err(e) => error_response(e),
    }
}

fn content_response(format: ExportFormat, bytes: Vec<u8>) -> Response {
    let content_type = match format {
        ExportFormat::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ExportFormat::Html => "text/html; charset=utf-8",
    };
    ([(axum::http::header::CONTENT_TYPE, content_type)], bytes).into_response()
}
