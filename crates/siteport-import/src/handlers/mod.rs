//! HTTP handlers for import sessions

pub mod types;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use futures::TryStreamExt;
use siteport_core::problemdetails::{self, Problem};
use siteport_import_types::ImportOutcome;
use std::sync::Arc;
use tokio_util::io::StreamReader;
use tracing::debug;
use utoipa::OpenApi;

use crate::services::{ImportServiceError, SessionInfo, UploadReceipt};
use types::{
    AppState, DestinationsResponse, RunImportRequest, RunImportResponse, UploadEnabledResponse,
};

const UPLOAD_FIELD: &str = "file";
const DEFAULT_UPLOAD_CONTENT_TYPE: &str = "application/octet-stream";
/// Room for multipart boundaries and headers on top of the file itself
const MULTIPART_OVERHEAD_BYTES: u64 = 64 * 1024;

/// Configure routes for the import API
pub fn configure_routes(max_upload_bytes: u64) -> Router<Arc<AppState>> {
    let body_limit =
        usize::try_from(max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES)).unwrap_or(usize::MAX);

    Router::new()
        .route("/imports/sessions", post(open_session))
        .route("/imports/sessions/{session_id}", delete(dispose_session))
        .route("/imports/sessions/{session_id}/enabled", get(upload_enabled))
        .route(
            "/imports/sessions/{session_id}/destinations",
            get(list_destinations),
        )
        .route(
            "/imports/sessions/{session_id}/upload",
            post(upload_bundle).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/imports/sessions/{session_id}/run", post(run_import))
}

/// Open a new import session
#[utoipa::path(
    post,
    path = "/imports/sessions",
    tag = "Imports",
    responses(
        (status = 201, description = "Session opened", body = SessionInfo),
    )
)]
async fn open_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let session = state.import_orchestrator.open_session().await;
    (StatusCode::CREATED, Json(session))
}

/// Whether any destination can receive an import
#[utoipa::path(
    get,
    path = "/imports/sessions/{session_id}/enabled",
    tag = "Imports",
    params(("session_id" = String, Path, description = "Import session ID")),
    responses(
        (status = 200, description = "Upload availability", body = UploadEnabledResponse),
        (status = 404, description = "Session not found", body = problemdetails::ProblemDetails),
    )
)]
async fn upload_enabled(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, Problem> {
    let upload_enabled = state
        .import_orchestrator
        .is_upload_enabled(&session_id)
        .await?;
    Ok(Json(UploadEnabledResponse { upload_enabled }))
}

/// List destinations eligible for import
#[utoipa::path(
    get,
    path = "/imports/sessions/{session_id}/destinations",
    tag = "Imports",
    params(("session_id" = String, Path, description = "Import session ID")),
    responses(
        (status = 200, description = "Eligible destinations", body = DestinationsResponse),
        (status = 404, description = "Session not found", body = problemdetails::ProblemDetails),
    )
)]
async fn list_destinations(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, Problem> {
    let destinations = state
        .import_orchestrator
        .list_eligible_destinations(&session_id)
        .await?;
    Ok(Json(DestinationsResponse { destinations }))
}

/// Upload a site bundle into the session
#[utoipa::path(
    post,
    path = "/imports/sessions/{session_id}/upload",
    tag = "Imports",
    params(("session_id" = String, Path, description = "Import session ID")),
    request_body(content_type = "multipart/form-data", description = "Bundle in the `file` field"),
    responses(
        (status = 200, description = "Upload captured", body = UploadReceipt),
        (status = 400, description = "Upload incomplete or missing", body = problemdetails::ProblemDetails),
        (status = 404, description = "Session not found", body = problemdetails::ProblemDetails),
        (status = 413, description = "Upload too large", body = problemdetails::ProblemDetails),
    )
)]
async fn upload_bundle(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, Problem> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        problemdetails::new(StatusCode::BAD_REQUEST)
            .with_title("Invalid Multipart Body")
            .with_detail(e.body_text())
    })? {
        if field.name() != Some(UPLOAD_FIELD) {
            debug!("Ignoring multipart field {:?}", field.name());
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field
            .content_type()
            .unwrap_or(DEFAULT_UPLOAD_CONTENT_TYPE)
            .to_string();

        let reader = StreamReader::new(field.map_err(std::io::Error::other));
        tokio::pin!(reader);

        let receipt = state
            .import_orchestrator
            .capture_upload(&session_id, &filename, &content_type, reader, None)
            .await?;
        return Ok(Json(receipt));
    }

    Err(ImportServiceError::Validation(format!(
        "Multipart field '{}' is required",
        UPLOAD_FIELD
    ))
    .into())
}

/// Run the import for the session's pending upload
#[utoipa::path(
    post,
    path = "/imports/sessions/{session_id}/run",
    tag = "Imports",
    params(("session_id" = String, Path, description = "Import session ID")),
    request_body = RunImportRequest,
    responses(
        (status = 200, description = "Import job accepted", body = RunImportResponse),
        (status = 404, description = "Session not found", body = problemdetails::ProblemDetails),
        (status = 422, description = "Import rejected", body = RunImportResponse),
        (status = 500, description = "Import failed", body = RunImportResponse),
    )
)]
async fn run_import(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(request): Json<RunImportRequest>,
) -> Result<impl IntoResponse, Problem> {
    let selection = request.destination_id.map(|d| d.as_text());
    let outcome = state
        .import_orchestrator
        .run_import(&session_id, selection.as_deref())
        .await?;

    let status = match outcome {
        ImportOutcome::Succeeded { .. } => StatusCode::OK,
        ImportOutcome::Rejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ImportOutcome::Failed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    Ok((status, Json(RunImportResponse::from(outcome))))
}

/// Dispose of a session and its pending upload
#[utoipa::path(
    delete,
    path = "/imports/sessions/{session_id}",
    tag = "Imports",
    params(("session_id" = String, Path, description = "Import session ID")),
    responses(
        (status = 204, description = "Session disposed"),
    )
)]
async fn dispose_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> StatusCode {
    state.import_orchestrator.dispose(&session_id).await;
    StatusCode::NO_CONTENT
}

#[derive(OpenApi)]
#[openapi(
    paths(
        open_session,
        upload_enabled,
        list_destinations,
        upload_bundle,
        run_import,
        dispose_session,
    ),
    components(schemas(
        SessionInfo,
        UploadReceipt,
        types::UploadEnabledResponse,
        types::DestinationsResponse,
        types::DestinationSelection,
        types::RunImportRequest,
        types::RunImportResponse,
        siteport_import_types::Destination,
        siteport_import_types::ImportOutcome,
        siteport_import_types::RejectionReason,
        siteport_import_types::FailureReason,
        problemdetails::ProblemDetails,
    )),
    tags(
        (name = "Imports", description = "Upload site bundles and import them into draft sites")
    )
)]
pub struct ImportApiDoc;
