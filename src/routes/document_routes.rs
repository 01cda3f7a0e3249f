// src/routes/document_routes.rs

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth_context::DentistContext,
    models::{ApiOk, AppState},
    services::documents::{self, DocumentView, SyncResult},
};

const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/documents", get(list_documents))
        .route(
            "/documents/{document_id}/upload",
            post(upload_document).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/documents/sync_all", post(sync_all))
}

#[derive(Debug, Deserialize)]
pub struct DocumentQuery {
    pub patient_id: Option<Uuid>,
}

pub async fn list_documents(
    State(state): State<AppState>,
    ctx: DentistContext,
    Query(q): Query<DocumentQuery>,
) -> Result<Json<ApiOk<Vec<DocumentView>>>, ApiError> {
    let docs = documents::list(state.store.as_ref(), ctx.dentist_id(), q.patient_id).await?;
    Ok(Json(ApiOk { data: docs }))
}

/// Body is the raw file; Content-Type is forwarded as the mime type.
pub async fn upload_document(
    State(state): State<AppState>,
    ctx: DentistContext,
    Path(document_id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ApiOk<DocumentView>>, ApiError> {
    let mime_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());
    let view = documents::upload(
        state.store.as_ref(),
        state.cloud.as_deref(),
        ctx.dentist_id(),
        document_id,
        &body,
        mime_type,
    )
    .await?;
    Ok(Json(ApiOk { data: view }))
}

pub async fn sync_all(
    State(state): State<AppState>,
    _ctx: DentistContext,
) -> Result<Json<ApiOk<Vec<SyncResult>>>, ApiError> {
    let results = documents::sync_all(state.cloud.as_deref()).await?;
    Ok(Json(ApiOk { data: results }))
}
