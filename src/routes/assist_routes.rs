// src/routes/assist_routes.rs

use axum::{extract::State, routing::post, Json, Router};

use crate::{
    error::ApiError,
    middleware::auth_context::DentistContext,
    models::{ApiOk, AppState},
    services::assist::{self, RewriteRequest, RewriteResponse},
};

pub fn router() -> Router<AppState> {
    Router::new().route("/assist/rewrite", post(rewrite_text))
}

pub async fn rewrite_text(
    State(state): State<AppState>,
    _ctx: DentistContext,
    Json(req): Json<RewriteRequest>,
) -> Result<Json<ApiOk<RewriteResponse>>, ApiError> {
    let out = assist::rewrite(state.rewriter.as_deref(), req).await?;
    Ok(Json(ApiOk { data: out }))
}
