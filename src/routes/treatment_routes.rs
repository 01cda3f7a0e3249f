// src/routes/treatment_routes.rs

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth_context::DentistContext,
    models::{ApiOk, AppState, TreatmentStep},
    services::treatment,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/treatment_plans/{plan_id}/steps", get(list_steps).post(add_step))
        .route("/treatment_plans/{plan_id}/steps/{step_id}/toggle", post(toggle_step))
}

#[derive(Debug, Deserialize)]
pub struct AddStepRequest {
    pub title: String,
}

pub async fn list_steps(
    State(state): State<AppState>,
    ctx: DentistContext,
    Path(plan_id): Path<Uuid>,
) -> Result<Json<ApiOk<Vec<TreatmentStep>>>, ApiError> {
    let steps = treatment::steps(state.store.as_ref(), plan_id, ctx.dentist_id()).await?;
    Ok(Json(ApiOk { data: steps }))
}

pub async fn add_step(
    State(state): State<AppState>,
    ctx: DentistContext,
    Path(plan_id): Path<Uuid>,
    Json(req): Json<AddStepRequest>,
) -> Result<Json<ApiOk<Vec<TreatmentStep>>>, ApiError> {
    let steps = treatment::add_step(state.store.as_ref(), plan_id, ctx.dentist_id(), &req.title).await?;
    Ok(Json(ApiOk { data: steps }))
}

pub async fn toggle_step(
    State(state): State<AppState>,
    ctx: DentistContext,
    Path((plan_id, step_id)): Path<(Uuid, String)>,
) -> Result<Json<ApiOk<Vec<TreatmentStep>>>, ApiError> {
    let steps = treatment::toggle_step(state.store.as_ref(), plan_id, ctx.dentist_id(), &step_id).await?;
    Ok(Json(ApiOk { data: steps }))
}
