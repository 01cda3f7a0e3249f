// src/routes/availability_routes.rs

use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    error::ApiError,
    middleware::auth_context::DentistContext,
    models::{ApiOk, AppState, Notice},
    services::availability::{self, CommitOutcome, TimeOffSelection},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/availability/time_off", get(list_time_off).post(commit_time_off))
        .route("/availability/time_off/{date}", delete(remove_time_off))
        .route("/availability/selection/toggle", post(toggle_selection))
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    #[serde(default)]
    pub selected: TimeOffSelection,
    pub date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct SelectionDto {
    pub selected: TimeOffSelection,
}

#[derive(Debug, Deserialize)]
pub struct CommitRequest {
    #[serde(default)]
    pub dates: Vec<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct RemovedDto {
    pub date: NaiveDate,
    pub removed: u64,
    pub notice: Notice,
}

pub async fn list_time_off(
    State(state): State<AppState>,
    ctx: DentistContext,
) -> Result<Json<ApiOk<Vec<NaiveDate>>>, ApiError> {
    let days = availability::list_time_off(state.store.as_ref(), ctx.dentist_id(), state.settings.practice_offset).await?;
    Ok(Json(ApiOk { data: days }))
}

/// Pure: returns the selection with `date` flipped. Nothing is stored.
pub async fn toggle_selection(
    _ctx: DentistContext,
    Json(req): Json<ToggleRequest>,
) -> Result<Json<ApiOk<SelectionDto>>, ApiError> {
    let mut selected = req.selected;
    selected.toggle(req.date);
    Ok(Json(ApiOk {
        data: SelectionDto { selected },
    }))
}

pub async fn commit_time_off(
    State(state): State<AppState>,
    ctx: DentistContext,
    Json(req): Json<CommitRequest>,
) -> Result<Json<ApiOk<CommitOutcome>>, ApiError> {
    let mut selection: TimeOffSelection = req.dates.into_iter().collect();
    let outcome = availability::commit(
        state.store.as_ref(),
        ctx.dentist_id(),
        &mut selection,
        state.settings.practice_offset,
    )
    .await?;
    Ok(Json(ApiOk { data: outcome }))
}

pub async fn remove_time_off(
    State(state): State<AppState>,
    ctx: DentistContext,
    Path(date): Path<NaiveDate>,
) -> Result<Json<ApiOk<RemovedDto>>, ApiError> {
    let removed = availability::remove(state.store.as_ref(), ctx.dentist_id(), date, state.settings.practice_offset).await?;
    Ok(Json(ApiOk {
        data: RemovedDto {
            date,
            removed,
            notice: Notice::new("Success", "Time off removed"),
        },
    }))
}
