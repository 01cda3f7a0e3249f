// src/routes/dashboard_routes.rs

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth_context::DentistContext,
    models::{ApiOk, AppState, Prescription},
    services::{
        availability::local_today,
        lifecycle::{DashboardController, DashboardView, PrescriptionDraft},
    },
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(get_dashboard))
        .route("/dashboard/appointments/{appointment_id}/accept", post(accept_appointment))
        .route("/dashboard/appointments/{appointment_id}/reject", post(reject_appointment))
        .route("/dashboard/appointments/{appointment_id}/complete", post(complete_appointment))
        .route("/dashboard/appointments/{appointment_id}/notes", post(save_notes))
}

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NotesRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    #[serde(default)]
    pub summary: String,
    /// Present when the completion form was used; may hold blank lines.
    pub prescriptions: Option<Vec<PrescriptionDraft>>,
}

#[derive(Debug, Serialize)]
pub struct CompletionDto {
    #[serde(flatten)]
    pub dashboard: DashboardView,
    pub prescriptions: Vec<Prescription>,
}

async fn open<'a>(state: &'a AppState, ctx: &DentistContext) -> Result<DashboardController<'a>, ApiError> {
    Ok(DashboardController::open(state.store.as_ref(), &state.settings, ctx.dentist_id()).await?)
}

pub async fn get_dashboard(
    State(state): State<AppState>,
    ctx: DentistContext,
    Query(q): Query<DashboardQuery>,
) -> Result<Json<ApiOk<DashboardView>>, ApiError> {
    let ctl = open(&state, &ctx).await?;
    Ok(Json(ApiOk {
        data: ctl.into_view(q.search.as_deref()),
    }))
}

pub async fn accept_appointment(
    State(state): State<AppState>,
    ctx: DentistContext,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<ApiOk<DashboardView>>, ApiError> {
    let mut ctl = open(&state, &ctx).await?;
    ctl.accept(appointment_id).await?;
    Ok(Json(ApiOk { data: ctl.into_view(None) }))
}

pub async fn reject_appointment(
    State(state): State<AppState>,
    ctx: DentistContext,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<ApiOk<DashboardView>>, ApiError> {
    let mut ctl = open(&state, &ctx).await?;
    ctl.reject(appointment_id).await?;
    Ok(Json(ApiOk { data: ctl.into_view(None) }))
}

pub async fn save_notes(
    State(state): State<AppState>,
    ctx: DentistContext,
    Path(appointment_id): Path<Uuid>,
    Json(req): Json<NotesRequest>,
) -> Result<Json<ApiOk<DashboardView>>, ApiError> {
    let mut ctl = open(&state, &ctx).await?;
    ctl.save_notes(appointment_id, &req.text).await?;
    Ok(Json(ApiOk { data: ctl.into_view(None) }))
}

pub async fn complete_appointment(
    State(state): State<AppState>,
    ctx: DentistContext,
    Path(appointment_id): Path<Uuid>,
    Json(req): Json<CompleteRequest>,
) -> Result<Json<ApiOk<CompletionDto>>, ApiError> {
    let mut ctl = open(&state, &ctx).await?;
    let prescriptions = match &req.prescriptions {
        Some(drafts) => {
            let today = local_today(state.settings.practice_offset);
            ctl.complete_with_prescriptions(appointment_id, &req.summary, drafts, today)
                .await?
        }
        None => {
            ctl.complete(appointment_id, &req.summary).await?;
            vec![]
        }
    };
    Ok(Json(ApiOk {
        data: CompletionDto {
            dashboard: ctl.into_view(None),
            prescriptions,
        },
    }))
}
