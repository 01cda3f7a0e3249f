// src/routes/patient_routes.rs

use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth_context::DentistContext,
    models::{ApiOk, AppState, Appointment, MedicalRecord, Prescription, Profile, TreatmentPlan},
    services::{
        agenda::{self, AppointmentInput},
        availability::local_today,
        dossier::{self, Dossier, MedicalRecordInput},
        lifecycle::PrescriptionDraft,
        treatment::{self, TreatmentPlanInput},
    },
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/patients", get(list_patients))
        .route("/patients/{patient_id}/dossier", get(get_dossier))
        .route(
            "/patients/{patient_id}/dossier/next_appointment/notes",
            put(save_next_appointment_notes),
        )
        .route("/patients/{patient_id}/appointments", post(create_appointment))
        .route("/patients/{patient_id}/treatment_plans", post(create_treatment_plan))
        .route("/patients/{patient_id}/medical_records", post(create_medical_record))
        .route("/patients/{patient_id}/prescriptions", post(create_prescription))
}

#[derive(Debug, Deserialize)]
pub struct PatientSearchQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NextAppointmentNotesRequest {
    pub appointment_id: Uuid,
    pub text: String,
}

pub async fn list_patients(
    State(state): State<AppState>,
    ctx: DentistContext,
    Query(q): Query<PatientSearchQuery>,
) -> Result<Json<ApiOk<Vec<Profile>>>, ApiError> {
    let patients = dossier::roster(state.store.as_ref(), ctx.dentist_id(), q.search.as_deref()).await?;
    Ok(Json(ApiOk { data: patients }))
}

pub async fn get_dossier(
    State(state): State<AppState>,
    ctx: DentistContext,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<ApiOk<Dossier>>, ApiError> {
    let store = state.store.as_ref();
    dossier::ensure_shared_patient(store, patient_id, ctx.dentist_id()).await?;
    let d = dossier::load_dossier(store, patient_id, ctx.dentist_id(), Utc::now()).await?;
    Ok(Json(ApiOk { data: d }))
}

pub async fn save_next_appointment_notes(
    State(state): State<AppState>,
    ctx: DentistContext,
    Path(patient_id): Path<Uuid>,
    Json(req): Json<NextAppointmentNotesRequest>,
) -> Result<Json<ApiOk<Appointment>>, ApiError> {
    let store = state.store.as_ref();
    dossier::ensure_shared_patient(store, patient_id, ctx.dentist_id()).await?;
    let mut d = dossier::load_dossier(store, patient_id, ctx.dentist_id(), Utc::now()).await?;
    let updated = d
        .save_next_appointment_notes(store, req.appointment_id, &req.text)
        .await?
        .clone();
    Ok(Json(ApiOk { data: updated }))
}

pub async fn create_appointment(
    State(state): State<AppState>,
    ctx: DentistContext,
    Path(patient_id): Path<Uuid>,
    Json(req): Json<AppointmentInput>,
) -> Result<Json<ApiOk<Appointment>>, ApiError> {
    let created = agenda::create_appointment(
        state.store.as_ref(),
        patient_id,
        ctx.dentist_id(),
        req,
        state.settings.practice_offset,
    )
    .await?;
    Ok(Json(ApiOk { data: created }))
}

pub async fn create_treatment_plan(
    State(state): State<AppState>,
    ctx: DentistContext,
    Path(patient_id): Path<Uuid>,
    Json(req): Json<TreatmentPlanInput>,
) -> Result<Json<ApiOk<TreatmentPlan>>, ApiError> {
    let plan = treatment::create_plan(state.store.as_ref(), patient_id, ctx.dentist_id(), req).await?;
    Ok(Json(ApiOk { data: plan }))
}

pub async fn create_medical_record(
    State(state): State<AppState>,
    ctx: DentistContext,
    Path(patient_id): Path<Uuid>,
    Json(req): Json<MedicalRecordInput>,
) -> Result<Json<ApiOk<MedicalRecord>>, ApiError> {
    let record = dossier::create_medical_record(state.store.as_ref(), patient_id, ctx.dentist_id(), req).await?;
    Ok(Json(ApiOk { data: record }))
}

pub async fn create_prescription(
    State(state): State<AppState>,
    ctx: DentistContext,
    Path(patient_id): Path<Uuid>,
    Json(req): Json<PrescriptionDraft>,
) -> Result<Json<ApiOk<Prescription>>, ApiError> {
    let today = local_today(state.settings.practice_offset);
    let p = dossier::create_prescription(state.store.as_ref(), patient_id, ctx.dentist_id(), &req, today).await?;
    Ok(Json(ApiOk { data: p }))
}
