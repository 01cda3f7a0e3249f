//! Patient dossier: one patient's clinical history as seen by one dentist.
//!
//! The profile read is mandatory. The four satellite collections are read
//! concurrently and independently; a failed one comes back empty and is
//! listed in `degraded` so the rest of the dossier still renders.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DashboardError;
use crate::models::{
    Appointment, MedicalRecord, Notice, Prescription, PrescriptionStatus, Profile,
    TreatmentPlan, TreatmentPlanStatus,
};
use crate::store::{
    AppointmentPatch, AppointmentQuery, NewMedicalRecord, PracticeStore, SortOrder, StoreResult,
};

use super::lifecycle::{prescription_from_draft, PrescriptionDraft};
use super::{fetch_failed, write_failed};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradedSection {
    TreatmentPlans,
    MedicalRecords,
    Prescriptions,
    Appointments,
}

impl DegradedSection {
    fn label(self) -> &'static str {
        match self {
            DegradedSection::TreatmentPlans => "Treatment plans",
            DegradedSection::MedicalRecords => "Medical records",
            DegradedSection::Prescriptions => "Prescriptions",
            DegradedSection::Appointments => "Appointments",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Dossier {
    pub patient: Profile,
    pub treatment_plans: Vec<TreatmentPlan>,
    pub medical_records: Vec<MedicalRecord>,
    pub prescriptions: Vec<Prescription>,
    pub appointments: Vec<Appointment>,
    pub next_appointment: Option<Appointment>,
    pub active_treatment_plans: usize,
    pub active_prescriptions: usize,
    pub degraded: Vec<DegradedSection>,
    pub notices: Vec<Notice>,
}

/// Earliest pending or confirmed appointment strictly after `now`.
/// Scans the whole list.
pub fn next_appointment(appointments: &[Appointment], now: DateTime<Utc>) -> Option<&Appointment> {
    appointments
        .iter()
        .filter(|a| a.status.is_active() && a.appointment_date > now)
        .min_by_key(|a| a.appointment_date)
}

/// Forbidden unless the patient holds at least one appointment with the dentist.
pub async fn ensure_shared_patient(
    store: &dyn PracticeStore,
    patient_id: Uuid,
    dentist_id: Uuid,
) -> Result<(), DashboardError> {
    let shared = store
        .shares_appointment(patient_id, dentist_id)
        .await
        .map_err(|e| fetch_failed("patient access", e))?;
    if shared {
        Ok(())
    } else {
        Err(DashboardError::Forbidden("Patient is not under your care".into()))
    }
}

fn soften<T>(section: DegradedSection, res: StoreResult<Vec<T>>, degraded: &mut Vec<DegradedSection>) -> Vec<T> {
    match res {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(error = %e, section = ?section, "dossier section degraded");
            degraded.push(section);
            vec![]
        }
    }
}

pub async fn load_dossier(
    store: &dyn PracticeStore,
    patient_id: Uuid,
    dentist_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Dossier, DashboardError> {
    let patient = store
        .profile_by_id(patient_id)
        .await
        .map_err(|e| fetch_failed("patient profile", e))?
        .ok_or_else(|| DashboardError::NotFound("Patient not found".into()))?;

    let appointment_query = AppointmentQuery::for_patient_of(patient_id, dentist_id).ordered(SortOrder::Descending);
    let (plans, records, prescriptions, appointments) = tokio::join!(
        store.treatment_plans_for(patient_id, dentist_id),
        store.medical_records_for(patient_id, dentist_id),
        store.prescriptions_for(patient_id, dentist_id),
        store.list_appointments(&appointment_query),
    );

    let mut degraded = vec![];
    let treatment_plans = soften(DegradedSection::TreatmentPlans, plans, &mut degraded);
    let medical_records = soften(DegradedSection::MedicalRecords, records, &mut degraded);
    let prescriptions = soften(DegradedSection::Prescriptions, prescriptions, &mut degraded);
    let appointments = soften(DegradedSection::Appointments, appointments, &mut degraded);

    let notices = degraded
        .iter()
        .map(|s| Notice::new("Partially loaded", format!("{} could not be loaded", s.label())))
        .collect();

    Ok(Dossier {
        next_appointment: next_appointment(&appointments, now).cloned(),
        active_treatment_plans: treatment_plans
            .iter()
            .filter(|p| p.status == TreatmentPlanStatus::Active)
            .count(),
        active_prescriptions: prescriptions
            .iter()
            .filter(|p| p.status == PrescriptionStatus::Active)
            .count(),
        patient,
        treatment_plans,
        medical_records,
        prescriptions,
        appointments,
        degraded,
        notices,
    })
}

impl Dossier {
    /// Writes consultation notes on the derived next appointment and mirrors
    /// the change into the loaded list.
    pub async fn save_next_appointment_notes(
        &mut self,
        store: &dyn PracticeStore,
        appointment_id: Uuid,
        text: &str,
    ) -> Result<&Appointment, DashboardError> {
        match &self.next_appointment {
            Some(next) if next.id == appointment_id => {}
            Some(_) => {
                return Err(DashboardError::Validation(
                    "Notes can only be saved on the next appointment".into(),
                ));
            }
            None => return Err(DashboardError::NotFound("Patient has no upcoming appointment".into())),
        }

        let patch = AppointmentPatch {
            consultation_notes: Some(text.to_string()),
            ..AppointmentPatch::default()
        };
        let updated = store
            .update_appointment(appointment_id, &patch)
            .await
            .map_err(|e| write_failed("save appointment notes", e))?
            .ok_or_else(|| DashboardError::Transition("Appointment no longer exists".into()))?;

        if let Some(row) = self.appointments.iter_mut().find(|a| a.id == appointment_id) {
            *row = updated.clone();
        }
        let next = self.next_appointment.insert(updated);
        Ok(&*next)
    }
}

/* -------------------------
   Roster
--------------------------*/

/// Distinct patients with at least one appointment with the dentist,
/// filtered by a case-insensitive match on first name, last name or email.
pub async fn roster(
    store: &dyn PracticeStore,
    dentist_id: Uuid,
    search: Option<&str>,
) -> Result<Vec<Profile>, DashboardError> {
    let patients = store
        .patients_of_dentist(dentist_id)
        .await
        .map_err(|e| fetch_failed("patients", e))?;

    let term = search.map(|s| s.trim().to_lowercase()).unwrap_or_default();
    if term.is_empty() {
        return Ok(patients);
    }
    Ok(patients
        .into_iter()
        .filter(|p| {
            p.first_name.to_lowercase().contains(&term)
                || p.last_name.to_lowercase().contains(&term)
                || p.email.to_lowercase().contains(&term)
        })
        .collect())
}

/* -------------------------
   Record creation
--------------------------*/

pub const DEFAULT_RECORD_TYPE: &str = "consultation";

#[derive(Debug, Clone, Deserialize)]
pub struct MedicalRecordInput {
    pub title: String,
    pub record_type: Option<String>,
    pub visit_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub findings: Option<String>,
    pub recommendations: Option<String>,
}

pub async fn create_medical_record(
    store: &dyn PracticeStore,
    patient_id: Uuid,
    dentist_id: Uuid,
    input: MedicalRecordInput,
) -> Result<MedicalRecord, DashboardError> {
    let title = input.title.trim();
    if title.is_empty() {
        return Err(DashboardError::Validation("Title is required".into()));
    }
    let visit_date = input
        .visit_date
        .ok_or_else(|| DashboardError::Validation("Visit date is required".into()))?;
    ensure_shared_patient(store, patient_id, dentist_id).await?;

    let record = NewMedicalRecord {
        patient_id,
        dentist_id,
        title: title.to_string(),
        record_type: input
            .record_type
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_RECORD_TYPE.to_string()),
        visit_date,
        description: input.description,
        findings: input.findings,
        recommendations: input.recommendations,
    };
    store
        .insert_medical_record(&record)
        .await
        .map_err(|e| write_failed("save medical record", e))
}

/// Stand-alone prescription outside the completion flow. Uses the same draft
/// shape; a blank medication name is a validation error here.
pub async fn create_prescription(
    store: &dyn PracticeStore,
    patient_id: Uuid,
    dentist_id: Uuid,
    draft: &PrescriptionDraft,
    today: NaiveDate,
) -> Result<Prescription, DashboardError> {
    if draft.medication_name.trim().is_empty() {
        return Err(DashboardError::Validation("Medication name is required".into()));
    }
    let new = prescription_from_draft(draft, patient_id, dentist_id, today)?;
    ensure_shared_patient(store, patient_id, dentist_id).await?;

    let mut created = store
        .insert_prescriptions(std::slice::from_ref(&new))
        .await
        .map_err(|e| write_failed("save prescription", e))?;
    created
        .pop()
        .ok_or_else(|| DashboardError::Transition("Prescription was not saved".into()))
}
