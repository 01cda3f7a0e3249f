// src/store/mod.rs

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::models::{
    Appointment, AppointmentStatus, CalendarEvent, Dentist, MedicalRecord, PatientDocument,
    Prescription, PrescriptionFrequency, PrescriptionStatus, Profile, SymptomAssessment,
    TreatmentPlan, TreatmentPlanStatus, TreatmentPriority, TreatmentStep, Urgency,
};

#[cfg(test)]
pub mod memory;
pub mod postgres;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("db error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("row decode error: {0}")]
    Decode(String),
    #[cfg(test)]
    #[error("injected failure: {0}")]
    Injected(&'static str),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone)]
pub struct SessionIdentity {
    pub session_token_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Filter over `appointments`. Empty `statuses` means any status; `from` and
/// `until` are both inclusive.
#[derive(Debug, Clone, Default)]
pub struct AppointmentQuery {
    pub dentist_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub statuses: Vec<AppointmentStatus>,
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub order: SortOrder,
    pub limit: Option<i64>,
}

impl AppointmentQuery {
    pub fn for_dentist(dentist_id: Uuid) -> Self {
        Self {
            dentist_id: Some(dentist_id),
            ..Self::default()
        }
    }

    pub fn for_patient_of(patient_id: Uuid, dentist_id: Uuid) -> Self {
        Self {
            dentist_id: Some(dentist_id),
            patient_id: Some(patient_id),
            ..Self::default()
        }
    }

    pub fn with_statuses(mut self, statuses: &[AppointmentStatus]) -> Self {
        self.statuses = statuses.to_vec();
        self
    }

    pub fn between(mut self, from: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.until = Some(until);
        self
    }

    pub fn ordered(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, a: &Appointment) -> bool {
        self.dentist_id.is_none_or(|d| a.dentist_id == d)
            && self.patient_id.is_none_or(|p| a.patient_id == p)
            && (self.statuses.is_empty() || self.statuses.contains(&a.status))
            && self.from.is_none_or(|f| a.appointment_date >= f)
            && self.until.is_none_or(|u| a.appointment_date <= u)
    }
}

#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub patient_id: Uuid,
    pub dentist_id: Uuid,
    pub patient_name: Option<String>,
    pub appointment_date: DateTime<Utc>,
    pub duration_minutes: i32,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    pub urgency: Urgency,
}

/// Partial update; `None` fields keep the stored value.
#[derive(Debug, Clone, Default)]
pub struct AppointmentPatch {
    pub status: Option<AppointmentStatus>,
    pub consultation_notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPrescription {
    pub patient_id: Uuid,
    pub dentist_id: Uuid,
    pub medication_name: String,
    pub dosage: String,
    pub frequency: PrescriptionFrequency,
    pub duration_days: Option<i32>,
    pub instructions: Option<String>,
    pub status: PrescriptionStatus,
    pub prescribed_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct NewTreatmentPlan {
    pub patient_id: Uuid,
    pub dentist_id: Uuid,
    pub title: String,
    pub diagnosis: Option<String>,
    pub description: Option<String>,
    pub status: TreatmentPlanStatus,
    pub priority: TreatmentPriority,
    pub estimated_cost: Option<f64>,
    pub estimated_duration_weeks: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewMedicalRecord {
    pub patient_id: Uuid,
    pub dentist_id: Uuid,
    pub title: String,
    pub record_type: String,
    pub visit_date: NaiveDate,
    pub description: Option<String>,
    pub findings: Option<String>,
    pub recommendations: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewTimeOff {
    pub dentist_id: Uuid,
    pub title: String,
    pub start_datetime: DateTime<Utc>,
    pub end_datetime: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DocumentSyncUpdate {
    pub external_file_id: String,
    pub external_url: Option<String>,
    pub synced_at: DateTime<Utc>,
}

/// The relational backend. Every clinical read is scoped by the
/// (patient, dentist) pair; no method joins across clinical collections.
#[async_trait]
pub trait PracticeStore: Send + Sync {
    async fn session_user(&self, token_hash: &str) -> StoreResult<Option<SessionIdentity>>;

    async fn profile_by_user(&self, user_id: Uuid) -> StoreResult<Option<Profile>>;
    async fn profile_by_id(&self, profile_id: Uuid) -> StoreResult<Option<Profile>>;
    async fn dentist_by_profile(&self, profile_id: Uuid) -> StoreResult<Option<Dentist>>;
    /// Distinct patients holding at least one appointment with the dentist.
    async fn patients_of_dentist(&self, dentist_id: Uuid) -> StoreResult<Vec<Profile>>;
    async fn shares_appointment(&self, patient_id: Uuid, dentist_id: Uuid) -> StoreResult<bool>;

    async fn list_appointments(&self, q: &AppointmentQuery) -> StoreResult<Vec<Appointment>>;
    async fn insert_appointment(&self, appointment: &NewAppointment) -> StoreResult<Appointment>;
    async fn update_appointment(
        &self,
        appointment_id: Uuid,
        patch: &AppointmentPatch,
    ) -> StoreResult<Option<Appointment>>;
    /// Marks the appointment completed with `notes` and inserts the
    /// prescriptions in one transaction.
    async fn complete_with_prescriptions(
        &self,
        appointment_id: Uuid,
        notes: &str,
        prescriptions: &[NewPrescription],
    ) -> StoreResult<Option<(Appointment, Vec<Prescription>)>>;
    async fn assessments_for(&self, appointment_ids: &[Uuid]) -> StoreResult<Vec<SymptomAssessment>>;

    async fn treatment_plans_for(&self, patient_id: Uuid, dentist_id: Uuid) -> StoreResult<Vec<TreatmentPlan>>;
    async fn treatment_plan(&self, plan_id: Uuid) -> StoreResult<Option<TreatmentPlan>>;
    async fn insert_treatment_plan(&self, plan: &NewTreatmentPlan) -> StoreResult<TreatmentPlan>;
    async fn replace_treatment_steps(
        &self,
        plan_id: Uuid,
        steps: &[TreatmentStep],
    ) -> StoreResult<Option<TreatmentPlan>>;

    async fn medical_records_for(&self, patient_id: Uuid, dentist_id: Uuid) -> StoreResult<Vec<MedicalRecord>>;
    async fn insert_medical_record(&self, record: &NewMedicalRecord) -> StoreResult<MedicalRecord>;

    async fn prescriptions_for(&self, patient_id: Uuid, dentist_id: Uuid) -> StoreResult<Vec<Prescription>>;
    async fn insert_prescriptions(&self, prescriptions: &[NewPrescription]) -> StoreResult<Vec<Prescription>>;

    async fn documents_for(
        &self,
        dentist_id: Uuid,
        patient_id: Option<Uuid>,
    ) -> StoreResult<Vec<PatientDocument>>;
    async fn document(&self, document_id: Uuid) -> StoreResult<Option<PatientDocument>>;
    async fn mark_document_synced(
        &self,
        document_id: Uuid,
        update: &DocumentSyncUpdate,
    ) -> StoreResult<Option<PatientDocument>>;

    async fn time_off_events(&self, dentist_id: Uuid) -> StoreResult<Vec<CalendarEvent>>;
    async fn insert_time_off(&self, events: &[NewTimeOff]) -> StoreResult<Vec<CalendarEvent>>;
    /// Deletes time-off events whose start lies in `[start, end]`.
    async fn delete_time_off_between(
        &self,
        dentist_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<u64>;
}
