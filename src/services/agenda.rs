// One day of a dentist's appointments, and booking new ones from a patient's
// file.

use std::collections::HashMap;

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DashboardError;
use crate::models::{Appointment, AppointmentStatus, Notice, PatientDocument, Urgency};
use crate::store::{AppointmentQuery, NewAppointment, PracticeStore, SortOrder};

use super::availability::day_bounds;
use super::dossier::ensure_shared_patient;
use super::{fetch_failed, write_failed};

pub const DEFAULT_APPOINTMENT_MINUTES: i32 = 60;
const MIN_APPOINTMENT_MINUTES: i32 = 15;

#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentInput {
    /// Wall-clock time at the practice, e.g. `2026-09-14T10:30:00`.
    pub appointment_date: NaiveDateTime,
    pub reason: Option<String>,
    pub notes: Option<String>,
    /// Pending or confirmed; defaults to pending.
    pub status: Option<AppointmentStatus>,
    pub duration_minutes: Option<i32>,
}

/// Books an appointment for a patient the dentist already sees.
pub async fn create_appointment(
    store: &dyn PracticeStore,
    patient_id: Uuid,
    dentist_id: Uuid,
    input: AppointmentInput,
    offset: FixedOffset,
) -> Result<Appointment, DashboardError> {
    let status = input.status.unwrap_or(AppointmentStatus::Pending);
    if !status.is_active() {
        return Err(DashboardError::Validation(format!(
            "New appointments must be pending or confirmed, not {status}"
        )));
    }
    let duration_minutes = input.duration_minutes.unwrap_or(DEFAULT_APPOINTMENT_MINUTES);
    if duration_minutes < MIN_APPOINTMENT_MINUTES {
        return Err(DashboardError::Validation(format!(
            "Duration must be at least {MIN_APPOINTMENT_MINUTES} minutes"
        )));
    }
    let appointment_date = offset
        .from_local_datetime(&input.appointment_date)
        .single()
        .ok_or_else(|| DashboardError::Validation(format!("Invalid date: {}", input.appointment_date)))?
        .with_timezone(&Utc);

    ensure_shared_patient(store, patient_id, dentist_id).await?;
    let patient = store
        .profile_by_id(patient_id)
        .await
        .map_err(|e| fetch_failed("patient profile", e))?
        .ok_or_else(|| DashboardError::NotFound("Patient not found".into()))?;

    let new = NewAppointment {
        patient_id,
        dentist_id,
        patient_name: Some(patient.full_name()),
        appointment_date,
        duration_minutes,
        reason: non_blank(input.reason),
        notes: non_blank(input.notes),
        status,
        urgency: Urgency::Low,
    };
    let created = store
        .insert_appointment(&new)
        .await
        .map_err(|e| write_failed("create appointment", e))?;
    tracing::info!(appointment_id = %created.id, %patient_id, %dentist_id, "appointment booked");
    Ok(created)
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentPeek {
    pub id: Uuid,
    pub document_name: String,
    pub external_url: Option<String>,
}

impl From<PatientDocument> for DocumentPeek {
    fn from(d: PatientDocument) -> Self {
        Self {
            id: d.id,
            document_name: d.document_name,
            external_url: d.external_url,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AgendaEntry {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub documents: Vec<DocumentPeek>,
}

#[derive(Debug, Serialize)]
pub struct DayAgenda {
    pub date: NaiveDate,
    pub appointments: Vec<AgendaEntry>,
    pub notices: Vec<Notice>,
}

/// Every appointment of the dentist on `date` (practice time), ascending.
/// A failed document lookup leaves that patient's list empty and adds a
/// notice; a failed appointment read fails the call.
pub async fn day_agenda(
    store: &dyn PracticeStore,
    dentist_id: Uuid,
    date: NaiveDate,
    offset: FixedOffset,
) -> Result<DayAgenda, DashboardError> {
    let (start, end) = day_bounds(date, offset)?;
    let q = AppointmentQuery::for_dentist(dentist_id)
        .between(start, end)
        .ordered(SortOrder::Ascending);
    let rows = store
        .list_appointments(&q)
        .await
        .map_err(|e| fetch_failed("agenda", e))?;

    let mut documents: HashMap<Uuid, Vec<DocumentPeek>> = HashMap::new();
    let mut notices = vec![];
    for patient_id in rows.iter().map(|a| a.patient_id) {
        if documents.contains_key(&patient_id) {
            continue;
        }
        let peek = match store.documents_for(dentist_id, Some(patient_id)).await {
            Ok(docs) => docs.into_iter().map(DocumentPeek::from).collect(),
            Err(e) => {
                tracing::warn!(error = %e, %patient_id, "agenda document lookup failed");
                if notices.is_empty() {
                    notices.push(Notice::new("Documents unavailable", "Some patient documents could not be loaded"));
                }
                vec![]
            }
        };
        documents.insert(patient_id, peek);
    }

    let appointments = rows
        .into_iter()
        .map(|a| AgendaEntry {
            documents: documents.get(&a.patient_id).cloned().unwrap_or_default(),
            appointment: a,
        })
        .collect();

    Ok(DayAgenda {
        date,
        appointments,
        notices,
    })
}
