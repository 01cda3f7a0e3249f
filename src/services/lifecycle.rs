// Appointment lifecycle for one dentist's dashboard.
//
// The controller holds the working set for a single request: the active
// appointments (pending and confirmed) and the most recent completed ones.
// Every action checks the transition against the working set first and only
// touches local state after the store accepted the write.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DashboardError;
use crate::models::{
    Appointment, AppointmentStatus, DashboardSettings, Notice, Prescription, PrescriptionFrequency,
    PrescriptionStatus,
};
use crate::store::{AppointmentPatch, AppointmentQuery, NewPrescription, PracticeStore, SortOrder};

use super::triage::{self, TriagedAppointment};
use super::{fetch_failed, write_failed};

pub const DEFAULT_DURATION_DAYS: i32 = 7;

fn default_duration_days() -> i32 {
    DEFAULT_DURATION_DAYS
}

/// One prescription line from the completion form.
#[derive(Debug, Clone, Deserialize)]
pub struct PrescriptionDraft {
    pub medication_name: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub frequency: String,
    #[serde(default = "default_duration_days")]
    pub duration_days: i32,
    #[serde(default)]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub confirmed: usize,
}

#[derive(Debug, Serialize)]
pub struct DashboardView {
    pub active: Vec<TriagedAppointment>,
    pub completed: Vec<TriagedAppointment>,
    pub counts: StatusCounts,
    pub notices: Vec<Notice>,
}

pub struct DashboardController<'a> {
    store: &'a dyn PracticeStore,
    settings: &'a DashboardSettings,
    dentist_id: Uuid,
    active: Vec<TriagedAppointment>,
    completed: Vec<TriagedAppointment>,
    notices: Vec<Notice>,
}

impl<'a> DashboardController<'a> {
    pub fn new(store: &'a dyn PracticeStore, settings: &'a DashboardSettings, dentist_id: Uuid) -> Self {
        Self {
            store,
            settings,
            dentist_id,
            active: vec![],
            completed: vec![],
            notices: vec![],
        }
    }

    /// Loads both lists. A failed active read fails the whole call; a failed
    /// completed read leaves that list empty with a notice.
    pub async fn open(
        store: &'a dyn PracticeStore,
        settings: &'a DashboardSettings,
        dentist_id: Uuid,
    ) -> Result<Self, DashboardError> {
        let mut ctl = Self::new(store, settings, dentist_id);
        ctl.load_active().await?;
        if let Err(e) = ctl.load_completed().await {
            ctl.notices.push(Notice::new("Error", e.to_string()));
        }
        Ok(ctl)
    }

    #[cfg(test)]
    pub fn active(&self) -> &[TriagedAppointment] {
        &self.active
    }

    #[cfg(test)]
    pub fn completed(&self) -> &[TriagedAppointment] {
        &self.completed
    }

    #[cfg(test)]
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub async fn load_active(&mut self) -> Result<(), DashboardError> {
        let q = AppointmentQuery::for_dentist(self.dentist_id)
            .with_statuses(&[AppointmentStatus::Pending, AppointmentStatus::Confirmed])
            .ordered(SortOrder::Ascending);
        let rows = self
            .store
            .list_appointments(&q)
            .await
            .map_err(|e| fetch_failed("appointments", e))?;
        let (rows, notice) = triage::enrich(self.store, rows).await;
        self.notices.extend(notice);
        self.active = rows;
        Ok(())
    }

    pub async fn load_completed(&mut self) -> Result<(), DashboardError> {
        let q = AppointmentQuery::for_dentist(self.dentist_id)
            .with_statuses(&[AppointmentStatus::Completed])
            .ordered(SortOrder::Descending)
            .limit(self.settings.completed_limit);
        let rows = self
            .store
            .list_appointments(&q)
            .await
            .map_err(|e| fetch_failed("completed appointments", e))?;
        let (rows, notice) = triage::enrich(self.store, rows).await;
        self.notices.extend(notice);
        self.completed = rows;
        Ok(())
    }

    pub async fn accept(&mut self, appointment_id: Uuid) -> Result<(), DashboardError> {
        let idx = self.active_index(appointment_id)?;
        self.guard(idx, AppointmentStatus::Confirmed)?;

        let patch = AppointmentPatch {
            status: Some(AppointmentStatus::Confirmed),
            ..AppointmentPatch::default()
        };
        let updated = self.write(appointment_id, &patch, "accept appointment").await?;
        self.active[idx].appointment = updated;
        self.notices.push(Notice::new(
            "Appointment Accepted",
            "The appointment has been confirmed successfully.",
        ));
        Ok(())
    }

    pub async fn reject(&mut self, appointment_id: Uuid) -> Result<(), DashboardError> {
        let idx = self.active_index(appointment_id)?;
        self.guard(idx, AppointmentStatus::Cancelled)?;

        let patch = AppointmentPatch {
            status: Some(AppointmentStatus::Cancelled),
            ..AppointmentPatch::default()
        };
        self.write(appointment_id, &patch, "reject appointment").await?;
        self.active.remove(idx);
        self.completed.retain(|a| a.id() != appointment_id);
        self.notices.push(Notice::new(
            "Appointment Rejected",
            "The appointment has been cancelled.",
        ));
        Ok(())
    }

    /// Overwrites consultation notes; status is left alone.
    pub async fn save_notes(&mut self, appointment_id: Uuid, text: &str) -> Result<(), DashboardError> {
        if self.find_mut(appointment_id).is_none() {
            return Err(not_in_working_set());
        }
        let patch = AppointmentPatch {
            consultation_notes: Some(text.to_string()),
            ..AppointmentPatch::default()
        };
        let updated = self.write(appointment_id, &patch, "save consultation notes").await?;
        if let Some(row) = self.find_mut(appointment_id) {
            row.appointment = updated;
        }
        self.notices.push(Notice::new("Notes Saved", "Consultation notes have been saved."));
        Ok(())
    }

    pub async fn complete(&mut self, appointment_id: Uuid, summary: &str) -> Result<(), DashboardError> {
        self.check_summary(summary)?;

        match self.completion_slot(appointment_id)? {
            CompletionSlot::Completed(pos) => {
                // already completed: only the notes change
                let patch = AppointmentPatch {
                    consultation_notes: Some(summary.to_string()),
                    ..AppointmentPatch::default()
                };
                let updated = self.write(appointment_id, &patch, "save consultation summary").await?;
                self.completed[pos].appointment = updated;
            }
            CompletionSlot::Active(idx) => {
                let patch = AppointmentPatch {
                    status: Some(AppointmentStatus::Completed),
                    consultation_notes: Some(summary.to_string()),
                };
                let updated = self.write(appointment_id, &patch, "complete appointment").await?;
                self.promote(idx, updated);
            }
        }

        self.notices.push(Notice::new(
            "Summary Saved",
            "Consultation summary has been saved and appointment marked as completed.",
        ));
        Ok(())
    }

    /// Completes the appointment and writes its prescriptions in one store
    /// transaction. Drafts with a blank medication name are dropped; the rest
    /// are validated before anything is written. On an already completed
    /// appointment the notes are rewritten and the prescriptions added.
    pub async fn complete_with_prescriptions(
        &mut self,
        appointment_id: Uuid,
        summary: &str,
        drafts: &[PrescriptionDraft],
        today: NaiveDate,
    ) -> Result<Vec<Prescription>, DashboardError> {
        self.check_summary(summary)?;
        let slot = self.completion_slot(appointment_id)?;

        let appointment = match slot {
            CompletionSlot::Completed(pos) => &self.completed[pos].appointment,
            CompletionSlot::Active(idx) => &self.active[idx].appointment,
        };
        let prescriptions = drafts
            .iter()
            .filter(|d| !d.medication_name.trim().is_empty())
            .map(|d| prescription_from_draft(d, appointment.patient_id, appointment.dentist_id, today))
            .collect::<Result<Vec<_>, _>>()?;

        let (updated, created) = self
            .store
            .complete_with_prescriptions(appointment_id, summary, &prescriptions)
            .await
            .map_err(|e| write_failed("complete appointment", e))?
            .ok_or_else(vanished)?;
        match slot {
            CompletionSlot::Completed(pos) => self.completed[pos].appointment = updated,
            CompletionSlot::Active(idx) => self.promote(idx, updated),
        }

        self.notices.push(Notice::new("Success", "Appointment completed successfully"));
        Ok(created)
    }

    pub fn view(&self, search: Option<&str>) -> DashboardView {
        let term = search.unwrap_or_default();
        let filter = |rows: &[TriagedAppointment]| {
            rows.iter()
                .filter(|a| triage::matches_search(&a.appointment, term))
                .cloned()
                .collect::<Vec<_>>()
        };
        let counts = StatusCounts {
            pending: self.count(AppointmentStatus::Pending),
            confirmed: self.count(AppointmentStatus::Confirmed),
        };
        DashboardView {
            active: filter(&self.active),
            completed: filter(&self.completed),
            counts,
            notices: self.notices.clone(),
        }
    }

    pub fn into_view(self, search: Option<&str>) -> DashboardView {
        self.view(search)
    }

    /* -------------------------
       internals
    --------------------------*/

    fn count(&self, status: AppointmentStatus) -> usize {
        self.active.iter().filter(|a| a.appointment.status == status).count()
    }

    fn active_index(&self, appointment_id: Uuid) -> Result<usize, DashboardError> {
        self.active
            .iter()
            .position(|a| a.id() == appointment_id)
            .ok_or_else(not_in_working_set)
    }

    fn completion_slot(&self, appointment_id: Uuid) -> Result<CompletionSlot, DashboardError> {
        if let Some(pos) = self.completed.iter().position(|a| a.id() == appointment_id) {
            return Ok(CompletionSlot::Completed(pos));
        }
        let idx = self.active_index(appointment_id)?;
        self.guard(idx, AppointmentStatus::Completed)?;
        Ok(CompletionSlot::Active(idx))
    }

    fn find_mut(&mut self, appointment_id: Uuid) -> Option<&mut TriagedAppointment> {
        self.active
            .iter_mut()
            .chain(self.completed.iter_mut())
            .find(|a| a.id() == appointment_id)
    }

    fn guard(&self, idx: usize, next: AppointmentStatus) -> Result<(), DashboardError> {
        let current = self.active[idx].appointment.status;
        if current.can_transition_to(next) {
            Ok(())
        } else {
            Err(DashboardError::Transition(format!(
                "Cannot move appointment from {current} to {next}"
            )))
        }
    }

    fn check_summary(&self, summary: &str) -> Result<(), DashboardError> {
        if self.settings.require_completion_notes && summary.trim().is_empty() {
            return Err(DashboardError::Validation(
                "Consultation notes are required to complete an appointment".into(),
            ));
        }
        Ok(())
    }

    async fn write(
        &self,
        appointment_id: Uuid,
        patch: &AppointmentPatch,
        what: &str,
    ) -> Result<Appointment, DashboardError> {
        self.store
            .update_appointment(appointment_id, patch)
            .await
            .map_err(|e| write_failed(what, e))?
            .ok_or_else(vanished)
    }

    /// Moves an active row to the head of the completed list.
    fn promote(&mut self, idx: usize, updated: Appointment) {
        let mut row = self.active.remove(idx);
        row.appointment = updated;
        self.completed.insert(0, row);
        let limit = usize::try_from(self.settings.completed_limit).unwrap_or(usize::MAX);
        self.completed.truncate(limit);
    }
}

/// Where a completion lands: a row already in the completed list, or an
/// active row that passed the transition guard.
#[derive(Debug, Clone, Copy)]
enum CompletionSlot {
    Completed(usize),
    Active(usize),
}

fn not_in_working_set() -> DashboardError {
    DashboardError::NotFound("Appointment not found on this dashboard".into())
}

fn vanished() -> DashboardError {
    DashboardError::Transition("Appointment no longer exists".into())
}

/// Longest course a single prescription may cover.
pub const MAX_DURATION_DAYS: i32 = 90;

pub fn prescription_from_draft(
    d: &PrescriptionDraft,
    patient_id: Uuid,
    dentist_id: Uuid,
    today: NaiveDate,
) -> Result<NewPrescription, DashboardError> {
    let name = d.medication_name.trim();
    if d.dosage.trim().is_empty() {
        return Err(DashboardError::Validation(format!("Dosage is required for {name}")));
    }
    let frequency: PrescriptionFrequency = d
        .frequency
        .trim()
        .parse()
        .map_err(|_| DashboardError::Validation(format!("Unknown frequency for {name}: {:?}", d.frequency)))?;
    if d.duration_days < 1 {
        return Err(DashboardError::Validation(format!("Duration for {name} must be at least one day")));
    }
    if d.duration_days > MAX_DURATION_DAYS {
        return Err(DashboardError::Validation(format!(
            "Duration for {name} cannot exceed {MAX_DURATION_DAYS} days"
        )));
    }

    Ok(NewPrescription {
        patient_id,
        dentist_id,
        medication_name: name.to_string(),
        dosage: d.dosage.trim().to_string(),
        frequency,
        duration_days: Some(d.duration_days),
        instructions: d.instructions.clone().filter(|s| !s.trim().is_empty()),
        status: PrescriptionStatus::Active,
        prescribed_date: today,
    })
}
