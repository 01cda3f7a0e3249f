// Joins appointments to their symptom assessments for the triage view.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::models::{Appointment, Notice, SymptomAssessment, Urgency};
use crate::store::PracticeStore;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct TriageBadge {
    pub urgency: Urgency,
    /// Higher sorts first: emergency 3, high 2, medium 1, low 0.
    pub rank: u8,
}

impl TriageBadge {
    pub fn of(urgency: Urgency) -> Self {
        Self {
            urgency,
            rank: urgency_rank(urgency),
        }
    }
}

pub fn urgency_rank(u: Urgency) -> u8 {
    match u {
        Urgency::Low => 0,
        Urgency::Medium => 1,
        Urgency::High => 2,
        Urgency::Emergency => 3,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TriagedAppointment {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub assessment: Option<SymptomAssessment>,
    pub triage: TriageBadge,
}

impl TriagedAppointment {
    pub fn bare(appointment: Appointment) -> Self {
        let triage = TriageBadge::of(appointment.urgency);
        Self {
            appointment,
            assessment: None,
            triage,
        }
    }

    pub fn id(&self) -> Uuid {
        self.appointment.id
    }
}

/// Attaches each appointment's assessment. When the assessment read fails
/// the appointments come back bare and a notice says so.
pub async fn enrich(
    store: &dyn PracticeStore,
    appointments: Vec<Appointment>,
) -> (Vec<TriagedAppointment>, Option<Notice>) {
    if appointments.is_empty() {
        return (vec![], None);
    }
    let ids: Vec<Uuid> = appointments.iter().map(|a| a.id).collect();

    let mut by_appointment: HashMap<Uuid, SymptomAssessment> = HashMap::new();
    let notice = match store.assessments_for(&ids).await {
        Ok(rows) => {
            // newest first; keep the latest assessment per appointment
            for row in rows {
                by_appointment.entry(row.appointment_id).or_insert(row);
            }
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, count = ids.len(), "symptom assessment lookup failed");
            Some(Notice::new("Triage unavailable", "Symptom assessments could not be loaded"))
        }
    };

    let triaged = appointments
        .into_iter()
        .map(|a| {
            let assessment = by_appointment.remove(&a.id);
            TriagedAppointment {
                assessment,
                ..TriagedAppointment::bare(a)
            }
        })
        .collect();
    (triaged, notice)
}

/// Case-insensitive substring match on patient name or reason. An empty
/// term matches everything.
pub fn matches_search(a: &Appointment, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return true;
    }
    let hit = |s: &Option<String>| s.as_deref().is_some_and(|v| v.to_lowercase().contains(&term));
    hit(&a.patient_name) || hit(&a.reason)
}
