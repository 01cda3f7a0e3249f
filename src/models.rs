use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::{assist::TextRewriter, documents::CloudStorage};
use crate::store::PracticeStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PracticeStore>,
    pub cloud: Option<Arc<dyn CloudStorage>>,
    pub rewriter: Option<Arc<dyn TextRewriter>>,
    pub settings: DashboardSettings,
}

#[derive(Clone, Debug)]
pub struct DashboardSettings {
    pub completed_limit: i64,
    pub require_completion_notes: bool,
    pub practice_offset: FixedOffset,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            completed_limit: 20,
            require_completion_notes: true,
            practice_offset: Utc.fix(),
        }
    }
}

/* -------------------------
   API envelopes
--------------------------*/

#[derive(Debug, Serialize)]
pub struct ApiOk<T> {
    pub data: T,
}

/// Short title + description pair rendered client-side as a toast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

/* -------------------------
   Text-backed enums
--------------------------*/

#[derive(Debug, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum!(UserRole {
    Patient => "patient",
    Dentist => "dentist",
    Admin => "admin",
});

text_enum!(
    /// Appointment lifecycle. Edges: pending -> confirmed | cancelled,
    /// confirmed -> completed | cancelled. Completed and cancelled are terminal.
    AppointmentStatus {
        Pending => "pending",
        Confirmed => "confirmed",
        Completed => "completed",
        Cancelled => "cancelled",
    }
);

impl AppointmentStatus {
    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed) | (Pending, Cancelled) | (Confirmed, Completed) | (Confirmed, Cancelled)
        )
    }

    pub fn is_active(self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Confirmed)
    }
}

text_enum!(Urgency {
    Low => "low",
    Medium => "medium",
    High => "high",
    Emergency => "emergency",
});

text_enum!(TreatmentPlanStatus {
    Draft => "draft",
    Active => "active",
    Completed => "completed",
    Cancelled => "cancelled",
});

text_enum!(TreatmentPriority {
    Low => "low",
    Medium => "medium",
    High => "high",
    Urgent => "urgent",
});

text_enum!(PrescriptionStatus {
    Active => "active",
    Completed => "completed",
    Cancelled => "cancelled",
});

text_enum!(PrescriptionFrequency {
    OnceDaily => "Once daily",
    TwiceDaily => "Twice daily",
    ThreeTimesDaily => "Three times daily",
    FourTimesDaily => "Four times daily",
    Every4Hours => "Every 4 hours",
    Every6Hours => "Every 6 hours",
    Every8Hours => "Every 8 hours",
    AsNeeded => "As needed",
});

/* -------------------------
   Entities
--------------------------*/

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
    pub emergency_contact: Option<String>,
    pub medical_history: Option<String>,
}

impl Profile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dentist {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub specialization: Option<String>,
    pub license_number: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub dentist_id: Uuid,
    pub patient_name: Option<String>,
    pub patient_age: Option<i32>,
    pub appointment_date: DateTime<Utc>,
    pub duration_minutes: Option<i32>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub consultation_notes: Option<String>,
    pub status: AppointmentStatus,
    pub urgency: Urgency,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymptomAssessment {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub pain_level: Option<i32>,
    pub has_swelling: Option<bool>,
    pub has_bleeding: Option<bool>,
    pub duration_symptoms: Option<String>,
    pub calculated_urgency: Option<Urgency>,
    pub assessment_score: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreatmentStep {
    pub id: String,
    pub title: String,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreatmentPlan {
    pub id: Uuid,
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
    pub treatment_steps: Vec<TreatmentStep>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub dentist_id: Uuid,
    pub title: String,
    /// consultation, diagnosis, treatment, prescription, x-ray, cleaning,
    /// surgery, follow-up; not enforced.
    pub record_type: String,
    pub visit_date: NaiveDate,
    pub description: Option<String>,
    pub findings: Option<String>,
    pub recommendations: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub dentist_id: Uuid,
    pub medication_name: String,
    pub dosage: String,
    /// Stored text. New rows always hold a `PrescriptionFrequency` label;
    /// older rows may hold anything, including an empty string.
    pub frequency: String,
    pub duration_days: Option<i32>,
    pub instructions: Option<String>,
    pub status: PrescriptionStatus,
    pub prescribed_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientDocument {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub dentist_id: Uuid,
    pub document_name: String,
    pub document_type: String,
    pub mime_type: Option<String>,
    pub file_size: Option<i64>,
    pub external_file_id: Option<String>,
    pub external_url: Option<String>,
    pub is_synced: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: Uuid,
    pub dentist_id: Uuid,
    pub title: String,
    pub event_type: String,
    pub start_datetime: DateTime<Utc>,
    pub end_datetime: DateTime<Utc>,
}

pub const EVENT_TYPE_TIME_OFF: &str = "time_off";
