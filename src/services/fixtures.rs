// Shared builders for service and router tests.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use uuid::Uuid;

use crate::models::{
    Appointment, AppointmentStatus, Dentist, PatientDocument, Prescription, PrescriptionFrequency,
    PrescriptionStatus, Profile, SymptomAssessment, TreatmentPlan, TreatmentPlanStatus,
    TreatmentPriority, Urgency, UserRole,
};
use crate::store::memory::MemoryStore;

pub fn profile(role: UserRole, first: &str, last: &str) -> Profile {
    Profile {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        email: format!("{}@example.test", first.to_lowercase()),
        first_name: first.into(),
        last_name: last.into(),
        role,
        phone: None,
        date_of_birth: None,
        address: None,
        emergency_contact: None,
        medical_history: None,
    }
}

pub fn dentist_for(p: &Profile) -> Dentist {
    Dentist {
        id: Uuid::new_v4(),
        profile_id: p.id,
        specialization: Some("General".into()),
        license_number: None,
        is_active: true,
    }
}

pub fn appointment(
    patient: &Profile,
    dentist_id: Uuid,
    at: DateTime<Utc>,
    status: AppointmentStatus,
) -> Appointment {
    Appointment {
        id: Uuid::new_v4(),
        patient_id: patient.id,
        dentist_id,
        patient_name: Some(patient.full_name()),
        patient_age: Some(34),
        appointment_date: at,
        duration_minutes: Some(30),
        reason: Some("Check-up".into()),
        notes: None,
        consultation_notes: None,
        status,
        urgency: Urgency::Low,
    }
}

pub fn assessment(appointment_id: Uuid, urgency: Urgency, pain: i32) -> SymptomAssessment {
    SymptomAssessment {
        id: Uuid::new_v4(),
        appointment_id,
        pain_level: Some(pain),
        has_swelling: Some(pain > 6),
        has_bleeding: None,
        duration_symptoms: Some("2 days".into()),
        calculated_urgency: Some(urgency),
        assessment_score: Some(pain * 10),
    }
}

pub fn treatment_plan(patient_id: Uuid, dentist_id: Uuid, title: &str, status: TreatmentPlanStatus) -> TreatmentPlan {
    TreatmentPlan {
        id: Uuid::new_v4(),
        patient_id,
        dentist_id,
        title: title.into(),
        diagnosis: None,
        description: None,
        status,
        priority: TreatmentPriority::Medium,
        estimated_cost: None,
        estimated_duration_weeks: None,
        start_date: None,
        end_date: None,
        notes: None,
        treatment_steps: vec![],
        created_at: Utc::now(),
    }
}

pub fn prescription(patient_id: Uuid, dentist_id: Uuid, name: &str, status: PrescriptionStatus) -> Prescription {
    Prescription {
        id: Uuid::new_v4(),
        patient_id,
        dentist_id,
        medication_name: name.into(),
        dosage: "500mg".into(),
        frequency: PrescriptionFrequency::TwiceDaily.to_string(),
        duration_days: Some(7),
        instructions: None,
        status,
        prescribed_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
    }
}

pub fn document(patient_id: Uuid, dentist_id: Uuid, name: &str) -> PatientDocument {
    PatientDocument {
        id: Uuid::new_v4(),
        patient_id,
        dentist_id,
        document_name: name.into(),
        document_type: "x-ray".into(),
        mime_type: Some("image/png".into()),
        file_size: Some(4),
        external_file_id: None,
        external_url: None,
        is_synced: false,
        last_synced_at: None,
        created_at: Utc::now(),
    }
}

/// One dentist and one patient, both stored.
pub struct Practice {
    pub store: MemoryStore,
    pub dentist_profile: Profile,
    pub dentist: Dentist,
    pub patient: Profile,
}

impl Practice {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let dentist_profile = profile(UserRole::Dentist, "Ana", "Silva");
        let dentist = dentist_for(&dentist_profile);
        let patient = profile(UserRole::Patient, "Joao", "Pereira");
        store.add_profile(dentist_profile.clone());
        store.add_dentist(dentist.clone());
        store.add_profile(patient.clone());
        Self {
            store,
            dentist_profile,
            dentist,
            patient,
        }
    }

    /// Stores an appointment for the default patient `hours` from now.
    pub fn book(&self, hours: i64, status: AppointmentStatus) -> Appointment {
        let a = appointment(&self.patient, self.dentist.id, Utc::now() + Duration::hours(hours), status);
        self.store.add_appointment(a.clone());
        a
    }
}
