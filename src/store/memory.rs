// src/store/memory.rs
//
// In-process PracticeStore for tests. Any operation can be made to fail by
// name, and every write bumps a counter so tests can assert that a rejected
// action never reached the store.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    Appointment, AppointmentStatus, CalendarEvent, Dentist, MedicalRecord, PatientDocument,
    Prescription, Profile, SymptomAssessment, TreatmentPlan, TreatmentStep, EVENT_TYPE_TIME_OFF,
};
use crate::store::{
    AppointmentPatch, AppointmentQuery, DocumentSyncUpdate, NewAppointment, NewMedicalRecord,
    NewPrescription, NewTimeOff, NewTreatmentPlan, PracticeStore, SessionIdentity, SortOrder, StoreError,
    StoreResult,
};

#[derive(Default)]
struct Tables {
    sessions: HashMap<String, SessionIdentity>,
    profiles: Vec<Profile>,
    dentists: Vec<Dentist>,
    appointments: Vec<Appointment>,
    assessments: Vec<SymptomAssessment>,
    treatment_plans: Vec<TreatmentPlan>,
    medical_records: Vec<MedicalRecord>,
    prescriptions: Vec<Prescription>,
    documents: Vec<PatientDocument>,
    events: Vec<CalendarEvent>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failing: Mutex<HashSet<&'static str>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later call to `op` (the trait method name) fail.
    pub fn fail(&self, op: &'static str) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn heal(&self, op: &'static str) {
        self.failing.lock().unwrap().remove(op);
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check(&self, op: &'static str) -> StoreResult<()> {
        if self.failing.lock().unwrap().contains(op) {
            Err(StoreError::Injected(op))
        } else {
            Ok(())
        }
    }

    fn write(&self, op: &'static str) -> StoreResult<()> {
        self.check(op)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    pub fn add_session(&self, token_hash: &str, session: SessionIdentity) {
        self.tables.lock().unwrap().sessions.insert(token_hash.to_string(), session);
    }

    pub fn add_profile(&self, p: Profile) {
        self.tables.lock().unwrap().profiles.push(p);
    }

    pub fn add_dentist(&self, d: Dentist) {
        self.tables.lock().unwrap().dentists.push(d);
    }

    pub fn add_appointment(&self, a: Appointment) {
        self.tables.lock().unwrap().appointments.push(a);
    }

    pub fn add_assessment(&self, a: SymptomAssessment) {
        self.tables.lock().unwrap().assessments.push(a);
    }

    pub fn add_treatment_plan(&self, p: TreatmentPlan) {
        self.tables.lock().unwrap().treatment_plans.push(p);
    }

    pub fn add_prescription(&self, p: Prescription) {
        self.tables.lock().unwrap().prescriptions.push(p);
    }

    pub fn add_document(&self, d: PatientDocument) {
        self.tables.lock().unwrap().documents.push(d);
    }

    pub fn appointment(&self, id: Uuid) -> Option<Appointment> {
        self.tables.lock().unwrap().appointments.iter().find(|a| a.id == id).cloned()
    }

    pub fn all_prescriptions(&self) -> Vec<Prescription> {
        self.tables.lock().unwrap().prescriptions.clone()
    }

    pub fn all_events(&self) -> Vec<CalendarEvent> {
        self.tables.lock().unwrap().events.clone()
    }
}

fn materialize(p: &NewPrescription) -> Prescription {
    Prescription {
        id: Uuid::new_v4(),
        patient_id: p.patient_id,
        dentist_id: p.dentist_id,
        medication_name: p.medication_name.clone(),
        dosage: p.dosage.clone(),
        frequency: p.frequency.to_string(),
        duration_days: p.duration_days,
        instructions: p.instructions.clone(),
        status: p.status,
        prescribed_date: p.prescribed_date,
    }
}

#[async_trait]
impl PracticeStore for MemoryStore {
    async fn session_user(&self, token_hash: &str) -> StoreResult<Option<SessionIdentity>> {
        self.check("session_user")?;
        Ok(self.tables.lock().unwrap().sessions.get(token_hash).cloned())
    }

    async fn profile_by_user(&self, user_id: Uuid) -> StoreResult<Option<Profile>> {
        self.check("profile_by_user")?;
        let t = self.tables.lock().unwrap();
        Ok(t.profiles.iter().find(|p| p.user_id == user_id).cloned())
    }

    async fn profile_by_id(&self, profile_id: Uuid) -> StoreResult<Option<Profile>> {
        self.check("profile_by_id")?;
        let t = self.tables.lock().unwrap();
        Ok(t.profiles.iter().find(|p| p.id == profile_id).cloned())
    }

    async fn dentist_by_profile(&self, profile_id: Uuid) -> StoreResult<Option<Dentist>> {
        self.check("dentist_by_profile")?;
        let t = self.tables.lock().unwrap();
        Ok(t.dentists.iter().find(|d| d.profile_id == profile_id).cloned())
    }

    async fn patients_of_dentist(&self, dentist_id: Uuid) -> StoreResult<Vec<Profile>> {
        self.check("patients_of_dentist")?;
        let t = self.tables.lock().unwrap();
        let mut seen = HashSet::new();
        let mut out = vec![];
        for a in t.appointments.iter().filter(|a| a.dentist_id == dentist_id) {
            if seen.insert(a.patient_id) {
                if let Some(p) = t.profiles.iter().find(|p| p.id == a.patient_id) {
                    out.push(p.clone());
                }
            }
        }
        Ok(out)
    }

    async fn shares_appointment(&self, patient_id: Uuid, dentist_id: Uuid) -> StoreResult<bool> {
        self.check("shares_appointment")?;
        let t = self.tables.lock().unwrap();
        Ok(t.appointments
            .iter()
            .any(|a| a.patient_id == patient_id && a.dentist_id == dentist_id))
    }

    async fn list_appointments(&self, q: &AppointmentQuery) -> StoreResult<Vec<Appointment>> {
        self.check("list_appointments")?;
        let t = self.tables.lock().unwrap();
        let mut rows: Vec<Appointment> = t.appointments.iter().filter(|a| q.matches(a)).cloned().collect();
        rows.sort_by_key(|a| a.appointment_date);
        if q.order == SortOrder::Descending {
            rows.reverse();
        }
        if let Some(limit) = q.limit {
            rows.truncate(limit.max(0) as usize);
        }
        Ok(rows)
    }

    async fn insert_appointment(&self, a: &NewAppointment) -> StoreResult<Appointment> {
        self.write("insert_appointment")?;
        let created = Appointment {
            id: Uuid::new_v4(),
            patient_id: a.patient_id,
            dentist_id: a.dentist_id,
            patient_name: a.patient_name.clone(),
            patient_age: None,
            appointment_date: a.appointment_date,
            duration_minutes: Some(a.duration_minutes),
            reason: a.reason.clone(),
            notes: a.notes.clone(),
            consultation_notes: None,
            status: a.status,
            urgency: a.urgency,
        };
        self.tables.lock().unwrap().appointments.push(created.clone());
        Ok(created)
    }

    async fn update_appointment(
        &self,
        appointment_id: Uuid,
        patch: &AppointmentPatch,
    ) -> StoreResult<Option<Appointment>> {
        self.write("update_appointment")?;
        let mut t = self.tables.lock().unwrap();
        let Some(a) = t.appointments.iter_mut().find(|a| a.id == appointment_id) else {
            return Ok(None);
        };
        if let Some(s) = patch.status {
            a.status = s;
        }
        if let Some(n) = &patch.consultation_notes {
            a.consultation_notes = Some(n.clone());
        }
        Ok(Some(a.clone()))
    }

    async fn complete_with_prescriptions(
        &self,
        appointment_id: Uuid,
        notes: &str,
        prescriptions: &[NewPrescription],
    ) -> StoreResult<Option<(Appointment, Vec<Prescription>)>> {
        self.write("complete_with_prescriptions")?;
        let mut t = self.tables.lock().unwrap();
        let Some(a) = t.appointments.iter_mut().find(|a| a.id == appointment_id) else {
            return Ok(None);
        };
        a.status = AppointmentStatus::Completed;
        a.consultation_notes = Some(notes.to_string());
        let appointment = a.clone();
        let created: Vec<Prescription> = prescriptions.iter().map(materialize).collect();
        t.prescriptions.extend(created.iter().cloned());
        Ok(Some((appointment, created)))
    }

    async fn assessments_for(&self, appointment_ids: &[Uuid]) -> StoreResult<Vec<SymptomAssessment>> {
        self.check("assessments_for")?;
        let t = self.tables.lock().unwrap();
        Ok(t.assessments
            .iter()
            .rev()
            .filter(|a| appointment_ids.contains(&a.appointment_id))
            .cloned()
            .collect())
    }

    async fn treatment_plans_for(&self, patient_id: Uuid, dentist_id: Uuid) -> StoreResult<Vec<TreatmentPlan>> {
        self.check("treatment_plans_for")?;
        let t = self.tables.lock().unwrap();
        let mut rows: Vec<TreatmentPlan> = t
            .treatment_plans
            .iter()
            .filter(|p| p.patient_id == patient_id && p.dentist_id == dentist_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn treatment_plan(&self, plan_id: Uuid) -> StoreResult<Option<TreatmentPlan>> {
        self.check("treatment_plan")?;
        let t = self.tables.lock().unwrap();
        Ok(t.treatment_plans.iter().find(|p| p.id == plan_id).cloned())
    }

    async fn insert_treatment_plan(&self, plan: &NewTreatmentPlan) -> StoreResult<TreatmentPlan> {
        self.write("insert_treatment_plan")?;
        let created = TreatmentPlan {
            id: Uuid::new_v4(),
            patient_id: plan.patient_id,
            dentist_id: plan.dentist_id,
            title: plan.title.clone(),
            diagnosis: plan.diagnosis.clone(),
            description: plan.description.clone(),
            status: plan.status,
            priority: plan.priority,
            estimated_cost: plan.estimated_cost,
            estimated_duration_weeks: plan.estimated_duration_weeks,
            start_date: plan.start_date,
            end_date: plan.end_date,
            notes: plan.notes.clone(),
            treatment_steps: vec![],
            created_at: Utc::now(),
        };
        self.tables.lock().unwrap().treatment_plans.push(created.clone());
        Ok(created)
    }

    async fn replace_treatment_steps(
        &self,
        plan_id: Uuid,
        steps: &[TreatmentStep],
    ) -> StoreResult<Option<TreatmentPlan>> {
        self.write("replace_treatment_steps")?;
        let mut t = self.tables.lock().unwrap();
        let Some(p) = t.treatment_plans.iter_mut().find(|p| p.id == plan_id) else {
            return Ok(None);
        };
        p.treatment_steps = steps.to_vec();
        Ok(Some(p.clone()))
    }

    async fn medical_records_for(&self, patient_id: Uuid, dentist_id: Uuid) -> StoreResult<Vec<MedicalRecord>> {
        self.check("medical_records_for")?;
        let t = self.tables.lock().unwrap();
        let mut rows: Vec<MedicalRecord> = t
            .medical_records
            .iter()
            .filter(|r| r.patient_id == patient_id && r.dentist_id == dentist_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.visit_date.cmp(&a.visit_date));
        Ok(rows)
    }

    async fn insert_medical_record(&self, record: &NewMedicalRecord) -> StoreResult<MedicalRecord> {
        self.write("insert_medical_record")?;
        let created = MedicalRecord {
            id: Uuid::new_v4(),
            patient_id: record.patient_id,
            dentist_id: record.dentist_id,
            title: record.title.clone(),
            record_type: record.record_type.clone(),
            visit_date: record.visit_date,
            description: record.description.clone(),
            findings: record.findings.clone(),
            recommendations: record.recommendations.clone(),
            created_at: Utc::now(),
        };
        self.tables.lock().unwrap().medical_records.push(created.clone());
        Ok(created)
    }

    async fn prescriptions_for(&self, patient_id: Uuid, dentist_id: Uuid) -> StoreResult<Vec<Prescription>> {
        self.check("prescriptions_for")?;
        let t = self.tables.lock().unwrap();
        let mut rows: Vec<Prescription> = t
            .prescriptions
            .iter()
            .filter(|p| p.patient_id == patient_id && p.dentist_id == dentist_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.prescribed_date.cmp(&a.prescribed_date));
        Ok(rows)
    }

    async fn insert_prescriptions(&self, prescriptions: &[NewPrescription]) -> StoreResult<Vec<Prescription>> {
        self.write("insert_prescriptions")?;
        let created: Vec<Prescription> = prescriptions.iter().map(materialize).collect();
        self.tables.lock().unwrap().prescriptions.extend(created.iter().cloned());
        Ok(created)
    }

    async fn documents_for(
        &self,
        dentist_id: Uuid,
        patient_id: Option<Uuid>,
    ) -> StoreResult<Vec<PatientDocument>> {
        self.check("documents_for")?;
        let t = self.tables.lock().unwrap();
        let mut rows: Vec<PatientDocument> = t
            .documents
            .iter()
            .filter(|d| d.dentist_id == dentist_id && patient_id.is_none_or(|p| d.patient_id == p))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn document(&self, document_id: Uuid) -> StoreResult<Option<PatientDocument>> {
        self.check("document")?;
        let t = self.tables.lock().unwrap();
        Ok(t.documents.iter().find(|d| d.id == document_id).cloned())
    }

    async fn mark_document_synced(
        &self,
        document_id: Uuid,
        update: &DocumentSyncUpdate,
    ) -> StoreResult<Option<PatientDocument>> {
        self.write("mark_document_synced")?;
        let mut t = self.tables.lock().unwrap();
        let Some(d) = t.documents.iter_mut().find(|d| d.id == document_id) else {
            return Ok(None);
        };
        d.external_file_id = Some(update.external_file_id.clone());
        d.external_url = update.external_url.clone();
        d.is_synced = true;
        d.last_synced_at = Some(update.synced_at);
        Ok(Some(d.clone()))
    }

    async fn time_off_events(&self, dentist_id: Uuid) -> StoreResult<Vec<CalendarEvent>> {
        self.check("time_off_events")?;
        let t = self.tables.lock().unwrap();
        let mut rows: Vec<CalendarEvent> = t
            .events
            .iter()
            .filter(|e| e.dentist_id == dentist_id && e.event_type == EVENT_TYPE_TIME_OFF)
            .cloned()
            .collect();
        rows.sort_by_key(|e| e.start_datetime);
        Ok(rows)
    }

    async fn insert_time_off(&self, events: &[NewTimeOff]) -> StoreResult<Vec<CalendarEvent>> {
        self.write("insert_time_off")?;
        let created: Vec<CalendarEvent> = events
            .iter()
            .map(|e| CalendarEvent {
                id: Uuid::new_v4(),
                dentist_id: e.dentist_id,
                title: e.title.clone(),
                event_type: EVENT_TYPE_TIME_OFF.to_string(),
                start_datetime: e.start_datetime,
                end_datetime: e.end_datetime,
            })
            .collect();
        self.tables.lock().unwrap().events.extend(created.iter().cloned());
        Ok(created)
    }

    async fn delete_time_off_between(
        &self,
        dentist_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<u64> {
        self.write("delete_time_off_between")?;
        let mut t = self.tables.lock().unwrap();
        let before = t.events.len();
        t.events.retain(|e| {
            !(e.dentist_id == dentist_id
                && e.event_type == EVENT_TYPE_TIME_OFF
                && e.start_datetime >= start
                && e.start_datetime <= end)
        });
        Ok((before - t.events.len()) as u64)
    }
}
