// src/store/postgres.rs

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{types::Json, PgPool, QueryBuilder};
use uuid::Uuid;

use crate::models::{
    Appointment, CalendarEvent, Dentist, MedicalRecord, PatientDocument, Prescription, Profile,
    SymptomAssessment, TreatmentPlan, TreatmentStep, UnknownVariant, EVENT_TYPE_TIME_OFF,
};
use crate::store::{
    AppointmentPatch, AppointmentQuery, DocumentSyncUpdate, NewAppointment, NewMedicalRecord,
    NewPrescription, NewTimeOff, NewTreatmentPlan, PracticeStore, SessionIdentity, SortOrder, StoreError,
    StoreResult,
};

/* -------------------------
   Column lists
--------------------------*/

const PROFILE_COLUMNS: &str = r#"
    p.id, p.user_id, p.email, p.first_name, p.last_name, p.role::text AS role,
    p.phone, p.date_of_birth, p.address, p.emergency_contact, p.medical_history
"#;

const APPOINTMENT_COLUMNS: &str = r#"
    id, patient_id, dentist_id, patient_name, patient_age, appointment_date,
    duration_minutes, reason, notes, consultation_notes,
    COALESCE(status, 'pending')::text AS status,
    COALESCE(urgency, 'low')::text AS urgency
"#;

const TREATMENT_PLAN_COLUMNS: &str = r#"
    id, patient_id, dentist_id, title, diagnosis, description, status, priority,
    estimated_cost::float8 AS estimated_cost, estimated_duration_weeks,
    start_date, end_date, notes, treatment_steps, created_at
"#;

const MEDICAL_RECORD_COLUMNS: &str = r#"
    id, patient_id, dentist_id, title, record_type, visit_date,
    description, findings, recommendations, created_at
"#;

const PRESCRIPTION_COLUMNS: &str = r#"
    id, patient_id, dentist_id, medication_name, dosage, frequency,
    duration_days, instructions, status, prescribed_date
"#;

const DOCUMENT_COLUMNS: &str = r#"
    id, patient_id, dentist_id, document_name, document_type, mime_type,
    file_size::int8 AS file_size,
    google_drive_file_id AS external_file_id,
    google_drive_url AS external_url,
    COALESCE(is_synced, false) AS is_synced,
    last_synced_at, created_at
"#;

const CALENDAR_EVENT_COLUMNS: &str = r#"
    id, dentist_id, title, event_type, start_datetime, end_datetime
"#;

/* -------------------------
   DB Row Models
--------------------------*/

fn parse_text<T>(raw: &str) -> StoreResult<T>
where
    T: FromStr<Err = UnknownVariant>,
{
    raw.parse::<T>()
        .map_err(|e| StoreError::Decode(e.to_string()))
}

#[derive(Debug, sqlx::FromRow)]
struct SessionLookupRow {
    session_token_id: Uuid,
    user_id: Uuid,
}

#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    id: Uuid,
    user_id: Uuid,
    email: String,
    first_name: String,
    last_name: String,
    role: String,
    phone: Option<String>,
    date_of_birth: Option<NaiveDate>,
    address: Option<String>,
    emergency_contact: Option<String>,
    medical_history: Option<String>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = StoreError;

    fn try_from(r: ProfileRow) -> StoreResult<Self> {
        Ok(Profile {
            id: r.id,
            user_id: r.user_id,
            email: r.email,
            first_name: r.first_name,
            last_name: r.last_name,
            role: parse_text(&r.role)?,
            phone: r.phone,
            date_of_birth: r.date_of_birth,
            address: r.address,
            emergency_contact: r.emergency_contact,
            medical_history: r.medical_history,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DentistRow {
    id: Uuid,
    profile_id: Uuid,
    specialization: Option<String>,
    license_number: Option<String>,
    is_active: Option<bool>,
}

impl From<DentistRow> for Dentist {
    fn from(r: DentistRow) -> Self {
        Dentist {
            id: r.id,
            profile_id: r.profile_id,
            specialization: r.specialization,
            license_number: r.license_number,
            is_active: r.is_active.unwrap_or(true),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AppointmentRow {
    id: Uuid,
    patient_id: Uuid,
    dentist_id: Uuid,
    patient_name: Option<String>,
    patient_age: Option<i32>,
    appointment_date: DateTime<Utc>,
    duration_minutes: Option<i32>,
    reason: Option<String>,
    notes: Option<String>,
    consultation_notes: Option<String>,
    status: String,
    urgency: String,
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = StoreError;

    fn try_from(r: AppointmentRow) -> StoreResult<Self> {
        Ok(Appointment {
            id: r.id,
            patient_id: r.patient_id,
            dentist_id: r.dentist_id,
            patient_name: r.patient_name,
            patient_age: r.patient_age,
            appointment_date: r.appointment_date,
            duration_minutes: r.duration_minutes,
            reason: r.reason,
            notes: r.notes,
            consultation_notes: r.consultation_notes,
            status: parse_text(&r.status)?,
            urgency: parse_text(&r.urgency)?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AssessmentRow {
    id: Uuid,
    appointment_id: Uuid,
    pain_level: Option<i32>,
    has_swelling: Option<bool>,
    has_bleeding: Option<bool>,
    duration_symptoms: Option<String>,
    calculated_urgency: Option<String>,
    assessment_score: Option<i32>,
}

impl TryFrom<AssessmentRow> for SymptomAssessment {
    type Error = StoreError;

    fn try_from(r: AssessmentRow) -> StoreResult<Self> {
        Ok(SymptomAssessment {
            id: r.id,
            appointment_id: r.appointment_id,
            pain_level: r.pain_level,
            has_swelling: r.has_swelling,
            has_bleeding: r.has_bleeding,
            duration_symptoms: r.duration_symptoms,
            calculated_urgency: r.calculated_urgency.as_deref().map(parse_text).transpose()?,
            assessment_score: r.assessment_score,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TreatmentPlanRow {
    id: Uuid,
    patient_id: Uuid,
    dentist_id: Uuid,
    title: String,
    diagnosis: Option<String>,
    description: Option<String>,
    status: String,
    priority: String,
    estimated_cost: Option<f64>,
    estimated_duration_weeks: Option<i32>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    notes: Option<String>,
    treatment_steps: Option<Json<Vec<TreatmentStep>>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TreatmentPlanRow> for TreatmentPlan {
    type Error = StoreError;

    fn try_from(r: TreatmentPlanRow) -> StoreResult<Self> {
        Ok(TreatmentPlan {
            id: r.id,
            patient_id: r.patient_id,
            dentist_id: r.dentist_id,
            title: r.title,
            diagnosis: r.diagnosis,
            description: r.description,
            status: parse_text(&r.status)?,
            priority: parse_text(&r.priority)?,
            estimated_cost: r.estimated_cost,
            estimated_duration_weeks: r.estimated_duration_weeks,
            start_date: r.start_date,
            end_date: r.end_date,
            notes: r.notes,
            treatment_steps: r.treatment_steps.map(|j| j.0).unwrap_or_default(),
            created_at: r.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MedicalRecordRow {
    id: Uuid,
    patient_id: Uuid,
    dentist_id: Uuid,
    title: String,
    record_type: String,
    visit_date: NaiveDate,
    description: Option<String>,
    findings: Option<String>,
    recommendations: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<MedicalRecordRow> for MedicalRecord {
    fn from(r: MedicalRecordRow) -> Self {
        MedicalRecord {
            id: r.id,
            patient_id: r.patient_id,
            dentist_id: r.dentist_id,
            title: r.title,
            record_type: r.record_type,
            visit_date: r.visit_date,
            description: r.description,
            findings: r.findings,
            recommendations: r.recommendations,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PrescriptionRow {
    id: Uuid,
    patient_id: Uuid,
    dentist_id: Uuid,
    medication_name: String,
    dosage: String,
    frequency: String,
    duration_days: Option<i32>,
    instructions: Option<String>,
    status: String,
    prescribed_date: NaiveDate,
}

impl TryFrom<PrescriptionRow> for Prescription {
    type Error = StoreError;

    fn try_from(r: PrescriptionRow) -> StoreResult<Self> {
        Ok(Prescription {
            id: r.id,
            patient_id: r.patient_id,
            dentist_id: r.dentist_id,
            medication_name: r.medication_name,
            dosage: r.dosage,
            frequency: r.frequency,
            duration_days: r.duration_days,
            instructions: r.instructions,
            status: parse_text(&r.status)?,
            prescribed_date: r.prescribed_date,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    id: Uuid,
    patient_id: Uuid,
    dentist_id: Uuid,
    document_name: String,
    document_type: String,
    mime_type: Option<String>,
    file_size: Option<i64>,
    external_file_id: Option<String>,
    external_url: Option<String>,
    is_synced: bool,
    last_synced_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<DocumentRow> for PatientDocument {
    fn from(r: DocumentRow) -> Self {
        PatientDocument {
            id: r.id,
            patient_id: r.patient_id,
            dentist_id: r.dentist_id,
            document_name: r.document_name,
            document_type: r.document_type,
            mime_type: r.mime_type,
            file_size: r.file_size,
            external_file_id: r.external_file_id,
            external_url: r.external_url,
            is_synced: r.is_synced,
            last_synced_at: r.last_synced_at,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CalendarEventRow {
    id: Uuid,
    dentist_id: Uuid,
    title: String,
    event_type: String,
    start_datetime: DateTime<Utc>,
    end_datetime: DateTime<Utc>,
}

impl From<CalendarEventRow> for CalendarEvent {
    fn from(r: CalendarEventRow) -> Self {
        CalendarEvent {
            id: r.id,
            dentist_id: r.dentist_id,
            title: r.title,
            event_type: r.event_type,
            start_datetime: r.start_datetime,
            end_datetime: r.end_datetime,
        }
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

/// Like `convert_all`, but a row whose text columns fall outside the known
/// vocabulary is logged and skipped. Used for plain `text` columns the old
/// clients wrote freely.
fn convert_lenient<R, T>(rows: Vec<R>, table: &'static str) -> Vec<T>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter()
        .filter_map(|r| match T::try_from(r) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(error = %e, table, "skipping undecodable row");
                None
            }
        })
        .collect()
}

/* -------------------------
   Store
--------------------------*/

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PracticeStore for PgStore {
    async fn session_user(&self, token_hash: &str) -> StoreResult<Option<SessionIdentity>> {
        let row: Option<SessionLookupRow> = sqlx::query_as::<_, SessionLookupRow>(
            r#"
            SELECT session_token_id, user_id
            FROM session_token
            WHERE session_token_hash = $1
              AND revoked_at IS NULL
              AND expires_at > now()
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.db)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        // Touch last_seen_at (best-effort)
        let _ = sqlx::query(
            r#"
            UPDATE session_token
            SET last_seen_at = now()
            WHERE session_token_id = $1
            "#,
        )
        .bind(row.session_token_id)
        .execute(&self.db)
        .await;

        Ok(Some(SessionIdentity {
            session_token_id: row.session_token_id,
            user_id: row.user_id,
        }))
    }

    async fn profile_by_user(&self, user_id: Uuid) -> StoreResult<Option<Profile>> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles p WHERE p.user_id = $1");
        sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .map(Profile::try_from)
            .transpose()
    }

    async fn profile_by_id(&self, profile_id: Uuid) -> StoreResult<Option<Profile>> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles p WHERE p.id = $1");
        sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(profile_id)
            .fetch_optional(&self.db)
            .await?
            .map(Profile::try_from)
            .transpose()
    }

    async fn dentist_by_profile(&self, profile_id: Uuid) -> StoreResult<Option<Dentist>> {
        let row: Option<DentistRow> = sqlx::query_as::<_, DentistRow>(
            r#"
            SELECT id, profile_id, specialization, license_number, is_active
            FROM dentists
            WHERE profile_id = $1
            "#,
        )
        .bind(profile_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Dentist::from))
    }

    async fn patients_of_dentist(&self, dentist_id: Uuid) -> StoreResult<Vec<Profile>> {
        let sql = format!(
            r#"
            SELECT DISTINCT ON (p.id) {PROFILE_COLUMNS}
            FROM appointments a
            JOIN profiles p ON p.id = a.patient_id
            WHERE a.dentist_id = $1
            ORDER BY p.id, a.appointment_date ASC
            "#
        );
        let rows: Vec<ProfileRow> = sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(dentist_id)
            .fetch_all(&self.db)
            .await?;

        convert_all(rows)
    }

    async fn shares_appointment(&self, patient_id: Uuid, dentist_id: Uuid) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
              SELECT 1 FROM appointments
              WHERE patient_id = $1 AND dentist_id = $2
            )
            "#,
        )
        .bind(patient_id)
        .bind(dentist_id)
        .fetch_one(&self.db)
        .await?;

        Ok(exists)
    }

    async fn list_appointments(&self, q: &AppointmentQuery) -> StoreResult<Vec<Appointment>> {
        let mut qb: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new(format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE 1=1 "));

        if let Some(d) = q.dentist_id {
            qb.push(" AND dentist_id = ");
            qb.push_bind(d);
        }
        if let Some(p) = q.patient_id {
            qb.push(" AND patient_id = ");
            qb.push_bind(p);
        }
        if !q.statuses.is_empty() {
            let statuses: Vec<String> = q.statuses.iter().map(|s| s.as_str().to_string()).collect();
            qb.push(" AND status::text = ANY(");
            qb.push_bind(statuses);
            qb.push(") ");
        }
        if let Some(from) = q.from {
            qb.push(" AND appointment_date >= ");
            qb.push_bind(from);
        }
        if let Some(until) = q.until {
            qb.push(" AND appointment_date <= ");
            qb.push_bind(until);
        }

        match q.order {
            SortOrder::Ascending => qb.push(" ORDER BY appointment_date ASC "),
            SortOrder::Descending => qb.push(" ORDER BY appointment_date DESC "),
        };

        if let Some(limit) = q.limit {
            qb.push(" LIMIT ");
            qb.push_bind(limit);
        }

        let rows: Vec<AppointmentRow> = qb
            .build_query_as::<AppointmentRow>()
            .fetch_all(&self.db)
            .await?;

        convert_all(rows)
    }

    async fn insert_appointment(&self, a: &NewAppointment) -> StoreResult<Appointment> {
        let sql = format!(
            r#"
            INSERT INTO appointments
              (patient_id, dentist_id, patient_name, appointment_date, duration_minutes,
               reason, notes, status, urgency)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8::appointment_status,$9::urgency_level)
            RETURNING {APPOINTMENT_COLUMNS}
            "#
        );
        let row: AppointmentRow = sqlx::query_as::<_, AppointmentRow>(&sql)
            .bind(a.patient_id)
            .bind(a.dentist_id)
            .bind(a.patient_name.as_deref())
            .bind(a.appointment_date)
            .bind(a.duration_minutes)
            .bind(a.reason.as_deref())
            .bind(a.notes.as_deref())
            .bind(a.status.as_str())
            .bind(a.urgency.as_str())
            .fetch_one(&self.db)
            .await?;

        Appointment::try_from(row)
    }

    async fn update_appointment(
        &self,
        appointment_id: Uuid,
        patch: &AppointmentPatch,
    ) -> StoreResult<Option<Appointment>> {
        let sql = format!(
            r#"
            UPDATE appointments
            SET status = COALESCE($2::appointment_status, status),
                consultation_notes = COALESCE($3, consultation_notes),
                updated_at = now()
            WHERE id = $1
            RETURNING {APPOINTMENT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, AppointmentRow>(&sql)
            .bind(appointment_id)
            .bind(patch.status.map(|s| s.as_str()))
            .bind(patch.consultation_notes.as_deref())
            .fetch_optional(&self.db)
            .await?
            .map(Appointment::try_from)
            .transpose()
    }

    async fn complete_with_prescriptions(
        &self,
        appointment_id: Uuid,
        notes: &str,
        prescriptions: &[NewPrescription],
    ) -> StoreResult<Option<(Appointment, Vec<Prescription>)>> {
        let mut tx = self.db.begin().await?;

        let sql = format!(
            r#"
            UPDATE appointments
            SET status = 'completed',
                consultation_notes = $2,
                updated_at = now()
            WHERE id = $1
            RETURNING {APPOINTMENT_COLUMNS}
            "#
        );
        let row: Option<AppointmentRow> = sqlx::query_as::<_, AppointmentRow>(&sql)
            .bind(appointment_id)
            .bind(notes)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };
        let appointment = Appointment::try_from(row)?;

        let mut created = Vec::with_capacity(prescriptions.len());
        for p in prescriptions {
            created.push(insert_prescription(&mut tx, p).await?);
        }

        tx.commit().await?;
        Ok(Some((appointment, created)))
    }

    async fn assessments_for(&self, appointment_ids: &[Uuid]) -> StoreResult<Vec<SymptomAssessment>> {
        if appointment_ids.is_empty() {
            return Ok(vec![]);
        }
        let rows: Vec<AssessmentRow> = sqlx::query_as::<_, AssessmentRow>(
            r#"
            SELECT id, appointment_id, pain_level, has_swelling, has_bleeding,
                   duration_symptoms, calculated_urgency::text AS calculated_urgency,
                   assessment_score
            FROM urgency_assessments
            WHERE appointment_id = ANY($1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(appointment_ids)
        .fetch_all(&self.db)
        .await?;

        convert_all(rows)
    }

    async fn treatment_plans_for(&self, patient_id: Uuid, dentist_id: Uuid) -> StoreResult<Vec<TreatmentPlan>> {
        let sql = format!(
            r#"
            SELECT {TREATMENT_PLAN_COLUMNS}
            FROM treatment_plans
            WHERE patient_id = $1 AND dentist_id = $2
            ORDER BY created_at DESC
            "#
        );
        let rows: Vec<TreatmentPlanRow> = sqlx::query_as::<_, TreatmentPlanRow>(&sql)
            .bind(patient_id)
            .bind(dentist_id)
            .fetch_all(&self.db)
            .await?;

        Ok(convert_lenient(rows, "treatment_plans"))
    }

    async fn treatment_plan(&self, plan_id: Uuid) -> StoreResult<Option<TreatmentPlan>> {
        let sql = format!("SELECT {TREATMENT_PLAN_COLUMNS} FROM treatment_plans WHERE id = $1");
        sqlx::query_as::<_, TreatmentPlanRow>(&sql)
            .bind(plan_id)
            .fetch_optional(&self.db)
            .await?
            .map(TreatmentPlan::try_from)
            .transpose()
    }

    async fn insert_treatment_plan(&self, plan: &NewTreatmentPlan) -> StoreResult<TreatmentPlan> {
        let sql = format!(
            r#"
            INSERT INTO treatment_plans
              (patient_id, dentist_id, title, diagnosis, description, status, priority,
               estimated_cost, estimated_duration_weeks, start_date, end_date, notes, treatment_steps)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,'[]'::jsonb)
            RETURNING {TREATMENT_PLAN_COLUMNS}
            "#
        );
        let row: TreatmentPlanRow = sqlx::query_as::<_, TreatmentPlanRow>(&sql)
            .bind(plan.patient_id)
            .bind(plan.dentist_id)
            .bind(&plan.title)
            .bind(plan.diagnosis.as_deref())
            .bind(plan.description.as_deref())
            .bind(plan.status.as_str())
            .bind(plan.priority.as_str())
            .bind(plan.estimated_cost)
            .bind(plan.estimated_duration_weeks)
            .bind(plan.start_date)
            .bind(plan.end_date)
            .bind(plan.notes.as_deref())
            .fetch_one(&self.db)
            .await?;

        TreatmentPlan::try_from(row)
    }

    async fn replace_treatment_steps(
        &self,
        plan_id: Uuid,
        steps: &[TreatmentStep],
    ) -> StoreResult<Option<TreatmentPlan>> {
        let sql = format!(
            r#"
            UPDATE treatment_plans
            SET treatment_steps = $2, updated_at = now()
            WHERE id = $1
            RETURNING {TREATMENT_PLAN_COLUMNS}
            "#
        );
        sqlx::query_as::<_, TreatmentPlanRow>(&sql)
            .bind(plan_id)
            .bind(Json(steps))
            .fetch_optional(&self.db)
            .await?
            .map(TreatmentPlan::try_from)
            .transpose()
    }

    async fn medical_records_for(&self, patient_id: Uuid, dentist_id: Uuid) -> StoreResult<Vec<MedicalRecord>> {
        let sql = format!(
            r#"
            SELECT {MEDICAL_RECORD_COLUMNS}
            FROM medical_records
            WHERE patient_id = $1 AND dentist_id = $2
            ORDER BY visit_date DESC
            "#
        );
        let rows: Vec<MedicalRecordRow> = sqlx::query_as::<_, MedicalRecordRow>(&sql)
            .bind(patient_id)
            .bind(dentist_id)
            .fetch_all(&self.db)
            .await?;

        Ok(rows.into_iter().map(MedicalRecord::from).collect())
    }

    async fn insert_medical_record(&self, record: &NewMedicalRecord) -> StoreResult<MedicalRecord> {
        let sql = format!(
            r#"
            INSERT INTO medical_records
              (patient_id, dentist_id, title, record_type, visit_date, description, findings, recommendations)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
            RETURNING {MEDICAL_RECORD_COLUMNS}
            "#
        );
        let row: MedicalRecordRow = sqlx::query_as::<_, MedicalRecordRow>(&sql)
            .bind(record.patient_id)
            .bind(record.dentist_id)
            .bind(&record.title)
            .bind(&record.record_type)
            .bind(record.visit_date)
            .bind(record.description.as_deref())
            .bind(record.findings.as_deref())
            .bind(record.recommendations.as_deref())
            .fetch_one(&self.db)
            .await?;

        Ok(MedicalRecord::from(row))
    }

    async fn prescriptions_for(&self, patient_id: Uuid, dentist_id: Uuid) -> StoreResult<Vec<Prescription>> {
        let sql = format!(
            r#"
            SELECT {PRESCRIPTION_COLUMNS}
            FROM prescriptions
            WHERE patient_id = $1 AND dentist_id = $2
            ORDER BY prescribed_date DESC
            "#
        );
        let rows: Vec<PrescriptionRow> = sqlx::query_as::<_, PrescriptionRow>(&sql)
            .bind(patient_id)
            .bind(dentist_id)
            .fetch_all(&self.db)
            .await?;

        Ok(convert_lenient(rows, "prescriptions"))
    }

    async fn insert_prescriptions(&self, prescriptions: &[NewPrescription]) -> StoreResult<Vec<Prescription>> {
        let mut tx = self.db.begin().await?;
        let mut created = Vec::with_capacity(prescriptions.len());
        for p in prescriptions {
            created.push(insert_prescription(&mut tx, p).await?);
        }
        tx.commit().await?;
        Ok(created)
    }

    async fn documents_for(
        &self,
        dentist_id: Uuid,
        patient_id: Option<Uuid>,
    ) -> StoreResult<Vec<PatientDocument>> {
        let mut qb: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
            "SELECT {DOCUMENT_COLUMNS} FROM patient_documents WHERE dentist_id = "
        ));
        qb.push_bind(dentist_id);
        if let Some(pid) = patient_id {
            qb.push(" AND patient_id = ");
            qb.push_bind(pid);
        }
        qb.push(" ORDER BY created_at DESC ");

        let rows: Vec<DocumentRow> = qb
            .build_query_as::<DocumentRow>()
            .fetch_all(&self.db)
            .await?;

        Ok(rows.into_iter().map(PatientDocument::from).collect())
    }

    async fn document(&self, document_id: Uuid) -> StoreResult<Option<PatientDocument>> {
        let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM patient_documents WHERE id = $1");
        let row: Option<DocumentRow> = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(document_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(row.map(PatientDocument::from))
    }

    async fn mark_document_synced(
        &self,
        document_id: Uuid,
        update: &DocumentSyncUpdate,
    ) -> StoreResult<Option<PatientDocument>> {
        let sql = format!(
            r#"
            UPDATE patient_documents
            SET google_drive_file_id = $2,
                google_drive_url = $3,
                is_synced = true,
                last_synced_at = $4,
                updated_at = now()
            WHERE id = $1
            RETURNING {DOCUMENT_COLUMNS}
            "#
        );
        let row: Option<DocumentRow> = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(document_id)
            .bind(&update.external_file_id)
            .bind(update.external_url.as_deref())
            .bind(update.synced_at)
            .fetch_optional(&self.db)
            .await?;

        Ok(row.map(PatientDocument::from))
    }

    async fn time_off_events(&self, dentist_id: Uuid) -> StoreResult<Vec<CalendarEvent>> {
        let sql = format!(
            r#"
            SELECT {CALENDAR_EVENT_COLUMNS}
            FROM calendar_events
            WHERE dentist_id = $1 AND event_type = $2
            ORDER BY start_datetime ASC
            "#
        );
        let rows: Vec<CalendarEventRow> = sqlx::query_as::<_, CalendarEventRow>(&sql)
            .bind(dentist_id)
            .bind(EVENT_TYPE_TIME_OFF)
            .fetch_all(&self.db)
            .await?;

        Ok(rows.into_iter().map(CalendarEvent::from).collect())
    }

    async fn insert_time_off(&self, events: &[NewTimeOff]) -> StoreResult<Vec<CalendarEvent>> {
        let sql = format!(
            r#"
            INSERT INTO calendar_events (dentist_id, title, event_type, start_datetime, end_datetime)
            VALUES ($1,$2,$3,$4,$5)
            RETURNING {CALENDAR_EVENT_COLUMNS}
            "#
        );

        let mut tx = self.db.begin().await?;
        let mut created = Vec::with_capacity(events.len());
        for ev in events {
            let row: CalendarEventRow = sqlx::query_as::<_, CalendarEventRow>(&sql)
                .bind(ev.dentist_id)
                .bind(&ev.title)
                .bind(EVENT_TYPE_TIME_OFF)
                .bind(ev.start_datetime)
                .bind(ev.end_datetime)
                .fetch_one(&mut *tx)
                .await?;
            created.push(CalendarEvent::from(row));
        }
        tx.commit().await?;

        Ok(created)
    }

    async fn delete_time_off_between(
        &self,
        dentist_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let res = sqlx::query(
            r#"
            DELETE FROM calendar_events
            WHERE dentist_id = $1
              AND event_type = $2
              AND start_datetime >= $3
              AND start_datetime <= $4
            "#,
        )
        .bind(dentist_id)
        .bind(EVENT_TYPE_TIME_OFF)
        .bind(start)
        .bind(end)
        .execute(&self.db)
        .await?;

        Ok(res.rows_affected())
    }
}

async fn insert_prescription(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    p: &NewPrescription,
) -> StoreResult<Prescription> {
    let sql = format!(
        r#"
        INSERT INTO prescriptions
          (patient_id, dentist_id, medication_name, dosage, frequency,
           duration_days, instructions, status, prescribed_date)
        VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
        RETURNING {PRESCRIPTION_COLUMNS}
        "#
    );
    let row: PrescriptionRow = sqlx::query_as::<_, PrescriptionRow>(&sql)
        .bind(p.patient_id)
        .bind(p.dentist_id)
        .bind(&p.medication_name)
        .bind(&p.dosage)
        .bind(p.frequency.as_str())
        .bind(p.duration_days)
        .bind(p.instructions.as_deref())
        .bind(p.status.as_str())
        .bind(p.prescribed_date)
        .fetch_one(&mut **tx)
        .await?;

    Prescription::try_from(row)
}
