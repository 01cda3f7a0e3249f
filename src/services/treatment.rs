// Treatment plans and their step checklists.
//
// Steps live inside the plan row and are always replaced as a whole list.
// Two dentists editing the same plan race; the last write wins.

use chrono::NaiveDate;
use rand::Rng;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::DashboardError;
use crate::models::{TreatmentPlan, TreatmentPlanStatus, TreatmentPriority, TreatmentStep};
use crate::store::{NewTreatmentPlan, PracticeStore};

use super::dossier::ensure_shared_patient;
use super::{fetch_failed, write_failed};

const STEP_ID_LEN: usize = 7;
const STEP_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

#[derive(Debug, Clone, Deserialize)]
pub struct TreatmentPlanInput {
    pub title: String,
    pub diagnosis: Option<String>,
    pub description: Option<String>,
    pub status: Option<TreatmentPlanStatus>,
    pub priority: Option<TreatmentPriority>,
    pub estimated_cost: Option<f64>,
    pub estimated_duration_weeks: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

pub async fn create_plan(
    store: &dyn PracticeStore,
    patient_id: Uuid,
    dentist_id: Uuid,
    input: TreatmentPlanInput,
) -> Result<TreatmentPlan, DashboardError> {
    let title = input.title.trim();
    if title.is_empty() {
        return Err(DashboardError::Validation("Title is required".into()));
    }
    if let (Some(start), Some(end)) = (input.start_date, input.end_date) {
        if end < start {
            return Err(DashboardError::Validation("End date is before start date".into()));
        }
    }
    ensure_shared_patient(store, patient_id, dentist_id).await?;

    let plan = NewTreatmentPlan {
        patient_id,
        dentist_id,
        title: title.to_string(),
        diagnosis: input.diagnosis,
        description: input.description,
        status: input.status.unwrap_or(TreatmentPlanStatus::Draft),
        priority: input.priority.unwrap_or(TreatmentPriority::Medium),
        estimated_cost: input.estimated_cost,
        estimated_duration_weeks: input.estimated_duration_weeks,
        start_date: input.start_date,
        end_date: input.end_date,
        notes: input.notes,
    };
    store
        .insert_treatment_plan(&plan)
        .await
        .map_err(|e| write_failed("save treatment plan", e))
}

pub fn new_step_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..STEP_ID_LEN)
        .map(|_| STEP_ID_ALPHABET[rng.gen_range(0..STEP_ID_ALPHABET.len())] as char)
        .collect()
}

/// Returns a new list with one more unchecked step at the end.
pub fn with_step_added(steps: &[TreatmentStep], title: &str) -> Result<Vec<TreatmentStep>, DashboardError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(DashboardError::Validation("Step title is required".into()));
    }
    let mut rng = rand::thread_rng();
    let id = loop {
        let candidate = new_step_id(&mut rng);
        if steps.iter().all(|s| s.id != candidate) {
            break candidate;
        }
    };

    let mut next = steps.to_vec();
    next.push(TreatmentStep {
        id,
        title: title.to_string(),
        completed: false,
    });
    Ok(next)
}

/// Returns a new list with the step's completed flag flipped.
pub fn with_step_toggled(steps: &[TreatmentStep], step_id: &str) -> Result<Vec<TreatmentStep>, DashboardError> {
    if !steps.iter().any(|s| s.id == step_id) {
        return Err(DashboardError::NotFound(format!("Step {step_id} not found")));
    }
    Ok(steps
        .iter()
        .map(|s| TreatmentStep {
            completed: if s.id == step_id { !s.completed } else { s.completed },
            ..s.clone()
        })
        .collect())
}

async fn owned_plan(store: &dyn PracticeStore, plan_id: Uuid, dentist_id: Uuid) -> Result<TreatmentPlan, DashboardError> {
    let plan = store
        .treatment_plan(plan_id)
        .await
        .map_err(|e| fetch_failed("treatment plan", e))?
        .ok_or_else(|| DashboardError::NotFound("Treatment plan not found".into()))?;
    if plan.dentist_id != dentist_id {
        return Err(DashboardError::Forbidden("Only the authoring dentist can change this plan".into()));
    }
    Ok(plan)
}

pub async fn steps(store: &dyn PracticeStore, plan_id: Uuid, dentist_id: Uuid) -> Result<Vec<TreatmentStep>, DashboardError> {
    Ok(owned_plan(store, plan_id, dentist_id).await?.treatment_steps)
}

async fn replace_steps(
    store: &dyn PracticeStore,
    plan_id: Uuid,
    steps: &[TreatmentStep],
) -> Result<Vec<TreatmentStep>, DashboardError> {
    let plan = store
        .replace_treatment_steps(plan_id, steps)
        .await
        .map_err(|e| write_failed("update treatment steps", e))?
        .ok_or_else(|| DashboardError::Transition("Treatment plan no longer exists".into()))?;
    Ok(plan.treatment_steps)
}

pub async fn add_step(
    store: &dyn PracticeStore,
    plan_id: Uuid,
    dentist_id: Uuid,
    title: &str,
) -> Result<Vec<TreatmentStep>, DashboardError> {
    let plan = owned_plan(store, plan_id, dentist_id).await?;
    let next = with_step_added(&plan.treatment_steps, title)?;
    replace_steps(store, plan_id, &next).await
}

pub async fn toggle_step(
    store: &dyn PracticeStore,
    plan_id: Uuid,
    dentist_id: Uuid,
    step_id: &str,
) -> Result<Vec<TreatmentStep>, DashboardError> {
    let plan = owned_plan(store, plan_id, dentist_id).await?;
    let next = with_step_toggled(&plan.treatment_steps, step_id)?;
    replace_steps(store, plan_id, &next).await
}
