// src/routes/agenda_routes.rs

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{
    error::ApiError,
    middleware::auth_context::DentistContext,
    models::{ApiOk, AppState},
    services::{
        agenda::{self, DayAgenda},
        availability::local_today,
    },
};

pub fn router() -> Router<AppState> {
    Router::new().route("/agenda", get(get_agenda))
}

#[derive(Debug, Deserialize)]
pub struct AgendaQuery {
    /// Defaults to today at the practice.
    pub date: Option<NaiveDate>,
}

pub async fn get_agenda(
    State(state): State<AppState>,
    ctx: DentistContext,
    Query(q): Query<AgendaQuery>,
) -> Result<Json<ApiOk<DayAgenda>>, ApiError> {
    let offset = state.settings.practice_offset;
    let date = q.date.unwrap_or_else(|| local_today(offset));
    let day = agenda::day_agenda(state.store.as_ref(), ctx.dentist_id(), date, offset).await?;
    Ok(Json(ApiOk { data: day }))
}
