// Dentist time off, stored as one calendar event per blocked day.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DashboardError;
use crate::models::Notice;
use crate::store::{NewTimeOff, PracticeStore};

use super::{fetch_failed, write_failed};

pub const TIME_OFF_TITLE: &str = "Time Off";

/// Days picked on the calendar but not yet committed. Keyed by calendar day,
/// so picking the same day twice keeps one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeOffSelection(BTreeSet<NaiveDate>);

impl TimeOffSelection {
    pub fn toggle(&mut self, date: NaiveDate) {
        if !self.0.remove(&date) {
            self.0.insert(date);
        }
    }

    #[cfg(test)]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.0.contains(&date)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.0.iter().copied()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl FromIterator<NaiveDate> for TimeOffSelection {
    fn from_iter<I: IntoIterator<Item = NaiveDate>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// First and last millisecond of `date` in the practice's time zone.
pub fn day_bounds(date: NaiveDate, offset: FixedOffset) -> Result<(DateTime<Utc>, DateTime<Utc>), DashboardError> {
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .and_then(|naive| offset.from_local_datetime(&naive).single())
        .ok_or_else(|| DashboardError::Validation(format!("Invalid date: {date}")))?;
    let start = midnight.with_timezone(&Utc);
    let end = start + Duration::days(1) - Duration::milliseconds(1);
    Ok((start, end))
}

pub fn local_date(at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    at.with_timezone(&offset).date_naive()
}

pub fn local_today(offset: FixedOffset) -> NaiveDate {
    local_date(Utc::now(), offset)
}

/// Blocked days, ascending, one entry per day.
pub async fn list_time_off(
    store: &dyn PracticeStore,
    dentist_id: Uuid,
    offset: FixedOffset,
) -> Result<Vec<NaiveDate>, DashboardError> {
    let events = store
        .time_off_events(dentist_id)
        .await
        .map_err(|e| fetch_failed("time off", e))?;
    let days: BTreeSet<NaiveDate> = events
        .iter()
        .map(|e| local_date(e.start_datetime, offset))
        .collect();
    Ok(days.into_iter().collect())
}

#[derive(Debug, Clone, Serialize)]
pub struct CommitOutcome {
    pub created: Vec<NaiveDate>,
    /// Selected days that were already blocked; nothing was written for them.
    pub already_blocked: Vec<NaiveDate>,
    pub blocked: Vec<NaiveDate>,
    pub notice: Notice,
}

/// Writes one time-off event per selected day that is not blocked yet, then
/// clears the selection. On failure the selection is left as it was.
pub async fn commit(
    store: &dyn PracticeStore,
    dentist_id: Uuid,
    selection: &mut TimeOffSelection,
    offset: FixedOffset,
) -> Result<CommitOutcome, DashboardError> {
    if selection.is_empty() {
        return Err(DashboardError::Validation(
            "Please select at least one date for time off".into(),
        ));
    }

    let selected = selection.len();
    let existing: BTreeSet<NaiveDate> = list_time_off(store, dentist_id, offset).await?.into_iter().collect();
    let (already_blocked, created): (Vec<NaiveDate>, Vec<NaiveDate>) =
        selection.dates().partition(|d| existing.contains(d));

    let events = created
        .iter()
        .map(|d| -> Result<NewTimeOff, DashboardError> {
            let (start, end) = day_bounds(*d, offset)?;
            Ok(NewTimeOff {
                dentist_id,
                title: TIME_OFF_TITLE.to_string(),
                start_datetime: start,
                end_datetime: end,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if !events.is_empty() {
        store
            .insert_time_off(&events)
            .await
            .map_err(|e| write_failed("schedule time off", e))?;
    }
    selection.clear();

    let blocked = match list_time_off(store, dentist_id, offset).await {
        Ok(days) => days,
        Err(_) => {
            let mut days = existing.clone();
            days.extend(created.iter().copied());
            days.into_iter().collect()
        }
    };

    let notice = Notice::new(
        "Success",
        format!("Time off scheduled for {} day(s)", created.len()),
    );
    tracing::info!(%dentist_id, selected, created = created.len(), skipped = already_blocked.len(), "time off committed");

    Ok(CommitOutcome {
        created,
        already_blocked,
        blocked,
        notice,
    })
}

/// Deletes every time-off event starting on `date`. Returns how many went.
pub async fn remove(
    store: &dyn PracticeStore,
    dentist_id: Uuid,
    date: NaiveDate,
    offset: FixedOffset,
) -> Result<u64, DashboardError> {
    let (start, end) = day_bounds(date, offset)?;
    store
        .delete_time_off_between(dentist_id, start, end)
        .await
        .map_err(|e| write_failed("remove time off", e))
}
