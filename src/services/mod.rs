pub mod agenda;
pub mod assist;
pub mod availability;
pub mod documents;
pub mod dossier;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod lifecycle;
pub mod profile;
pub mod treatment;
pub mod triage;

use crate::error::DashboardError;
use crate::store::StoreError;

/// Logs a failed read and turns it into a `Fetch` error.
pub(crate) fn fetch_failed(what: &str, e: StoreError) -> DashboardError {
    tracing::warn!(error = %e, "failed to load {what}");
    DashboardError::Fetch(format!("Could not load {what}"))
}

/// Logs a failed write and turns it into a `Transition` error.
pub(crate) fn write_failed(what: &str, e: StoreError) -> DashboardError {
    tracing::error!(error = %e, "failed to {what}");
    DashboardError::Transition(format!("Could not {what}"))
}
