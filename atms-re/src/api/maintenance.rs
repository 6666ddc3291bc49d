//! Maintenance pass API
//!
//! Admin triggers for the reconciliation pass and its diagnostic view.

use axum::{extract::State, Json};

use crate::services::maintenance::{CohortDistribution, MaintenanceService};
use crate::services::MaintenanceReport;
use crate::{ApiResult, AppState};

/// POST /api/maintenance/run
///
/// Runs one full maintenance pass and returns what it changed.
/// Returns 409 when a pass is already in progress.
pub async fn run_maintenance(State(state): State<AppState>) -> ApiResult<Json<MaintenanceReport>> {
    let service = MaintenanceService::new(state.db.clone(), state.maintenance_lock.clone());
    let report = service.run_pass().await?;
    Ok(Json(report))
}

/// GET /api/maintenance/distribution
///
/// Cohort population vs. scheduled sessions, with the cohorts that have
/// sessions but no students.
pub async fn cohort_distribution(
    State(state): State<AppState>,
) -> ApiResult<Json<CohortDistribution>> {
    let service = MaintenanceService::new(state.db.clone(), state.maintenance_lock.clone());
    let distribution = service.cohort_distribution().await?;
    Ok(Json(distribution))
}
