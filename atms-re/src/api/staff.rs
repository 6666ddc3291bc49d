//! Staff sync API

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::services::staff_sync;
use crate::{ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct StaffSyncResponse {
    pub staff_id: i64,
    pub sessions_relinked: usize,
}

/// POST /api/staff/:id/sync
///
/// Scoped staff-session sync, invoked by the host application right after
/// a staff member's registered-subjects set changes.
pub async fn sync_staff(
    State(state): State<AppState>,
    Path(staff_id): Path<i64>,
) -> ApiResult<Json<StaffSyncResponse>> {
    let sessions_relinked = staff_sync::sync_staff_subjects(&state.db, staff_id).await?;
    Ok(Json(StaffSyncResponse {
        staff_id,
        sessions_relinked,
    }))
}
