//! atms-re library - Roster Engine module
//!
//! Keeps the three independently-edited classification axes (student
//! enrollment, timetable scheduling, staff-subject assignment) mutually
//! consistent, merges duplicate subject records, and aggregates raw
//! attendance marks into compliance percentages.

use axum::Router;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Mutex;

pub mod api;
pub mod db;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Serializes maintenance passes; concurrent triggers are rejected
    pub maintenance_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            db,
            maintenance_lock: Arc::new(Mutex::new(())),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .merge(api::health_routes())
        .route("/api/maintenance/run", post(api::run_maintenance))
        .route("/api/maintenance/distribution", get(api::cohort_distribution))
        .route("/api/staff/:id/sync", post(api::sync_staff))
        .route("/api/attendance/subject", get(api::subject_percentage))
        .route("/api/attendance/overall", get(api::overall_attendance))
        .route("/api/attendance/range", get(api::range_percentage))
        .route("/api/attendance/report", get(api::range_report))
        .route("/api/attendance/low", get(api::low_attendance))
        .layer(tower_http::cors::CorsLayer::permissive())
        .with_state(state)
}
