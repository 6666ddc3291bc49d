//! Attendance aggregation API

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::services::attendance::{ComplianceRow, LowAttendanceStudent, StudentAttendanceReport};
use crate::services::AttendanceAggregator;
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct SubjectQuery {
    pub student_id: i64,
    pub subject_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct StudentQuery {
    pub student_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub student_id: i64,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct LowAttendanceQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
    /// Overrides the configured threshold when present
    pub threshold: Option<f64>,
    /// Restrict to one display year (two semesters)
    pub year: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub department: Option<String>,
    pub year: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PercentageResponse {
    pub student_id: i64,
    pub percentage: f64,
}

/// GET /api/attendance/subject?student_id=&subject_id=
pub async fn subject_percentage(
    State(state): State<AppState>,
    Query(query): Query<SubjectQuery>,
) -> ApiResult<Json<PercentageResponse>> {
    ensure_student_exists(&state, query.student_id).await?;
    let aggregator = AttendanceAggregator::new(state.db.clone());
    let percentage = aggregator
        .subject_percentage(query.student_id, query.subject_id)
        .await?;
    Ok(Json(PercentageResponse {
        student_id: query.student_id,
        percentage,
    }))
}

/// GET /api/attendance/overall?student_id=
pub async fn overall_attendance(
    State(state): State<AppState>,
    Query(query): Query<StudentQuery>,
) -> ApiResult<Json<StudentAttendanceReport>> {
    ensure_student_exists(&state, query.student_id).await?;
    let aggregator = AttendanceAggregator::new(state.db.clone());
    let report = aggregator.overall_for_student(query.student_id).await?;
    Ok(Json(report))
}

/// GET /api/attendance/range?student_id=&from=&to=
pub async fn range_percentage(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<PercentageResponse>> {
    if query.from > query.to {
        return Err(ApiError::BadRequest("from must not be after to".to_string()));
    }
    ensure_student_exists(&state, query.student_id).await?;
    let aggregator = AttendanceAggregator::new(state.db.clone());
    let percentage = aggregator
        .range_percentage(query.student_id, query.from, query.to)
        .await?;
    Ok(Json(PercentageResponse {
        student_id: query.student_id,
        percentage,
    }))
}

/// GET /api/attendance/low?from=&to=[&threshold=][&year=]
pub async fn low_attendance(
    State(state): State<AppState>,
    Query(query): Query<LowAttendanceQuery>,
) -> ApiResult<Json<Vec<LowAttendanceStudent>>> {
    if query.from > query.to {
        return Err(ApiError::BadRequest("from must not be after to".to_string()));
    }
    let aggregator = AttendanceAggregator::new(state.db.clone());
    let selected = aggregator
        .low_attendance_students(query.from, query.to, query.threshold, query.year)
        .await?;
    Ok(Json(selected))
}

/// GET /api/attendance/report?from=&to=[&department=][&year=]
pub async fn range_report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Json<Vec<ComplianceRow>>> {
    if query.from > query.to {
        return Err(ApiError::BadRequest("from must not be after to".to_string()));
    }
    let aggregator = AttendanceAggregator::new(state.db.clone());
    let rows = aggregator
        .range_report(query.from, query.to, query.department.as_deref(), query.year)
        .await?;
    Ok(Json(rows))
}

async fn ensure_student_exists(state: &AppState, student_id: i64) -> ApiResult<()> {
    let student = crate::db::students::find_by_id(&state.db, student_id).await?;
    if student.is_none() {
        return Err(ApiError::NotFound(format!("Student not found: {student_id}")));
    }
    Ok(())
}
