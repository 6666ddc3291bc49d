//! Timetable session queries

use atms_common::db::models::TimetableSession;
use atms_common::Result;
use sqlx::SqliteExecutor;

const SELECT_COLUMNS: &str = "id, subject_id, staff_id, department, semester, section, \
                              day_of_week, start_time, end_time, room, active";

/// All active sessions
pub async fn find_active<'e, E: SqliteExecutor<'e>>(ex: E) -> Result<Vec<TimetableSession>> {
    let sessions = sqlx::query_as::<_, TimetableSession>(&format!(
        "SELECT {SELECT_COLUMNS} FROM timetable_sessions WHERE active = 1 ORDER BY id"
    ))
    .fetch_all(ex)
    .await?;
    Ok(sessions)
}

/// Active sessions teaching a subject
pub async fn find_active_by_subject<'e, E: SqliteExecutor<'e>>(
    ex: E,
    subject_id: i64,
) -> Result<Vec<TimetableSession>> {
    let sessions = sqlx::query_as::<_, TimetableSession>(&format!(
        "SELECT {SELECT_COLUMNS} FROM timetable_sessions \
         WHERE subject_id = ? AND active = 1 ORDER BY id"
    ))
    .bind(subject_id)
    .fetch_all(ex)
    .await?;
    Ok(sessions)
}

/// Rewrite a session's declared semester (classification repair only)
pub async fn update_semester<'e, E: SqliteExecutor<'e>>(
    ex: E,
    session_id: i64,
    semester: i64,
) -> Result<()> {
    sqlx::query("UPDATE timetable_sessions SET semester = ? WHERE id = ?")
        .bind(semester)
        .bind(session_id)
        .execute(ex)
        .await?;
    Ok(())
}

/// Point a session at a staff member
pub async fn assign_staff<'e, E: SqliteExecutor<'e>>(
    ex: E,
    session_id: i64,
    staff_id: i64,
) -> Result<()> {
    sqlx::query("UPDATE timetable_sessions SET staff_id = ? WHERE id = ?")
        .bind(staff_id)
        .bind(session_id)
        .execute(ex)
        .await?;
    Ok(())
}

/// Insert a session row, returning its id
#[allow(clippy::too_many_arguments)]
pub async fn insert<'e, E: SqliteExecutor<'e>>(
    ex: E,
    subject_id: Option<i64>,
    staff_id: Option<i64>,
    department: &str,
    semester: i64,
    section: &str,
    day_of_week: &str,
    start_time: &str,
    end_time: &str,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO timetable_sessions \
         (subject_id, staff_id, department, semester, section, day_of_week, start_time, end_time, active) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1)",
    )
    .bind(subject_id)
    .bind(staff_id)
    .bind(department)
    .bind(semester)
    .bind(section)
    .bind(day_of_week)
    .bind(start_time)
    .bind(end_time)
    .execute(ex)
    .await?;
    Ok(result.last_insert_rowid())
}
