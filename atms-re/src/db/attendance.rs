//! Session attendance queries
//!
//! Attendance rows are written through a single upsert keyed on
//! (student, session, date); the aggregation queries are read-only.

use atms_common::db::models::{AttendanceRecord, AttendanceStatus};
use atms_common::Result;
use chrono::NaiveDate;
use sqlx::SqliteExecutor;

/// Attended/total tallies for one aggregation bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct AttendanceCounts {
    pub attended: i64,
    pub total: i64,
}

/// Per-subject tallies for one student
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SubjectCounts {
    pub subject_id: i64,
    pub subject_name: String,
    pub attended: i64,
    pub total: i64,
}

/// Insert or update the mark for (student, session, date)
pub async fn upsert<'e, E: SqliteExecutor<'e>>(
    ex: E,
    student_id: i64,
    session_id: i64,
    date: NaiveDate,
    status: AttendanceStatus,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO session_attendance (student_id, session_id, date, status) \
         VALUES (?, ?, ?, ?) \
         ON CONFLICT (student_id, session_id, date) DO UPDATE SET status = excluded.status",
    )
    .bind(student_id)
    .bind(session_id)
    .bind(date)
    .bind(status.as_str())
    .execute(ex)
    .await?;
    Ok(())
}

/// All marks for one student
pub async fn find_by_student<'e, E: SqliteExecutor<'e>>(
    ex: E,
    student_id: i64,
) -> Result<Vec<AttendanceRecord>> {
    let records = sqlx::query_as::<_, AttendanceRecord>(
        "SELECT id, student_id, session_id, date, status \
         FROM session_attendance WHERE student_id = ? ORDER BY date, id",
    )
    .bind(student_id)
    .fetch_all(ex)
    .await?;
    Ok(records)
}

/// All marks for sessions teaching one subject
pub async fn find_by_subject<'e, E: SqliteExecutor<'e>>(
    ex: E,
    subject_id: i64,
) -> Result<Vec<AttendanceRecord>> {
    let records = sqlx::query_as::<_, AttendanceRecord>(
        "SELECT sa.id, sa.student_id, sa.session_id, sa.date, sa.status \
         FROM session_attendance sa \
         JOIN timetable_sessions ts ON ts.id = sa.session_id \
         WHERE ts.subject_id = ? ORDER BY sa.date, sa.id",
    )
    .bind(subject_id)
    .fetch_all(ex)
    .await?;
    Ok(records)
}

/// All marks in a date range (inclusive)
pub async fn find_by_date_range<'e, E: SqliteExecutor<'e>>(
    ex: E,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<AttendanceRecord>> {
    let records = sqlx::query_as::<_, AttendanceRecord>(
        "SELECT id, student_id, session_id, date, status \
         FROM session_attendance WHERE date BETWEEN ? AND ? ORDER BY date, id",
    )
    .bind(from)
    .bind(to)
    .fetch_all(ex)
    .await?;
    Ok(records)
}

/// Tallies for one (student, subject), joined through the session's subject
pub async fn subject_counts<'e, E: SqliteExecutor<'e>>(
    ex: E,
    student_id: i64,
    subject_id: i64,
) -> Result<AttendanceCounts> {
    let counts = sqlx::query_as::<_, AttendanceCounts>(
        "SELECT \
             COUNT(CASE WHEN sa.status IN ('PRESENT', 'OD') THEN 1 END) AS attended, \
             COUNT(*) AS total \
         FROM session_attendance sa \
         JOIN timetable_sessions ts ON ts.id = sa.session_id \
         WHERE sa.student_id = ? AND ts.subject_id = ?",
    )
    .bind(student_id)
    .bind(subject_id)
    .fetch_one(ex)
    .await?;
    Ok(counts)
}

/// Per-subject tallies for one student, grouped through the session join
pub async fn per_subject_counts<'e, E: SqliteExecutor<'e>>(
    ex: E,
    student_id: i64,
) -> Result<Vec<SubjectCounts>> {
    let rows = sqlx::query_as::<_, SubjectCounts>(
        "SELECT sub.id AS subject_id, sub.name AS subject_name, \
             COUNT(CASE WHEN sa.status IN ('PRESENT', 'OD') THEN 1 END) AS attended, \
             COUNT(*) AS total \
         FROM session_attendance sa \
         JOIN timetable_sessions ts ON ts.id = sa.session_id \
         JOIN subjects sub ON sub.id = ts.subject_id \
         WHERE sa.student_id = ? \
         GROUP BY sub.id, sub.name \
         ORDER BY sub.id",
    )
    .bind(student_id)
    .fetch_all(ex)
    .await?;
    Ok(rows)
}

/// Tallies for one student over an inclusive date range, all subjects
pub async fn range_counts<'e, E: SqliteExecutor<'e>>(
    ex: E,
    student_id: i64,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<AttendanceCounts> {
    let counts = sqlx::query_as::<_, AttendanceCounts>(
        "SELECT \
             COUNT(CASE WHEN status IN ('PRESENT', 'OD') THEN 1 END) AS attended, \
             COUNT(*) AS total \
         FROM session_attendance \
         WHERE student_id = ? AND date BETWEEN ? AND ?",
    )
    .bind(student_id)
    .bind(from)
    .bind(to)
    .fetch_one(ex)
    .await?;
    Ok(counts)
}
