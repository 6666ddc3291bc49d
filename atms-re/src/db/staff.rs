//! Staff queries, including the staff_subjects join table

use atms_common::db::models::Staff;
use atms_common::Result;
use sqlx::SqliteExecutor;

/// One (staff, subject) registration from the join table.
///
/// The registered-subjects set is the source of truth for session
/// assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct Registration {
    pub staff_id: i64,
    pub subject_id: i64,
}

/// All staff rows, active and inactive
pub async fn find_all<'e, E: SqliteExecutor<'e>>(ex: E) -> Result<Vec<Staff>> {
    let staff = sqlx::query_as::<_, Staff>(
        "SELECT id, staff_code, name, department, subject, active FROM staff ORDER BY id",
    )
    .fetch_all(ex)
    .await?;
    Ok(staff)
}

/// Registrations held by active staff members
pub async fn find_active_registrations<'e, E: SqliteExecutor<'e>>(
    ex: E,
) -> Result<Vec<Registration>> {
    let registrations = sqlx::query_as::<_, Registration>(
        "SELECT ss.staff_id, ss.subject_id \
         FROM staff_subjects ss \
         JOIN staff s ON s.id = ss.staff_id \
         WHERE s.active = 1 \
         ORDER BY ss.staff_id, ss.subject_id",
    )
    .fetch_all(ex)
    .await?;
    Ok(registrations)
}

/// Registrations of a single staff member
pub async fn find_registrations_for<'e, E: SqliteExecutor<'e>>(
    ex: E,
    staff_id: i64,
) -> Result<Vec<Registration>> {
    let registrations = sqlx::query_as::<_, Registration>(
        "SELECT staff_id, subject_id FROM staff_subjects \
         WHERE staff_id = ? ORDER BY subject_id",
    )
    .bind(staff_id)
    .fetch_all(ex)
    .await?;
    Ok(registrations)
}

/// Add a (staff, subject) registration; a repeat insert is a no-op
pub async fn register_subject<'e, E: SqliteExecutor<'e>>(
    ex: E,
    staff_id: i64,
    subject_id: i64,
) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO staff_subjects (staff_id, subject_id) VALUES (?, ?)")
        .bind(staff_id)
        .bind(subject_id)
        .execute(ex)
        .await?;
    Ok(())
}

/// Rewrite the legacy free-text subject field wherever it matches a
/// normalized name, returning the number of rows touched
pub async fn rewrite_subject_text<'e, E: SqliteExecutor<'e>>(
    ex: E,
    normalized_name: &str,
    canonical_name: &str,
) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE staff SET subject = ? \
         WHERE subject IS NOT NULL AND UPPER(TRIM(subject)) = ? AND subject != ?",
    )
    .bind(canonical_name)
    .bind(normalized_name)
    .bind(canonical_name)
    .execute(ex)
    .await?;
    Ok(result.rows_affected())
}

/// Insert a staff row, returning its id
pub async fn insert<'e, E: SqliteExecutor<'e>>(
    ex: E,
    staff_code: &str,
    name: &str,
    department: &str,
    subject: Option<&str>,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO staff (staff_code, name, department, subject, active) \
         VALUES (?, ?, ?, ?, 1)",
    )
    .bind(staff_code)
    .bind(name)
    .bind(department)
    .bind(subject)
    .execute(ex)
    .await?;
    Ok(result.last_insert_rowid())
}
