//! Subject queries, including reference repointing used by duplicate merge

use atms_common::db::models::Subject;
use atms_common::Result;
use sqlx::SqliteExecutor;

/// All subject rows
pub async fn find_all<'e, E: SqliteExecutor<'e>>(ex: E) -> Result<Vec<Subject>> {
    let subjects = sqlx::query_as::<_, Subject>(
        "SELECT id, code, name, department, semester, credits FROM subjects ORDER BY id",
    )
    .fetch_all(ex)
    .await?;
    Ok(subjects)
}

pub async fn find_by_id<'e, E: SqliteExecutor<'e>>(ex: E, id: i64) -> Result<Option<Subject>> {
    let subject = sqlx::query_as::<_, Subject>(
        "SELECT id, code, name, department, semester, credits FROM subjects WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(ex)
    .await?;
    Ok(subject)
}

/// Repoint every timetable session from one subject to another,
/// returning the number of rows touched
pub async fn repoint_sessions<'e, E: SqliteExecutor<'e>>(
    ex: E,
    from_subject: i64,
    to_subject: i64,
) -> Result<u64> {
    let result = sqlx::query("UPDATE timetable_sessions SET subject_id = ? WHERE subject_id = ?")
        .bind(to_subject)
        .bind(from_subject)
        .execute(ex)
        .await?;
    Ok(result.rows_affected())
}

/// Repoint staff_subjects join rows from one subject to another.
///
/// A staff member registered for both the duplicate and the canonical
/// subject would collide on the primary key, so the update ignores those
/// rows and the leftover duplicates are deleted.
pub async fn repoint_staff_links(
    conn: &mut sqlx::SqliteConnection,
    from_subject: i64,
    to_subject: i64,
) -> Result<u64> {
    let repointed = sqlx::query(
        "UPDATE OR IGNORE staff_subjects SET subject_id = ? WHERE subject_id = ?",
    )
    .bind(to_subject)
    .bind(from_subject)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    sqlx::query("DELETE FROM staff_subjects WHERE subject_id = ?")
        .bind(from_subject)
        .execute(&mut *conn)
        .await?;

    Ok(repointed)
}

/// Delete a subject row
pub async fn delete<'e, E: SqliteExecutor<'e>>(ex: E, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM subjects WHERE id = ?")
        .bind(id)
        .execute(ex)
        .await?;
    Ok(())
}

/// Insert a subject row, returning its id
pub async fn insert<'e, E: SqliteExecutor<'e>>(
    ex: E,
    code: &str,
    name: &str,
    department: &str,
    semester: i64,
    credits: i64,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO subjects (code, name, department, semester, credits) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(code)
    .bind(name)
    .bind(department)
    .bind(semester)
    .bind(credits)
    .execute(ex)
    .await?;
    Ok(result.last_insert_rowid())
}
