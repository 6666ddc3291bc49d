//! Student queries

use atms_common::db::models::Student;
use atms_common::Result;
use sqlx::SqliteExecutor;

/// All active students
pub async fn find_active<'e, E: SqliteExecutor<'e>>(ex: E) -> Result<Vec<Student>> {
    let students = sqlx::query_as::<_, Student>(
        "SELECT id, roll_no, name, department, semester, section, active \
         FROM students WHERE active = 1 ORDER BY id",
    )
    .fetch_all(ex)
    .await?;
    Ok(students)
}

/// Active students at an exact cohort key (department, semester, section)
pub async fn find_active_by_cohort<'e, E: SqliteExecutor<'e>>(
    ex: E,
    department: &str,
    semester: i64,
    section: &str,
) -> Result<Vec<Student>> {
    let students = sqlx::query_as::<_, Student>(
        "SELECT id, roll_no, name, department, semester, section, active \
         FROM students \
         WHERE department = ? AND semester = ? AND section = ? AND active = 1 \
         ORDER BY id",
    )
    .bind(department)
    .bind(semester)
    .bind(section)
    .fetch_all(ex)
    .await?;
    Ok(students)
}

/// Active students for a department and semester, any section
pub async fn find_by_department_and_semester<'e, E: SqliteExecutor<'e>>(
    ex: E,
    department: &str,
    semester: i64,
) -> Result<Vec<Student>> {
    let students = sqlx::query_as::<_, Student>(
        "SELECT id, roll_no, name, department, semester, section, active \
         FROM students \
         WHERE department = ? AND semester = ? AND active = 1 \
         ORDER BY id",
    )
    .bind(department)
    .bind(semester)
    .fetch_all(ex)
    .await?;
    Ok(students)
}

pub async fn find_by_id<'e, E: SqliteExecutor<'e>>(ex: E, id: i64) -> Result<Option<Student>> {
    let student = sqlx::query_as::<_, Student>(
        "SELECT id, roll_no, name, department, semester, section, active \
         FROM students WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(ex)
    .await?;
    Ok(student)
}

/// Rewrite a student's section (classification repair only)
pub async fn update_section<'e, E: SqliteExecutor<'e>>(
    ex: E,
    student_id: i64,
    section: &str,
) -> Result<()> {
    sqlx::query("UPDATE students SET section = ? WHERE id = ?")
        .bind(section)
        .bind(student_id)
        .execute(ex)
        .await?;
    Ok(())
}

/// Insert a student row, returning its id
pub async fn insert<'e, E: SqliteExecutor<'e>>(
    ex: E,
    roll_no: &str,
    name: &str,
    department: &str,
    semester: i64,
    section: &str,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO students (roll_no, name, department, semester, section, active) \
         VALUES (?, ?, ?, ?, ?, 1)",
    )
    .bind(roll_no)
    .bind(name)
    .bind(department)
    .bind(semester)
    .bind(section)
    .execute(ex)
    .await?;
    Ok(result.last_insert_rowid())
}
