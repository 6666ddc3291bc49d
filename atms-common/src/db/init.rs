//! Database initialization
//!
//! Creates the connection pool and the full schema on first run. Every
//! statement here is idempotent, so calling init again on an existing
//! database is safe.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows concurrent readers while the maintenance pass writes
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    init_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and seed default settings (idempotent)
///
/// Exposed separately so tests can build the schema on an in-memory pool.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_students_table(pool).await?;
    create_staff_table(pool).await?;
    create_subjects_table(pool).await?;
    create_staff_subjects_table(pool).await?;
    create_timetable_sessions_table(pool).await?;
    create_session_attendance_table(pool).await?;
    init_default_settings(pool).await?;
    Ok(())
}

pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn create_students_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS students (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            roll_no TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            department TEXT NOT NULL,
            semester INTEGER NOT NULL,
            section TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn create_staff_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS staff (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            staff_code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            department TEXT NOT NULL,
            subject TEXT,
            active INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn create_subjects_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS subjects (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL,
            name TEXT NOT NULL,
            department TEXT NOT NULL,
            semester INTEGER NOT NULL,
            credits INTEGER NOT NULL DEFAULT 3
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn create_staff_subjects_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS staff_subjects (
            staff_id INTEGER NOT NULL REFERENCES staff(id) ON DELETE CASCADE,
            subject_id INTEGER NOT NULL REFERENCES subjects(id) ON DELETE CASCADE,
            PRIMARY KEY (staff_id, subject_id)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn create_timetable_sessions_table(pool: &SqlitePool) -> Result<()> {
    // subject_id and staff_id stay nullable: sessions are created before
    // either reference is resolved
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS timetable_sessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            subject_id INTEGER REFERENCES subjects(id),
            staff_id INTEGER REFERENCES staff(id),
            department TEXT NOT NULL,
            semester INTEGER NOT NULL,
            section TEXT NOT NULL,
            day_of_week TEXT NOT NULL,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL,
            room TEXT,
            active INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn create_session_attendance_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS session_attendance (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id INTEGER NOT NULL REFERENCES students(id),
            session_id INTEGER NOT NULL REFERENCES timetable_sessions(id),
            date TEXT NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('PRESENT', 'ABSENT', 'OD')),
            UNIQUE (student_id, session_id, date)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Seed default settings without overwriting operator changes
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    let defaults: &[(&str, &str)] = &[
        ("attendance_threshold_percent", "75.0"),
        ("roster_max_semester", "8"),
    ];

    for (key, value) in defaults {
        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(pool)
            .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn schema_creation_is_idempotent() {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        init_schema(&pool).await.unwrap();
        init_schema(&pool).await.unwrap();

        let threshold: String =
            sqlx::query_scalar("SELECT value FROM settings WHERE key = 'attendance_threshold_percent'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(threshold, "75.0");
    }

    #[tokio::test]
    async fn attendance_unique_key_enforced() {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        init_schema(&pool).await.unwrap();

        sqlx::query(
            "INSERT INTO students (roll_no, name, department, semester, section) \
             VALUES ('CS001', 'Asha', 'CS', 3, 'A')",
        )
        .execute(&pool)
        .await
        .unwrap();

        sqlx::query(
            "INSERT INTO timetable_sessions \
             (department, semester, section, day_of_week, start_time, end_time) \
             VALUES ('CS', 3, 'A', 'Monday', '09:00', '10:00')",
        )
        .execute(&pool)
        .await
        .unwrap();

        sqlx::query(
            "INSERT INTO session_attendance (student_id, session_id, date, status) \
             VALUES (1, 1, '2026-01-05', 'PRESENT')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let dup = sqlx::query(
            "INSERT INTO session_attendance (student_id, session_id, date, status) \
             VALUES (1, 1, '2026-01-05', 'ABSENT')",
        )
        .execute(&pool)
        .await;
        assert!(dup.is_err());
    }

    #[tokio::test]
    async fn default_settings_do_not_overwrite_changes() {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        init_schema(&pool).await.unwrap();

        sqlx::query("UPDATE settings SET value = '80.0' WHERE key = 'attendance_threshold_percent'")
            .execute(&pool)
            .await
            .unwrap();

        init_schema(&pool).await.unwrap();

        let threshold: String =
            sqlx::query_scalar("SELECT value FROM settings WHERE key = 'attendance_threshold_percent'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(threshold, "80.0");
    }
}
