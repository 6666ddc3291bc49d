//! Settings database operations
//!
//! Provides get/set accessors for the settings table following the
//! key-value pattern. Engine tunables live here so an operator can adjust
//! them without a rebuild.

use crate::{Error, Result};
use sqlx::{Pool, Sqlite};

/// Compliance threshold in percent
///
/// **Default:** 75.0
pub async fn get_attendance_threshold(db: &Pool<Sqlite>) -> Result<f64> {
    get_setting(db, "attendance_threshold_percent")
        .await
        .map(|opt| opt.unwrap_or(75.0))
}

/// Upper bound of the semester search range used by mismatch repair
///
/// **Default:** 8
pub async fn get_max_semester(db: &Pool<Sqlite>) -> Result<i64> {
    get_setting(db, "roster_max_semester")
        .await
        .map(|opt| opt.unwrap_or(8))
}

/// Generic setting getter
pub async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await?;

    match row {
        None => Ok(None),
        Some((value,)) => value
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::Internal(format!("Invalid setting '{}': {}", key, e))),
    }
}

/// Generic setting setter (insert or replace)
pub async fn set_setting<T: std::fmt::Display>(
    db: &Pool<Sqlite>,
    key: &str,
    value: T,
) -> Result<()> {
    sqlx::query("INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)")
        .bind(key)
        .bind(value.to_string())
        .execute(db)
        .await?;
    Ok(())
}
