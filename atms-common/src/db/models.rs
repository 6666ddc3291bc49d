//! Database models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Attendance status for a single (student, session, date) record.
///
/// OD ("on duty") counts as attended for percentage purposes but is
/// recorded distinctly from plain presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Od,
}

impl AttendanceStatus {
    /// Whether this status counts toward the attended tally
    pub fn is_attended(self) -> bool {
        matches!(self, AttendanceStatus::Present | AttendanceStatus::Od)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "PRESENT",
            AttendanceStatus::Absent => "ABSENT",
            AttendanceStatus::Od => "OD",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Student {
    pub id: i64,
    pub roll_no: String,
    pub name: String,
    pub department: String,
    pub semester: i64,
    pub section: String,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Staff {
    pub id: i64,
    pub staff_code: String,
    pub name: String,
    pub department: String,
    /// Legacy free-text subject field kept in sync with the subjects table
    pub subject: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subject {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub department: String,
    pub semester: i64,
    pub credits: i64,
}

/// One slot in the master timetable. The (department, semester, section)
/// triple declares which cohort of students the session teaches.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TimetableSession {
    pub id: i64,
    pub subject_id: Option<i64>,
    pub staff_id: Option<i64>,
    pub department: String,
    pub semester: i64,
    pub section: String,
    pub day_of_week: String,
    pub start_time: String,
    pub end_time: String,
    pub room: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AttendanceRecord {
    pub id: i64,
    pub student_id: i64,
    pub session_id: i64,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}
