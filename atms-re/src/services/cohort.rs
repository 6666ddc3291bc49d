//! Cohort key resolution
//!
//! A cohort is the group of students sharing one timetable, identified by
//! (department, semester, section). Years map onto semester pairs:
//! semesters {1,2} are Year 1, {3,4} are Year 2, and so on.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The triple identifying a group of students who share a timetable
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CohortKey {
    pub department: String,
    pub semester: i64,
    pub section: String,
}

impl CohortKey {
    pub fn new(department: impl Into<String>, semester: i64, section: impl Into<String>) -> Self {
        Self {
            department: department.into(),
            semester,
            section: section.into(),
        }
    }
}

impl fmt::Display for CohortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Sem{} Sec{}", self.department, self.semester, self.section)
    }
}

/// Display year for a semester: {1,2} -> 1, {3,4} -> 2, ...
pub fn year_of_semester(semester: i64) -> i64 {
    (semester + 1) / 2
}

/// First semester of a display year: 1 -> 1, 2 -> 3, ...
pub fn first_semester_of_year(year: i64) -> i64 {
    (year - 1) * 2 + 1
}

/// The pair of semesters a display year spans
pub fn semesters_of_year(year: i64) -> (i64, i64) {
    let first = first_semester_of_year(year);
    (first, first + 1)
}
