//! Classification mismatch detection and repair
//!
//! Students and timetable sessions carry independently-edited cohort keys
//! (department, semester, section). When they drift apart, attendance
//! marking finds zero students for a session. Detection and planning are
//! pure functions over snapshots; only `apply_corrections` writes.

use atms_common::db::models::{Student, TimetableSession};
use atms_common::Result;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

/// A detected defect; carries the affected entity ids, no fix yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    /// Sessions declare a (department, section) cohort at a semester where
    /// no active student is enrolled
    Semester {
        department: String,
        section: String,
        declared_semester: i64,
        session_ids: Vec<i64>,
    },
    /// Students disagree with the single section the sessions declare for
    /// their (department, semester)
    Section {
        department: String,
        semester: i64,
        expected_section: String,
        student_ids: Vec<i64>,
    },
}

/// A single planned write, with before/after values for the audit log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Correction {
    SessionSemester {
        session_id: i64,
        old_semester: i64,
        new_semester: i64,
    },
    StudentSection {
        student_id: i64,
        old_section: String,
        new_section: String,
    },
}

/// A semester mismatch no semester in the search range could resolve.
/// Reported, never guessed at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedMismatch {
    pub department: String,
    pub section: String,
    pub declared_semester: i64,
    pub session_count: usize,
}

/// Output of the planning step
#[derive(Debug, Clone, Default)]
pub struct RepairPlan {
    pub corrections: Vec<Correction>,
    pub unresolved: Vec<UnresolvedMismatch>,
}

/// Scan active sessions and students for cohort key drift. Pure; no
/// mutation, deterministic output order.
pub fn detect_mismatches(sessions: &[TimetableSession], students: &[Student]) -> Vec<Mismatch> {
    let mut mismatches = Vec::new();

    // Semester mismatches: session groups whose declared semester has no
    // enrolled students
    let mut sessions_by_dept_section: BTreeMap<(&str, &str), Vec<&TimetableSession>> =
        BTreeMap::new();
    for session in sessions.iter().filter(|s| s.active) {
        sessions_by_dept_section
            .entry((session.department.as_str(), session.section.as_str()))
            .or_default()
            .push(session);
    }

    for ((department, section), group) in &sessions_by_dept_section {
        let declared_semester = group[0].semester;
        let any_students = students.iter().any(|s| {
            s.active
                && s.department == *department
                && s.semester == declared_semester
                && s.section == *section
        });
        if !any_students {
            let mut session_ids: Vec<i64> = group.iter().map(|s| s.id).collect();
            session_ids.sort_unstable();
            mismatches.push(Mismatch::Semester {
                department: department.to_string(),
                section: section.to_string(),
                declared_semester,
                session_ids,
            });
        }
    }

    // Section mismatches: students disagreeing with the single section the
    // sessions declare for their department+semester
    let mut students_by_dept_sem: BTreeMap<(&str, i64), Vec<&Student>> = BTreeMap::new();
    for student in students.iter().filter(|s| s.active) {
        students_by_dept_sem
            .entry((student.department.as_str(), student.semester))
            .or_default()
            .push(student);
    }

    for ((department, semester), group) in &students_by_dept_sem {
        let declared_sections: BTreeSet<&str> = sessions
            .iter()
            .filter(|s| s.active && s.department == *department && s.semester == *semester)
            .map(|s| s.section.as_str())
            .collect();

        // Only a single unambiguous session section is authoritative
        if declared_sections.len() != 1 {
            continue;
        }
        let expected_section = *declared_sections.iter().next().unwrap();

        let mut student_ids: Vec<i64> = group
            .iter()
            .filter(|s| s.section != expected_section)
            .map(|s| s.id)
            .collect();
        if !student_ids.is_empty() {
            student_ids.sort_unstable();
            mismatches.push(Mismatch::Section {
                department: department.to_string(),
                semester: *semester,
                expected_section: expected_section.to_string(),
                student_ids,
            });
        }
    }

    mismatches
}

/// Turn detected mismatches into concrete corrections. Pure.
///
/// Semester mismatches resolve to the first semester in
/// `1..=max_semester` where active students exist for the (department,
/// section); if none exists the mismatch is reported unresolved.
pub fn plan_corrections(
    mismatches: &[Mismatch],
    sessions: &[TimetableSession],
    students: &[Student],
    max_semester: i64,
) -> RepairPlan {
    let mut plan = RepairPlan::default();

    for mismatch in mismatches {
        match mismatch {
            Mismatch::Semester {
                department,
                section,
                declared_semester,
                session_ids,
            } => {
                let target = (1..=max_semester).find(|sem| {
                    students.iter().any(|s| {
                        s.active
                            && s.department == *department
                            && s.semester == *sem
                            && s.section == *section
                    })
                });

                match target {
                    Some(new_semester) => {
                        for &session_id in session_ids {
                            let old_semester = sessions
                                .iter()
                                .find(|s| s.id == session_id)
                                .map(|s| s.semester)
                                .unwrap_or(*declared_semester);
                            plan.corrections.push(Correction::SessionSemester {
                                session_id,
                                old_semester,
                                new_semester,
                            });
                        }
                    }
                    None => plan.unresolved.push(UnresolvedMismatch {
                        department: department.clone(),
                        section: section.clone(),
                        declared_semester: *declared_semester,
                        session_count: session_ids.len(),
                    }),
                }
            }
            Mismatch::Section {
                expected_section,
                student_ids,
                ..
            } => {
                for &student_id in student_ids {
                    let old_section = students
                        .iter()
                        .find(|s| s.id == student_id)
                        .map(|s| s.section.clone())
                        .unwrap_or_default();
                    plan.corrections.push(Correction::StudentSection {
                        student_id,
                        old_section,
                        new_section: expected_section.clone(),
                    });
                }
            }
        }
    }

    plan
}

/// Persist the planned corrections, one audit log line each.
/// Returns the number of rows written.
pub async fn apply_corrections(
    conn: &mut sqlx::SqliteConnection,
    corrections: &[Correction],
) -> Result<usize> {
    for correction in corrections {
        match correction {
            Correction::SessionSemester {
                session_id,
                old_semester,
                new_semester,
            } => {
                crate::db::sessions::update_semester(&mut *conn, *session_id, *new_semester)
                    .await?;
                info!(
                    entity = "timetable_session",
                    id = session_id,
                    field = "semester",
                    old = old_semester,
                    new = new_semester,
                    "Repaired semester mismatch"
                );
            }
            Correction::StudentSection {
                student_id,
                old_section,
                new_section,
            } => {
                crate::db::students::update_section(&mut *conn, *student_id, new_section).await?;
                info!(
                    entity = "student",
                    id = student_id,
                    field = "section",
                    old = %old_section,
                    new = %new_section,
                    "Repaired section mismatch"
                );
            }
        }
    }
    Ok(corrections.len())
}

/// Log unresolved mismatches; they are carried into the pass report
pub fn report_unresolved(unresolved: &[UnresolvedMismatch]) {
    for item in unresolved {
        warn!(
            department = %item.department,
            section = %item.section,
            declared_semester = item.declared_semester,
            session_count = item.session_count,
            "No semester with enrolled students found; sessions left unrepaired"
        );
    }
}
