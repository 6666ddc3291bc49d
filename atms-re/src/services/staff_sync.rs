//! Staff-session synchronization
//!
//! The staff_subjects join table is the source of truth: every active
//! session teaching a registered subject gets linked to that subject's
//! staff member. When two staff hold the same subject, the most recently
//! registered one (highest id) wins. Last writer wins is the documented
//! policy; this is not a scheduling conflict resolver.

use crate::db::staff::Registration;
use atms_common::db::models::TimetableSession;
use atms_common::Result;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use tracing::info;

/// One planned staff pointer rewrite
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub session_id: i64,
    pub subject_id: i64,
    pub old_staff_id: Option<i64>,
    pub new_staff_id: i64,
}

/// Output of the planning step. Orphans are sessions whose subject has no
/// registered staff (or no subject at all); they stay unassigned and are
/// reported.
#[derive(Debug, Clone, Default)]
pub struct SyncPlan {
    pub assignments: Vec<Assignment>,
    pub orphan_session_ids: Vec<i64>,
}

/// Winner per subject: highest staff id among its registrations
fn winners(registrations: &[Registration]) -> BTreeMap<i64, i64> {
    let mut winners: BTreeMap<i64, i64> = BTreeMap::new();
    for reg in registrations {
        let entry = winners.entry(reg.subject_id).or_insert(reg.staff_id);
        if reg.staff_id > *entry {
            *entry = reg.staff_id;
        }
    }
    winners
}

/// Plan assignments for every active session. Pure; a session already
/// pointing at the winning staff member produces no assignment, so a
/// repeat run over unchanged registrations plans zero writes.
pub fn plan_assignments(
    sessions: &[TimetableSession],
    registrations: &[Registration],
) -> SyncPlan {
    let winners = winners(registrations);
    let mut plan = SyncPlan::default();

    for session in sessions.iter().filter(|s| s.active) {
        let Some(subject_id) = session.subject_id else {
            plan.orphan_session_ids.push(session.id);
            continue;
        };
        match winners.get(&subject_id) {
            Some(&winner) if session.staff_id != Some(winner) => {
                plan.assignments.push(Assignment {
                    session_id: session.id,
                    subject_id,
                    old_staff_id: session.staff_id,
                    new_staff_id: winner,
                });
            }
            Some(_) => {}
            None => plan.orphan_session_ids.push(session.id),
        }
    }

    plan
}

/// Persist the planned assignments, one audit log line each.
/// Returns the number of rows written.
pub async fn apply_assignments(
    conn: &mut sqlx::SqliteConnection,
    assignments: &[Assignment],
) -> Result<usize> {
    for assignment in assignments {
        crate::db::sessions::assign_staff(&mut *conn, assignment.session_id, assignment.new_staff_id)
            .await?;
        info!(
            entity = "timetable_session",
            id = assignment.session_id,
            field = "staff_id",
            old = ?assignment.old_staff_id,
            new = assignment.new_staff_id,
            subject_id = assignment.subject_id,
            "Linked session to staff"
        );
    }
    Ok(assignments.len())
}

/// Scoped sync for one staff member, invoked right after their
/// registered-subjects set changes. Links every active session of each
/// registered subject to this staff member (last writer wins).
/// Returns the number of sessions relinked.
pub async fn sync_staff_subjects(db: &SqlitePool, staff_id: i64) -> Result<usize> {
    let registrations = crate::db::staff::find_registrations_for(db, staff_id).await?;

    let mut tx = db.begin().await?;
    let mut relinked = 0usize;

    for reg in &registrations {
        let sessions = crate::db::sessions::find_active_by_subject(&mut *tx, reg.subject_id).await?;
        for session in sessions {
            if session.staff_id == Some(staff_id) {
                continue;
            }
            crate::db::sessions::assign_staff(&mut *tx, session.id, staff_id).await?;
            info!(
                entity = "timetable_session",
                id = session.id,
                field = "staff_id",
                old = ?session.staff_id,
                new = staff_id,
                subject_id = reg.subject_id,
                "Relinked session after staff registration change"
            );
            relinked += 1;
        }
    }

    tx.commit().await?;
    Ok(relinked)
}
