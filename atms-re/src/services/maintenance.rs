//! Maintenance pass orchestration
//!
//! One pass = mismatch detection -> repair -> subject dedup -> staff
//! sync, inside a single transaction so concurrent readers never observe
//! a partially repaired roster. Passes are serialized by a mutex;
//! a concurrent trigger is rejected, not queued.

use crate::services::{mismatch, staff_sync, subject_dedup};
use atms_common::db::settings;
use atms_common::{Error, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// What one maintenance pass found and changed
#[derive(Debug, Clone, Default, Serialize)]
pub struct MaintenanceReport {
    pub mismatches_detected: usize,
    pub sessions_resemestered: usize,
    pub students_resectioned: usize,
    pub subjects_merged: usize,
    pub staff_texts_rewritten: u64,
    pub sessions_relinked: usize,
    /// Cohorts whose semester mismatch no enrollment could resolve
    pub unresolved: Vec<mismatch::UnresolvedMismatch>,
    /// Active sessions left without a staff assignment
    pub orphan_session_ids: Vec<i64>,
    pub total_writes: usize,
}

/// Count of active rows at one cohort key
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CohortCount {
    pub department: String,
    pub semester: i64,
    pub section: String,
    pub count: i64,
}

/// Diagnostic snapshot of how students and sessions distribute over
/// cohort keys, plus the session cohorts with no enrolled students
#[derive(Debug, Clone, Serialize)]
pub struct CohortDistribution {
    pub students: Vec<CohortCount>,
    pub sessions: Vec<CohortCount>,
    pub mismatched: Vec<String>,
}

/// Runs the reconciliation pass; shared between startup and the admin
/// endpoint
pub struct MaintenanceService {
    db: SqlitePool,
    lock: Arc<Mutex<()>>,
}

impl MaintenanceService {
    pub fn new(db: SqlitePool, lock: Arc<Mutex<()>>) -> Self {
        Self { db, lock }
    }

    /// Run one full maintenance pass.
    ///
    /// Idempotent: on already-consistent data the pass detects nothing
    /// and writes nothing. Unresolved cohorts and orphan sessions are
    /// collected into the report; they never abort the pass.
    pub async fn run_pass(&self) -> Result<MaintenanceReport> {
        let _guard = self
            .lock
            .try_lock()
            .map_err(|_| Error::MaintenancePassRunning)?;

        let max_semester = settings::get_max_semester(&self.db).await?;

        let mut tx = self.db.begin().await?;
        let mut report = MaintenanceReport::default();

        // Phase 1: classification mismatches
        let sessions = crate::db::sessions::find_active(&mut *tx).await?;
        let students = crate::db::students::find_active(&mut *tx).await?;

        let mismatches = mismatch::detect_mismatches(&sessions, &students);
        report.mismatches_detected = mismatches.len();

        let plan = mismatch::plan_corrections(&mismatches, &sessions, &students, max_semester);
        mismatch::report_unresolved(&plan.unresolved);
        report.unresolved = plan.unresolved;

        for correction in &plan.corrections {
            match correction {
                mismatch::Correction::SessionSemester { .. } => report.sessions_resemestered += 1,
                mismatch::Correction::StudentSection { .. } => report.students_resectioned += 1,
            }
        }
        report.total_writes += mismatch::apply_corrections(&mut *tx, &plan.corrections).await?;

        // Phase 2: subject duplicate merge (before staff sync so the join
        // rows it repoints are what the sync reads)
        let subjects = crate::db::subjects::find_all(&mut *tx).await?;
        let merges = subject_dedup::plan_merges(&subjects);
        let outcome = subject_dedup::apply_merges(&mut *tx, &merges).await?;
        report.subjects_merged = outcome.subjects_deleted;
        report.staff_texts_rewritten = outcome.staff_texts_rewritten;
        report.total_writes += outcome.subjects_deleted
            + outcome.sessions_repointed as usize
            + outcome.staff_links_repointed as usize
            + outcome.staff_texts_rewritten as usize;

        // Phase 3: staff-session sync over the post-merge state
        let registrations = crate::db::staff::find_active_registrations(&mut *tx).await?;
        let sessions = crate::db::sessions::find_active(&mut *tx).await?;
        let sync_plan = staff_sync::plan_assignments(&sessions, &registrations);
        report.orphan_session_ids = sync_plan.orphan_session_ids;
        report.sessions_relinked =
            staff_sync::apply_assignments(&mut *tx, &sync_plan.assignments).await?;
        report.total_writes += report.sessions_relinked;

        tx.commit().await?;

        info!(
            mismatches = report.mismatches_detected,
            sessions_resemestered = report.sessions_resemestered,
            students_resectioned = report.students_resectioned,
            subjects_merged = report.subjects_merged,
            sessions_relinked = report.sessions_relinked,
            unresolved = report.unresolved.len(),
            orphan_sessions = report.orphan_session_ids.len(),
            total_writes = report.total_writes,
            "Maintenance pass completed"
        );

        Ok(report)
    }

    /// Read-only snapshot of cohort population vs. scheduled sessions
    pub async fn cohort_distribution(&self) -> Result<CohortDistribution> {
        let students = sqlx::query_as::<_, CohortCount>(
            "SELECT department, semester, section, COUNT(*) AS count \
             FROM students WHERE active = 1 \
             GROUP BY department, semester, section \
             ORDER BY department, semester, section",
        )
        .fetch_all(&self.db)
        .await?;

        let sessions = sqlx::query_as::<_, CohortCount>(
            "SELECT department, semester, section, COUNT(*) AS count \
             FROM timetable_sessions WHERE active = 1 \
             GROUP BY department, semester, section \
             ORDER BY department, semester, section",
        )
        .fetch_all(&self.db)
        .await?;

        // Session cohorts with no enrolled students
        let mismatched = sessions
            .iter()
            .filter(|sc| {
                !students.iter().any(|st| {
                    st.department == sc.department
                        && st.semester == sc.semester
                        && st.section == sc.section
                })
            })
            .map(|sc| {
                let key = crate::services::cohort::CohortKey::new(
                    sc.department.clone(),
                    sc.semester,
                    sc.section.clone(),
                );
                format!("{key} (sessions exist but no students)")
            })
            .collect();

        Ok(CohortDistribution {
            students,
            sessions,
            mismatched,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_service() -> MaintenanceService {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        atms_common::db::init::init_schema(&pool).await.unwrap();
        MaintenanceService::new(pool.clone(), Arc::new(Mutex::new(())))
    }

    fn pool_of(service: &MaintenanceService) -> &SqlitePool {
        &service.db
    }

    #[tokio::test]
    async fn pass_on_empty_database_writes_nothing() {
        let service = setup_service().await;
        let report = service.run_pass().await.unwrap();
        assert_eq!(report.total_writes, 0);
        assert!(report.unresolved.is_empty());
    }

    #[tokio::test]
    async fn semester_repair_then_second_pass_is_a_no_op() {
        let service = setup_service().await;
        let pool = pool_of(&service);

        // Sessions declared at semester 1, students enrolled at semester 3
        for day in ["Monday", "Tuesday"] {
            crate::db::sessions::insert(pool, None, None, "CS", 1, "A", day, "09:00", "10:00")
                .await
                .unwrap();
        }
        crate::db::students::insert(pool, "CS001", "Asha", "CS", 3, "A").await.unwrap();

        let report = service.run_pass().await.unwrap();
        assert_eq!(report.sessions_resemestered, 2);

        let semesters: Vec<i64> =
            sqlx::query_scalar("SELECT semester FROM timetable_sessions ORDER BY id")
                .fetch_all(pool)
                .await
                .unwrap();
        assert_eq!(semesters, vec![3, 3]);

        let second = service.run_pass().await.unwrap();
        assert_eq!(second.mismatches_detected, 0);
        assert_eq!(second.total_writes, 0);
    }

    #[tokio::test]
    async fn section_repair_rewrites_disagreeing_students() {
        let service = setup_service().await;
        let pool = pool_of(&service);

        crate::db::sessions::insert(pool, None, None, "CS", 3, "A", "Monday", "09:00", "10:00")
            .await
            .unwrap();
        crate::db::students::insert(pool, "CS001", "Asha", "CS", 3, "A").await.unwrap();
        crate::db::students::insert(pool, "CS002", "Ravi", "CS", 3, "B").await.unwrap();

        let report = service.run_pass().await.unwrap();
        assert_eq!(report.students_resectioned, 1);

        let sections: Vec<String> = sqlx::query_scalar("SELECT section FROM students ORDER BY id")
            .fetch_all(pool)
            .await
            .unwrap();
        assert_eq!(sections, vec!["A".to_string(), "A".to_string()]);
    }

    #[tokio::test]
    async fn unresolvable_cohort_is_reported_and_does_not_abort_the_pass() {
        let service = setup_service().await;
        let pool = pool_of(&service);

        // No CS students anywhere; EE cohort is repairable
        crate::db::sessions::insert(pool, None, None, "CS", 1, "A", "Monday", "09:00", "10:00")
            .await
            .unwrap();
        crate::db::sessions::insert(pool, None, None, "EE", 1, "A", "Monday", "09:00", "10:00")
            .await
            .unwrap();
        crate::db::students::insert(pool, "EE001", "Priya", "EE", 5, "A").await.unwrap();

        let report = service.run_pass().await.unwrap();
        assert_eq!(report.unresolved.len(), 1);
        assert_eq!(report.unresolved[0].department, "CS");
        assert_eq!(report.sessions_resemestered, 1);

        let ee_semester: i64 = sqlx::query_scalar(
            "SELECT semester FROM timetable_sessions WHERE department = 'EE'",
        )
        .fetch_one(pool)
        .await
        .unwrap();
        assert_eq!(ee_semester, 5);
    }

    #[tokio::test]
    async fn full_pass_merges_subjects_then_syncs_staff() {
        let service = setup_service().await;
        let pool = pool_of(&service);

        let canonical =
            crate::db::subjects::insert(pool, "CS301", "Data Structures", "CS", 3, 4).await.unwrap();
        let duplicate =
            crate::db::subjects::insert(pool, "CS301B", "data structures ", "CS", 3, 4)
                .await
                .unwrap();

        // Staff registered against the duplicate; session references it too
        let staff_id = crate::db::staff::insert(pool, "ST01", "Meera", "CS", None).await.unwrap();
        crate::db::staff::register_subject(pool, staff_id, duplicate).await.unwrap();
        crate::db::sessions::insert(
            pool, Some(duplicate), None, "CS", 3, "A", "Monday", "09:00", "10:00",
        )
        .await
        .unwrap();
        crate::db::students::insert(pool, "CS001", "Asha", "CS", 3, "A").await.unwrap();

        let report = service.run_pass().await.unwrap();
        assert_eq!(report.subjects_merged, 1);
        // The sync saw the repointed join row and linked the session
        assert_eq!(report.sessions_relinked, 1);

        let (subject_id, session_staff): (i64, i64) = sqlx::query_as(
            "SELECT subject_id, staff_id FROM timetable_sessions LIMIT 1",
        )
        .fetch_one(pool)
        .await
        .unwrap();
        assert_eq!(subject_id, canonical);
        assert_eq!(session_staff, staff_id);

        let second = service.run_pass().await.unwrap();
        assert_eq!(second.total_writes, 0);
    }

    #[tokio::test]
    async fn staff_takeover_is_last_writer_wins() {
        let service = setup_service().await;
        let pool = pool_of(&service);

        let subject =
            crate::db::subjects::insert(pool, "CS301", "Algorithms", "CS", 3, 4).await.unwrap();
        let first = crate::db::staff::insert(pool, "ST01", "Ravi", "CS", None).await.unwrap();
        let second = crate::db::staff::insert(pool, "ST02", "Meera", "CS", None).await.unwrap();
        crate::db::staff::register_subject(pool, first, subject).await.unwrap();
        crate::db::staff::register_subject(pool, second, subject).await.unwrap();

        crate::db::students::insert(pool, "CS001", "Asha", "CS", 3, "A").await.unwrap();
        crate::db::sessions::insert(
            pool, Some(subject), Some(first), "CS", 3, "A", "Monday", "09:00", "10:00",
        )
        .await
        .unwrap();

        let report = service.run_pass().await.unwrap();
        assert_eq!(report.sessions_relinked, 1);

        let assigned: i64 = sqlx::query_scalar("SELECT staff_id FROM timetable_sessions LIMIT 1")
            .fetch_one(pool)
            .await
            .unwrap();
        assert_eq!(assigned, second);

        // Unchanged registrations: nothing to write
        let rerun = service.run_pass().await.unwrap();
        assert_eq!(rerun.total_writes, 0);
    }

    #[tokio::test]
    async fn orphan_sessions_are_reported_not_defaulted() {
        let service = setup_service().await;
        let pool = pool_of(&service);

        let subject =
            crate::db::subjects::insert(pool, "CS301", "Algorithms", "CS", 3, 4).await.unwrap();
        let session_id = crate::db::sessions::insert(
            pool, Some(subject), None, "CS", 3, "A", "Monday", "09:00", "10:00",
        )
        .await
        .unwrap();
        crate::db::students::insert(pool, "CS001", "Asha", "CS", 3, "A").await.unwrap();

        let report = service.run_pass().await.unwrap();
        assert_eq!(report.orphan_session_ids, vec![session_id]);

        let staff: Option<i64> = sqlx::query_scalar("SELECT staff_id FROM timetable_sessions LIMIT 1")
            .fetch_one(pool)
            .await
            .unwrap();
        assert!(staff.is_none());
    }

    #[tokio::test]
    async fn concurrent_pass_is_rejected() {
        let service = setup_service().await;

        let guard = service.lock.clone().try_lock_owned().unwrap();
        let result = service.run_pass().await;
        drop(guard);

        assert!(matches!(result, Err(Error::MaintenancePassRunning)));
        assert!(service.run_pass().await.is_ok());
    }

    #[tokio::test]
    async fn distribution_names_cohorts_without_students() {
        let service = setup_service().await;
        let pool = pool_of(&service);

        crate::db::students::insert(pool, "CS001", "Asha", "CS", 3, "A").await.unwrap();
        crate::db::sessions::insert(pool, None, None, "CS", 3, "A", "Monday", "09:00", "10:00")
            .await
            .unwrap();
        crate::db::sessions::insert(pool, None, None, "EE", 1, "B", "Monday", "09:00", "10:00")
            .await
            .unwrap();

        let distribution = service.cohort_distribution().await.unwrap();
        assert_eq!(distribution.students.len(), 1);
        assert_eq!(distribution.sessions.len(), 2);
        assert_eq!(
            distribution.mismatched,
            vec!["EE Sem1 SecB (sessions exist but no students)".to_string()]
        );
    }
}
