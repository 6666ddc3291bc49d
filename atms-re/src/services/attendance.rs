//! Attendance aggregation
//!
//! Turns raw session attendance marks into percentages and compliance
//! classifications. Read-only; runs with unbounded concurrency against
//! the store.
//!
//! OD counts as attended. An empty input set is a valid boundary, not an
//! error: zero records aggregate to 0.0%.

use atms_common::db::models::Student;
use atms_common::{db::settings, Result};
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::SqlitePool;

/// Compliance classification against the configured threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Compliance {
    Qualified,
    Shortage,
}

/// attended/total as a percentage; 0.0 when there are no records
pub fn percentage(attended: i64, total: i64) -> f64 {
    if total > 0 {
        attended as f64 * 100.0 / total as f64
    } else {
        0.0
    }
}

/// `Qualified` at or above the threshold, `Shortage` below it
pub fn classify(percentage: f64, threshold: f64) -> Compliance {
    if percentage >= threshold {
        Compliance::Qualified
    } else {
        Compliance::Shortage
    }
}

/// Round to two decimals for report rows
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One subject's tallies for a student
#[derive(Debug, Clone, Serialize)]
pub struct SubjectAttendanceRow {
    pub subject_id: i64,
    pub subject_name: String,
    pub attended: i64,
    pub total: i64,
    pub percentage: f64,
}

/// Per-subject rows plus the overall mean for one student
#[derive(Debug, Clone, Serialize)]
pub struct StudentAttendanceReport {
    pub student_id: i64,
    pub subjects: Vec<SubjectAttendanceRow>,
    /// Unweighted arithmetic mean of the per-subject percentages
    pub overall_percentage: f64,
    pub compliance: Compliance,
}

/// One student selected by the low-attendance filter
#[derive(Debug, Clone, Serialize)]
pub struct LowAttendanceStudent {
    pub student: Student,
    pub attended: i64,
    pub total: i64,
    pub percentage: f64,
}

/// One row of the date-range compliance report
#[derive(Debug, Clone, Serialize)]
pub struct ComplianceRow {
    pub student: Student,
    pub attended: i64,
    pub total: i64,
    pub percentage: f64,
    pub compliance: Compliance,
}

/// Attendance aggregation service
pub struct AttendanceAggregator {
    db: SqlitePool,
}

impl AttendanceAggregator {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Percentage for one (student, subject)
    pub async fn subject_percentage(&self, student_id: i64, subject_id: i64) -> Result<f64> {
        let counts = crate::db::attendance::subject_counts(&self.db, student_id, subject_id).await?;
        Ok(round2(percentage(counts.attended, counts.total)))
    }

    /// Per-subject rows plus overall mean for one student
    pub async fn overall_for_student(&self, student_id: i64) -> Result<StudentAttendanceReport> {
        let threshold = settings::get_attendance_threshold(&self.db).await?;
        let counts = crate::db::attendance::per_subject_counts(&self.db, student_id).await?;

        let subjects: Vec<SubjectAttendanceRow> = counts
            .into_iter()
            .map(|c| SubjectAttendanceRow {
                subject_id: c.subject_id,
                subject_name: c.subject_name,
                attended: c.attended,
                total: c.total,
                percentage: round2(percentage(c.attended, c.total)),
            })
            .collect();

        // Mean of per-subject percentages, not attendance-weighted
        let overall = if subjects.is_empty() {
            0.0
        } else {
            subjects.iter().map(|s| s.percentage).sum::<f64>() / subjects.len() as f64
        };
        let overall = round2(overall);

        Ok(StudentAttendanceReport {
            student_id,
            subjects,
            overall_percentage: overall,
            compliance: classify(overall, threshold),
        })
    }

    /// Percentage for one student over an inclusive date range, all
    /// subjects combined
    pub async fn range_percentage(
        &self,
        student_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<f64> {
        let counts = crate::db::attendance::range_counts(&self.db, student_id, from, to).await?;
        Ok(round2(percentage(counts.attended, counts.total)))
    }

    /// Compliance report over a date window for every active student,
    /// optionally narrowed to one department (case-insensitive) or one
    /// display year
    pub async fn range_report(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        department: Option<&str>,
        year: Option<i64>,
    ) -> Result<Vec<ComplianceRow>> {
        let threshold = settings::get_attendance_threshold(&self.db).await?;
        let students = crate::db::students::find_active(&self.db).await?;
        let mut rows = Vec::new();

        for student in students {
            if let Some(department) = department {
                if !student.department.eq_ignore_ascii_case(department) {
                    continue;
                }
            }
            if let Some(year) = year {
                if crate::services::cohort::year_of_semester(student.semester) != year {
                    continue;
                }
            }
            let counts = crate::db::attendance::range_counts(&self.db, student.id, from, to).await?;
            let pct = percentage(counts.attended, counts.total);
            rows.push(ComplianceRow {
                attended: counts.attended,
                total: counts.total,
                percentage: round2(pct),
                compliance: classify(pct, threshold),
                student,
            });
        }

        Ok(rows)
    }

    /// Active students strictly below the threshold over the date window.
    /// A student at exactly the threshold is not selected. `year` narrows
    /// the sweep to one display year (its two semesters).
    pub async fn low_attendance_students(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        threshold: Option<f64>,
        year: Option<i64>,
    ) -> Result<Vec<LowAttendanceStudent>> {
        let threshold = match threshold {
            Some(t) => t,
            None => settings::get_attendance_threshold(&self.db).await?,
        };

        let students = crate::db::students::find_active(&self.db).await?;
        let mut selected = Vec::new();

        for student in students {
            if let Some(year) = year {
                if crate::services::cohort::year_of_semester(student.semester) != year {
                    continue;
                }
            }
            let counts = crate::db::attendance::range_counts(&self.db, student.id, from, to).await?;
            let pct = percentage(counts.attended, counts.total);
            if pct < threshold {
                selected.push(LowAttendanceStudent {
                    attended: counts.attended,
                    total: counts.total,
                    percentage: round2(pct),
                    student,
                });
            }
        }

        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atms_common::db::models::AttendanceStatus;

    #[test]
    fn empty_input_is_zero_percent_not_an_error() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(classify(0.0, 75.0), Compliance::Shortage);
    }

    #[test]
    fn threshold_boundary_is_qualified() {
        assert_eq!(classify(75.0, 75.0), Compliance::Qualified);
        assert_eq!(classify(74.99, 75.0), Compliance::Shortage);
    }

    async fn setup_pool() -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        atms_common::db::init::init_schema(&pool).await.unwrap();
        pool
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    /// Seed one student with `marks` against a fresh session of a fresh
    /// subject, one mark per day starting 2026-01-05
    async fn seed_marks(
        pool: &SqlitePool,
        roll_no: &str,
        code: &str,
        marks: &[AttendanceStatus],
    ) -> (i64, i64) {
        let student = crate::db::students::insert(pool, roll_no, roll_no, "CS", 3, "A")
            .await
            .unwrap();
        let subject = crate::db::subjects::insert(pool, code, code, "CS", 3, 4).await.unwrap();
        let session = crate::db::sessions::insert(
            pool, Some(subject), None, "CS", 3, "A", "Monday", "09:00", "10:00",
        )
        .await
        .unwrap();

        let start = date("2026-01-05");
        for (offset, status) in marks.iter().enumerate() {
            let day = start + chrono::Days::new(offset as u64);
            crate::db::attendance::upsert(pool, student, session, day, *status).await.unwrap();
        }
        (student, subject)
    }

    #[tokio::test]
    async fn seven_present_two_absent_one_od_is_eighty_percent() {
        let pool = setup_pool().await;
        let mut marks = vec![AttendanceStatus::Present; 7];
        marks.extend([AttendanceStatus::Absent, AttendanceStatus::Absent, AttendanceStatus::Od]);
        let (student, subject) = seed_marks(&pool, "CS001", "CS301", &marks).await;

        let aggregator = AttendanceAggregator::new(pool);
        let pct = aggregator.subject_percentage(student, subject).await.unwrap();
        assert_eq!(pct, 80.0);
    }

    #[tokio::test]
    async fn no_records_is_zero_percent_and_shortage() {
        let pool = setup_pool().await;
        let student = crate::db::students::insert(&pool, "CS001", "Asha", "CS", 3, "A")
            .await
            .unwrap();
        let subject = crate::db::subjects::insert(&pool, "CS301", "Algorithms", "CS", 3, 4)
            .await
            .unwrap();

        let aggregator = AttendanceAggregator::new(pool);
        let pct = aggregator.subject_percentage(student, subject).await.unwrap();
        assert_eq!(pct, 0.0);

        let report = aggregator.overall_for_student(student).await.unwrap();
        assert_eq!(report.overall_percentage, 0.0);
        assert_eq!(report.compliance, Compliance::Shortage);
    }

    #[tokio::test]
    async fn overall_is_unweighted_mean_of_subject_percentages() {
        let pool = setup_pool().await;

        let student = crate::db::students::insert(&pool, "CS001", "Asha", "CS", 3, "A")
            .await
            .unwrap();
        let algo = crate::db::subjects::insert(&pool, "CS301", "Algorithms", "CS", 3, 4)
            .await
            .unwrap();
        let os = crate::db::subjects::insert(&pool, "CS302", "Operating Systems", "CS", 3, 4)
            .await
            .unwrap();
        let algo_session = crate::db::sessions::insert(
            &pool, Some(algo), None, "CS", 3, "A", "Monday", "09:00", "10:00",
        )
        .await
        .unwrap();
        let os_session = crate::db::sessions::insert(
            &pool, Some(os), None, "CS", 3, "A", "Tuesday", "09:00", "10:00",
        )
        .await
        .unwrap();

        // Algorithms: 1/1 = 100%. Operating Systems: 1/4 = 25%.
        crate::db::attendance::upsert(&pool, student, algo_session, date("2026-01-05"), AttendanceStatus::Present)
            .await
            .unwrap();
        let start = date("2026-01-06");
        for offset in 0..4u64 {
            let status = if offset == 0 {
                AttendanceStatus::Present
            } else {
                AttendanceStatus::Absent
            };
            crate::db::attendance::upsert(&pool, student, os_session, start + chrono::Days::new(offset), status)
                .await
                .unwrap();
        }

        let aggregator = AttendanceAggregator::new(pool);
        let report = aggregator.overall_for_student(student).await.unwrap();

        // Mean of (100, 25), not 2/5 of all marks
        assert_eq!(report.overall_percentage, 62.5);
        assert_eq!(report.subjects.len(), 2);
    }

    #[tokio::test]
    async fn selection_is_strictly_below_threshold() {
        let pool = setup_pool().await;

        // 3/4 = exactly 75%
        let mut marks = vec![AttendanceStatus::Present; 3];
        marks.push(AttendanceStatus::Absent);
        seed_marks(&pool, "CS001", "CS301", &marks).await;

        // 2/3 = 66.67%, below the threshold
        let marks = vec![
            AttendanceStatus::Present,
            AttendanceStatus::Od,
            AttendanceStatus::Absent,
        ];
        seed_marks(&pool, "CS002", "CS302", &marks).await;

        let aggregator = AttendanceAggregator::new(pool);
        let selected = aggregator
            .low_attendance_students(date("2026-01-01"), date("2026-01-31"), Some(75.0), None)
            .await
            .unwrap();

        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].student.roll_no, "CS002");
        assert_eq!(selected[0].percentage, 66.67);
    }

    #[tokio::test]
    async fn range_report_classifies_each_student() {
        let pool = setup_pool().await;

        // 3/4 = 75%: qualified at the default threshold
        let mut marks = vec![AttendanceStatus::Present; 3];
        marks.push(AttendanceStatus::Absent);
        seed_marks(&pool, "CS001", "CS301", &marks).await;

        // 1/3: shortage
        let marks = vec![
            AttendanceStatus::Present,
            AttendanceStatus::Absent,
            AttendanceStatus::Absent,
        ];
        seed_marks(&pool, "CS002", "CS302", &marks).await;

        let aggregator = AttendanceAggregator::new(pool);
        let rows = aggregator
            .range_report(date("2026-01-01"), date("2026-01-31"), Some("cs"), None)
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].compliance, Compliance::Qualified);
        assert_eq!(rows[1].compliance, Compliance::Shortage);

        let rows = aggregator
            .range_report(date("2026-01-01"), date("2026-01-31"), Some("EE"), None)
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn year_filter_narrows_the_sweep() {
        let pool = setup_pool().await;

        // Semester 3 student (Year 2) with everything absent
        seed_marks(&pool, "CS001", "CS301", &[AttendanceStatus::Absent]).await;

        let aggregator = AttendanceAggregator::new(pool);
        let year_one = aggregator
            .low_attendance_students(date("2026-01-01"), date("2026-01-31"), Some(75.0), Some(1))
            .await
            .unwrap();
        assert!(year_one.is_empty());

        let year_two = aggregator
            .low_attendance_students(date("2026-01-01"), date("2026-01-31"), Some(75.0), Some(2))
            .await
            .unwrap();
        assert_eq!(year_two.len(), 1);
    }

    #[tokio::test]
    async fn range_percentage_ignores_marks_outside_window() {
        let pool = setup_pool().await;
        let (student, _) = seed_marks(
            &pool,
            "CS001",
            "CS301",
            &[AttendanceStatus::Present, AttendanceStatus::Absent],
        )
        .await;

        let aggregator = AttendanceAggregator::new(pool);
        // Window covering only the first (present) mark
        let pct = aggregator
            .range_percentage(student, date("2026-01-05"), date("2026-01-05"))
            .await
            .unwrap();
        assert_eq!(pct, 100.0);
    }
}
