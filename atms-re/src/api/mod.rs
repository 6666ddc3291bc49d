//! HTTP API handlers for atms-re

pub mod attendance;
pub mod health;
pub mod maintenance;
pub mod staff;

pub use attendance::{
    low_attendance, overall_attendance, range_percentage, range_report, subject_percentage,
};
pub use health::health_routes;
pub use maintenance::{cohort_distribution, run_maintenance};
pub use staff::sync_staff;
