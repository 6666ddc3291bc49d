//! Engine services
//!
//! Reconciliation runs as a pure pipeline: detect defects, plan
//! corrections, apply them. Only the apply step and the aggregation
//! queries touch the database.

pub mod attendance;
pub mod cohort;
pub mod maintenance;
pub mod mismatch;
pub mod staff_sync;
pub mod subject_dedup;

pub use attendance::{AttendanceAggregator, Compliance};
pub use maintenance::{MaintenanceReport, MaintenanceService};
