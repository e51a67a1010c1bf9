//! Relational table and view names.
//!
//! Pure string constants. These define the canonical layout of records in
//! the MedReports database.

pub const MEDICAL_REPORTS: &str = "medical_reports";

pub const TEST_RESULTS: &str = "test_results";

pub const PROCESSING_LOGS: &str = "processing_logs";

pub const USER_PREFERENCES: &str = "user_preferences";

/// Read-only view joining report metadata with the computed health score.
pub const REPORT_SUMMARY: &str = "report_summary";
