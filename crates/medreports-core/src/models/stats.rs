use serde::{Deserialize, Serialize};

use super::finding::FindingCounts;
use super::report::ReportSummary;

/// Dashboard numbers for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserReportStats {
    pub total_reports: u64,
    pub completed_reports: u64,
    pub average_health_score: u8,
    pub recent_reports: Vec<ReportSummary>,
}

/// Percentage score for a report: normal findings count fully, concerning
/// ones count half, abnormal and unknown ones not at all.
pub fn health_score(counts: FindingCounts) -> u8 {
    if counts.total == 0 {
        return 0;
    }
    let weighted = f64::from(counts.normal) + 0.5 * f64::from(counts.concerning);
    (100.0 * weighted / f64::from(counts.total)).round() as u8
}

/// Rounded mean of the given scores, 0 for an empty input.
pub fn average_score<I>(scores: I) -> u8
where
    I: IntoIterator<Item = u8>,
{
    let (sum, n) = scores
        .into_iter()
        .fold((0u64, 0u64), |(sum, n), s| (sum + u64::from(s), n + 1));
    if n == 0 {
        return 0;
    }
    (sum as f64 / n as f64).round() as u8
}
