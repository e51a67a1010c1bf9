use async_trait::async_trait;
use uuid::Uuid;

use medreports_core::models::finding::{Finding, FindingCounts};
use medreports_core::models::preferences::{PreferencesUpdate, UserPreferences};
use medreports_core::models::processing_log::{NewProcessingLog, ProcessingLog};
use medreports_core::models::report::{
    AnalysisStatus, MedicalReport, NewReport, ReportSummary, ReportUpdate, TestResult,
    TestResultUpdate,
};
use medreports_core::models::stats::{UserReportStats, average_score};

use crate::error::StorageError;

/// Number of recent reports the dashboard average is computed over.
const STATS_WINDOW: u32 = 50;

const MAX_PAGE_SIZE: u32 = 100;

/// Pagination window for report listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Page {
    /// `limit` is clamped to `1..=100`.
    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit: limit.clamp(1, MAX_PAGE_SIZE),
            offset,
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: 10,
            offset: 0,
        }
    }
}

/// Persistence for reports, findings, processing logs and preferences.
///
/// Reads that take a `user_id` only return rows owned by that user.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn create_report(&self, report: NewReport) -> Result<MedicalReport, StorageError>;

    async fn update_report(
        &self,
        report_id: Uuid,
        update: ReportUpdate,
    ) -> Result<MedicalReport, StorageError>;

    async fn get_report(&self, user_id: Uuid, report_id: Uuid)
    -> Result<MedicalReport, StorageError>;

    /// Newest first.
    async fn list_reports(
        &self,
        user_id: Uuid,
        page: Page,
    ) -> Result<Vec<ReportSummary>, StorageError>;

    async fn delete_report(&self, user_id: Uuid, report_id: Uuid) -> Result<(), StorageError>;

    /// Insert findings in the given order.
    async fn create_findings(
        &self,
        report_id: Uuid,
        findings: &[Finding],
    ) -> Result<Vec<TestResult>, StorageError>;

    async fn get_finding(&self, finding_id: Uuid) -> Result<TestResult, StorageError>;

    /// In insertion order.
    async fn list_findings(&self, report_id: Uuid) -> Result<Vec<TestResult>, StorageError>;

    async fn update_finding(
        &self,
        finding_id: Uuid,
        update: TestResultUpdate,
    ) -> Result<TestResult, StorageError>;

    async fn delete_finding(&self, finding_id: Uuid) -> Result<(), StorageError>;

    async fn create_processing_log(
        &self,
        log: NewProcessingLog,
    ) -> Result<ProcessingLog, StorageError>;

    /// Oldest first.
    async fn list_processing_logs(
        &self,
        report_id: Uuid,
    ) -> Result<Vec<ProcessingLog>, StorageError>;

    async fn get_preferences(&self, user_id: Uuid)
    -> Result<Option<UserPreferences>, StorageError>;

    async fn create_preferences(
        &self,
        user_id: Uuid,
        prefs: PreferencesUpdate,
    ) -> Result<UserPreferences, StorageError>;

    async fn update_preferences(
        &self,
        user_id: Uuid,
        prefs: PreferencesUpdate,
    ) -> Result<UserPreferences, StorageError>;

    /// Score from the report summary view, `None` if the report is unknown.
    async fn health_score(&self, report_id: Uuid) -> Result<Option<u8>, StorageError>;

    async fn count_reports(
        &self,
        user_id: Uuid,
        status: Option<AnalysisStatus>,
    ) -> Result<u64, StorageError>;

    /// Mark the report completed with `summary` and the finding tallies,
    /// then insert the findings. Stops at the first failure; earlier writes
    /// are kept.
    async fn save_complete_analysis(
        &self,
        report_id: Uuid,
        summary: &str,
        findings: &[Finding],
    ) -> Result<(), StorageError> {
        let update = ReportUpdate::completed(summary.to_string())
            .with_counts(FindingCounts::from_findings(findings));
        self.update_report(report_id, update).await?;
        self.create_findings(report_id, findings).await?;
        Ok(())
    }
}

/// Report counts plus the mean health score of completed reports among the
/// most recent ones.
pub async fn user_report_stats(
    store: &dyn ReportStore,
    user_id: Uuid,
) -> Result<UserReportStats, StorageError> {
    let total_reports = store.count_reports(user_id, None).await?;
    let completed_reports = store
        .count_reports(user_id, Some(AnalysisStatus::Completed))
        .await?;
    let recent_reports = store
        .list_reports(user_id, Page::new(STATS_WINDOW, 0))
        .await?;

    let average_health_score = average_score(
        recent_reports
            .iter()
            .filter(|r| r.analysis_status == AnalysisStatus::Completed)
            .map(|r| r.health_score),
    );

    Ok(UserReportStats {
        total_reports,
        completed_reports,
        average_health_score,
        recent_reports,
    })
}
