//! In-process [`ReportStore`].
//!
//! Rows live in insertion-ordered vectors behind a `tokio` lock. The
//! report summary view is derived on read with
//! [`medreports_core::models::stats::health_score`].

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use medreports_core::models::finding::Finding;
use medreports_core::models::preferences::{
    DEFAULT_RETENTION_DAYS, PreferencesUpdate, UserPreferences,
};
use medreports_core::models::processing_log::{NewProcessingLog, ProcessingLog};
use medreports_core::models::report::{
    AnalysisStatus, MedicalReport, NewReport, ReportSummary, ReportUpdate, TestResult,
    TestResultUpdate,
};
use medreports_core::models::stats::health_score;
use medreports_core::tables;

use crate::error::StorageError;
use crate::store::{Page, ReportStore};

#[derive(Default)]
struct Tables {
    reports: Vec<MedicalReport>,
    findings: Vec<TestResult>,
    logs: Vec<ProcessingLog>,
    preferences: Vec<UserPreferences>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    failing_table: Option<&'static str>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose writes to `table` always fail, for exercising error
    /// paths.
    pub fn with_failing_table(table: &'static str) -> Self {
        Self {
            failing_table: Some(table),
            ..Self::default()
        }
    }

    fn check_writable(&self, table: &str) -> Result<(), StorageError> {
        if self.failing_table == Some(table) {
            return Err(StorageError::Postgrest {
                status: 503,
                code: None,
                message: format!("writes to {table} are disabled"),
            });
        }
        Ok(())
    }
}

fn summarize(report: &MedicalReport) -> ReportSummary {
    ReportSummary {
        id: report.id,
        user_id: report.user_id,
        file_name: report.file_name.clone(),
        file_size: report.file_size,
        file_type: report.file_type.clone(),
        patient_info: report.patient_info.clone(),
        analysis_status: report.analysis_status,
        created_at: report.created_at,
        updated_at: report.updated_at,
        total_tests: report.total_tests,
        normal_tests: report.normal_tests,
        abnormal_tests: report.abnormal_tests,
        concerning_tests: report.concerning_tests,
        health_score: health_score(report.counts()),
    }
}

fn apply_report_update(report: &mut MedicalReport, update: ReportUpdate) {
    if let Some(v) = update.patient_info {
        report.patient_info = Some(v);
    }
    if let Some(v) = update.analysis_status {
        report.analysis_status = v;
    }
    if let Some(v) = update.total_tests {
        report.total_tests = v;
    }
    if let Some(v) = update.normal_tests {
        report.normal_tests = v;
    }
    if let Some(v) = update.abnormal_tests {
        report.abnormal_tests = v;
    }
    if let Some(v) = update.concerning_tests {
        report.concerning_tests = v;
    }
    report.updated_at = jiff::Timestamp::now();
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn create_report(&self, report: NewReport) -> Result<MedicalReport, StorageError> {
        self.check_writable(tables::MEDICAL_REPORTS)?;
        let now = jiff::Timestamp::now();
        let created = MedicalReport {
            id: Uuid::new_v4(),
            user_id: report.user_id,
            file_name: report.file_name,
            file_size: report.file_size,
            file_type: report.file_type,
            original_text: report.original_text,
            patient_info: None,
            analysis_status: report.analysis_status,
            created_at: now,
            updated_at: now,
            total_tests: 0,
            normal_tests: 0,
            abnormal_tests: 0,
            concerning_tests: 0,
        };
        self.tables.write().await.reports.push(created.clone());
        Ok(created)
    }

    async fn update_report(
        &self,
        report_id: Uuid,
        update: ReportUpdate,
    ) -> Result<MedicalReport, StorageError> {
        self.check_writable(tables::MEDICAL_REPORTS)?;
        let mut tables = self.tables.write().await;
        let report = tables
            .reports
            .iter_mut()
            .find(|r| r.id == report_id)
            .ok_or_else(|| StorageError::not_found(format!("report {report_id}")))?;
        apply_report_update(report, update);
        Ok(report.clone())
    }

    async fn get_report(
        &self,
        user_id: Uuid,
        report_id: Uuid,
    ) -> Result<MedicalReport, StorageError> {
        self.tables
            .read()
            .await
            .reports
            .iter()
            .find(|r| r.id == report_id && r.user_id == user_id)
            .cloned()
            .ok_or_else(|| StorageError::not_found(format!("report {report_id}")))
    }

    async fn list_reports(
        &self,
        user_id: Uuid,
        page: Page,
    ) -> Result<Vec<ReportSummary>, StorageError> {
        Ok(self
            .tables
            .read()
            .await
            .reports
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id)
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .map(summarize)
            .collect())
    }

    async fn delete_report(&self, user_id: Uuid, report_id: Uuid) -> Result<(), StorageError> {
        self.check_writable(tables::MEDICAL_REPORTS)?;
        let mut tables = self.tables.write().await;
        let before = tables.reports.len();
        tables
            .reports
            .retain(|r| !(r.id == report_id && r.user_id == user_id));
        if tables.reports.len() == before {
            return Err(StorageError::not_found(format!("report {report_id}")));
        }
        // Mirrors ON DELETE CASCADE.
        tables.findings.retain(|f| f.report_id != report_id);
        tables.logs.retain(|l| l.report_id != report_id);
        Ok(())
    }

    async fn create_findings(
        &self,
        report_id: Uuid,
        findings: &[Finding],
    ) -> Result<Vec<TestResult>, StorageError> {
        self.check_writable(tables::TEST_RESULTS)?;
        let mut tables = self.tables.write().await;
        if !tables.reports.iter().any(|r| r.id == report_id) {
            return Err(StorageError::Postgrest {
                status: 409,
                code: Some("23503".to_string()),
                message: format!("report {report_id} does not exist"),
            });
        }
        let now = jiff::Timestamp::now();
        let created: Vec<TestResult> = findings
            .iter()
            .map(|f| TestResult {
                id: Uuid::new_v4(),
                report_id,
                test_name: f.name.clone(),
                test_value: f.value.clone(),
                status: f.status.clone(),
                explanation: f.explanation.clone(),
                created_at: now,
            })
            .collect();
        tables.findings.extend(created.iter().cloned());
        Ok(created)
    }

    async fn get_finding(&self, finding_id: Uuid) -> Result<TestResult, StorageError> {
        self.tables
            .read()
            .await
            .findings
            .iter()
            .find(|f| f.id == finding_id)
            .cloned()
            .ok_or_else(|| StorageError::not_found(format!("finding {finding_id}")))
    }

    async fn list_findings(&self, report_id: Uuid) -> Result<Vec<TestResult>, StorageError> {
        Ok(self
            .tables
            .read()
            .await
            .findings
            .iter()
            .filter(|f| f.report_id == report_id)
            .cloned()
            .collect())
    }

    async fn update_finding(
        &self,
        finding_id: Uuid,
        update: TestResultUpdate,
    ) -> Result<TestResult, StorageError> {
        self.check_writable(tables::TEST_RESULTS)?;
        let mut tables = self.tables.write().await;
        let finding = tables
            .findings
            .iter_mut()
            .find(|f| f.id == finding_id)
            .ok_or_else(|| StorageError::not_found(format!("finding {finding_id}")))?;
        if let Some(v) = update.test_name {
            finding.test_name = v;
        }
        if let Some(v) = update.test_value {
            finding.test_value = v;
        }
        if let Some(v) = update.status {
            finding.status = v;
        }
        if let Some(v) = update.explanation {
            finding.explanation = v;
        }
        Ok(finding.clone())
    }

    async fn delete_finding(&self, finding_id: Uuid) -> Result<(), StorageError> {
        self.check_writable(tables::TEST_RESULTS)?;
        let mut tables = self.tables.write().await;
        let before = tables.findings.len();
        tables.findings.retain(|f| f.id != finding_id);
        if tables.findings.len() == before {
            return Err(StorageError::not_found(format!("finding {finding_id}")));
        }
        Ok(())
    }

    async fn create_processing_log(
        &self,
        log: NewProcessingLog,
    ) -> Result<ProcessingLog, StorageError> {
        self.check_writable(tables::PROCESSING_LOGS)?;
        let created = ProcessingLog {
            id: Uuid::new_v4(),
            report_id: log.report_id,
            step: log.step,
            status: log.status,
            message: log.message,
            duration_ms: log.duration_ms,
            created_at: jiff::Timestamp::now(),
        };
        self.tables.write().await.logs.push(created.clone());
        Ok(created)
    }

    async fn list_processing_logs(
        &self,
        report_id: Uuid,
    ) -> Result<Vec<ProcessingLog>, StorageError> {
        Ok(self
            .tables
            .read()
            .await
            .logs
            .iter()
            .filter(|l| l.report_id == report_id)
            .cloned()
            .collect())
    }

    async fn get_preferences(
        &self,
        user_id: Uuid,
    ) -> Result<Option<UserPreferences>, StorageError> {
        Ok(self
            .tables
            .read()
            .await
            .preferences
            .iter()
            .find(|p| p.user_id == user_id)
            .cloned())
    }

    async fn create_preferences(
        &self,
        user_id: Uuid,
        prefs: PreferencesUpdate,
    ) -> Result<UserPreferences, StorageError> {
        self.check_writable(tables::USER_PREFERENCES)?;
        let mut tables = self.tables.write().await;
        if tables.preferences.iter().any(|p| p.user_id == user_id) {
            return Err(StorageError::Postgrest {
                status: 409,
                code: Some("23505".to_string()),
                message: format!("preferences for {user_id} already exist"),
            });
        }
        let now = jiff::Timestamp::now();
        let created = UserPreferences {
            id: Uuid::new_v4(),
            user_id,
            email_notifications: prefs.email_notifications.unwrap_or(true),
            analysis_history_retention_days: prefs
                .analysis_history_retention_days
                .unwrap_or(DEFAULT_RETENTION_DAYS),
            created_at: now,
            updated_at: now,
        };
        tables.preferences.push(created.clone());
        Ok(created)
    }

    async fn update_preferences(
        &self,
        user_id: Uuid,
        prefs: PreferencesUpdate,
    ) -> Result<UserPreferences, StorageError> {
        self.check_writable(tables::USER_PREFERENCES)?;
        let mut tables = self.tables.write().await;
        let existing = tables
            .preferences
            .iter_mut()
            .find(|p| p.user_id == user_id)
            .ok_or_else(|| StorageError::not_found(format!("preferences for {user_id}")))?;
        if let Some(v) = prefs.email_notifications {
            existing.email_notifications = v;
        }
        if let Some(v) = prefs.analysis_history_retention_days {
            existing.analysis_history_retention_days = v;
        }
        existing.updated_at = jiff::Timestamp::now();
        Ok(existing.clone())
    }

    async fn health_score(&self, report_id: Uuid) -> Result<Option<u8>, StorageError> {
        Ok(self
            .tables
            .read()
            .await
            .reports
            .iter()
            .find(|r| r.id == report_id)
            .map(|r| health_score(r.counts())))
    }

    async fn count_reports(
        &self,
        user_id: Uuid,
        status: Option<AnalysisStatus>,
    ) -> Result<u64, StorageError> {
        Ok(self
            .tables
            .read()
            .await
            .reports
            .iter()
            .filter(|r| r.user_id == user_id)
            .filter(|r| status.is_none_or(|s| r.analysis_status == s))
            .count() as u64)
    }
}
