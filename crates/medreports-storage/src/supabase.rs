use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use medreports_core::models::finding::Finding;
use medreports_core::models::preferences::{PreferencesUpdate, UserPreferences};
use medreports_core::models::processing_log::{NewProcessingLog, ProcessingLog};
use medreports_core::models::report::{
    AnalysisStatus, MedicalReport, NewReport, NewTestResult, ReportSummary, ReportUpdate,
    TestResult, TestResultUpdate,
};
use medreports_core::tables;

use crate::client::PostgrestClient;
use crate::error::StorageError;
use crate::rows::{self, Query};
use crate::store::{Page, ReportStore};

/// [`ReportStore`] backed by a Supabase project's PostgREST API.
#[derive(Clone)]
pub struct SupabaseStore {
    client: PostgrestClient,
}

impl SupabaseStore {
    pub fn new(client: PostgrestClient) -> Self {
        Self { client }
    }
}

#[derive(Serialize)]
struct NewPreferences {
    user_id: Uuid,
    #[serde(flatten)]
    prefs: PreferencesUpdate,
}

#[derive(Deserialize)]
struct HealthScoreRow {
    health_score: Option<u8>,
}

fn first_or_not_found<T>(rows: Vec<T>, what: impl FnOnce() -> String) -> Result<T, StorageError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| StorageError::not_found(what()))
}

/// Rows for one batch insert. A batch would otherwise share the
/// transaction's `now()` and `created_at` ordering would be undefined, so
/// each row is stamped one microsecond after the previous one.
fn stamped_rows(
    report_id: Uuid,
    findings: &[Finding],
    base: jiff::Timestamp,
) -> Result<Vec<NewTestResult>, StorageError> {
    findings
        .iter()
        .zip(0i64..)
        .map(|(finding, i)| {
            let at = base
                .checked_add(jiff::SignedDuration::from_micros(i))
                .map_err(|e| StorageError::Config(format!("finding timestamp: {e}")))?;
            Ok(NewTestResult::from_finding(report_id, finding).created_at(at))
        })
        .collect()
}

#[async_trait]
impl ReportStore for SupabaseStore {
    async fn create_report(&self, report: NewReport) -> Result<MedicalReport, StorageError> {
        let rows = rows::insert_rows(&self.client, tables::MEDICAL_REPORTS, &[report]).await?;
        let created: MedicalReport = first_or_not_found(rows, || "inserted report".to_string())?;
        debug!(report_id = %created.id, "report created");
        Ok(created)
    }

    async fn update_report(
        &self,
        report_id: Uuid,
        update: ReportUpdate,
    ) -> Result<MedicalReport, StorageError> {
        let query = Query::new().eq("id", report_id);
        let rows = rows::update_rows(&self.client, tables::MEDICAL_REPORTS, &query, &update).await?;
        first_or_not_found(rows, || format!("report {report_id}"))
    }

    async fn get_report(
        &self,
        user_id: Uuid,
        report_id: Uuid,
    ) -> Result<MedicalReport, StorageError> {
        let query = Query::new().eq("id", report_id).eq("user_id", user_id);
        let rows = rows::select_rows(&self.client, tables::MEDICAL_REPORTS, &query).await?;
        first_or_not_found(rows, || format!("report {report_id}"))
    }

    async fn list_reports(
        &self,
        user_id: Uuid,
        page: Page,
    ) -> Result<Vec<ReportSummary>, StorageError> {
        let query = Query::new()
            .eq("user_id", user_id)
            .order("created_at", false)
            .limit(page.limit)
            .offset(page.offset);
        rows::select_rows(&self.client, tables::REPORT_SUMMARY, &query).await
    }

    async fn delete_report(&self, user_id: Uuid, report_id: Uuid) -> Result<(), StorageError> {
        let query = Query::new().eq("id", report_id).eq("user_id", user_id);
        let deleted = rows::delete_rows(&self.client, tables::MEDICAL_REPORTS, &query).await?;
        if deleted == 0 {
            return Err(StorageError::not_found(format!("report {report_id}")));
        }
        Ok(())
    }

    async fn create_findings(
        &self,
        report_id: Uuid,
        findings: &[Finding],
    ) -> Result<Vec<TestResult>, StorageError> {
        if findings.is_empty() {
            return Ok(Vec::new());
        }
        let new_rows = stamped_rows(report_id, findings, jiff::Timestamp::now())?;
        rows::insert_rows(&self.client, tables::TEST_RESULTS, &new_rows).await
    }

    async fn get_finding(&self, finding_id: Uuid) -> Result<TestResult, StorageError> {
        let query = Query::new().eq("id", finding_id);
        let rows = rows::select_rows(&self.client, tables::TEST_RESULTS, &query).await?;
        first_or_not_found(rows, || format!("finding {finding_id}"))
    }

    async fn list_findings(&self, report_id: Uuid) -> Result<Vec<TestResult>, StorageError> {
        let query = Query::new()
            .eq("report_id", report_id)
            .order("created_at", true);
        rows::select_rows(&self.client, tables::TEST_RESULTS, &query).await
    }

    async fn update_finding(
        &self,
        finding_id: Uuid,
        update: TestResultUpdate,
    ) -> Result<TestResult, StorageError> {
        let query = Query::new().eq("id", finding_id);
        let rows = rows::update_rows(&self.client, tables::TEST_RESULTS, &query, &update).await?;
        first_or_not_found(rows, || format!("finding {finding_id}"))
    }

    async fn delete_finding(&self, finding_id: Uuid) -> Result<(), StorageError> {
        let query = Query::new().eq("id", finding_id);
        let deleted = rows::delete_rows(&self.client, tables::TEST_RESULTS, &query).await?;
        if deleted == 0 {
            return Err(StorageError::not_found(format!("finding {finding_id}")));
        }
        Ok(())
    }

    async fn create_processing_log(
        &self,
        log: NewProcessingLog,
    ) -> Result<ProcessingLog, StorageError> {
        let rows = rows::insert_rows(&self.client, tables::PROCESSING_LOGS, &[log]).await?;
        first_or_not_found(rows, || "inserted processing log".to_string())
    }

    async fn list_processing_logs(
        &self,
        report_id: Uuid,
    ) -> Result<Vec<ProcessingLog>, StorageError> {
        let query = Query::new()
            .eq("report_id", report_id)
            .order("created_at", true);
        rows::select_rows(&self.client, tables::PROCESSING_LOGS, &query).await
    }

    async fn get_preferences(
        &self,
        user_id: Uuid,
    ) -> Result<Option<UserPreferences>, StorageError> {
        let query = Query::new().eq("user_id", user_id).limit(1);
        let rows: Vec<UserPreferences> =
            rows::select_rows(&self.client, tables::USER_PREFERENCES, &query).await?;
        Ok(rows.into_iter().next())
    }

    async fn create_preferences(
        &self,
        user_id: Uuid,
        prefs: PreferencesUpdate,
    ) -> Result<UserPreferences, StorageError> {
        let row = NewPreferences { user_id, prefs };
        let rows = rows::insert_rows(&self.client, tables::USER_PREFERENCES, &[row]).await?;
        first_or_not_found(rows, || "inserted preferences".to_string())
    }

    async fn update_preferences(
        &self,
        user_id: Uuid,
        prefs: PreferencesUpdate,
    ) -> Result<UserPreferences, StorageError> {
        let query = Query::new().eq("user_id", user_id);
        let rows = rows::update_rows(&self.client, tables::USER_PREFERENCES, &query, &prefs).await?;
        first_or_not_found(rows, || format!("preferences for {user_id}"))
    }

    async fn health_score(&self, report_id: Uuid) -> Result<Option<u8>, StorageError> {
        let query = Query::new().select("health_score").eq("id", report_id);
        let rows: Vec<HealthScoreRow> =
            rows::select_rows(&self.client, tables::REPORT_SUMMARY, &query).await?;
        Ok(rows.into_iter().next().and_then(|r| r.health_score))
    }

    async fn count_reports(
        &self,
        user_id: Uuid,
        status: Option<AnalysisStatus>,
    ) -> Result<u64, StorageError> {
        let mut query = Query::new().eq("user_id", user_id);
        if let Some(status) = status {
            query = query.eq("analysis_status", status.as_str());
        }
        rows::count_rows(&self.client, tables::MEDICAL_REPORTS, &query).await
    }
}
