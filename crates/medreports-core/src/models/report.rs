use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

use super::finding::{Finding, FindingCounts};

/// A stored medical report: upload metadata, extracted text and the
/// analysis summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalReport {
    pub id: Uuid,
    pub user_id: Uuid,
    pub file_name: String,
    pub file_size: u64,
    pub file_type: String,
    #[serde(default)]
    pub original_text: Option<String>,
    #[serde(default)]
    pub patient_info: Option<String>,
    pub analysis_status: AnalysisStatus,
    pub created_at: jiff::Timestamp,
    pub updated_at: jiff::Timestamp,
    #[serde(default)]
    pub total_tests: u32,
    #[serde(default)]
    pub normal_tests: u32,
    #[serde(default)]
    pub abnormal_tests: u32,
    #[serde(default)]
    pub concerning_tests: u32,
}

impl MedicalReport {
    pub fn counts(&self) -> FindingCounts {
        FindingCounts {
            total: self.total_tests,
            normal: self.normal_tests,
            concerning: self.concerning_tests,
            abnormal: self.abnormal_tests,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisStatus {
    Processing,
    Completed,
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisStatus::Processing => "PROCESSING",
            AnalysisStatus::Completed => "COMPLETED",
            AnalysisStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PROCESSING" => Ok(AnalysisStatus::Processing),
            "COMPLETED" => Ok(AnalysisStatus::Completed),
            "FAILED" => Ok(AnalysisStatus::Failed),
            other => Err(CoreError::InvalidStatus(other.to_string())),
        }
    }
}

/// Insert payload for a new report. The database assigns `id` and the
/// timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReport {
    pub user_id: Uuid,
    pub file_name: String,
    pub file_size: u64,
    pub file_type: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub original_text: Option<String>,
    pub analysis_status: AnalysisStatus,
}

/// Partial update. Only fields that are `Some` are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportUpdate {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub patient_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub analysis_status: Option<AnalysisStatus>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub total_tests: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub normal_tests: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub abnormal_tests: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub concerning_tests: Option<u32>,
}

impl ReportUpdate {
    pub fn status(status: AnalysisStatus) -> Self {
        ReportUpdate {
            analysis_status: Some(status),
            ..Default::default()
        }
    }

    pub fn completed(patient_info: String) -> Self {
        ReportUpdate {
            patient_info: Some(patient_info),
            analysis_status: Some(AnalysisStatus::Completed),
            ..Default::default()
        }
    }

    pub fn with_counts(mut self, counts: FindingCounts) -> Self {
        self.total_tests = Some(counts.total);
        self.normal_tests = Some(counts.normal);
        self.abnormal_tests = Some(counts.abnormal);
        self.concerning_tests = Some(counts.concerning);
        self
    }
}

/// A row of the `report_summary` view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub file_name: String,
    pub file_size: u64,
    pub file_type: String,
    #[serde(default)]
    pub patient_info: Option<String>,
    pub analysis_status: AnalysisStatus,
    pub created_at: jiff::Timestamp,
    pub updated_at: jiff::Timestamp,
    #[serde(default)]
    pub total_tests: u32,
    #[serde(default)]
    pub normal_tests: u32,
    #[serde(default)]
    pub abnormal_tests: u32,
    #[serde(default)]
    pub concerning_tests: u32,
    #[serde(default)]
    pub health_score: u8,
}

/// A stored finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub id: Uuid,
    pub report_id: Uuid,
    pub test_name: String,
    pub test_value: String,
    pub status: String,
    pub explanation: String,
    pub created_at: jiff::Timestamp,
}

impl TestResult {
    pub fn to_finding(&self) -> Finding {
        Finding {
            name: self.test_name.clone(),
            value: self.test_value.clone(),
            status: self.status.clone(),
            explanation: self.explanation.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTestResult {
    pub report_id: Uuid,
    pub test_name: String,
    pub test_value: String,
    pub status: String,
    pub explanation: String,
    /// Left to the database default when unset.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub created_at: Option<jiff::Timestamp>,
}

impl NewTestResult {
    pub fn from_finding(report_id: Uuid, finding: &Finding) -> Self {
        NewTestResult {
            report_id,
            test_name: finding.name.clone(),
            test_value: finding.value.clone(),
            status: finding.status.clone(),
            explanation: finding.explanation.clone(),
            created_at: None,
        }
    }

    pub fn created_at(mut self, at: jiff::Timestamp) -> Self {
        self.created_at = Some(at);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResultUpdate {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub test_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub test_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub explanation: Option<String>,
}

/// A report together with its findings, in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDetail {
    pub report: MedicalReport,
    pub findings: Vec<TestResult>,
}
