//! Page view models. Each serializes into the tera context of one page.

use serde::Serialize;
use uuid::Uuid;

use medreports_core::models::analysis::AnalysisResult;
use medreports_core::models::finding::{Finding, FindingStatus};
use medreports_core::models::report::{MedicalReport, ReportSummary, TestResult};
use medreports_core::models::stats::{UserReportStats, health_score};

pub const DISCLAIMER_HEADLINE: &str =
    "This analysis is AI-generated and may contain errors or inaccuracies.";

pub const DISCLAIMER: &str = "The information provided is for educational and informational \
purposes only and should not be considered as medical advice, diagnosis, or treatment \
recommendations. Always consult with a qualified healthcare professional or doctor for proper \
medical interpretation of your test results and any health-related decisions. This tool is not \
a substitute for professional medical consultation.";

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

/// CSS tone for a status label. Labels are matched case-sensitively, so
/// `"normal"` renders as unknown.
pub fn status_tone(status: &str) -> &'static str {
    match FindingStatus::from_label(status).unwrap_or(FindingStatus::Unknown) {
        FindingStatus::Normal => "normal",
        FindingStatus::Concerning => "concerning",
        FindingStatus::Abnormal => "abnormal",
        FindingStatus::Unknown => "unknown",
    }
}

/// Summary text as shown to the patient, with leftover markdown emphasis
/// removed.
pub fn display_summary(summary: &str) -> String {
    summary.replace("**", "").replace("##", "").replace('*', "")
}

fn format_time(ts: jiff::Timestamp) -> String {
    ts.strftime(DATE_FORMAT).to_string()
}

#[derive(Debug, Clone, Serialize)]
pub struct FindingView {
    pub name: String,
    pub value: String,
    pub status: String,
    pub explanation: String,
    pub tone: &'static str,
}

impl From<&Finding> for FindingView {
    fn from(f: &Finding) -> Self {
        FindingView {
            name: f.name.clone(),
            value: f.value.clone(),
            status: f.status.clone(),
            explanation: f.explanation.clone(),
            tone: status_tone(&f.status),
        }
    }
}

impl From<&TestResult> for FindingView {
    fn from(t: &TestResult) -> Self {
        FindingView::from(&t.to_finding())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LandingPage {
    pub user_email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignInPage {
    pub user_email: Option<String>,
    pub redirect_to: String,
    pub error: Option<String>,
}

/// Results block of the analyze page.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisView {
    pub report_id: Option<Uuid>,
    pub file_name: String,
    pub summary: String,
    pub findings: Vec<FindingView>,
    /// Raw model text, only set when no findings could be extracted.
    pub raw_response: Option<String>,
    pub health_score: Option<u8>,
}

impl AnalysisView {
    pub fn new(
        file_name: &str,
        report_id: Option<Uuid>,
        raw_response: &str,
        analysis: &AnalysisResult,
    ) -> Self {
        let has_findings = analysis.has_findings();
        AnalysisView {
            report_id,
            file_name: file_name.to_string(),
            summary: display_summary(&analysis.summary),
            findings: analysis.findings.iter().map(FindingView::from).collect(),
            raw_response: (!has_findings && !raw_response.is_empty())
                .then(|| raw_response.to_string()),
            health_score: has_findings.then(|| health_score(analysis.counts())),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzePage {
    pub user_email: Option<String>,
    pub max_upload_mb: u64,
    pub result: Option<AnalysisView>,
    pub error: Option<String>,
    pub disclaimer_headline: &'static str,
    pub disclaimer: &'static str,
}

impl AnalyzePage {
    pub fn new(user_email: Option<String>, max_upload_bytes: u64) -> Self {
        AnalyzePage {
            user_email,
            max_upload_mb: max_upload_bytes.div_ceil(1024 * 1024),
            result: None,
            error: None,
            disclaimer_headline: DISCLAIMER_HEADLINE,
            disclaimer: DISCLAIMER,
        }
    }

    pub fn with_result(mut self, result: AnalysisView) -> Self {
        self.result = Some(result);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    pub id: Uuid,
    pub file_name: String,
    pub created: String,
    pub status: String,
    pub total_tests: u32,
    pub abnormal_tests: u32,
    pub concerning_tests: u32,
    pub health_score: u8,
}

impl From<&ReportSummary> for ReportRow {
    fn from(r: &ReportSummary) -> Self {
        ReportRow {
            id: r.id,
            file_name: r.file_name.clone(),
            created: format_time(r.created_at),
            status: r.analysis_status.to_string(),
            total_tests: r.total_tests,
            abnormal_tests: r.abnormal_tests,
            concerning_tests: r.concerning_tests,
            health_score: r.health_score,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportsPage {
    pub user_email: Option<String>,
    pub total_reports: u64,
    pub completed_reports: u64,
    pub average_health_score: u8,
    pub reports: Vec<ReportRow>,
    pub previous_offset: Option<u32>,
    pub next_offset: Option<u32>,
    pub limit: u32,
}

impl ReportsPage {
    /// `page` is the listing at `offset`; `stats` supplies the totals.
    pub fn new(
        user_email: Option<String>,
        stats: &UserReportStats,
        page: &[ReportSummary],
        limit: u32,
        offset: u32,
    ) -> Self {
        let shown = offset as u64 + page.len() as u64;
        ReportsPage {
            user_email,
            total_reports: stats.total_reports,
            completed_reports: stats.completed_reports,
            average_health_score: stats.average_health_score,
            reports: page.iter().map(ReportRow::from).collect(),
            previous_offset: (offset > 0).then(|| offset.saturating_sub(limit)),
            next_offset: (shown < stats.total_reports).then_some(offset + limit),
            limit,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportPage {
    pub user_email: Option<String>,
    pub id: Uuid,
    pub file_name: String,
    pub created: String,
    pub status: String,
    pub summary: String,
    pub findings: Vec<FindingView>,
    pub health_score: u8,
    pub disclaimer_headline: &'static str,
    pub disclaimer: &'static str,
}

impl ReportPage {
    pub fn new(user_email: Option<String>, report: &MedicalReport, findings: &[TestResult]) -> Self {
        ReportPage {
            user_email,
            id: report.id,
            file_name: report.file_name.clone(),
            created: format_time(report.created_at),
            status: report.analysis_status.to_string(),
            summary: display_summary(report.patient_info.as_deref().unwrap_or_default()),
            findings: findings.iter().map(FindingView::from).collect(),
            health_score: health_score(report.counts()),
            disclaimer_headline: DISCLAIMER_HEADLINE,
            disclaimer: DISCLAIMER,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPage {
    pub user_email: Option<String>,
    pub title: String,
    pub message: String,
}
