//! The per-submission analysis chain: text extraction, report creation,
//! explanation, normalization, persistence. Steps run strictly in order
//! and nothing is retried.

use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use medreports_ai::error::AiError;
use medreports_ai::normalize::normalize_with_tier;
use medreports_ai::ocr::ReportImage;
use medreports_core::models::analysis::AnalysisResult;
use medreports_core::models::processing_log::{NewProcessingLog, PipelineStep, StepStatus};
use medreports_core::models::report::{AnalysisStatus, NewReport, ReportUpdate};
use medreports_storage::error::StorageError;

use crate::state::AppState;

/// Summary stored when the model produced findings but no summary text.
const NO_SUMMARY: &str = "No patient summary available";

/// Halting failures. `Display` is the message shown to the user.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Extraction(AiError),

    #[error("Failed to save report to database")]
    SaveReport(StorageError),

    #[error("Failed to process text with Google AI")]
    Explanation(AiError),
}

/// Result of a submission that got as far as normalization.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub report_id: Uuid,
    /// The explanation model's text, unmodified.
    pub raw_response: String,
    pub analysis: AnalysisResult,
    /// Set when the final write failed. The analysis itself is still valid.
    pub persist_error: Option<String>,
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Processing-log writes are best effort.
async fn record_step(state: &AppState, log: NewProcessingLog) {
    let step = log.step.clone();
    if let Err(e) = state.store.create_processing_log(log).await {
        warn!(step = %step, error = %e, "failed to write processing log");
    }
}

pub async fn run_analysis(
    state: &AppState,
    user_id: Uuid,
    image: ReportImage,
) -> Result<AnalysisOutcome, PipelineError> {
    info!(
        user_id = %user_id,
        file_name = %image.file_name,
        bytes = image.bytes.len(),
        "analysis started"
    );

    let started = Instant::now();
    let text = state
        .extractor
        .extract_text(&image)
        .await
        .map_err(PipelineError::Extraction)?;
    let ocr_ms = elapsed_ms(started);

    let report = state
        .store
        .create_report(NewReport {
            user_id,
            file_name: image.file_name.clone(),
            file_size: image.bytes.len() as u64,
            file_type: image.mime_type.clone(),
            original_text: Some(text.clone()),
            analysis_status: AnalysisStatus::Processing,
        })
        .await
        .map_err(PipelineError::SaveReport)?;
    let report_id = report.id;

    // The report row only exists now, so the extraction step is logged late.
    record_step(
        state,
        NewProcessingLog::new(report_id, PipelineStep::Ocr, StepStatus::Succeeded)
            .duration_ms(ocr_ms),
    )
    .await;

    let started = Instant::now();
    let raw_response = match state.explainer.explain(&text).await {
        Ok(raw) => raw,
        Err(e) => {
            record_step(
                state,
                NewProcessingLog::new(report_id, PipelineStep::Explanation, StepStatus::Failed)
                    .message(e.to_string())
                    .duration_ms(elapsed_ms(started)),
            )
            .await;
            if let Err(mark) = state
                .store
                .update_report(report_id, ReportUpdate::status(AnalysisStatus::Failed))
                .await
            {
                warn!(report_id = %report_id, error = %mark, "failed to mark report failed");
            }
            return Err(PipelineError::Explanation(e));
        }
    };
    record_step(
        state,
        NewProcessingLog::new(report_id, PipelineStep::Explanation, StepStatus::Succeeded)
            .duration_ms(elapsed_ms(started)),
    )
    .await;

    let (analysis, tier) = normalize_with_tier(&raw_response);
    record_step(
        state,
        NewProcessingLog::new(report_id, PipelineStep::Normalization, StepStatus::Succeeded)
            .message(format!(
                "{} finding(s) via {}",
                analysis.findings.len(),
                tier.as_str()
            )),
    )
    .await;

    let started = Instant::now();
    let persisted = if analysis.has_findings() {
        let summary = if analysis.summary.is_empty() {
            NO_SUMMARY
        } else {
            analysis.summary.as_str()
        };
        state
            .store
            .save_complete_analysis(report_id, summary, &analysis.findings)
            .await
            .map_err(|e| ("Failed to save analysis results to database", e))
    } else {
        let patient_info = if analysis.summary.is_empty() {
            raw_response.clone()
        } else {
            analysis.summary.clone()
        };
        state
            .store
            .update_report(report_id, ReportUpdate::completed(patient_info))
            .await
            .map(|_| ())
            .map_err(|e| ("Failed to update report in database", e))
    };

    let persist_error = match persisted {
        Ok(()) => {
            record_step(
                state,
                NewProcessingLog::new(report_id, PipelineStep::Persistence, StepStatus::Succeeded)
                    .duration_ms(elapsed_ms(started)),
            )
            .await;
            None
        }
        Err((message, e)) => {
            warn!(report_id = %report_id, error = %e, "{message}");
            record_step(
                state,
                NewProcessingLog::new(report_id, PipelineStep::Persistence, StepStatus::Failed)
                    .message(e.to_string())
                    .duration_ms(elapsed_ms(started)),
            )
            .await;
            Some(message.to_string())
        }
    };

    info!(
        report_id = %report_id,
        findings = analysis.findings.len(),
        tier = tier.as_str(),
        persisted = persist_error.is_none(),
        "analysis finished"
    );

    Ok(AnalysisOutcome {
        report_id,
        raw_response,
        analysis,
        persist_error,
    })
}
