use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use medreports_core::models::processing_log::ProcessingLog;
use medreports_core::models::report::{ReportDetail, ReportSummary};
use medreports_storage::store::Page;

use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::pipeline::{AnalysisOutcome, run_analysis};
use crate::state::AppState;
use crate::upload::read_report_image;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ListQuery {
    pub fn page(&self) -> Page {
        let default = Page::default();
        Page::new(
            self.limit.unwrap_or(default.limit),
            self.offset.unwrap_or(default.offset),
        )
    }
}

/// Upload a report image and run the full analysis.
pub async fn upload_report(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<Json<AnalysisOutcome>, ApiError> {
    let image = read_report_image(multipart, state.max_upload_bytes).await?;
    let outcome = run_analysis(&state, user.user_id, image).await?;
    Ok(Json(outcome))
}

pub async fn list_reports(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ReportSummary>>, ApiError> {
    let reports = state.store.list_reports(user.user_id, query.page()).await?;
    Ok(Json(reports))
}

pub async fn get_report(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReportDetail>, ApiError> {
    let report = state.store.get_report(user.user_id, id).await?;
    let findings = state.store.list_findings(id).await?;
    Ok(Json(ReportDetail { report, findings }))
}

pub async fn delete_report(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_report(user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_logs(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ProcessingLog>>, ApiError> {
    state.store.get_report(user.user_id, id).await?;
    let logs = state.store.list_processing_logs(id).await?;
    Ok(Json(logs))
}

#[derive(Debug, Serialize)]
pub struct HealthScore {
    pub report_id: Uuid,
    pub health_score: u8,
}

pub async fn get_health_score(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<HealthScore>, ApiError> {
    state.store.get_report(user.user_id, id).await?;
    let health_score = state
        .store
        .health_score(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no health score for report {id}")))?;
    Ok(Json(HealthScore {
        report_id: id,
        health_score,
    }))
}
