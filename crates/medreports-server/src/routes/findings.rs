use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use uuid::Uuid;

use medreports_core::models::finding::{FindingCounts, FindingStatus};
use medreports_core::models::report::{ReportUpdate, TestResult, TestResultUpdate};

use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Load a finding, failing with 404 unless its report belongs to `user`.
async fn owned_finding(
    state: &AppState,
    user: &AuthUser,
    finding_id: Uuid,
) -> Result<TestResult, ApiError> {
    let finding = state.store.get_finding(finding_id).await?;
    state
        .store
        .get_report(user.user_id, finding.report_id)
        .await
        .map_err(|_| ApiError::NotFound(format!("not found: finding {finding_id}")))?;
    Ok(finding)
}

/// Re-tally the report's counts after its findings changed.
async fn refresh_counts(state: &AppState, report_id: Uuid) -> Result<(), ApiError> {
    let findings = state.store.list_findings(report_id).await?;
    let counts = FindingCounts::from_statuses(
        findings
            .iter()
            .map(|f| FindingStatus::from_label(&f.status).unwrap_or(FindingStatus::Unknown)),
    );
    let update = ReportUpdate::default().with_counts(counts);
    state.store.update_report(report_id, update).await?;
    Ok(())
}

pub async fn update_finding(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(update): Json<TestResultUpdate>,
) -> Result<Json<TestResult>, ApiError> {
    if let Some(status) = update.status.as_deref()
        && FindingStatus::from_label(status).is_none()
    {
        return Err(ApiError::BadRequest(format!("unknown status: {status}")));
    }

    let finding = owned_finding(&state, &user, id).await?;
    let status_changed = update.status.is_some();
    let updated = state.store.update_finding(id, update).await?;
    if status_changed {
        refresh_counts(&state, finding.report_id).await?;
    }
    Ok(Json(updated))
}

pub async fn delete_finding(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let finding = owned_finding(&state, &user, id).await?;
    state.store.delete_finding(id).await?;
    refresh_counts(&state, finding.report_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
