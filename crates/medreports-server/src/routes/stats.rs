use axum::extract::State;
use axum::{Extension, Json};

use medreports_core::models::stats::UserReportStats;
use medreports_storage::store::user_report_stats;

use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub async fn get_stats(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserReportStats>, ApiError> {
    let stats = user_report_stats(state.store.as_ref(), user.user_id).await?;
    Ok(Json(stats))
}
