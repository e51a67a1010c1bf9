use axum::extract::State;
use axum::{Extension, Json};
use serde::Serialize;

use medreports_core::models::preferences::{
    DEFAULT_RETENTION_DAYS, PreferencesUpdate, UserPreferences,
};

use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Preferences in effect for a user; defaults until first saved.
#[derive(Debug, Serialize)]
pub struct EffectivePreferences {
    pub email_notifications: bool,
    pub analysis_history_retention_days: u32,
    pub saved: bool,
}

impl From<UserPreferences> for EffectivePreferences {
    fn from(p: UserPreferences) -> Self {
        EffectivePreferences {
            email_notifications: p.email_notifications,
            analysis_history_retention_days: p.analysis_history_retention_days,
            saved: true,
        }
    }
}

impl Default for EffectivePreferences {
    fn default() -> Self {
        EffectivePreferences {
            email_notifications: true,
            analysis_history_retention_days: DEFAULT_RETENTION_DAYS,
            saved: false,
        }
    }
}

pub async fn get_preferences(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<EffectivePreferences>, ApiError> {
    let prefs = state.store.get_preferences(user.user_id).await?;
    Ok(Json(prefs.map(Into::into).unwrap_or_default()))
}

/// Update preferences, creating the row on first write.
pub async fn put_preferences(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(update): Json<PreferencesUpdate>,
) -> Result<Json<EffectivePreferences>, ApiError> {
    if update.analysis_history_retention_days == Some(0) {
        return Err(ApiError::BadRequest(
            "analysis_history_retention_days must be at least 1".to_string(),
        ));
    }

    let saved = match state.store.get_preferences(user.user_id).await? {
        Some(_) => state.store.update_preferences(user.user_id, update).await?,
        None => state.store.create_preferences(user.user_id, update).await?,
    };
    Ok(Json(saved.into()))
}
