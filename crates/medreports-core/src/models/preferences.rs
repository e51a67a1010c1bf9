use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_RETENTION_DAYS: u32 = 365;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email_notifications: bool,
    pub analysis_history_retention_days: u32,
    pub created_at: jiff::Timestamp,
    pub updated_at: jiff::Timestamp,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferencesUpdate {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub email_notifications: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub analysis_history_retention_days: Option<u32>,
}
