use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbSessionRecord {
    /// Stable external identity; unique key for the table.
    pub twitch_id: String,
    pub display_name: String,
    pub username: String,
    pub email: Option<String>,
    pub avatar_url: String,
    pub access_token: String,
    pub refresh_token: String,
    /// Token TTL in seconds, when the provider reported one.
    pub expires_in: Option<i64>,
    pub token_obtained_at: DateTime<Utc>,
    /// Raw callback payload as received, kept opaque.
    pub auth_payload: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbSettingRecord {
    pub id: i64,
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbCharadeSet {
    pub id: i64,
    pub name: String,
    /// JSON array of channel names.
    pub channels: String,
    /// JSON array of words.
    pub words: String,
    /// JSON object of set-specific settings.
    pub settings: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
