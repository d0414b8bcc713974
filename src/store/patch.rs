use serde::{Deserialize, Serialize};

/// Payload for creating or overwriting a session row.
/// `token_obtained_at`, `created_at` and `updated_at` are stamped by the
/// store actor at write time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCreate {
    pub twitch_id: String,
    pub display_name: String,
    pub username: String,
    pub email: Option<String>,
    pub avatar_url: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: Option<i64>,
    /// Raw callback payload, serialized as-is.
    pub auth_payload: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingUpsert {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharadeSetCreate {
    pub name: String,
    /// JSON array of channel names.
    pub channels: String,
    /// JSON array of words.
    pub words: String,
    /// JSON object of set-specific settings.
    pub settings: String,
    pub is_active: bool,
}

/// Partial update for a charade set; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CharadeSetPatch {
    pub name: Option<String>,
    pub channels: Option<String>,
    pub words: Option<String>,
    pub settings: Option<String>,
    pub is_active: Option<bool>,
}

impl CharadeSetPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.channels.is_none()
            && self.words.is_none()
            && self.settings.is_none()
            && self.is_active.is_none()
    }
}
