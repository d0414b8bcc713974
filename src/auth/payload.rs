//! Callback payload parsing and mapping to a session row.

use crate::error::CharadesError;
use crate::store::SessionCreate;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Structured token/profile data the callback page exposes after sign-in.
///
/// Every field is optional at the parse stage; [`CallbackPayload::into_create`]
/// enforces which ones a usable payload must carry. An `error` field marks a
/// provider-reported failure and wins over everything else.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackPayload {
    pub error: Option<String>,
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub profile_image_url: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    /// The provider serializes this as a string ("3600"); accept both.
    #[serde(default, deserialize_with = "deserialize_i64_lax")]
    pub expires_in: Option<i64>,
}

impl CallbackPayload {
    /// Parse the raw object the surface extracted from the callback page.
    pub fn from_value(value: &Value) -> Result<Self, CharadesError> {
        serde_json::from_value(value.clone())
            .map_err(|e| CharadesError::Extraction(format!("malformed callback payload: {e}")))
    }

    /// Map provider fields onto a session row, keeping the raw payload as an
    /// opaque blob. Fails with [`CharadesError::Extraction`] when a required
    /// field is missing.
    pub fn into_create(self, raw: &Value) -> Result<SessionCreate, CharadesError> {
        let missing = |field: &str| CharadesError::Extraction(format!("missing field `{field}`"));

        Ok(SessionCreate {
            twitch_id: self.user_id.ok_or_else(|| missing("user_id"))?,
            display_name: self.display_name.ok_or_else(|| missing("display_name"))?,
            username: self.username.ok_or_else(|| missing("username"))?,
            email: self.email,
            avatar_url: self.profile_image_url.unwrap_or_default(),
            access_token: self.access_token.ok_or_else(|| missing("access_token"))?,
            refresh_token: self.refresh_token.ok_or_else(|| missing("refresh_token"))?,
            expires_in: self.expires_in,
            auth_payload: Some(raw.to_string()),
        })
    }
}

fn deserialize_i64_lax<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(deserializer)?;
    match v {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_i64()),
        Some(Value::String(s)) => s
            .parse::<i64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom("expected an integer string for expires_in")),
        Some(_) => Err(serde::de::Error::custom(
            "expected a number or string for expires_in",
        )),
    }
}
