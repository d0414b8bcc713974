//! Query-time session status and sign-out.
//!
//! Expiry is evaluated on read, never by a background timer: a token is
//! expired once `token_obtained_at + expires_in` has passed. An expired
//! session is reported distinctly from an absent one and keeps the
//! last-known identity so the UI can greet the user by name.

use crate::error::CharadesError;
use crate::store::{DbSessionRecord, StoreHandle};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionProfile {
    pub twitch_id: String,
    pub display_name: String,
    pub username: String,
    pub email: Option<String>,
    pub avatar_url: String,
}

impl From<&DbSessionRecord> for SessionProfile {
    fn from(record: &DbSessionRecord) -> Self {
        Self {
            twitch_id: record.twitch_id.clone(),
            display_name: record.display_name.clone(),
            username: record.username.clone(),
            email: record.email.clone(),
            avatar_url: record.avatar_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SessionStatus {
    Authenticated {
        user: SessionProfile,
    },
    /// Token TTL elapsed; identity retained for UX continuity.
    #[serde(rename_all = "camelCase")]
    Expired {
        display_name: String,
        username: String,
    },
    Absent,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum SignOutOutcome {
    #[serde(rename_all = "camelCase")]
    Removed {
        twitch_id: String,
        display_name: String,
    },
    NotSignedIn,
}

/// True once the token TTL has fully elapsed. Records without a TTL never
/// expire locally; the companion service revokes them server-side.
pub fn is_expired(record: &DbSessionRecord, now: DateTime<Utc>) -> bool {
    match record.expires_in {
        Some(ttl_seconds) => now >= record.token_obtained_at + Duration::seconds(ttl_seconds),
        None => false,
    }
}

/// Status of the sole local session (one-account-per-device model).
pub async fn session_status(store: &StoreHandle) -> Result<SessionStatus, CharadesError> {
    let Some(record) = store.get_sole_session().await? else {
        return Ok(SessionStatus::Absent);
    };

    if is_expired(&record, Utc::now()) {
        info!(
            twitch_id = %record.twitch_id,
            display_name = %record.display_name,
            "stored token expired"
        );
        return Ok(SessionStatus::Expired {
            display_name: record.display_name,
            username: record.username,
        });
    }

    Ok(SessionStatus::Authenticated {
        user: SessionProfile::from(&record),
    })
}

/// Lightweight check: is any session row present at all.
pub async fn is_signed_in(store: &StoreHandle) -> Result<bool, CharadesError> {
    Ok(store.get_sole_session().await?.is_some())
}

/// Sign out the sole local session by deleting its row outright (tokens and
/// profile together). Reports which identity was removed.
pub async fn sign_out(store: &StoreHandle) -> Result<SignOutOutcome, CharadesError> {
    let Some(record) = store.get_sole_session().await? else {
        return Ok(SignOutOutcome::NotSignedIn);
    };

    store.delete_session(&record.twitch_id).await?;
    info!(twitch_id = %record.twitch_id, display_name = %record.display_name, "user signed out");

    Ok(SignOutOutcome::Removed {
        twitch_id: record.twitch_id,
        display_name: record.display_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(expires_in: Option<i64>, obtained_secs_ago: i64) -> DbSessionRecord {
        let now = Utc::now();
        DbSessionRecord {
            twitch_id: "42".to_string(),
            display_name: "Ash".to_string(),
            username: "ash".to_string(),
            email: None,
            avatar_url: String::new(),
            access_token: "t1".to_string(),
            refresh_token: "r1".to_string(),
            expires_in,
            token_obtained_at: now - Duration::seconds(obtained_secs_ago),
            auth_payload: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn fresh_token_is_not_expired() {
        assert!(!is_expired(&record(Some(3600), 0), Utc::now()));
    }

    #[test]
    fn elapsed_ttl_is_expired() {
        assert!(is_expired(&record(Some(3600), 3600), Utc::now()));
        assert!(is_expired(&record(Some(0), 0), Utc::now()));
    }

    #[test]
    fn missing_ttl_never_expires() {
        assert!(!is_expired(&record(None, 999_999), Utc::now()));
    }
}
