//! Message-passing boundary toward the UI layer.
//!
//! The GUI shell owns the real transport (renderer IPC, webview postMessage,
//! whatever it is); this module only fixes the channel names and payload
//! shapes. Components publish [`UiEvent`]s on a broadcast channel and the
//! shell forwards them verbatim.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

/// Channel names, kept in sync with the renderer side.
pub mod channels {
    pub const HEALTH_STATUS: &str = "health-status";
    pub const AUTH_ESTABLISHED: &str = "twitch:auth:established";
    pub const AUTH_FAILED: &str = "twitch:auth:failed";
    pub const AUTH_CANCELLED: &str = "twitch:auth:cancelled";
}

/// Events crossing the UI boundary. Serialized shapes are the contract;
/// field names are camelCase on the wire.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum UiEvent {
    HealthStatus(HealthStatusPayload),
    #[serde(rename_all = "camelCase")]
    SessionEstablished {
        display_name: String,
        avatar_url: String,
    },
    SignInFailed {
        reason: String,
    },
    SignInCancelled,
}

impl UiEvent {
    /// Channel the shell should deliver this event on.
    pub fn channel(&self) -> &'static str {
        match self {
            UiEvent::HealthStatus(_) => channels::HEALTH_STATUS,
            UiEvent::SessionEstablished { .. } => channels::AUTH_ESTABLISHED,
            UiEvent::SignInFailed { .. } => channels::AUTH_FAILED,
            UiEvent::SignInCancelled => channels::AUTH_CANCELLED,
        }
    }
}

/// Splash-screen health status payload.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatusPayload {
    /// One of `checking`, `online`, `offline`.
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<bool>,
}

/// Cloneable publisher for UI events.
#[derive(Clone)]
pub struct BridgeHandle {
    tx: broadcast::Sender<UiEvent>,
}

impl BridgeHandle {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. A UI that is not listening yet is not an error; the
    /// splash window in particular may still be loading.
    pub fn publish(&self, event: UiEvent) {
        let channel = event.channel();
        if self.tx.send(event).is_err() {
            debug!(channel, "no bridge subscribers, event dropped");
        }
    }
}

impl Default for BridgeHandle {
    fn default() -> Self {
        Self::new(64)
    }
}
