//! Injected capability for the interactive sign-in window.
//!
//! The coordinator never touches a native window object; the GUI shell
//! implements these traits over its real webview and tests implement them
//! over a scripted fake. One surface exists per sign-in attempt.

use crate::error::CharadesError;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use url::Url;

/// Lifecycle signals observed from the sign-in window.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    /// The window is about to navigate to a new URL.
    WillRedirect(Url),
    /// The current page finished loading.
    LoadFinished,
    /// The window was closed (by the user or programmatically).
    Closed,
}

#[async_trait]
pub trait AuthSurface: Send + Sync {
    /// URL of the page currently displayed, if any.
    fn current_url(&self) -> Option<Url>;

    /// Read the token payload object the callback page publishes
    /// (`window.__AUTH_DATA__`). `Ok(None)` means the page has not
    /// published it yet.
    async fn read_callback_payload(&self) -> Result<Option<Value>, CharadesError>;

    /// Close the window. Must be idempotent and must eventually produce a
    /// [`SurfaceEvent::Closed`] on the event stream if the window was open.
    async fn close(&self);
}

/// Opens a sign-in window already navigating to `login_url` and hands back
/// its lifecycle event stream. A closed sender side (receiver returns
/// `None`) is treated like [`SurfaceEvent::Closed`].
#[async_trait]
pub trait AuthSurfaceFactory: Send + Sync {
    async fn open(
        &self,
        login_url: &Url,
    ) -> Result<(Arc<dyn AuthSurface>, mpsc::UnboundedReceiver<SurfaceEvent>), CharadesError>;
}
