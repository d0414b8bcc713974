//! Auth Session Coordinator: owns the sign-in window lifecycle.
//!
//! One sign-in attempt at a time; each attempt opens a surface via the
//! injected factory, watches its lifecycle events, extracts the callback
//! payload, persists the session and publishes exactly one terminal event
//! (`sessionEstablished`, `signInFailed` or `signInCancelled`) on the bridge.

use crate::auth::payload::CallbackPayload;
use crate::auth::surface::{AuthSurface, AuthSurfaceFactory, SurfaceEvent};
use crate::bridge::{BridgeHandle, UiEvent};
use crate::config::AuthConfig;
use crate::error::CharadesError;
use crate::store::StoreHandle;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    pub login_url: Url,
    pub callback_prefix: Url,
    /// Hold after a successful save so the callback page can play its
    /// success animation before the window disappears.
    pub success_close_delay: Duration,
    /// Overall deadline for one attempt.
    pub sign_in_timeout: Duration,
    /// Deadline armed after a failed payload extraction; when it fires the
    /// attempt fails instead of leaving the window open forever.
    pub extraction_grace: Duration,
}

impl CoordinatorOptions {
    pub fn from_config(cfg: &AuthConfig) -> Self {
        Self {
            login_url: cfg.login_url.clone(),
            callback_prefix: cfg.callback_prefix.clone(),
            success_close_delay: Duration::from_millis(1500),
            sign_in_timeout: cfg.sign_in_timeout(),
            extraction_grace: Duration::from_secs(10),
        }
    }
}

/// Receipt for a started sign-in attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignInTicket {
    pub attempt: Uuid,
}

struct ActiveSignIn {
    attempt: Uuid,
    surface: Option<Arc<dyn AuthSurface>>,
}

enum SignInOutcome {
    Established {
        display_name: String,
        avatar_url: String,
    },
    Failed(String),
    Cancelled,
}

pub struct AuthCoordinator {
    store: StoreHandle,
    bridge: BridgeHandle,
    surfaces: Arc<dyn AuthSurfaceFactory>,
    options: CoordinatorOptions,
    in_flight: Arc<Mutex<Option<ActiveSignIn>>>,
}

impl AuthCoordinator {
    pub fn new(
        store: StoreHandle,
        bridge: BridgeHandle,
        surfaces: Arc<dyn AuthSurfaceFactory>,
        options: CoordinatorOptions,
    ) -> Self {
        Self {
            store,
            bridge,
            surfaces,
            options,
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    /// Open the sign-in window and start driving it. Rejects with
    /// [`CharadesError::SignInInProgress`] while another attempt is live;
    /// two concurrent windows are never opened.
    pub async fn begin_sign_in(&self) -> Result<SignInTicket, CharadesError> {
        let attempt = Uuid::new_v4();
        {
            let mut slot = self.in_flight.lock().expect("sign-in slot poisoned");
            if slot.is_some() {
                return Err(CharadesError::SignInInProgress);
            }
            // Reserve the slot before the first await so a racing call
            // cannot slip past the guard while the window is opening.
            *slot = Some(ActiveSignIn {
                attempt,
                surface: None,
            });
        }

        let opened = self.surfaces.open(&self.options.login_url).await;
        let (surface, events) = match opened {
            Ok(pair) => pair,
            Err(e) => {
                error!(error = %e, "failed to open sign-in window");
                self.clear_slot(attempt);
                return Err(e);
            }
        };

        if let Some(active) = self
            .in_flight
            .lock()
            .expect("sign-in slot poisoned")
            .as_mut()
        {
            active.surface = Some(surface.clone());
        }

        info!(%attempt, url = %self.options.login_url, "sign-in window opened");

        let store = self.store.clone();
        let bridge = self.bridge.clone();
        let options = self.options.clone();
        let in_flight = self.in_flight.clone();
        tokio::spawn(async move {
            let outcome = run_attempt(&store, surface, events, &options, attempt).await;
            match outcome {
                SignInOutcome::Established {
                    display_name,
                    avatar_url,
                } => {
                    bridge.publish(UiEvent::SessionEstablished {
                        display_name,
                        avatar_url,
                    });
                }
                SignInOutcome::Failed(reason) => {
                    bridge.publish(UiEvent::SignInFailed { reason });
                }
                SignInOutcome::Cancelled => {
                    info!(%attempt, "sign-in cancelled before completion");
                    bridge.publish(UiEvent::SignInCancelled);
                }
            }
            let mut slot = in_flight.lock().expect("sign-in slot poisoned");
            if slot.as_ref().is_some_and(|a| a.attempt == attempt) {
                *slot = None;
            }
        });

        Ok(SignInTicket { attempt })
    }

    /// True while a sign-in window is live.
    pub fn sign_in_in_progress(&self) -> bool {
        self.in_flight
            .lock()
            .expect("sign-in slot poisoned")
            .is_some()
    }

    /// Close the live sign-in window, if any. Cancellation then flows
    /// through the surface's `Closed` event, so the terminal
    /// `signInCancelled` is still emitted exactly once by the driver.
    pub async fn cancel_sign_in(&self) -> bool {
        let surface = self
            .in_flight
            .lock()
            .expect("sign-in slot poisoned")
            .as_ref()
            .and_then(|a| a.surface.clone());
        match surface {
            Some(surface) => {
                surface.close().await;
                true
            }
            None => false,
        }
    }

    fn clear_slot(&self, attempt: Uuid) {
        let mut slot = self.in_flight.lock().expect("sign-in slot poisoned");
        if slot.as_ref().is_some_and(|a| a.attempt == attempt) {
            *slot = None;
        }
    }
}

async fn run_attempt(
    store: &StoreHandle,
    surface: Arc<dyn AuthSurface>,
    mut events: mpsc::UnboundedReceiver<SurfaceEvent>,
    options: &CoordinatorOptions,
    attempt: Uuid,
) -> SignInOutcome {
    let deadline = sleep(options.sign_in_timeout);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            () = &mut deadline => {
                warn!(%attempt, "sign-in deadline elapsed, closing window");
                surface.close().await;
                return SignInOutcome::Failed("sign-in timed out".to_string());
            }

            event = events.recv() => match event {
                // A dropped sender means the window is gone.
                None | Some(SurfaceEvent::Closed) => {
                    return SignInOutcome::Cancelled;
                }

                Some(SurfaceEvent::WillRedirect(url)) => {
                    debug!(%attempt, %url, "sign-in window redirecting");
                }

                Some(SurfaceEvent::LoadFinished) => {
                    let Some(url) = surface.current_url() else {
                        continue;
                    };
                    if !url.as_str().starts_with(options.callback_prefix.as_str()) {
                        debug!(%attempt, %url, "non-callback page loaded, waiting");
                        continue;
                    }

                    match surface.read_callback_payload().await {
                        Ok(Some(raw)) => {
                            match settle_payload(store, &raw, options, &surface, attempt).await {
                                Settled::Terminal(outcome) => return outcome,
                                Settled::Recoverable(e) => {
                                    warn!(
                                        %attempt, error = %e,
                                        "payload extraction failed, arming grace deadline"
                                    );
                                    deadline
                                        .as_mut()
                                        .reset(Instant::now() + options.extraction_grace);
                                }
                            }
                        }
                        // The callback page has not published the payload
                        // yet; a later load event will carry it.
                        Ok(None) => {
                            debug!(%attempt, "callback payload not yet published");
                        }
                        Err(e) => {
                            warn!(
                                %attempt, error = %e,
                                "payload read failed, arming grace deadline"
                            );
                            deadline
                                .as_mut()
                                .reset(Instant::now() + options.extraction_grace);
                        }
                    }
                }
            }
        }
    }
}

enum Settled {
    Terminal(SignInOutcome),
    /// The payload was present but unusable; the window stays open under
    /// the grace deadline.
    Recoverable(CharadesError),
}

async fn settle_payload(
    store: &StoreHandle,
    raw: &serde_json::Value,
    options: &CoordinatorOptions,
    surface: &Arc<dyn AuthSurface>,
    attempt: Uuid,
) -> Settled {
    let mut payload = match CallbackPayload::from_value(raw) {
        Ok(payload) => payload,
        Err(e) => return Settled::Recoverable(e),
    };

    if let Some(provider_error) = payload.error.take() {
        error!(%attempt, error = %provider_error, "identity provider reported an error");
        surface.close().await;
        return Settled::Terminal(SignInOutcome::Failed(provider_error));
    }

    let create = match payload.into_create(raw) {
        Ok(create) => create,
        Err(e) => return Settled::Recoverable(e),
    };
    let display_name = create.display_name.clone();
    let avatar_url = create.avatar_url.clone();

    match store.upsert_session(create).await {
        Ok(twitch_id) => {
            info!(%attempt, %twitch_id, %display_name, "user authenticated and saved");
            sleep(options.success_close_delay).await;
            surface.close().await;
            Settled::Terminal(SignInOutcome::Established {
                display_name,
                avatar_url,
            })
        }
        Err(e) => {
            error!(%attempt, error = %e, "failed to persist session");
            surface.close().await;
            Settled::Terminal(SignInOutcome::Failed(format!(
                "failed to save session: {e}"
            )))
        }
    }
}
