//! Boot-time liveness gate for the companion microservice.
//!
//! A bounded, fixed-delay retry loop drives the splash screen: every attempt
//! publishes a `checking` status on the bridge, success publishes `online`
//! and failure after exhaustion publishes `offline`. The check targets a
//! co-located service, so there is deliberately no jitter and no backoff.

use crate::bridge::{BridgeHandle, HealthStatusPayload, UiEvent};
use crate::error::CharadesError;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

/// One liveness check against the companion service.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    /// Returns the health endpoint's JSON body on success. Any error,
    /// network-level or HTTP-level, counts as one failed attempt.
    async fn check(&self) -> Result<Value, CharadesError>;
}

#[async_trait]
impl<P: LivenessProbe + ?Sized> LivenessProbe for std::sync::Arc<P> {
    async fn check(&self) -> Result<Value, CharadesError> {
        (**self).check().await
    }
}

/// Probe hitting `GET {base_url}/health`; 2xx with a JSON body is success.
pub struct HttpProbe {
    client: reqwest::Client,
    health_url: Url,
}

impl HttpProbe {
    pub fn new(base_url: &Url) -> Result<Self, CharadesError> {
        let client = reqwest::Client::builder()
            .user_agent("charades-companion/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .build()?;
        let health_url = base_url.join("health")?;
        Ok(Self { client, health_url })
    }
}

#[async_trait]
impl LivenessProbe for HttpProbe {
    async fn check(&self) -> Result<Value, CharadesError> {
        let response = self.client.get(self.health_url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CharadesError::ProbeStatus(status));
        }
        Ok(response.json::<Value>().await?)
    }
}

/// Timing knobs for the monitor. The hold delays keep the splash screen's
/// final status visible before the shell moves on.
#[derive(Debug, Clone)]
pub struct HealthOptions {
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub online_hold: Duration,
    pub offline_hold: Duration,
}

impl Default for HealthOptions {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            retry_delay: Duration::from_millis(2000),
            online_hold: Duration::from_millis(2000),
            offline_hold: Duration::from_millis(3000),
        }
    }
}

/// Terminal outcome of one monitor run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthVerdict {
    Ready,
    Failed,
}

pub struct HealthMonitor<P: LivenessProbe> {
    probe: P,
    bridge: BridgeHandle,
    options: HealthOptions,
}

impl<P: LivenessProbe> HealthMonitor<P> {
    pub fn new(probe: P, bridge: BridgeHandle, options: HealthOptions) -> Self {
        Self {
            probe,
            bridge,
            options,
        }
    }

    /// Run the retry loop to completion. Attempts are strictly sequential;
    /// the returned verdict is produced exactly once and no probe is issued
    /// after success.
    pub async fn run(&self) -> HealthVerdict {
        let max_attempts = self.options.max_attempts;
        info!(
            max_attempts,
            retry_delay_ms = self.options.retry_delay.as_millis() as u64,
            "starting microservice health check"
        );

        for attempt in 1..=max_attempts {
            self.bridge
                .publish(UiEvent::HealthStatus(HealthStatusPayload {
                    status: "checking",
                    message: format!("Connecting to microservice... ({attempt}/{max_attempts})"),
                    attempts: Some(attempt),
                    max_retries: Some(max_attempts),
                    data: None,
                    error: None,
                }));

            match self.probe.check().await {
                Ok(data) => {
                    info!(attempt, "microservice health check passed");
                    self.bridge
                        .publish(UiEvent::HealthStatus(HealthStatusPayload {
                            status: "online",
                            message: "Microservice connected".to_string(),
                            attempts: None,
                            max_retries: None,
                            data: Some(data),
                            error: None,
                        }));
                    // Hold so the splash screen can show the success state.
                    sleep(self.options.online_hold).await;
                    return HealthVerdict::Ready;
                }
                Err(e) => {
                    warn!(attempt, max_attempts, error = %e, "health check failed");
                    if attempt < max_attempts {
                        debug!(
                            retry_delay_ms = self.options.retry_delay.as_millis() as u64,
                            "waiting before retry"
                        );
                        sleep(self.options.retry_delay).await;
                    }
                }
            }
        }

        warn!(max_attempts, "health check failed after all retries");
        self.bridge
            .publish(UiEvent::HealthStatus(HealthStatusPayload {
                status: "offline",
                message: "Unable to connect to microservice".to_string(),
                attempts: None,
                max_retries: None,
                data: None,
                error: Some(true),
            }));
        sleep(self.options.offline_hold).await;
        HealthVerdict::Failed
    }
}
