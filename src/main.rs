use charades_companion::bridge::BridgeHandle;
use charades_companion::config::CONFIG;
use charades_companion::health::{HealthMonitor, HealthOptions, HttpProbe};
use charades_companion::{HealthVerdict, store};
use mimalloc::MiMalloc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = &*CONFIG;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.basic.database_url,
        service_base_url = %cfg.service.base_url,
        login_url = %cfg.auth.login_url,
        loglevel = %cfg.basic.loglevel,
        "starting charades companion"
    );

    // The store is a fatal precondition: quit rather than boot without it.
    // The GUI shell picks up this handle for the auth coordinator and the
    // settings/charades IPC surface.
    let _store = match store::spawn(&cfg.basic.database_url).await {
        Ok(handle) => handle,
        Err(e) => {
            error!(error = %e, "failed to initialize store");
            std::process::exit(1);
        }
    };

    let bridge = BridgeHandle::default();

    // Stand-in shell transport: log every UI event we would forward to the
    // splash/main windows.
    let mut ui_events = bridge.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = ui_events.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => info!(channel = event.channel(), payload = %json, "ui event"),
                Err(e) => error!(error = %e, "failed to serialize ui event"),
            }
        }
    });

    let probe = HttpProbe::new(&cfg.service.base_url)?;
    let monitor = HealthMonitor::new(
        probe,
        bridge.clone(),
        HealthOptions {
            max_attempts: cfg.service.health_max_attempts,
            retry_delay: cfg.service.health_retry_delay(),
            ..HealthOptions::default()
        },
    );

    match monitor.run().await {
        HealthVerdict::Ready => {
            info!("microservice reachable, companion ready");
        }
        HealthVerdict::Failed => {
            error!("exiting: microservice unreachable after all retries");
            std::process::exit(1);
        }
    }

    shutdown_signal().await;
    info!("companion shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { /* ... */ },
        _ = terminate => { /* ... */ },
    }
}
