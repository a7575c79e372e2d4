use std::sync::Arc;

use confwatch::ConfWatchConfig;
use confwatch::ConnectionManager;
use confwatch::EtcdConnector;
use confwatch::Error;
use confwatch::HookMode;
use confwatch::Result;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tracing::error;
use tracing::info;
use tracing::warn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

const DEFAULT_PREFIX: &str = "CONFIG";

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    init_observability();

    let settings = ConfWatchConfig::new()?.validate()?;
    let prefix = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_PREFIX.to_string());

    let manager = ConnectionManager::connect(settings, &EtcdConnector).await.map_err(|e| {
        error!("store connection failed: {}", e);
        e
    })?;

    let watcher = manager.new_watcher(&prefix).await?;
    let hooked = watcher
        .add_hook("", HookMode::Prefix, |new, old| {
            info!(key = new.key(), old = old.as_str(), new = new.as_str(), "config changed");
        })
        .await;
    if !hooked {
        warn!(prefix = watcher.prefix(), "watcher closed before the change hook was registered");
    }

    info!(prefix = watcher.prefix(), "Watching. Waiting for CTRL+C signal...");
    if let Err(e) = graceful_shutdown(manager.clone()).await {
        error!("Failed to shutdown: {:?}", e);
        manager.close_all();
    }

    watcher.closed().await;
    println!("Exiting program.");
    Ok(())
}

async fn graceful_shutdown(manager: Arc<ConnectionManager>) -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt()).map_err(|e| Error::Fatal(format!("SIGINT handler: {e}")))?;
    let mut sigterm = signal(SignalKind::terminate()).map_err(|e| Error::Fatal(format!("SIGTERM handler: {e}")))?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
        },
    }

    let closed = manager.close_all();
    info!("Shutdown completed, {} resources closed", closed);
    Ok(())
}

fn init_observability() {
    let base_subscriber = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));
    tracing_subscriber::registry().with(base_subscriber).init();
}
