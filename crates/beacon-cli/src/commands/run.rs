use std::convert::Infallible;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use beacon_client::{BeaconClient, ExpectationOptions, start_heartbeat};
use beacon_core::BeaconConfig;
use beacon_monitor::FeatureInstanceMonitor;
use tokio::sync::watch;
use tracing::{info, warn};

pub async fn run(config_path: &Path) -> anyhow::Result<()> {
    let config = BeaconConfig::from_file(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    let system_config = config
        .system
        .as_ref()
        .context("config has no [system] section")?;

    let client = BeaconClient::from_config(&config.client)?;
    let system = client.start_system(system_config.options()).await;
    info!(nrn = %system.nrn(), degraded = system.is_degraded(), "system ready");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Reload the feature instance in the background and log changes.
    let watcher = match &config.monitor {
        Some(monitor_config) => {
            let interval = monitor_config.interval()?;
            match FeatureInstanceMonitor::new(monitor_config.source.as_str()).await {
                Ok(monitor) => {
                    let monitor = Arc::new(monitor);
                    let doc = monitor.current().await;
                    info!(path = %doc.path, feature = %doc.feature_name, "feature instance loaded");
                    Some(monitor.watch_for_changes(shutdown_rx.clone(), interval))
                }
                Err(e) => {
                    warn!(
                        source = %monitor_config.source,
                        error = %e,
                        "feature instance unavailable, not watching"
                    );
                    None
                }
            }
        }
        None => None,
    };

    let heartbeat = match &config.heartbeat {
        Some(heartbeat_config) => {
            let interval = heartbeat_config.interval()?;
            // Two missed beats before beacon considers the system down.
            let ttl_ms = u64::try_from(interval.as_millis() * 2).unwrap_or(u64::MAX);
            let expectation = Arc::new(
                system
                    .expectation(ExpectationOptions::heartbeat(&heartbeat_config.name, ttl_ms))
                    .await,
            );
            let beat = start_heartbeat(expectation.clone(), interval, || Ok::<(), Infallible>(()));
            info!(nrn = %expectation.nrn(), ?interval, "heartbeat started");
            Some((expectation, beat))
        }
        None => None,
    };

    super::ctrl_c().await;

    let _ = shutdown_tx.send(true);
    if let Some((expectation, beat)) = heartbeat {
        beat.stop().await;
        expectation.retire().await;
    }
    if let Some(handle) = watcher {
        let _ = handle.await;
    }
    system.shutdown().await;

    info!("beacon stopped");
    Ok(())
}
