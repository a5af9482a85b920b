use std::sync::Arc;

use anyhow::Context;
use beacon_core::config::parse_duration;
use beacon_monitor::FeatureInstanceMonitor;
use tokio::sync::watch;
use tracing::info;

pub async fn watch(source: &str, interval: &str) -> anyhow::Result<()> {
    let interval = parse_duration(interval)
        .with_context(|| format!("invalid interval {interval:?}"))?;

    let monitor = Arc::new(FeatureInstanceMonitor::new(source).await?);
    let mut updates = monitor.subscribe().await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = monitor.watch_for_changes(shutdown_rx, interval);
    info!(%source, ?interval, "watching feature instance");

    let stop = super::ctrl_c();
    tokio::pin!(stop);
    loop {
        tokio::select! {
            _ = &mut stop => break,
            update = updates.recv() => match update {
                Some(doc) => println!("{}", serde_json::to_string_pretty(&doc)?),
                None => break,
            },
        }
    }

    let _ = shutdown_tx.send(true);
    handle.await?;
    Ok(())
}
