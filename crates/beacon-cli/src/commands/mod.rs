pub mod init;
pub mod nrn;
pub mod run;
pub mod watch;

/// Resolve on Ctrl-C. If the handler cannot be installed, never resolve.
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
