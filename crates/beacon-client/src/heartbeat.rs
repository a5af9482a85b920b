//! Heartbeat scheduler — drives an expectation from a periodic health check.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::expectation::Expectation;

/// Something a heartbeat can report to.
#[async_trait]
pub trait Reporter: Send + Sync {
    async fn fulfil(&self, message: &str);

    async fn fail(&self, message: &str);
}

#[async_trait]
impl Reporter for Expectation {
    async fn fulfil(&self, message: &str) {
        Expectation::fulfil(self, message).await
    }

    async fn fail(&self, message: &str) {
        Expectation::fail(self, message).await
    }
}

/// A running heartbeat. Dropping it also stops the loop.
pub struct Heartbeat {
    handle: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
}

impl Heartbeat {
    /// Stop the loop and wait for it to exit.
    ///
    /// A check already in progress finishes and reports; nothing runs
    /// after this returns.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.handle.await {
            warn!(error = %e, "heartbeat task did not exit cleanly");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Every `interval`, run `checker` and report its outcome to `reporter`:
/// `Ok` fulfils with an empty message, `Err(e)` fails with `e`'s text.
///
/// A failed check is reported once and not retried.
pub fn start_heartbeat<R, F, E>(reporter: Arc<R>, interval: Duration, checker: F) -> Heartbeat
where
    R: Reporter + ?Sized + 'static,
    F: FnMut() -> Result<(), E> + Send + 'static,
    E: Display + Send + 'static,
{
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(run_heartbeat_loop(reporter, interval, checker, shutdown_rx));
    Heartbeat {
        handle,
        shutdown_tx,
    }
}

async fn run_heartbeat_loop<R, F, E>(
    reporter: Arc<R>,
    interval: Duration,
    mut checker: F,
    mut shutdown: watch::Receiver<bool>,
) where
    R: Reporter + ?Sized,
    F: FnMut() -> Result<(), E>,
    E: Display,
{
    debug!(?interval, "heartbeat loop starting");

    loop {
        tokio::select! {
            biased;
            // Also fires when the `Heartbeat` is dropped.
            _ = shutdown.changed() => {
                debug!("heartbeat loop shutting down");
                break;
            }
            _ = tokio::time::sleep(interval) => {
                // Bind first so the error is not held across the await.
                let outcome = checker().map_err(|e| e.to_string());
                match outcome {
                    Ok(()) => reporter.fulfil("").await,
                    Err(message) => reporter.fail(&message).await,
                }
            }
        }
    }
}
