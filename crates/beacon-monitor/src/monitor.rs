//! Feature-instance monitor: polls a document and fans out changes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use beacon_core::FeatureInstance;

use crate::error::{MonitorError, MonitorResult};
use crate::source::{ConfigSource, LocatorSource};

pub type SubscriptionId = u64;

/// Receiving end of a subscription. Holds at most one pending document.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    rx: mpsc::Receiver<FeatureInstance>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Wait for the next document. `None` once the monitor has shut down.
    pub async fn recv(&mut self) -> Option<FeatureInstance> {
        self.rx.recv().await
    }

    /// Take the pending document, if any, without waiting.
    pub fn try_recv(&mut self) -> Option<FeatureInstance> {
        self.rx.try_recv().ok()
    }
}

#[derive(Default)]
struct State {
    /// Bytes of the last document that deserialized.
    raw: Vec<u8>,
    current: Option<FeatureInstance>,
    subscribers: HashMap<SubscriptionId, mpsc::Sender<FeatureInstance>>,
    next_id: SubscriptionId,
    /// Set once the watch loop has shut down; no new registrations.
    closed: bool,
}

pub struct FeatureInstanceMonitor {
    locator: String,
    source: Arc<dyn ConfigSource>,
    state: Mutex<State>,
}

impl FeatureInstanceMonitor {
    /// Monitor `locator` through [`LocatorSource`]. Fails if the first
    /// fetch does.
    pub async fn new(locator: impl Into<String>) -> MonitorResult<Self> {
        Self::with_source(locator, Arc::new(LocatorSource::new())).await
    }

    pub async fn with_source(
        locator: impl Into<String>,
        source: Arc<dyn ConfigSource>,
    ) -> MonitorResult<Self> {
        let monitor = Self {
            locator: locator.into(),
            source,
            state: Mutex::new(State::default()),
        };
        monitor.refresh().await?;
        Ok(monitor)
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// The latest document, or the default document if none has loaded.
    pub async fn current(&self) -> FeatureInstance {
        self.state.lock().await.current.clone().unwrap_or_default()
    }

    pub async fn subscriber_count(&self) -> usize {
        self.state.lock().await.subscribers.len()
    }

    /// Fetch the document and, if its bytes changed, replace the current
    /// one and notify subscribers. Returns whether anything changed.
    ///
    /// On error the current document is left as it was.
    pub async fn refresh(&self) -> MonitorResult<bool> {
        let bytes = self
            .source
            .fetch(&self.locator)
            .await
            .map_err(|source| MonitorError::Fetch {
                locator: self.locator.clone(),
                source,
            })?;

        let mut state = self.state.lock().await;
        if state.raw == bytes {
            return Ok(false);
        }
        let doc: FeatureInstance = serde_json::from_slice(&bytes)?;

        state.raw = bytes;
        state.current = Some(doc.clone());
        state.subscribers.retain(|id, tx| match tx.try_send(doc.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!(subscriber = id, "subscriber busy, update dropped");
                true
            }
            Err(TrySendError::Closed(_)) => {
                debug!(subscriber = id, "subscriber gone, removing");
                false
            }
        });
        Ok(true)
    }

    /// Register for change notifications. The current document is queued
    /// straight away.
    pub async fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(1);
        let mut state = self.state.lock().await;
        let id = state.next_id;
        state.next_id += 1;

        let snapshot = state.current.clone().unwrap_or_default();
        // Capacity is 1 and the channel is fresh, so this cannot be full.
        let _ = tx.try_send(snapshot);
        if !state.closed {
            state.subscribers.insert(id, tx);
        }
        Subscription { id, rx }
    }

    /// Stop delivering to `id`. Safe to call more than once or after shutdown.
    pub async fn unsubscribe(&self, id: SubscriptionId) {
        if self.state.lock().await.subscribers.remove(&id).is_some() {
            debug!(subscriber = id, "unsubscribed");
        }
    }

    /// Poll every `interval` until `shutdown` fires, then close every
    /// subscriber channel.
    pub fn watch_for_changes(
        self: &Arc<Self>,
        mut shutdown: watch::Receiver<bool>,
        interval: Duration,
    ) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            debug!(locator = %monitor.locator, ?interval, "config watch starting");
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.changed() => {
                        debug!(locator = %monitor.locator, "config watch shutting down");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        let locator = &monitor.locator;
                        match monitor.refresh().await {
                            Ok(true) => info!(%locator, "config changed"),
                            Ok(false) => {}
                            Err(e) => warn!(%locator, error = %e, "config refresh failed"),
                        }
                    }
                }
            }
            monitor.close().await;
        })
    }

    async fn close(&self) {
        let mut state = self.state.lock().await;
        state.closed = true;
        // Dropping the senders closes the channels.
        state.subscribers.clear();
    }
}

impl std::fmt::Debug for FeatureInstanceMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureInstanceMonitor")
            .field("locator", &self.locator)
            .finish_non_exhaustive()
    }
}
