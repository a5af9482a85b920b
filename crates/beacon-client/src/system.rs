//! Systems: registered nodes in the monitored hierarchy.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use beacon_core::config::{ClientConfig, ConfigError};
use beacon_core::{
    ExpectationInputs, ExpectationOptions, Nrn, NrnKind, SystemInputs, SystemOptions,
    SystemRecord,
};

use crate::api::{BeaconApi, DEFAULT_CALL_TIMEOUT, bounded};
use crate::expectation::Expectation;
use crate::rest::HttpBeaconApi;

/// Entry point: owns the remote port and the per-call timeout handed to
/// every system and expectation it creates.
#[derive(Clone)]
pub struct BeaconClient {
    api: Arc<dyn BeaconApi>,
    timeout: Duration,
}

impl BeaconClient {
    pub fn new(api: Arc<dyn BeaconApi>) -> Self {
        Self {
            api,
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Build a REST-backed client from the `[client]` config section.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        let mut api = HttpBeaconApi::new(&config.base_url);
        if let Some(token) = &config.token {
            api = api.with_token(token);
        }
        Ok(Self::new(Arc::new(api)).with_timeout(config.timeout()?))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Register the root system of this process.
    ///
    /// `options.feature_instance_path` must be the NRN of the feature
    /// instance the system belongs to. If it does not parse, or beacon
    /// cannot be reached, a degraded system is returned.
    pub async fn start_system(&self, options: SystemOptions) -> System {
        let path = options.feature_instance_path.clone().unwrap_or_default();
        let instance = match Nrn::parse(&path) {
            Ok(nrn) if can_own_systems(nrn.kind()) => nrn,
            Ok(nrn) => {
                warn!(
                    system = %options.name,
                    %nrn,
                    kind = %nrn.kind(),
                    "feature instance path cannot own systems, using a degraded system instead"
                );
                return System::degraded(detached(&options));
            }
            Err(e) => {
                warn!(
                    system = %options.name,
                    error = %e,
                    "invalid feature instance path, using a degraded system instead"
                );
                return System::degraded(detached(&options));
            }
        };

        // Stand-in parent addressed by the feature instance; it has no
        // remote identity of its own.
        let parent = LiveSystem {
            record: SystemRecord {
                tenant: options.tenant.clone().unwrap_or_default(),
                feature_instance_path: instance.to_string(),
                ..SystemRecord::default()
            },
            nrn: instance,
            api: self.api.clone(),
            timeout: self.timeout,
        };
        parent.child(options).await
    }
}

/// Handle to a registered system.
///
/// Backed either by a system beacon knows about or by a degraded stand-in
/// when registration failed. Degradation is permanent for the handle and
/// everything created through it.
pub struct System {
    inner: Inner,
}

enum Inner {
    Live(LiveSystem),
    Degraded(Nrn),
}

struct LiveSystem {
    nrn: Nrn,
    record: SystemRecord,
    api: Arc<dyn BeaconApi>,
    timeout: Duration,
}

impl System {
    fn degraded(nrn: Nrn) -> Self {
        Self {
            inner: Inner::Degraded(nrn),
        }
    }

    /// The locally derived address of this system.
    pub fn nrn(&self) -> &Nrn {
        match &self.inner {
            Inner::Live(live) => &live.nrn,
            Inner::Degraded(nrn) => nrn,
        }
    }

    /// The system as registered with beacon, if registration succeeded.
    pub fn record(&self) -> Option<&SystemRecord> {
        match &self.inner {
            Inner::Live(live) => Some(&live.record),
            Inner::Degraded(_) => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.inner, Inner::Degraded(_))
    }

    /// Register a child system.
    pub async fn child(&self, options: SystemOptions) -> System {
        match &self.inner {
            Inner::Live(live) => live.child(options).await,
            Inner::Degraded(nrn) => {
                debug!(%nrn, child = %options.name, degraded = true, "creating child system");
                System::degraded(nrn.child_system(&options.name))
            }
        }
    }

    /// Declare an expectation owned by this system.
    pub async fn expectation(&self, options: ExpectationOptions) -> Expectation {
        match &self.inner {
            Inner::Live(live) => live.expectation(options).await,
            Inner::Degraded(nrn) => {
                debug!(%nrn, expectation = %options.name, degraded = true, "creating expectation");
                Expectation::degraded(nrn.child_expectation(&options.name))
            }
        }
    }

    /// Deregister the system.
    pub async fn shutdown(&self) {
        match &self.inner {
            Inner::Live(live) => live.shutdown().await,
            Inner::Degraded(nrn) => debug!(%nrn, degraded = true, "shutdown"),
        }
    }
}

impl std::fmt::Debug for System {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("System")
            .field("nrn", &self.nrn().to_string())
            .field("degraded", &self.is_degraded())
            .finish()
    }
}

impl LiveSystem {
    /// Path expectations are registered under: the remote identity, or the
    /// local address for the stand-in root parent.
    fn remote_path(&self) -> String {
        if self.record.path.is_empty() {
            self.nrn.to_string()
        } else {
            self.record.path.clone()
        }
    }

    async fn child(&self, options: SystemOptions) -> System {
        debug!(nrn = %self.nrn, child = %options.name, "creating child system");
        let nrn = self.nrn.child_system(&options.name);

        let inputs = SystemInputs {
            tenant: non_empty(options.tenant).unwrap_or_else(|| self.record.tenant.clone()),
            parent_path: self.nrn.to_string(),
            feature_instance_path: non_empty(options.feature_instance_path)
                .unwrap_or_else(|| self.record.feature_instance_path.clone()),
            display_name: non_empty(options.display_name),
            description: non_empty(options.description),
            name: options.name,
        };

        match bounded(self.timeout, self.api.create_system(&inputs)).await {
            Ok(record) => {
                info!(%nrn, path = %record.path, "started system");
                System {
                    inner: Inner::Live(LiveSystem {
                        nrn,
                        record,
                        api: self.api.clone(),
                        timeout: self.timeout,
                    }),
                }
            }
            Err(e) => {
                warn!(%nrn, error = %e, "could not start system, using a degraded system instead");
                System::degraded(nrn)
            }
        }
    }

    async fn expectation(&self, options: ExpectationOptions) -> Expectation {
        debug!(nrn = %self.nrn, expectation = %options.name, "creating expectation");
        let nrn = self.nrn.child_expectation(&options.name);

        let inputs = ExpectationInputs {
            tenant: self.record.tenant.clone(),
            system: self.remote_path(),
            display_name: non_empty(options.display_name),
            description: non_empty(options.description),
            behavior: options.behavior,
            tolerance: options.tolerance,
            schedule: options.schedule,
            max_missed_deadline_count: options.max_missed_deadline_count,
            tags: options.tags,
            data: options.data,
            name: options.name,
        };

        match bounded(self.timeout, self.api.create_expectation(&inputs)).await {
            Ok(record) => {
                debug!(%nrn, path = %record.path, "created expectation");
                Expectation::live(nrn, record, self.api.clone(), self.timeout)
            }
            Err(e) => {
                warn!(
                    %nrn,
                    error = %e,
                    "could not create expectation, using a degraded expectation instead"
                );
                Expectation::degraded(nrn)
            }
        }
    }

    async fn shutdown(&self) {
        match bounded(self.timeout, self.api.delete_system(&self.record.path)).await {
            Ok(()) => debug!(nrn = %self.nrn, "shutdown"),
            Err(e) => warn!(nrn = %self.nrn, error = %e, "shutdown failed"),
        }
    }
}

/// Root systems hang off a feature instance; a `sys` address is accepted
/// too so a process can register under an existing system.
fn can_own_systems(kind: &NrnKind) -> bool {
    matches!(kind, NrnKind::FeatureInstance | NrnKind::System)
}

fn detached(options: &SystemOptions) -> Nrn {
    let tenant = options.tenant.as_deref().unwrap_or_default();
    Nrn::detached_system(tenant, &options.name)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}
