//! Expectations: obligations a system reports against.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use beacon_core::{
    ExpectationRecord, FailedExpectation, FulfilledExpectation, Nrn, RescheduledExpectation,
};

use crate::api::{BeaconApi, bounded};

/// Handle to a declared expectation.
///
/// Backed either by a registered expectation or by a degraded stand-in
/// when registration failed. Both accept the same calls and neither ever
/// returns an error: reporting is best effort.
pub struct Expectation {
    inner: Inner,
}

enum Inner {
    Live(LiveExpectation),
    Degraded(Nrn),
}

struct LiveExpectation {
    nrn: Nrn,
    record: ExpectationRecord,
    api: Arc<dyn BeaconApi>,
    timeout: Duration,
}

impl Expectation {
    pub(crate) fn live(
        nrn: Nrn,
        record: ExpectationRecord,
        api: Arc<dyn BeaconApi>,
        timeout: Duration,
    ) -> Self {
        Self {
            inner: Inner::Live(LiveExpectation {
                nrn,
                record,
                api,
                timeout,
            }),
        }
    }

    pub(crate) fn degraded(nrn: Nrn) -> Self {
        Self {
            inner: Inner::Degraded(nrn),
        }
    }

    /// The locally derived address of this expectation.
    pub fn nrn(&self) -> &Nrn {
        match &self.inner {
            Inner::Live(live) => &live.nrn,
            Inner::Degraded(nrn) => nrn,
        }
    }

    /// The expectation as registered with beacon, if registration succeeded.
    pub fn record(&self) -> Option<&ExpectationRecord> {
        match &self.inner {
            Inner::Live(live) => Some(&live.record),
            Inner::Degraded(_) => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.inner, Inner::Degraded(_))
    }

    /// Report that the expectation was met.
    pub async fn fulfil(&self, message: &str) {
        let live = match &self.inner {
            Inner::Live(live) => live,
            Inner::Degraded(nrn) => {
                debug!(%nrn, note = message, degraded = true, "fulfilled");
                return;
            }
        };
        let body = FulfilledExpectation {
            message: message.to_string(),
        };
        match bounded(live.timeout, live.api.fulfil_expectation(&live.record.path, &body)).await {
            Ok(()) => debug!(nrn = %live.nrn, note = message, "fulfilled"),
            Err(e) => warn!(nrn = %live.nrn, note = message, error = %e, "fulfilment failed"),
        }
    }

    /// Report that the expectation was not met.
    pub async fn fail(&self, message: &str) {
        let live = match &self.inner {
            Inner::Live(live) => live,
            Inner::Degraded(nrn) => {
                debug!(%nrn, note = message, degraded = true, "failed");
                return;
            }
        };
        let body = FailedExpectation {
            message: message.to_string(),
        };
        match bounded(live.timeout, live.api.fail_expectation(&live.record.path, &body)).await {
            Ok(()) => debug!(nrn = %live.nrn, note = message, "failed"),
            Err(e) => warn!(nrn = %live.nrn, note = message, error = %e, "failure report failed"),
        }
    }

    /// Move the expectation's next deadline to `reschedule_to`.
    pub async fn reschedule(&self, message: &str, reschedule_to: DateTime<Utc>) {
        let live = match &self.inner {
            Inner::Live(live) => live,
            Inner::Degraded(nrn) => {
                debug!(%nrn, note = message, to = %reschedule_to, degraded = true, "rescheduled");
                return;
            }
        };
        let body = RescheduledExpectation {
            message: message.to_string(),
            reschedule_to,
        };
        match bounded(
            live.timeout,
            live.api.reschedule_expectation(&live.record.path, &body),
        )
        .await
        {
            Ok(()) => debug!(nrn = %live.nrn, note = message, to = %reschedule_to, "rescheduled"),
            Err(e) => warn!(
                nrn = %live.nrn,
                note = message,
                to = %reschedule_to,
                error = %e,
                "reschedule failed"
            ),
        }
    }

    /// Delete the expectation; beacon stops tracking it.
    pub async fn retire(&self) {
        let live = match &self.inner {
            Inner::Live(live) => live,
            Inner::Degraded(nrn) => {
                debug!(%nrn, degraded = true, "retired");
                return;
            }
        };
        match bounded(live.timeout, live.api.delete_expectation(&live.record.path)).await {
            Ok(()) => debug!(nrn = %live.nrn, "retired"),
            Err(e) => warn!(nrn = %live.nrn, error = %e, "retirement failed"),
        }
    }
}

impl std::fmt::Debug for Expectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Expectation")
            .field("nrn", &self.nrn().to_string())
            .field("degraded", &self.is_degraded())
            .finish()
    }
}
