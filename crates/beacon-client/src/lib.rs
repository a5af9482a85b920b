//! beacon-client — register systems and expectations with beacon and
//! report against them without ever failing the host application.
//!
//! # Architecture
//!
//! ```text
//! BeaconClient::start_system()
//!   └── System (Live | Degraded)
//!         ├── child()        → System
//!         ├── expectation()  → Expectation (Live | Degraded)
//!         │     └── fulfil / fail / reschedule / retire
//!         └── shutdown()
//!
//! start_heartbeat(expectation, interval, checker) → Heartbeat
//! ```
//!
//! # Degradation
//!
//! Every remote call goes through [`BeaconApi`] and is bounded by the
//! client's call timeout. When creating a system or expectation fails, a
//! degraded stand-in is returned instead of an error. Degraded instances
//! accept every call, log it at debug level and do nothing else; their
//! children are degraded too. Reporting calls on live instances log
//! failures and carry on. The only fallible operation application code
//! sees is NRN parsing.

pub mod api;
pub mod expectation;
pub mod heartbeat;
pub mod rest;
pub mod system;

pub use api::{ApiError, ApiResult, BeaconApi, DEFAULT_CALL_TIMEOUT};
pub use expectation::Expectation;
pub use heartbeat::{Heartbeat, Reporter, start_heartbeat};
pub use rest::HttpBeaconApi;
pub use system::{BeaconClient, System};

pub use beacon_core::{
    Behavior, ExpectationOptions, ExpectationRecord, Nrn, NrnError, Schedule, SystemOptions,
    SystemRecord,
};
