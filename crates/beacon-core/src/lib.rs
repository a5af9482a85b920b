//! beacon-core — shared types for the beacon monitoring client.
//!
//! - [`Nrn`]: the hierarchical `nrn:beacon:…` address of every tenant,
//!   feature instance, system and expectation.
//! - [`types`]: mirrors of the remote entities and the request bodies the
//!   REST API accepts, plus the [`FeatureInstance`] configuration document.
//! - [`BeaconConfig`]: the `beacon.toml` configuration file.
//! - [`http`]: the minimal HTTP/1.1 (and TLS) client shared by the REST client and
//!   the locator-based config source.

pub mod config;
pub mod http;
pub mod nrn;
pub mod types;

pub use config::{BeaconConfig, ConfigError};
pub use nrn::{Nrn, NrnError, NrnKind};
pub use types::*;
