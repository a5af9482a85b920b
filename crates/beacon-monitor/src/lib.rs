//! beacon-monitor — watch a feature-instance document for changes.
//!
//! ```text
//! FeatureInstanceMonitor
//!   ├── ConfigSource::fetch(locator) → raw bytes
//!   ├── byte compare against last seen → deserialize → replace
//!   └── subscribers: bounded(1) channel each, try_send, drop on full
//! ```
//!
//! Delivery is at-most-once and may skip intermediate documents: a
//! subscriber that has not drained its channel misses updates until it
//! does. Treat every received document as the latest known state, not as
//! one entry in a change log.

pub mod error;
pub mod monitor;
pub mod source;

pub use error::{MonitorError, MonitorResult, SourceError};
pub use monitor::{FeatureInstanceMonitor, Subscription, SubscriptionId};
pub use source::{ConfigSource, LocatorSource, SourceLocator};
