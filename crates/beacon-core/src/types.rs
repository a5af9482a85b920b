//! Remote entity models.
//!
//! Mirrors of what the beacon service stores, the request bodies it
//! accepts, and the feature-instance configuration document. All wire
//! types use camelCase JSON keys.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

// ── System ────────────────────────────────────────────────────────

/// A system as registered with the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemRecord {
    /// Address assigned by the service.
    pub path: String,
    pub tenant: String,
    pub feature_instance_path: String,
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub parent_path: Option<String>,
}

/// Body of a create-system request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInputs {
    pub name: String,
    pub tenant: String,
    pub parent_path: String,
    pub feature_instance_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Caller-supplied options for registering a system.
///
/// Unset tenant and feature-instance path are inherited from the parent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemOptions {
    pub name: String,
    pub tenant: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub feature_instance_path: Option<String>,
}

impl SystemOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn feature_instance_path(mut self, path: impl Into<String>) -> Self {
        self.feature_instance_path = Some(path.into());
        self
    }
}

// ── Expectation ───────────────────────────────────────────────────

/// How the service evaluates an expectation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Behavior {
    /// Must be fulfilled before every TTL lapses.
    #[default]
    Heartbeat,
    /// Fulfilled once, then gone.
    Transient,
    /// Fulfilled once per schedule period.
    Recurrent,
    /// Stays failed until fulfilled.
    UntilFulfilled,
    Workflow,
}

/// When an expectation is due.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Schedule {
    /// Due at a fixed instant.
    Deadline { deadline: DateTime<Utc> },
    /// Due `ttl` milliseconds after the last report.
    #[serde(rename = "ttl")]
    Ttl { ttl: u64 },
}

impl Default for Schedule {
    fn default() -> Self {
        Schedule::Ttl { ttl: 60_000 }
    }
}

/// An expectation as registered with the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExpectationRecord {
    pub path: String,
    pub tenant: String,
    pub system_path: String,
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub behavior: Behavior,
    pub schedule: Option<Schedule>,
    pub tolerance: f64,
    pub max_missed_deadline_count: Option<u32>,
    pub tags: Vec<String>,
    pub data: serde_json::Value,
    pub is_failed: Option<bool>,
}

/// Body of a create-expectation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectationInputs {
    pub name: String,
    pub tenant: String,
    /// Path of the owning system.
    pub system: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub behavior: Behavior,
    pub tolerance: f64,
    pub schedule: Schedule,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_missed_deadline_count: Option<u32>,
    pub tags: Vec<String>,
    pub data: serde_json::Value,
}

/// Caller-supplied options for declaring an expectation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpectationOptions {
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub behavior: Behavior,
    pub tolerance: f64,
    pub schedule: Schedule,
    /// Missed deadlines allowed before the expectation counts as failed.
    pub max_missed_deadline_count: Option<u32>,
    pub tags: Vec<String>,
    pub data: serde_json::Value,
}

impl ExpectationOptions {
    /// A heartbeat that must be reported at least every `ttl_ms`.
    pub fn heartbeat(name: impl Into<String>, ttl_ms: u64) -> Self {
        Self {
            name: name.into(),
            behavior: Behavior::Heartbeat,
            schedule: Schedule::Ttl { ttl: ttl_ms },
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FulfilledExpectation {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedExpectation {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduledExpectation {
    pub message: String,
    pub reschedule_to: DateTime<Utc>,
}

// ── Feature instance ──────────────────────────────────────────────

/// A named, versioned configuration document for one deployed feature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeatureInstance {
    pub path: String,
    pub tenant: String,
    pub feature_name: String,
    pub feature_version: String,
    pub instance_name: String,
    pub display_name: Option<String>,
    /// Feature-specific settings, decoded with [`FeatureInstance::extract_config`].
    pub config: serde_json::Value,
}

impl FeatureInstance {
    /// Decode the `config` field into a typed value.
    pub fn extract_config<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_value(self.config.clone())
    }
}
