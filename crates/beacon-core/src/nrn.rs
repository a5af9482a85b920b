//! NRN addressing.
//!
//! Every entity beacon knows about is named by a nine-segment address:
//!
//! ```text
//! nrn:beacon:<tenant>:<kind>:<feature>:<version>:<instance>:<system-path>:<name>
//! ```
//!
//! The system path is the dot-joined chain of ancestor system names, so a
//! child address can always be derived locally from its parent without a
//! round trip to the service.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const PREFIX: &str = "nrn";
const SERVICE: &str = "beacon";
const SEGMENTS: usize = 9;

/// Errors produced when parsing an NRN.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NrnError {
    #[error("invalid nrn {input:?}: wrong number of segments (expected 9, got {found})")]
    SegmentCount { input: String, found: usize },

    #[error("invalid nrn {input:?}: must start with \"nrn:beacon:\"")]
    Prefix { input: String },
}

/// The kind segment of an NRN.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum NrnKind {
    /// `sys`
    #[default]
    System,
    /// `exp`
    Expectation,
    /// `fin`
    FeatureInstance,
    /// Any other literal, kept verbatim.
    Other(String),
}

impl NrnKind {
    pub fn as_str(&self) -> &str {
        match self {
            NrnKind::System => "sys",
            NrnKind::Expectation => "exp",
            NrnKind::FeatureInstance => "fin",
            NrnKind::Other(s) => s,
        }
    }
}

impl From<&str> for NrnKind {
    fn from(s: &str) -> Self {
        match s {
            "sys" => NrnKind::System,
            "exp" => NrnKind::Expectation,
            "fin" => NrnKind::FeatureInstance,
            other => NrnKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for NrnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed beacon address.
///
/// Values are immutable; the `child_*` methods return new addresses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Nrn {
    tenant: String,
    kind: NrnKind,
    feature: String,
    version: String,
    instance: String,
    system_path: String,
    name: String,
}

impl Nrn {
    /// Parse the textual form of an address.
    pub fn parse(input: &str) -> Result<Self, NrnError> {
        let segs: Vec<&str> = input.split(':').collect();
        if segs.len() != SEGMENTS {
            return Err(NrnError::SegmentCount {
                input: input.to_string(),
                found: segs.len(),
            });
        }
        if segs[0] != PREFIX || segs[1] != SERVICE {
            return Err(NrnError::Prefix {
                input: input.to_string(),
            });
        }

        Ok(Self {
            tenant: segs[2].to_string(),
            kind: NrnKind::from(segs[3]),
            feature: segs[4].to_string(),
            version: segs[5].to_string(),
            instance: segs[6].to_string(),
            system_path: segs[7].to_string(),
            name: segs[8].to_string(),
        })
    }

    /// A `sys` address for a system whose feature instance is unknown.
    ///
    /// Only the tenant and name are filled in.
    pub fn detached_system(tenant: &str, name: &str) -> Self {
        Self {
            tenant: tenant.to_string(),
            kind: NrnKind::System,
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Derive the address of a child system.
    ///
    /// # Panics
    ///
    /// Panics if `self` names an expectation; expectations never own systems.
    pub fn child_system(&self, name: &str) -> Self {
        assert!(
            self.kind != NrnKind::Expectation,
            "an expectation cannot have a child system (parent {self})"
        );
        let mut child = self.clone();
        if self.kind == NrnKind::System {
            child.system_path = self.nested_path();
        }
        child.kind = NrnKind::System;
        child.name = name.to_string();
        child
    }

    /// Derive the address of an expectation owned by this system.
    ///
    /// # Panics
    ///
    /// Panics unless `self` names a system.
    pub fn child_expectation(&self, name: &str) -> Self {
        assert!(
            self.kind == NrnKind::System,
            "only a system can have a child expectation (parent {self})"
        );
        let mut child = self.clone();
        child.system_path = self.nested_path();
        child.kind = NrnKind::Expectation;
        child.name = name.to_string();
        child
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn kind(&self) -> &NrnKind {
        &self.kind
    }

    pub fn feature(&self) -> &str {
        &self.feature
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn system_path(&self) -> &str {
        &self.system_path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The system path a child of this address lives under.
    fn nested_path(&self) -> String {
        if self.system_path.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.system_path, self.name)
        }
    }
}

impl fmt::Display for Nrn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{PREFIX}:{SERVICE}:{}:{}:{}:{}:{}:{}:{}",
            self.tenant,
            self.kind,
            self.feature,
            self.version,
            self.instance,
            self.system_path,
            self.name
        )
    }
}

impl FromStr for Nrn {
    type Err = NrnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Nrn::parse(s)
    }
}

impl TryFrom<String> for Nrn {
    type Error = NrnError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Nrn::parse(&value)
    }
}

impl From<Nrn> for String {
    fn from(nrn: Nrn) -> Self {
        nrn.to_string()
    }
}
