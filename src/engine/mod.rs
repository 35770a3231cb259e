//! Boundary to the policy decision engine under test.
//!
//! The harness only ever sees an engine through [`EngineGateway`] and
//! [`DecisionEngine`]; it measures the time spent inside `construct` and
//! `decide` and nothing else. An engine instance is released when its box is
//! dropped, which also happens when the measurement loop bails out early.
//!
//! Two gateways ship with the crate:
//! - [`embedded::EmbeddedGateway`] loads the materialized policy documents of
//!   a namespace and evaluates them with the selected index strategy.
//! - [`stub::StubGateway`] answers with fixed latencies and is used to test
//!   the harness in isolation.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod embedded;
pub mod policy;
pub mod stub;

pub use embedded::EmbeddedGateway;
pub use stub::{StubCounters, StubGateway};

/// Policy-matching structure the engine builds at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum IndexStrategy {
    /// Linear scan over every policy.
    Simple,
    /// Policies bucketed by action.
    #[default]
    Fast,
    /// Policies bucketed by action and resource.
    Improved,
}

impl IndexStrategy {
    pub fn all() -> [IndexStrategy; 3] {
        [IndexStrategy::Simple, IndexStrategy::Fast, IndexStrategy::Improved]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IndexStrategy::Simple => "SIMPLE",
            IndexStrategy::Fast => "FAST",
            IndexStrategy::Improved => "IMPROVED",
        }
    }
}

impl fmt::Display for IndexStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SIMPLE" => Ok(IndexStrategy::Simple),
            "FAST" => Ok(IndexStrategy::Fast),
            "IMPROVED" => Ok(IndexStrategy::Improved),
            _ => Err(format!(
                "invalid index strategy '{s}' (expected SIMPLE, FAST or IMPROVED)"
            )),
        }
    }
}

impl TryFrom<String> for IndexStrategy {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<IndexStrategy> for String {
    fn from(index: IndexStrategy) -> Self {
        index.as_str().to_string()
    }
}

/// A single authorization question posed to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    pub subject: String,
    pub action: String,
    pub resource: String,
}

impl AuthorizationRequest {
    pub fn new(
        subject: impl Into<String>,
        action: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            action: action.into(),
            resource: resource.into(),
        }
    }
}

impl fmt::Display for AuthorizationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Permit,
    Deny,
    NotApplicable,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Decision::Permit => "PERMIT",
            Decision::Deny => "DENY",
            Decision::NotApplicable => "NOT_APPLICABLE",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid engine configuration: {0}")]
    Configuration(String),

    #[error("Invalid policy document {}: {reason}", .path.display())]
    Policy { path: PathBuf, reason: String },

    #[error("Attribute resolution failed: {0}")]
    Attribute(String),

    #[error("Function evaluation failed: {0}")]
    Function(String),
}

/// Builds engine instances bound to a policy namespace.
pub trait EngineGateway {
    fn construct(
        &self,
        namespace: &Path,
        index: IndexStrategy,
    ) -> Result<Box<dyn DecisionEngine>, EngineError>;
}

/// A constructed engine. Dropping it releases the instance.
pub trait DecisionEngine {
    /// Evaluate one request. `Ok(None)` means the engine produced no
    /// decision at all.
    fn decide(&mut self, request: &AuthorizationRequest) -> Result<Option<Decision>, EngineError>;
}
