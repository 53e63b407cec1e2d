//! Agent and session identity types.
//!
//! These identifiers flow through every layer of the orchestrator: registry
//! lookups, handoff validation, policy evaluation, and memory submissions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable, human-readable name of an agent.
///
/// Unique across a deployment. Handoff targets are expressed as names and
/// resolved against the registry at dispatch time, never as live references.
/// Example: AgentName("Weather Agent")
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentName(pub String);

impl AgentName {
    /// Construct a name from any string-like value.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Unique identifier for a single live session.
///
/// Appears in every log line and memory submission produced by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub uuid::Uuid);

impl SessionId {
    /// Create a new, unique session ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The end user a session belongs to. Memory entries are filed under it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub const DEFAULT: &'static str = "default_user";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
