//! Error types for the switchboard orchestrator.
//!
//! All fallible operations return `SwitchboardResult<T>`. Only `Connection`
//! and `Config` are fatal to a session; every error raised inside a tool is
//! converted to result text before it can reach the dispatch loop.

use thiserror::Error;

/// The unified error type for the switchboard workspace.
#[derive(Debug, Error)]
pub enum SwitchboardError {
    /// Credential issuance or the streaming transport failed.
    #[error("connection error: {reason}")]
    Connection { reason: String },

    /// Tool arguments failed schema validation.
    #[error("invalid input for tool '{tool}': {reason}")]
    ToolInput { tool: String, reason: String },

    /// A tool handler failed while running.
    #[error("tool '{tool}' failed: {reason}")]
    ToolExecution { tool: String, reason: String },

    /// The active agent has no tool by this name.
    #[error("agent '{agent}' has no tool named '{tool}'")]
    UnknownTool { agent: String, tool: String },

    /// A handoff directive named a target outside the issuing agent's
    /// permitted set. The issuing agent remains active.
    #[error("agent '{from}' is not permitted to hand off to '{target}'")]
    HandoffNotPermitted { from: String, target: String },

    /// A name did not resolve against the agent registry.
    #[error("no agent named '{name}' is registered")]
    UnknownAgent { name: String },

    /// Finalize was called before any field was recorded.
    #[error("no data collected for interview '{interview}'")]
    NoDataCollected { interview: String },

    /// A strict interview received a key outside its declared fields.
    #[error("field '{key}' is not part of interview '{interview}'")]
    UnknownField { interview: String, key: String },

    /// A remote service answered, but with a rejection (bad credentials,
    /// an error status, an unreadable body). Retrying will not help.
    #[error("upstream error: {reason}")]
    Upstream { reason: String },

    /// The parsing collaborator refused or failed to produce a record.
    #[error("structured parse failed: {reason}")]
    ParseFailed { reason: String },

    /// A memory submission failed. Logged, never fatal to close.
    #[error("memory sink error: {reason}")]
    MemorySink { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    Config { reason: String },

    /// An operation was attempted in the wrong lifecycle phase.
    #[error("session state error: {reason}")]
    SessionState { reason: String },

    /// The session has begun closing and accepts no further events.
    #[error("session is closed")]
    SessionClosed,

    /// The turn loop hit its configured bound without producing content.
    #[error("maximum turns exceeded: {max_turns}")]
    MaxTurnsExceeded { max_turns: usize },

    /// A JSON Schema document could not be compiled.
    #[error("schema validation error: {reason}")]
    SchemaValidation { reason: String },
}

impl SwitchboardError {
    /// Whether this error ends the session.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SwitchboardError::Connection { .. } | SwitchboardError::Config { .. }
        )
    }
}

/// Convenience alias used throughout the switchboard crates.
pub type SwitchboardResult<T> = Result<T, SwitchboardError>;
