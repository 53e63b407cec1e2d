//! # switchboard-core
//!
//! The orchestration runtime for switchboard agents.
//!
//! This crate provides:
//! - The collaborator traits (`ModelCollaborator`, `PolicyEngine`,
//!   `ParsingCollaborator`, `SessionSink`, ...)
//! - `ToolSpec` and the validated, retrying, cancellable invocation path
//! - `AgentSpec` and the `AgentRegistry` that holds the handoff graph
//! - `InterviewKit`, the interview state machine exposed as tools
//! - `Session`, the single-writer orchestration loop, and `SessionHandle`,
//!   the actor that runs it on its own task
//! - `DeploymentConfig` and `Credentials`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use switchboard_core::{AgentRegistry, AgentSpec, Session, SessionHandle};
//! ```

pub mod agent;
pub mod config;
pub mod handle;
pub mod interview;
pub mod session;
pub mod tool;
pub mod traits;

#[cfg(test)]
mod proptests;
#[cfg(test)]
mod testing;

pub use agent::{AgentRegistry, AgentSpec, AgentView};
pub use config::{Credentials, DeploymentConfig, SessionConfig};
pub use handle::{SessionHandle, SessionStatus};
pub use interview::InterviewKit;
pub use session::{Collaborators, Session, TurnReport};
pub use tool::{ToolContext, ToolError, ToolHandler, ToolSpec};
