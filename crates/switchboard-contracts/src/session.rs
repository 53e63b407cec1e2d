//! Session lifecycle, inbound event, and dispatch outcome types.
//!
//! Every kind of event the orchestrator reacts to is enumerated here. There
//! is no wildcard subscription: a session consumes `SessionEvent`s through a
//! single dispatch function, one at a time, in arrival order.

use serde::{Deserialize, Serialize};

use crate::{
    agent::AgentName,
    conversation::{Content, ItemId},
    tool::{HandoffDirective, ToolCall, ToolOutcome},
};

/// Lifecycle of a session.
///
/// `Idle → Connecting → Active → Closing → Closed`. A failed connect returns
/// to `Idle`. No events are accepted outside `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Connecting,
    Active,
    Closing,
    Closed,
}

/// An inbound event from the transport or model collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    UserMessage { content: Content },
    AssistantMessage { content: Content },
    ToolCallRequested(ToolCall),
    HandoffRequested(HandoffDirective),
    /// The streaming transport went away underneath the session.
    TransportDropped { reason: String },
}

/// One model turn: exactly one of content, a tool call, or a handoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ModelTurn {
    Content(Content),
    ToolCall(ToolCall),
    Handoff(HandoffDirective),
}

impl From<ModelTurn> for SessionEvent {
    fn from(turn: ModelTurn) -> Self {
        match turn {
            ModelTurn::Content(content) => SessionEvent::AssistantMessage { content },
            ModelTurn::ToolCall(call) => SessionEvent::ToolCallRequested(call),
            ModelTurn::Handoff(directive) => SessionEvent::HandoffRequested(directive),
        }
    }
}

/// What dispatching one event did to the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// A message item was appended to history.
    Appended { item_id: ItemId },
    /// A tool call ran to completion (successfully or not).
    ToolCompleted(ToolOutcome),
    /// The active agent changed.
    HandedOff { from: AgentName, to: AgentName },
    /// The directive was refused; `from` is still active.
    HandoffRejected {
        from: AgentName,
        target: AgentName,
        reason: String,
    },
}

/// A short-lived credential for the model collaborator.
///
/// Issued per session from the deployment-wide secret; never logged.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredential {
    pub token: String,
    /// Unix seconds, when the issuer reports one.
    pub expires_at: Option<i64>,
}

impl std::fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCredential")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
