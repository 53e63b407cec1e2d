//! Policy verdict, evaluation context, and approval types.
//!
//! The policy engine consumes a `PolicyContext` and produces a
//! `PolicyVerdict` before any tool handler runs. `RequireApproval` suspends
//! the call until an `ApprovalDecision` arrives.

use serde::{Deserialize, Serialize};

use crate::{
    agent::{AgentName, SessionId},
    tool::ToolCall,
};

/// The decision emitted by the policy engine for a single tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyVerdict {
    /// The call may proceed to validation and invocation.
    Allow,

    /// The call is refused. The reason is returned to the agent as the
    /// tool's result text.
    Deny {
        reason: String,
    },

    /// The call is suspended pending a human decision.
    RequireApproval {
        /// Why approval is required.
        reason: String,
        /// The role expected to decide (e.g. "account_holder").
        approver_role: String,
    },
}

/// Everything the policy engine needs to make a decision.
///
/// Plain strings, so rules can be written without depending on the rest of
/// the contract types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyContext {
    /// The agent issuing the call.
    pub agent: String,
    pub session_id: String,
    pub tool: String,
    /// The raw, not yet validated arguments.
    pub arguments: serde_json::Value,
    /// Whether the tool descriptor itself is marked approval-required.
    pub tool_requires_approval: bool,
}

/// A pending approval handed to whoever decides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub session_id: SessionId,
    pub agent: AgentName,
    pub call: ToolCall,
    pub reason: String,
    pub approver_role: String,
}

/// How a pending approval was resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalDecision {
    Approved,
    Denied { reason: String },
    /// No decision arrived in time. Treated exactly like a denial.
    TimedOut,
}

impl ApprovalDecision {
    pub fn is_approved(&self) -> bool {
        matches!(self, ApprovalDecision::Approved)
    }
}
