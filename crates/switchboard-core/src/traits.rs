//! Trait definitions for every collaborator the session talks to.
//!
//! The session owns orchestration; everything it does not own sits behind
//! one of these traits:
//!
//! - `ModelCollaborator`: produces model turns for the active agent
//! - `CredentialIssuer`: mints a short-lived credential per session
//! - `ParsingCollaborator`: turns free text into a typed record
//! - `MemoryStore`: long-term memory, written once per session
//! - `PolicyEngine`: trusted gate evaluated before any tool runs
//! - `ApprovalGate`: human decision for approval-required calls
//! - `ArgumentValidator`: checks tool arguments against their schema
//! - `RecordValidator`: checks parsed records against their schema
//! - `SessionSink`: receives the final snapshot at close
//!
//! The policy engine and validators are synchronous and must be
//! deterministic. Everything that may perform I/O is async.

use async_trait::async_trait;
use serde_json::Value;

use switchboard_contracts::{
    conversation::ConversationItem,
    error::SwitchboardResult,
    memory::{MemoryBatch, MemoryReceipt, SessionSnapshot, SinkReport},
    policy::{ApprovalDecision, ApprovalRequest, PolicyContext, PolicyVerdict},
    record::{ParseOutcome, RecordSchema, StructuredRecord},
    session::{ModelTurn, SessionCredential},
    tool::ToolDescriptor,
};

use crate::agent::{AgentView, HandoffTarget};

/// What the model collaborator is asked on each turn.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub agent: switchboard_contracts::agent::AgentName,
    pub instructions: String,
    pub tools: Vec<ToolDescriptor>,
    pub handoff_targets: Vec<HandoffTarget>,
    /// The full shared history, oldest first.
    pub history: Vec<ConversationItem>,
}

impl ModelRequest {
    pub fn new(view: AgentView, history: Vec<ConversationItem>) -> Self {
        Self {
            agent: view.name,
            instructions: view.instructions,
            tools: view.tools,
            handoff_targets: view.handoff_targets,
            history,
        }
    }
}

/// The language model behind the conversation.
///
/// Implementations are **untrusted**: a turn may name a tool the agent does
/// not own or a handoff target it may not reach. The session validates both.
#[async_trait]
pub trait ModelCollaborator: Send + Sync {
    /// Open the streaming connection for `agent` using `credential`.
    async fn connect(&self, credential: &SessionCredential, agent: &AgentView) -> SwitchboardResult<()>;

    /// Produce exactly one turn for the active agent.
    async fn next_turn(&self, request: &ModelRequest) -> SwitchboardResult<ModelTurn>;

    /// Release the transport and the credential. Called once, at close.
    async fn disconnect(&self) -> SwitchboardResult<()>;
}

/// Issues the short-lived credential the model collaborator connects with.
///
/// Failure is a `SwitchboardError::Connection`.
#[async_trait]
pub trait CredentialIssuer: Send + Sync {
    async fn issue(&self) -> SwitchboardResult<SessionCredential>;
}

/// Extracts a `StructuredRecord` from free text.
///
/// Implementations return a conforming record, or an explicit refusal or
/// failure. They never return a value that violates `schema`.
#[async_trait]
pub trait ParsingCollaborator: Send + Sync {
    async fn parse(&self, raw: &str, schema: &RecordSchema) -> SwitchboardResult<ParseOutcome>;
}

/// The external long-term memory store.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Submit one batch. A rejected batch is reported in the receipt, not as
    /// an error; `Err` means the store could not be reached at all.
    async fn add(&self, batch: &MemoryBatch) -> SwitchboardResult<MemoryReceipt>;
}

/// The policy engine: evaluated before every tool invocation.
///
/// Implementations are **trusted** and must be deterministic. Avoid I/O.
pub trait PolicyEngine: Send + Sync {
    fn evaluate(&self, ctx: &PolicyContext) -> SwitchboardResult<PolicyVerdict>;
}

/// Resolves approval-required tool calls.
///
/// The session bounds the wait with its configured timeout; implementations
/// may block for as long as a human takes.
#[async_trait]
pub trait ApprovalGate: Send + Sync {
    async fn request(&self, request: ApprovalRequest) -> ApprovalDecision;
}

/// Checks tool arguments before the handler runs.
pub trait ArgumentValidator: Send + Sync {
    /// Return `SwitchboardError::ToolInput` naming the first violation.
    fn validate_arguments(&self, tool: &ToolDescriptor, arguments: &Value) -> SwitchboardResult<()>;
}

/// Checks a parsed record before it is accepted at finalize.
pub trait RecordValidator: Send + Sync {
    fn validate_record(&self, schema: &RecordSchema, record: &StructuredRecord) -> SwitchboardResult<()>;
}

/// Receives the final session snapshot exactly once, at close.
///
/// Branch failures are reported inside the `SinkReport`, never as an error.
#[async_trait]
pub trait SessionSink: Send + Sync {
    async fn persist(&self, snapshot: &SessionSnapshot) -> SinkReport;
}
