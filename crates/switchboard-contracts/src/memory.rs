//! Memory submission and sink report types.
//!
//! On close, a session's history is reduced to one or more `MemoryBatch`es
//! and handed to the external memory store. Each persistence branch reports
//! its own `BranchOutcome`; one branch failing never undoes another.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    agent::{SessionId, UserId},
    conversation::{ConversationItem, Role},
    interview::InterviewState,
    record::StructuredRecord,
};

/// Role of a message as the memory store sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryRole {
    User,
    Assistant,
    System,
}

impl From<Role> for MemoryRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => MemoryRole::User,
            Role::Assistant => MemoryRole::Assistant,
            Role::System => MemoryRole::System,
        }
    }
}

/// A single flattened message submitted to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryMessage {
    pub role: MemoryRole,
    pub content: String,
}

/// Which persistence branch produced a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryLabel {
    /// The user/assistant transcript plus a timestamp marker.
    Transcript,
    /// A structured payload found in assistant text or produced by finalize.
    StructuredRecord,
    /// An interview episode that was still in progress at close.
    InterviewState,
}

impl MemoryLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            MemoryLabel::Transcript => "transcript",
            MemoryLabel::StructuredRecord => "structured_record",
            MemoryLabel::InterviewState => "interview_state",
        }
    }
}

/// Metadata attached to every submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryMetadata {
    /// Deployment-level tag (e.g. "voice_agent").
    pub session_type: String,
    pub session_id: SessionId,
    pub label: MemoryLabel,
    pub timestamp: DateTime<Utc>,
}

/// One submission to the memory store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryBatch {
    /// Content-addressed identifier: resubmitting the same batch yields the
    /// same id, so stores can recognise retries.
    pub entry_id: String,
    pub user_id: UserId,
    pub messages: Vec<MemoryMessage>,
    pub metadata: MemoryMetadata,
}

impl MemoryBatch {
    /// Messages that came from the conversation itself, excluding the
    /// synthetic system marker.
    pub fn conversation_messages(&self) -> impl Iterator<Item = &MemoryMessage> {
        self.messages
            .iter()
            .filter(|m| m.role != MemoryRole::System)
    }
}

/// The store's answer to one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryReceipt {
    pub success: bool,
    pub error: Option<String>,
}

impl MemoryReceipt {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Result of one persistence branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BranchOutcome {
    /// Nothing to submit (e.g. a zero-message transcript).
    Skipped,
    Stored { entry_id: String },
    Failed { entry_id: String, error: String },
}

impl BranchOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, BranchOutcome::Failed { .. })
    }
}

/// Everything the memory sink persisted, returned to the caller of close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkReport {
    pub transcript: BranchOutcome,
    pub records: Vec<BranchOutcome>,
}

impl SinkReport {
    /// A report for a session that had nothing to persist.
    pub fn empty() -> Self {
        Self {
            transcript: BranchOutcome::Skipped,
            records: Vec::new(),
        }
    }

    pub fn has_failures(&self) -> bool {
        self.transcript.is_failure() || self.records.iter().any(BranchOutcome::is_failure)
    }
}

/// The final view of a session handed to the sink exactly once, at close.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub history: Vec<ConversationItem>,
    /// Interview episodes still holding data (keyed by interview id).
    pub resident_interviews: Vec<(String, InterviewState)>,
    /// Records produced by finalize during the session, oldest first.
    pub records: Vec<StructuredRecord>,
}
