//! The memory sink: what a session leaves behind when it closes.
//!
//! ```text
//! SessionSnapshot
//!       │
//!       ├─► transcript ─────► user/assistant text, flattened, empties dropped
//!       │                     + one system timestamp marker ─► Transcript batch
//!       │
//!       ├─► records ────────► JSON found in assistant text
//!       │                     + records produced by finalize ─► StructuredRecord batches
//!       │
//!       └─► interviews ─────► each resident, non-empty episode ─► InterviewState batch
//! ```
//!
//! Branches are independent. A failed submission is logged and reported in
//! the `SinkReport`; it never stops the other branches, and it never turns
//! into an error for the caller of close.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};

use switchboard_contracts::{
    conversation::Role,
    memory::{
        BranchOutcome, MemoryBatch, MemoryLabel, MemoryMessage, MemoryMetadata, MemoryRole,
        SessionSnapshot, SinkReport,
    },
};
use switchboard_core::{
    config::MemoryConfig,
    traits::{MemoryStore, SessionSink},
};

use crate::{entry::entry_id, extract::json_fragments};

/// Reduces a closed session to memory batches and submits them.
pub struct MemorySink {
    store: Arc<dyn MemoryStore>,
    session_type: String,
}

impl MemorySink {
    pub fn new(store: Arc<dyn MemoryStore>, config: &MemoryConfig) -> Self {
        Self {
            store,
            session_type: config.session_type.clone(),
        }
    }

    fn batch(&self, snapshot: &SessionSnapshot, label: MemoryLabel, messages: Vec<MemoryMessage>) -> MemoryBatch {
        MemoryBatch {
            entry_id: entry_id(snapshot.session_id, label, &messages),
            user_id: snapshot.user_id.clone(),
            messages,
            metadata: MemoryMetadata {
                session_type: self.session_type.clone(),
                session_id: snapshot.session_id,
                label,
                timestamp: Utc::now(),
            },
        }
    }

    async fn submit(&self, batch: MemoryBatch) -> BranchOutcome {
        let label = batch.metadata.label.as_str();
        let entry_id = batch.entry_id.clone();

        let error = match self.store.add(&batch).await {
            Ok(receipt) if receipt.success => {
                debug!(%entry_id, label, messages = batch.messages.len(), "memory batch stored");
                return BranchOutcome::Stored { entry_id };
            }
            Ok(receipt) => receipt
                .error
                .unwrap_or_else(|| "store rejected the batch".to_string()),
            Err(e) => e.to_string(),
        };

        warn!(
            session_id = %batch.metadata.session_id,
            %entry_id,
            label,
            %error,
            "memory submission failed"
        );
        BranchOutcome::Failed { entry_id, error }
    }

    async fn persist_transcript(&self, snapshot: &SessionSnapshot) -> BranchOutcome {
        let mut messages = transcript(snapshot);
        if messages.is_empty() {
            debug!(session_id = %snapshot.session_id, "empty transcript, nothing to submit");
            return BranchOutcome::Skipped;
        }
        messages.push(MemoryMessage {
            role: MemoryRole::System,
            content: format!("Conversation timestamp: {}", Utc::now().to_rfc3339()),
        });
        self.submit(self.batch(snapshot, MemoryLabel::Transcript, messages)).await
    }

    async fn persist_records(&self, snapshot: &SessionSnapshot) -> Vec<BranchOutcome> {
        let mut outcomes = Vec::new();

        let mut payloads: Vec<String> = Vec::new();
        let embedded = snapshot
            .history
            .iter()
            .filter(|item| item.role() == Role::Assistant)
            .filter_map(|item| item.message_content())
            .flat_map(|content| json_fragments(&content.flatten()));
        let finalized = snapshot.records.iter().map(|record| record.to_value());
        for payload in embedded.chain(finalized).map(|value| value.to_string()) {
            if !payloads.contains(&payload) {
                payloads.push(payload);
            }
        }

        for payload in payloads {
            let message = MemoryMessage {
                role: MemoryRole::Assistant,
                content: payload,
            };
            let batch = self.batch(snapshot, MemoryLabel::StructuredRecord, vec![message]);
            outcomes.push(self.submit(batch).await);
        }

        for (interview_id, state) in &snapshot.resident_interviews {
            if state.is_empty() {
                continue;
            }
            let content = json!({
                "interview_id": interview_id,
                "fields": state.to_json(),
                "is_complete": state.is_complete,
            })
            .to_string();
            let message = MemoryMessage {
                role: MemoryRole::Assistant,
                content,
            };
            let batch = self.batch(snapshot, MemoryLabel::InterviewState, vec![message]);
            outcomes.push(self.submit(batch).await);
        }

        outcomes
    }
}

/// User and assistant messages, flattened, with empty ones dropped.
pub fn transcript(snapshot: &SessionSnapshot) -> Vec<MemoryMessage> {
    snapshot
        .history
        .iter()
        .filter(|item| matches!(item.role(), Role::User | Role::Assistant))
        .filter_map(|item| {
            let content = item.message_content()?.flatten();
            (!content.is_empty()).then(|| MemoryMessage {
                role: item.role().into(),
                content,
            })
        })
        .collect()
}

#[async_trait]
impl SessionSink for MemorySink {
    async fn persist(&self, snapshot: &SessionSnapshot) -> SinkReport {
        let report = SinkReport {
            transcript: self.persist_transcript(snapshot).await,
            records: self.persist_records(snapshot).await,
        };
        info!(
            session_id = %snapshot.session_id,
            user_id = %snapshot.user_id,
            records = report.records.len(),
            failures = report.has_failures(),
            "session persisted to memory"
        );
        report
    }
}
