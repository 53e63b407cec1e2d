//! Conversation history types.
//!
//! History is append-only. Items are never edited in place; a session only
//! ever extends its history, and item IDs increase strictly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tool::{ToolCall, ToolOutcome};

/// Who authored a message item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Position of an item within its session's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub u64);

/// One typed part of a multi-part message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    /// Audio is never stored; only its transcript (when the model produced
    /// one) is carried.
    Audio { transcript: Option<String> },
}

/// Message content: either plain text or an ordered list of parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Content::Text(text.into())
    }

    pub fn audio(transcript: impl Into<String>) -> Self {
        Content::Parts(vec![ContentPart::Audio {
            transcript: Some(transcript.into()),
        }])
    }

    /// Collapse the content to a single string.
    ///
    /// Text parts contribute their text, audio parts their transcript; empty
    /// pieces are skipped and the rest joined by a single space.
    pub fn flatten(&self) -> String {
        match self {
            Content::Text(text) => text.trim().to_string(),
            Content::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.trim()),
                    ContentPart::Audio { transcript } => transcript.as_deref().map(str::trim),
                })
                .filter(|piece| !piece.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// What an item records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemBody {
    Message { role: Role, content: Content },
    ToolCall(ToolCall),
    ToolOutput(ToolOutcome),
}

/// A single entry in a session's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationItem {
    pub item_id: ItemId,
    pub created_at: DateTime<Utc>,
    pub body: ItemBody,
}

impl ConversationItem {
    /// The role an item is attributed to.
    ///
    /// Tool calls are issued by the assistant; tool outputs come from the
    /// orchestrator and count as system items.
    pub fn role(&self) -> Role {
        match &self.body {
            ItemBody::Message { role, .. } => *role,
            ItemBody::ToolCall(_) => Role::Assistant,
            ItemBody::ToolOutput(_) => Role::System,
        }
    }

    /// The content of a message item, `None` for tool items.
    pub fn message_content(&self) -> Option<&Content> {
        match &self.body {
            ItemBody::Message { content, .. } => Some(content),
            _ => None,
        }
    }
}
