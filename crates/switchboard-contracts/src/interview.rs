//! Interview episode types.
//!
//! An interview is a multi-turn data-collection episode: the model elicits a
//! set of fields from the user one `record_field` call at a time, then
//! finalizes them into a `StructuredRecord`.

use serde::{Deserialize, Serialize};

use crate::record::RecordSchema;

/// How the episode decides which field comes next and when it is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InterviewMode {
    /// An explicit ordered field list and a cursor owned by the tools.
    IndexDriven,
    /// The agent tracks remaining fields itself and flags the final record
    /// call with `is_complete`.
    CompletionFlag,
}

/// One field the interview elicits, with the question that asks for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewField {
    pub key: String,
    pub prompt: String,
}

impl InterviewField {
    pub fn new(key: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            prompt: prompt.into(),
        }
    }
}

/// Static description of an interview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewPlan {
    /// Keys the session-owned state; two plans with the same id share state.
    pub interview_id: String,
    pub mode: InterviewMode,
    pub fields: Vec<InterviewField>,
    /// Target schema handed to the parsing collaborator at finalize.
    pub schema: RecordSchema,
    /// Reject `record_field` calls for keys outside `fields`.
    #[serde(default)]
    pub strict: bool,
}

impl InterviewPlan {
    pub fn declares(&self, key: &str) -> bool {
        self.fields.iter().any(|f| f.key == key)
    }
}

/// Mutable progress of one episode.
///
/// `fields` keeps collection order. Re-recording a key overwrites its value
/// in place; it does not move the key to the end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewState {
    pub fields: Vec<(String, String)>,
    /// Index into the plan's field list (index-driven mode only).
    pub cursor: usize,
    pub is_complete: bool,
}

impl InterviewState {
    /// Store `value` under `key`; last write wins.
    pub fn record(&mut self, key: &str, value: &str) {
        match self.fields.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.fields.push((key.to_string(), value.to_string())),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Drop all progress. Only called after a successful finalize.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// The collected fields as a JSON object, in collection order.
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        serde_json::Value::Object(map)
    }
}
