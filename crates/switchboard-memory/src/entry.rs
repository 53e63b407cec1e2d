//! Content-addressed entry ids.
//!
//! Hash input layout (bytes, in order):
//!   1. session id as its hyphenated UUID string
//!   2. label name (`transcript`, `structured_record`, `interview_state`)
//!   3. for each message: role name, content length as 8-byte little-endian,
//!      content as UTF-8
//!
//! The length prefix keeps `["ab", "c"]` and `["a", "bc"]` apart. Timestamps
//! are not hashed, so a resubmitted batch keeps its id.

use sha2::{Digest, Sha256};

use switchboard_contracts::{
    agent::SessionId,
    memory::{MemoryLabel, MemoryMessage, MemoryRole},
};

fn role_name(role: MemoryRole) -> &'static str {
    match role {
        MemoryRole::User => "user",
        MemoryRole::Assistant => "assistant",
        MemoryRole::System => "system",
    }
}

/// Lowercase 64-character hex SHA-256 over the batch's identifying content.
pub fn entry_id(session_id: SessionId, label: MemoryLabel, messages: &[MemoryMessage]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(session_id.to_string().as_bytes());
    hasher.update(label.as_str().as_bytes());
    for message in messages {
        hasher.update(role_name(message.role).as_bytes());
        hasher.update((message.content.len() as u64).to_le_bytes());
        hasher.update(message.content.as_bytes());
    }
    hex::encode(hasher.finalize())
}
