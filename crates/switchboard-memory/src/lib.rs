//! # switchboard-memory
//!
//! Files a closed session into long-term memory.
//!
//! ## Overview
//!
//! [`MemorySink`] implements [`SessionSink`](switchboard_core::traits::SessionSink).
//! When a session closes it receives the session snapshot and submits up to
//! three kinds of batch to a [`MemoryStore`](switchboard_core::traits::MemoryStore):
//! the conversation transcript, any structured records, and any interview
//! that was still in progress. Each batch carries a SHA-256 `entry_id` over
//! its content, so a store can tell a retry from a new submission.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use switchboard_memory::{InMemoryMemoryStore, MemorySink};
//!
//! let store = InMemoryMemoryStore::new();
//! let sink = MemorySink::new(Arc::new(store.clone()), &config.memory);
//! // Pass `sink` to the session's collaborators, then after close:
//! assert!(!store.is_empty());
//! ```

pub mod entry;
pub mod extract;
pub mod sink;
pub mod store;

pub use entry::entry_id;
pub use extract::json_fragments;
pub use sink::{transcript, MemorySink};
pub use store::InMemoryMemoryStore;

// ── Tests ─────────────────────────────────────────────────────────────────────
