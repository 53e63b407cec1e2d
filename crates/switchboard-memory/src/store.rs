//! In-memory implementation of `MemoryStore`.
//!
//! `InMemoryMemoryStore` keeps accepted batches in a `Vec` behind
//! `Arc<Mutex<_>>`, so tests and the reference scenarios can hold a clone
//! and inspect what a session persisted after it closed.
//!
//! Batches are deduplicated on `entry_id`: resubmitting a batch succeeds
//! without storing it twice.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use tracing::debug;

use switchboard_contracts::{
    error::{SwitchboardError, SwitchboardResult},
    memory::{MemoryBatch, MemoryLabel, MemoryReceipt},
};
use switchboard_core::traits::MemoryStore;

#[derive(Default)]
struct StoreState {
    batches: Vec<MemoryBatch>,
    seen: HashSet<String>,
}

/// A `MemoryStore` that keeps everything in process memory.
#[derive(Clone, Default)]
pub struct InMemoryMemoryStore {
    state: Arc<Mutex<StoreState>>,
    /// Labels whose submissions are rejected with a failed receipt.
    rejected: Arc<HashSet<MemoryLabel>>,
    unreachable: bool,
}

impl InMemoryMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects every batch carrying `label`.
    pub fn rejecting(labels: impl IntoIterator<Item = MemoryLabel>) -> Self {
        Self {
            rejected: Arc::new(labels.into_iter().collect()),
            ..Self::default()
        }
    }

    /// A store that cannot be reached at all.
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Every accepted batch, in submission order.
    pub fn batches(&self) -> Vec<MemoryBatch> {
        self.lock().batches.clone()
    }

    pub fn batches_labelled(&self, label: MemoryLabel) -> Vec<MemoryBatch> {
        self.lock()
            .batches
            .iter()
            .filter(|b| b.metadata.label == label)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MemoryStore for InMemoryMemoryStore {
    async fn add(&self, batch: &MemoryBatch) -> SwitchboardResult<MemoryReceipt> {
        if self.unreachable {
            return Err(SwitchboardError::MemorySink {
                reason: "memory store is unreachable".to_string(),
            });
        }
        if self.rejected.contains(&batch.metadata.label) {
            return Ok(MemoryReceipt::failed(format!(
                "store rejects {} batches",
                batch.metadata.label.as_str()
            )));
        }

        let mut state = self.lock();
        if state.seen.insert(batch.entry_id.clone()) {
            state.batches.push(batch.clone());
        } else {
            debug!(entry_id = %batch.entry_id, "duplicate batch ignored");
        }
        Ok(MemoryReceipt::ok())
    }
}
