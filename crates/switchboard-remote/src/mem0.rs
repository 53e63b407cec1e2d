//! Client for a mem0-compatible memory service.
//!
//! Each `MemoryBatch` becomes one `POST {api_base}/v1/memories/` with
//! `Authorization: Token <key>`. A 4xx/5xx answer is a failed receipt; only
//! a transport failure is an `Err`.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use switchboard_contracts::{
    error::{SwitchboardError, SwitchboardResult},
    memory::{MemoryBatch, MemoryMessage, MemoryReceipt},
};
use switchboard_core::{
    config::{Credentials, MemoryStoreConfig},
    traits::MemoryStore,
};

use crate::http::JsonClient;

#[derive(Debug, Serialize)]
struct AddMemoriesRequest<'a> {
    messages: &'a [MemoryMessage],
    user_id: &'a str,
    metadata: Metadata<'a>,
}

#[derive(Debug, Serialize)]
struct Metadata<'a> {
    session_type: &'a str,
    session_id: String,
    label: &'static str,
    entry_id: &'a str,
    timestamp: String,
}

impl<'a> From<&'a MemoryBatch> for AddMemoriesRequest<'a> {
    fn from(batch: &'a MemoryBatch) -> Self {
        Self {
            messages: &batch.messages,
            user_id: &batch.user_id.0,
            metadata: Metadata {
                session_type: &batch.metadata.session_type,
                session_id: batch.metadata.session_id.to_string(),
                label: batch.metadata.label.as_str(),
                entry_id: &batch.entry_id,
                timestamp: batch.metadata.timestamp.to_rfc3339(),
            },
        }
    }
}

pub struct Mem0Store {
    http: JsonClient,
}

impl Mem0Store {
    pub fn new(config: &MemoryStoreConfig, credentials: &Credentials) -> SwitchboardResult<Self> {
        Ok(Self {
            http: JsonClient::new(&config.api_base, format!("Token {}", credentials.mem_api_key))?,
        })
    }
}

#[async_trait]
impl MemoryStore for Mem0Store {
    async fn add(&self, batch: &MemoryBatch) -> SwitchboardResult<MemoryReceipt> {
        let request = AddMemoriesRequest::from(batch);
        match self.http.post::<_, Value>("v1/memories/", &request).await {
            Ok(_) => {
                debug!(entry_id = %batch.entry_id, "memory batch accepted");
                Ok(MemoryReceipt::ok())
            }
            Err(e) if !e.is_transient() => Ok(MemoryReceipt::failed(e.to_string())),
            Err(e) => Err(SwitchboardError::MemorySink { reason: e.to_string() }),
        }
    }
}
