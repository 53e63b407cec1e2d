//! Deterministic stand-ins for the realtime model and credential issuer.
//!
//! `ScriptedModel` replays a fixed list of model turns, one per
//! `next_turn` request, and remembers which agent each request was made
//! for. The scenarios use it to drive real sessions without a network.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use switchboard_contracts::{
    agent::AgentName,
    conversation::Content,
    error::{SwitchboardError, SwitchboardResult},
    session::{ModelTurn, SessionCredential},
    tool::{HandoffDirective, ToolCall},
};
use switchboard_core::{
    agent::AgentView,
    traits::{CredentialIssuer, ModelCollaborator, ModelRequest},
};

/// Shorthand constructors for scripted turns.
pub mod turn {
    use super::*;

    pub fn say(text: &str) -> ModelTurn {
        ModelTurn::Content(Content::audio(text))
    }

    pub fn call(call_id: &str, tool: &str, arguments: Value) -> ModelTurn {
        ModelTurn::ToolCall(ToolCall::new(call_id, tool, arguments))
    }

    pub fn hand_off(target: &str) -> ModelTurn {
        ModelTurn::Handoff(HandoffDirective::to(target))
    }
}

#[derive(Default)]
struct Script {
    turns: VecDeque<ModelTurn>,
    asked: Vec<AgentName>,
    connected: bool,
}

/// A model that replays a script.
#[derive(Clone, Default)]
pub struct ScriptedModel {
    script: Arc<Mutex<Script>>,
}

impl ScriptedModel {
    pub fn new(turns: impl IntoIterator<Item = ModelTurn>) -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                turns: turns.into_iter().collect(),
                ..Script::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The agent each `next_turn` request was made for, in order.
    pub fn asked(&self) -> Vec<AgentName> {
        self.lock().asked.clone()
    }

    pub fn remaining(&self) -> usize {
        self.lock().turns.len()
    }

    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }
}

#[async_trait]
impl ModelCollaborator for ScriptedModel {
    async fn connect(&self, _credential: &SessionCredential, agent: &AgentView) -> SwitchboardResult<()> {
        debug!(agent = %agent.name, "scripted model connected");
        self.lock().connected = true;
        Ok(())
    }

    async fn next_turn(&self, request: &ModelRequest) -> SwitchboardResult<ModelTurn> {
        let mut script = self.lock();
        script.asked.push(request.agent.clone());
        script.turns.pop_front().ok_or_else(|| SwitchboardError::Connection {
            reason: "model script exhausted".to_string(),
        })
    }

    async fn disconnect(&self) -> SwitchboardResult<()> {
        self.lock().connected = false;
        Ok(())
    }
}

/// Issues the same fixed credential every time.
#[derive(Debug, Clone)]
pub struct StaticCredentialIssuer {
    token: String,
}

impl StaticCredentialIssuer {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

impl Default for StaticCredentialIssuer {
    fn default() -> Self {
        Self::new("ek_reference")
    }
}

#[async_trait]
impl CredentialIssuer for StaticCredentialIssuer {
    async fn issue(&self) -> SwitchboardResult<SessionCredential> {
        Ok(SessionCredential {
            token: self.token.clone(),
            expires_at: None,
        })
    }
}
