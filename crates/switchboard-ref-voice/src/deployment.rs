//! Wiring: one place that turns a `DeploymentConfig` into sessions.
//!
//! The registry, policy engine and validator are built once and shared by
//! every session. The model, approval gate and memory store are supplied
//! per session so callers can choose scripted or remote collaborators.
//! `VoiceDeployment::remote` builds the HTTP-backed set from `Credentials`.

use std::sync::Arc;

use tracing::info;

use switchboard_contracts::{agent::UserId, error::SwitchboardResult};
use switchboard_core::{
    agent::AgentRegistry,
    config::{Credentials, DeploymentConfig},
    session::{Collaborators, Session},
    traits::{ApprovalGate, CredentialIssuer, MemoryStore, ModelCollaborator, ParsingCollaborator},
};
use switchboard_memory::MemorySink;
use switchboard_policy::TomlPolicyEngine;
use switchboard_remote::{Mem0Store, OpenAiCredentialIssuer, OpenAiRecordParser};
use switchboard_verify::{CoercingParser, SchemaValidator};

use crate::agents::{voice_registry, GET_WEATHER, VOICE_AGENT};

/// Tool-call policy shipped with the deployment.
pub const VOICE_POLICY: &str = include_str!("../policies/voice.toml");

/// Argument and record checks beyond what the JSON schemas express.
pub fn voice_validator() -> SchemaValidator {
    SchemaValidator::new().with_rule(
        GET_WEATHER,
        Box::new(|arguments| match arguments["location"].as_str() {
            Some(location) if location.trim().is_empty() => Some("location must not be blank".to_string()),
            _ => None,
        }),
    )
}

/// The per-session collaborators a caller chooses.
pub struct SessionParts {
    pub model: Box<dyn ModelCollaborator>,
    pub credentials: Arc<dyn CredentialIssuer>,
    pub approvals: Arc<dyn ApprovalGate>,
    pub store: Arc<dyn MemoryStore>,
}

/// The HTTP collaborators a live session uses. The record parser is not
/// here: it is wired into the interview agents when the deployment is built.
#[derive(Clone)]
pub struct RemoteServices {
    pub credentials: Arc<dyn CredentialIssuer>,
    pub store: Arc<dyn MemoryStore>,
}

pub struct VoiceDeployment {
    config: DeploymentConfig,
    registry: Arc<AgentRegistry>,
    policy: Arc<TomlPolicyEngine>,
    validator: Arc<SchemaValidator>,
}

impl VoiceDeployment {
    /// Build with the offline `CoercingParser` behind both interviews.
    pub fn new(config: DeploymentConfig) -> SwitchboardResult<Self> {
        Self::with_parser(config, Arc::new(CoercingParser::new()))
    }

    pub fn with_parser(config: DeploymentConfig, parser: Arc<dyn ParsingCollaborator>) -> SwitchboardResult<Self> {
        let validator = Arc::new(voice_validator());
        let registry = Arc::new(voice_registry(parser, validator.clone())?);
        let policy = Arc::new(TomlPolicyEngine::from_toml_str(VOICE_POLICY)?);
        info!(agents = registry.len(), "voice deployment ready");
        Ok(Self {
            config,
            registry,
            policy,
            validator,
        })
    }

    /// Build against the remote services named in `config`.
    ///
    /// Both interviews parse through `OpenAiRecordParser`; the returned
    /// services carry the credential issuer and the memory store client.
    /// Nothing is contacted until a session uses them.
    pub fn remote(config: DeploymentConfig, credentials: &Credentials) -> SwitchboardResult<(Self, RemoteServices)> {
        let parser = Arc::new(OpenAiRecordParser::new(&config.model, credentials)?);
        let services = RemoteServices {
            credentials: Arc::new(OpenAiCredentialIssuer::new(&config.model, credentials)?),
            store: Arc::new(Mem0Store::new(&config.memory_store, credentials)?),
        };
        info!(
            model_api = %config.model.api_base,
            memory_api = %config.memory_store.api_base,
            "remote collaborators configured"
        );
        Ok((Self::with_parser(config, parser)?, services))
    }

    pub fn config(&self) -> &DeploymentConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    /// A new idle session entering at the Voice Agent.
    pub fn session(&self, parts: SessionParts) -> SwitchboardResult<Session> {
        let sink = MemorySink::new(parts.store, &self.config.memory);
        Session::new(
            self.registry.clone(),
            VOICE_AGENT,
            UserId::new(self.config.memory.default_user_id.clone()),
            Collaborators {
                model: parts.model,
                credentials: parts.credentials,
                policy: self.policy.clone(),
                approvals: parts.approvals,
                validator: self.validator.clone(),
                sink: Arc::new(sink),
            },
            self.config.session.clone(),
        )
    }
}
