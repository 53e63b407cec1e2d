//! Deployment configuration.
//!
//! `DeploymentConfig` is read from a TOML document. Every field has a
//! default, so an empty document (or no document at all) yields a working
//! configuration. Secrets never live in the document: `Credentials` reads
//! them from the environment once, at startup.

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use switchboard_contracts::error::{SwitchboardError, SwitchboardResult};

use crate::tool::RetryPolicy;

/// `[session]`: limits applied to every session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long an approval-required call may wait before it counts as
    /// denied. `0` (or leaving it unset in code) waits indefinitely.
    pub approval_timeout_secs: Option<u64>,
    /// Upper bound on model turns per `run_turn`.
    pub max_turns: usize,
    /// Retries for transient failures of idempotent tools.
    pub tool_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            approval_timeout_secs: Some(60),
            max_turns: 10,
            tool_retries: 2,
            retry_backoff_ms: 200,
        }
    }
}

impl SessionConfig {
    pub fn approval_timeout(&self) -> Option<Duration> {
        self.approval_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.tool_retries,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }
}

/// `[memory]`: how session summaries are filed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Tag attached to every submission's metadata.
    pub session_type: String,
    pub default_user_id: String,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            session_type: "voice_agent".to_string(),
            default_user_id: switchboard_contracts::agent::UserId::DEFAULT.to_string(),
        }
    }
}

/// `[model]`: the realtime model and the structured parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub realtime_model: String,
    pub parser_model: String,
    pub api_base: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            realtime_model: "gpt-4o-realtime-preview".to_string(),
            parser_model: "gpt-4o-mini".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
        }
    }
}

/// `[memory_store]`: the external memory service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryStoreConfig {
    pub api_base: String,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.mem0.ai".to_string(),
        }
    }
}

/// The whole deployment configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentConfig {
    pub session: SessionConfig,
    pub memory: MemoryConfig,
    pub model: ModelConfig,
    pub memory_store: MemoryStoreConfig,
}

impl DeploymentConfig {
    /// Parse `s` as TOML.
    ///
    /// Returns `SwitchboardError::Config` if the TOML is malformed or has a
    /// field of the wrong type.
    pub fn from_toml_str(s: &str) -> SwitchboardResult<Self> {
        toml::from_str(s).map_err(|e| SwitchboardError::Config {
            reason: format!("failed to parse deployment TOML: {}", e),
        })
    }

    pub fn from_file(path: &Path) -> SwitchboardResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| SwitchboardError::Config {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }
}

pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const MEM_API_KEY: &str = "MEM_API_KEY";

/// Deployment-wide secrets.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub openai_api_key: String,
    pub mem_api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("openai_api_key", &"<redacted>")
            .field("mem_api_key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Read both secrets from the process environment.
    ///
    /// A missing or empty variable is a fatal `SwitchboardError::Config`.
    pub fn from_env() -> SwitchboardResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read both secrets through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> SwitchboardResult<Self> {
        let require = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| SwitchboardError::Config {
                    reason: format!("environment variable {} is not set", key),
                })
        };
        Ok(Self {
            openai_api_key: require(OPENAI_API_KEY)?,
            mem_api_key: require(MEM_API_KEY)?,
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
