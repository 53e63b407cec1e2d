//! TOML-driven policy engine implementation.
//!
//! `TomlPolicyEngine` loads a `PolicyConfig` from a TOML string or file and
//! implements the `PolicyEngine` trait from switchboard-core.
//!
//! Evaluation algorithm:
//!
//! 1. Iterate rules in declaration order.
//! 2. For the first rule whose `agent` and `tool` patterns match, convert its
//!    `RuleVerdict` to a `PolicyVerdict` and return.
//! 3. If no rule matched, return `default_verdict`.
//!
//! Descriptors marked approval-required are escalated by the session itself,
//! so an `allow` here never skips a descriptor-level approval.

use std::{collections::HashSet, path::Path};

use tracing::debug;

use switchboard_contracts::{
    error::{SwitchboardError, SwitchboardResult},
    policy::{PolicyContext, PolicyVerdict},
};
use switchboard_core::{session::DEFAULT_APPROVER_ROLE, traits::PolicyEngine};

use crate::rule::{PolicyConfig, PolicyRule, RuleVerdict};

/// A `PolicyEngine` that reads rules from a TOML document.
///
/// ```rust,ignore
/// use switchboard_policy::TomlPolicyEngine;
///
/// let engine = TomlPolicyEngine::from_file(Path::new("policies/voice.toml"))?;
/// ```
#[derive(Debug, Default)]
pub struct TomlPolicyEngine {
    config: PolicyConfig,
}

impl TomlPolicyEngine {
    /// An engine with no rules that allows every call.
    pub fn permissive() -> Self {
        Self::default()
    }

    /// Parse `s` as TOML and build a `TomlPolicyEngine`.
    ///
    /// Returns `SwitchboardError::Config` if the TOML is malformed, does not
    /// match `PolicyConfig`, or repeats a rule id.
    pub fn from_toml_str(s: &str) -> SwitchboardResult<Self> {
        let config: PolicyConfig = toml::from_str(s).map_err(|e| SwitchboardError::Config {
            reason: format!("failed to parse policy TOML: {}", e),
        })?;
        Self::from_config(config)
    }

    pub fn from_file(path: &Path) -> SwitchboardResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| SwitchboardError::Config {
            reason: format!("failed to read policy file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_config(config: PolicyConfig) -> SwitchboardResult<Self> {
        let mut seen = HashSet::new();
        for rule in &config.rules {
            if !seen.insert(rule.id.as_str()) {
                return Err(SwitchboardError::Config {
                    reason: format!("duplicate policy rule id '{}'", rule.id),
                });
            }
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }
}

fn verdict_for(verdict: RuleVerdict, rule: Option<&PolicyRule>, ctx: &PolicyContext) -> PolicyVerdict {
    let source = match rule {
        Some(rule) => format!("rule '{}'", rule.id),
        None => "default policy".to_string(),
    };

    match verdict {
        RuleVerdict::Allow => PolicyVerdict::Allow,

        RuleVerdict::Deny => PolicyVerdict::Deny {
            reason: rule
                .and_then(|r| r.deny_reason.clone())
                .unwrap_or_else(|| format!("tool '{}' denied by {}", ctx.tool, source)),
        },

        RuleVerdict::RequireApproval => PolicyVerdict::RequireApproval {
            reason: rule
                .and_then(|r| r.approval_reason.clone())
                .unwrap_or_else(|| format!("tool '{}' needs approval under {}", ctx.tool, source)),
            approver_role: rule
                .and_then(|r| r.approver_role.clone())
                .unwrap_or_else(|| DEFAULT_APPROVER_ROLE.to_string()),
        },
    }
}

impl PolicyEngine for TomlPolicyEngine {
    fn evaluate(&self, ctx: &PolicyContext) -> SwitchboardResult<PolicyVerdict> {
        debug!(
            agent = %ctx.agent,
            tool = %ctx.tool,
            session_id = %ctx.session_id,
            "evaluating policy"
        );

        for rule in &self.config.rules {
            if !rule.matches(&ctx.agent, &ctx.tool) {
                continue;
            }
            debug!(rule_id = %rule.id, tool = %ctx.tool, "rule matched");
            return Ok(verdict_for(rule.verdict, Some(rule), ctx));
        }

        debug!(tool = %ctx.tool, verdict = ?self.config.default_verdict, "no rule matched");
        Ok(verdict_for(self.config.default_verdict, None, ctx))
    }
}
