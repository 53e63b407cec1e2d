//! Policy rule types and configuration schema.
//!
//! A `PolicyConfig` is deserialized from TOML and holds an ordered list of
//! `PolicyRule`s. Rules are evaluated in declaration order and the first
//! matching rule wins. If no rule matches, `default_verdict` applies.

use serde::{Deserialize, Serialize};

/// The decision a rule produces when it matches a tool call.
///
/// Written in TOML as kebab-case strings:
/// ```toml
/// verdict = "allow"
/// verdict = "deny"
/// verdict = "require-approval"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleVerdict {
    Allow,
    Deny,
    RequireApproval,
}

fn wildcard() -> String {
    WILDCARD.to_string()
}

/// Matches any agent or tool name.
pub const WILDCARD: &str = "*";

/// A single policy rule loaded from TOML.
///
/// `agent` and `tool` both default to `"*"`, so a rule that names only a
/// tool applies to every agent that carries it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Stable identifier, used in log lines and default reasons.
    pub id: String,

    #[serde(default)]
    pub description: String,

    /// Agent name pattern.
    #[serde(default = "wildcard")]
    pub agent: String,

    /// Tool name pattern.
    #[serde(default = "wildcard")]
    pub tool: String,

    pub verdict: RuleVerdict,

    /// Returned to the model as the tool result when `verdict = "deny"`.
    pub deny_reason: Option<String>,

    /// Shown to the approver when `verdict = "require-approval"`.
    pub approval_reason: Option<String>,

    /// Who is expected to decide (e.g. `"account_holder"`).
    pub approver_role: Option<String>,
}

impl PolicyRule {
    /// Return true if this rule applies to `tool` called by `agent`.
    ///
    /// `"*"` matches anything; otherwise names compare exactly.
    pub fn matches(&self, agent: &str, tool: &str) -> bool {
        let agent_matches = self.agent == WILDCARD || self.agent == agent;
        let tool_matches = self.tool == WILDCARD || self.tool == tool;
        agent_matches && tool_matches
    }
}

/// The top-level structure deserialized from a TOML policy file.
///
/// ```toml
/// default_verdict = "allow"
///
/// [[rules]]
/// id = "stock-price-needs-consent"
/// tool = "get_stock_price"
/// verdict = "require-approval"
/// approval_reason = "market data lookups are billed to the caller"
/// approver_role = "user"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Applied when no rule matches.
    #[serde(default = "default_verdict")]
    pub default_verdict: RuleVerdict,

    /// Ordered list of rules. First match wins.
    #[serde(default)]
    pub rules: Vec<PolicyRule>,
}

fn default_verdict() -> RuleVerdict {
    RuleVerdict::Allow
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            default_verdict: default_verdict(),
            rules: Vec::new(),
        }
    }
}
