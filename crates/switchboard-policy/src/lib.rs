//! # switchboard-policy
//!
//! Decides whether a tool call may run, and who gets asked when it needs a
//! human.
//!
//! ## Overview
//!
//! [`TomlPolicyEngine`] implements the
//! [`PolicyEngine`](switchboard_core::traits::PolicyEngine) trait. Rules are
//! declared in TOML, matched on agent and tool name, evaluated in order, and
//! the first match wins. Unmatched calls get the document's
//! `default_verdict`, which is `allow` unless stated otherwise.
//!
//! [`ChannelApprovalGate`] and [`StaticApprovalGate`] implement
//! [`ApprovalGate`](switchboard_core::traits::ApprovalGate).
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use switchboard_policy::TomlPolicyEngine;
//!
//! let engine = TomlPolicyEngine::from_file(Path::new("policies/voice.toml"))?;
//! ```

pub mod approvals;
pub mod engine;
pub mod rule;

pub use approvals::{ApprovalInbox, ChannelApprovalGate, PendingApproval, StaticApprovalGate};
pub use engine::TomlPolicyEngine;
pub use rule::{PolicyConfig, PolicyRule, RuleVerdict};

// ── Tests ─────────────────────────────────────────────────────────────────────
