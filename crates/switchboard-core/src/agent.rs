//! Agents and the registry that holds the handoff graph.
//!
//! An agent is static configuration: instructions, a tool set, and the names
//! of the agents it may hand the conversation to. Agents never call each
//! other. The graph is stored as names and resolved against the registry at
//! dispatch time, so cycles (hub ↔ specialist) need no special handling.

use std::{
    collections::{BTreeMap, BTreeSet, HashSet},
    sync::Arc,
};

use tracing::debug;

use switchboard_contracts::{
    agent::AgentName,
    error::{SwitchboardError, SwitchboardResult},
    tool::ToolDescriptor,
};

use crate::tool::ToolSpec;

/// A handoff target as presented to the model: who, and when to pick them.
#[derive(Debug, Clone, PartialEq)]
pub struct HandoffTarget {
    pub name: AgentName,
    pub description: String,
}

/// The model-facing view of one agent.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentView {
    pub name: AgentName,
    pub instructions: String,
    pub tools: Vec<ToolDescriptor>,
    pub handoff_targets: Vec<HandoffTarget>,
}

/// Static configuration of one agent.
#[derive(Debug, Clone)]
pub struct AgentSpec {
    name: AgentName,
    instructions: String,
    handoff_description: String,
    tools: Vec<ToolSpec>,
    handoff_targets: BTreeSet<AgentName>,
    post_finalize_handoff: Option<AgentName>,
}

impl AgentSpec {
    pub fn new(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            name: AgentName::new(name),
            instructions: instructions.into(),
            handoff_description: String::new(),
            tools: Vec::new(),
            handoff_targets: BTreeSet::new(),
            post_finalize_handoff: None,
        }
    }

    /// One line telling other agents when to hand off to this one.
    pub fn with_handoff_description(mut self, description: impl Into<String>) -> Self {
        self.handoff_description = description.into();
        self
    }

    pub fn with_tool(mut self, tool: ToolSpec) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_tools(mut self, tools: impl IntoIterator<Item = ToolSpec>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn with_handoff_target(mut self, target: impl Into<String>) -> Self {
        self.handoff_targets.insert(AgentName::new(target));
        self
    }

    /// The agent an interview's finalize result should point back to.
    ///
    /// Must also be a permitted handoff target; the registry checks this.
    pub fn with_post_finalize_handoff(mut self, target: impl Into<String>) -> Self {
        self.post_finalize_handoff = Some(AgentName::new(target));
        self
    }

    pub fn name(&self) -> &AgentName {
        &self.name
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn handoff_description(&self) -> &str {
        &self.handoff_description
    }

    pub fn tools(&self) -> &[ToolSpec] {
        &self.tools
    }

    /// Look up one of this agent's tools by name.
    pub fn tool(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn handoff_targets(&self) -> &BTreeSet<AgentName> {
        &self.handoff_targets
    }

    pub fn may_hand_off_to(&self, target: &AgentName) -> bool {
        self.handoff_targets.contains(target)
    }

    pub fn post_finalize_handoff(&self) -> Option<&AgentName> {
        self.post_finalize_handoff.as_ref()
    }
}

/// Collects agent specs and validates the graph once, at `build()`.
#[derive(Debug, Default)]
pub struct AgentRegistryBuilder {
    specs: Vec<AgentSpec>,
}

impl AgentRegistryBuilder {
    pub fn register(mut self, spec: AgentSpec) -> Self {
        self.specs.push(spec);
        self
    }

    /// Validate and freeze the registry.
    ///
    /// # Errors
    ///
    /// `SwitchboardError::Config` for an empty registry, duplicate agent
    /// names, duplicate tool names inside one agent, handoff targets that do
    /// not resolve, or a post-finalize target the agent may not hand off to.
    pub fn build(self) -> SwitchboardResult<AgentRegistry> {
        if self.specs.is_empty() {
            return Err(config("registry has no agents"));
        }

        let mut agents = BTreeMap::new();
        for spec in self.specs {
            let mut tool_names = HashSet::new();
            for tool in spec.tools() {
                if !tool_names.insert(tool.name().to_string()) {
                    return Err(config(format!(
                        "agent '{}' declares tool '{}' more than once",
                        spec.name(),
                        tool.name()
                    )));
                }
            }
            let name = spec.name().clone();
            if agents.insert(name.clone(), Arc::new(spec)).is_some() {
                return Err(config(format!("agent '{}' is registered more than once", name)));
            }
        }

        for spec in agents.values() {
            for target in spec.handoff_targets() {
                if !agents.contains_key(target) {
                    return Err(config(format!(
                        "agent '{}' hands off to unknown agent '{}'",
                        spec.name(),
                        target
                    )));
                }
            }
            if let Some(target) = spec.post_finalize_handoff() {
                if !spec.may_hand_off_to(target) {
                    return Err(config(format!(
                        "agent '{}' names '{}' as post-finalize handoff but may not hand off to it",
                        spec.name(),
                        target
                    )));
                }
            }
        }

        debug!(agents = agents.len(), "agent registry built");
        Ok(AgentRegistry { agents })
    }
}

fn config(reason: impl Into<String>) -> SwitchboardError {
    SwitchboardError::Config { reason: reason.into() }
}

/// The validated, immutable set of agents in a deployment.
///
/// Shared read-only across sessions behind an `Arc`.
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    agents: BTreeMap<AgentName, Arc<AgentSpec>>,
}

impl AgentRegistry {
    pub fn builder() -> AgentRegistryBuilder {
        AgentRegistryBuilder::default()
    }

    pub fn get(&self, name: &AgentName) -> Option<Arc<AgentSpec>> {
        self.agents.get(name).cloned()
    }

    /// Like `get`, but an unknown name is an error.
    pub fn resolve(&self, name: &AgentName) -> SwitchboardResult<Arc<AgentSpec>> {
        self.get(name).ok_or_else(|| SwitchboardError::UnknownAgent {
            name: name.to_string(),
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &AgentName> {
        self.agents.keys()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Check that `from` may hand the conversation to `target`.
    ///
    /// Returns the target's spec on success. `from` stays active on error.
    pub fn check_handoff(&self, from: &AgentName, target: &AgentName) -> SwitchboardResult<Arc<AgentSpec>> {
        let source = self.resolve(from)?;
        if !source.may_hand_off_to(target) {
            return Err(SwitchboardError::HandoffNotPermitted {
                from: from.to_string(),
                target: target.to_string(),
            });
        }
        self.resolve(target)
    }

    /// The model-facing view of `name`, with handoff targets described by
    /// the targets' own handoff descriptions.
    pub fn view(&self, name: &AgentName) -> SwitchboardResult<AgentView> {
        let spec = self.resolve(name)?;
        let handoff_targets = spec
            .handoff_targets()
            .iter()
            .map(|target| HandoffTarget {
                name: target.clone(),
                description: self
                    .get(target)
                    .map(|t| t.handoff_description().to_string())
                    .unwrap_or_default(),
            })
            .collect();

        Ok(AgentView {
            name: spec.name().clone(),
            instructions: spec.instructions().to_string(),
            tools: spec.tools().iter().map(|t| t.descriptor().clone()).collect(),
            handoff_targets,
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
