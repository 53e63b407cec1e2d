//! Voice deployment demo scenarios.
//!
//! Each scenario builds real sessions from a `VoiceDeployment`, drives them
//! with a `ScriptedModel`, closes them into an `InMemoryMemoryStore`, and
//! prints a short report. Every scenario also returns what happened so tests
//! can check it.

pub mod contact_intake;
pub mod daily_checkin;
pub mod handoff_tour;
pub mod tool_approval;

use switchboard_contracts::{
    agent::AgentName,
    memory::{BranchOutcome, MemoryBatch, SinkReport},
    record::StructuredRecord,
    session::DispatchOutcome,
    tool::ToolOutcome,
};
use switchboard_core::session::TurnReport;

/// What one scenario session did.
#[derive(Debug, Clone)]
pub struct ScenarioOutcome {
    pub final_agent: AgentName,
    /// Every tool result, in call order.
    pub tool_results: Vec<ToolOutcome>,
    /// Handoffs the graph refused, as (from, target).
    pub rejected_handoffs: Vec<(AgentName, AgentName)>,
    pub records: Vec<StructuredRecord>,
    pub sink: SinkReport,
    /// What the memory store holds after close.
    pub stored: Vec<MemoryBatch>,
}

impl ScenarioOutcome {
    pub(crate) fn new(final_agent: AgentName) -> Self {
        Self {
            final_agent,
            tool_results: Vec::new(),
            rejected_handoffs: Vec::new(),
            records: Vec::new(),
            sink: SinkReport::empty(),
            stored: Vec::new(),
        }
    }

    pub(crate) fn absorb(&mut self, turn: &TurnReport) {
        for outcome in &turn.outcomes {
            match outcome {
                DispatchOutcome::ToolCompleted(result) => self.tool_results.push(result.clone()),
                DispatchOutcome::HandoffRejected { from, target, .. } => {
                    self.rejected_handoffs.push((from.clone(), target.clone()))
                }
                _ => {}
            }
        }
        self.final_agent = turn.agent.clone();
    }
}

// ── Report printing ───────────────────────────────────────────────────────────

pub(crate) fn print_turn(user: &str, turn: &TurnReport) {
    println!("    user      > {}", user);
    for outcome in &turn.outcomes {
        match outcome {
            DispatchOutcome::HandedOff { from, to } => println!("      [handoff]  {} -> {}", from, to),
            DispatchOutcome::HandoffRejected { from, target, .. } => {
                println!("      [rejected] {} -> {} (not a permitted target)", from, target)
            }
            DispatchOutcome::ToolCompleted(result) => println!(
                "      [tool]     {} -> {:?}: {}",
                result.tool_name,
                result.status,
                result.result_text.lines().next().unwrap_or_default()
            ),
            DispatchOutcome::Appended { .. } => {}
        }
    }
    println!("    {:<10}> {}", short_name(&turn.agent), turn.reply);
}

fn short_name(agent: &AgentName) -> &str {
    agent.as_str().trim_end_matches(" Agent")
}

fn describe(branch: &BranchOutcome) -> String {
    match branch {
        BranchOutcome::Skipped => "skipped".to_string(),
        BranchOutcome::Stored { entry_id } => format!("stored ({}…)", &entry_id[..entry_id.len().min(12)]),
        BranchOutcome::Failed { error, .. } => format!("FAILED: {}", error),
    }
}

pub(crate) fn print_memory(sink: &SinkReport, stored: &[MemoryBatch]) {
    println!("  Memory:");
    println!("    transcript: {}", describe(&sink.transcript));
    for branch in &sink.records {
        println!("    record:     {}", describe(branch));
    }
    for batch in stored {
        println!(
            "    - {:<17} {} message(s) for {}",
            batch.metadata.label.as_str(),
            batch.messages.len(),
            batch.user_id
        );
    }
}
