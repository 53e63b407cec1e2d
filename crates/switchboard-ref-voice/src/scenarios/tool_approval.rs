//! Scenario 2: Tool Approval
//!
//! `get_stock_price` is approval-required, both by declaration and by the
//! deployment policy. Three sub-cases show the three ways an approval can
//! resolve:
//!
//! Sub-case A: an approver answering over a channel approves -> Ok
//! Sub-case B: nobody answers before the timeout            -> Denied
//! Sub-case C: the approver refuses                         -> Denied
//!
//! In B and C the handler never runs; the model gets the denial as the
//! tool's result and tells the user.

use std::{sync::Arc, time::Duration};

use serde_json::json;

use switchboard_contracts::{agent::AgentName, error::SwitchboardResult};
use switchboard_core::{config::DeploymentConfig, traits::ApprovalGate};
use switchboard_memory::InMemoryMemoryStore;
use switchboard_policy::{ChannelApprovalGate, StaticApprovalGate};

use crate::{
    agents::{GET_STOCK_PRICE, STOCK_AGENT, VOICE_AGENT},
    collaborators::{turn, ScriptedModel, StaticCredentialIssuer},
    deployment::{SessionParts, VoiceDeployment},
    scenarios::{print_memory, print_turn, ScenarioOutcome},
};

/// Approval wait used for sub-case B, whatever the deployment says.
const SHORT_APPROVAL_TIMEOUT_SECS: u64 = 1;

async fn ask_for_quote(
    config: DeploymentConfig,
    approvals: Arc<dyn ApprovalGate>,
    closing_line: &str,
) -> SwitchboardResult<ScenarioOutcome> {
    let model = ScriptedModel::new([
        turn::hand_off(STOCK_AGENT),
        turn::call("quote-1", GET_STOCK_PRICE, json!({ "stock": "ACME" })),
        turn::say(closing_line),
    ]);
    let store = InMemoryMemoryStore::new();
    let deployment = VoiceDeployment::new(config)?;

    let mut session = deployment.session(SessionParts {
        model: Box::new(model),
        credentials: Arc::new(StaticCredentialIssuer::default()),
        approvals,
        store: Arc::new(store.clone()),
    })?;
    session.connect().await?;

    let mut outcome = ScenarioOutcome::new(AgentName::new(VOICE_AGENT));
    let user = "What's ACME trading at?";
    let report = session.run_turn(user).await?;
    print_turn(user, &report);
    outcome.absorb(&report);

    outcome.sink = session.close().await?;
    outcome.stored = store.batches();
    Ok(outcome)
}

/// Run Scenario 2: Tool Approval, returning sub-cases A, B and C in order.
pub async fn run_scenario(config: &DeploymentConfig) -> SwitchboardResult<Vec<ScenarioOutcome>> {
    println!("=== Scenario 2: Tool Approval ===");
    println!();

    // ── Sub-case A: approved over a channel ──────────────────────────────────

    println!("  Sub-case A: approver answers over a channel and approves");
    let (gate, mut inbox) = ChannelApprovalGate::new(4);
    let approver = tokio::spawn(async move {
        while let Some(pending) = inbox.next().await {
            println!(
                "      [approval] {} asks {} to approve {}: {}",
                pending.request.agent, pending.request.approver_role, pending.request.call.tool_name, pending.request.reason
            );
            pending.approve();
        }
    });
    let approved = ask_for_quote(config.clone(), Arc::new(gate), "ACME is trading at $100.").await?;
    // The gate was dropped with its session, so the approver loop ends.
    let _ = approver.await;
    println!();

    // ── Sub-case B: nobody answers ───────────────────────────────────────────

    println!("  Sub-case B: nobody answers within {}s", SHORT_APPROVAL_TIMEOUT_SECS);
    let mut short = config.clone();
    short.session.approval_timeout_secs = Some(SHORT_APPROVAL_TIMEOUT_SECS);
    let (gate, _unanswered) = ChannelApprovalGate::new(4);
    let started = tokio::time::Instant::now();
    let timed_out = ask_for_quote(short, Arc::new(gate), "Sorry, I couldn't get approval for that quote.").await?;
    println!("      waited {:?}", round_to_tenths(started.elapsed()));
    println!();

    // ── Sub-case C: refused ──────────────────────────────────────────────────

    println!("  Sub-case C: approver refuses");
    let denied = ask_for_quote(
        config.clone(),
        Arc::new(StaticApprovalGate::deny_all("market data is off limits today")),
        "Sorry, the quote was declined.",
    )
    .await?;
    print_memory(&denied.sink, &denied.stored);
    println!();

    Ok(vec![approved, timed_out, denied])
}

fn round_to_tenths(d: Duration) -> Duration {
    Duration::from_millis((d.as_millis() as u64 / 100) * 100)
}
