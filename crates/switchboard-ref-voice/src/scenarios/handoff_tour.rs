//! Scenario 1: Handoff Tour
//!
//! One caller visits the weather and stock specialists and comes back to
//! the hub. Along the way the model tries one handoff the graph does not
//! allow (Weather -> Stock); it is refused and the weather agent stays
//! active until the model routes through the hub instead.
//!
//! Stock quotes need approval; here every request is approved up front.

use std::sync::Arc;

use serde_json::json;

use switchboard_contracts::{agent::AgentName, error::SwitchboardResult, session::ModelTurn};
use switchboard_core::config::DeploymentConfig;
use switchboard_memory::InMemoryMemoryStore;
use switchboard_policy::StaticApprovalGate;

use crate::{
    agents::{GET_STOCK_PRICE, GET_WEATHER, STOCK_AGENT, VOICE_AGENT, WEATHER_AGENT},
    collaborators::{turn, ScriptedModel, StaticCredentialIssuer},
    deployment::{SessionParts, VoiceDeployment},
    scenarios::{print_memory, print_turn, ScenarioOutcome},
};

/// (what the user says, what the model does in response)
fn script() -> Vec<(&'static str, Vec<ModelTurn>)> {
    vec![
        (
            "What's the weather like in New York?",
            vec![
                turn::hand_off(WEATHER_AGENT),
                turn::call("w1", GET_WEATHER, json!({ "location": "New York" })),
                turn::say("Fuhgeddaboudit, it's sunny in New York!"),
            ],
        ),
        (
            "Can you check ACME stock for me too?",
            vec![
                turn::hand_off(STOCK_AGENT),
                turn::hand_off(VOICE_AGENT),
                turn::hand_off(STOCK_AGENT),
                turn::call("s1", GET_STOCK_PRICE, json!({ "stock": "ACME" })),
                turn::say("ACME is trading at $100."),
            ],
        ),
        (
            "And how's the weather in Boston?",
            vec![
                turn::hand_off(WEATHER_AGENT),
                turn::call("w2", GET_WEATHER, json!({ "location": "Boston" })),
                turn::say("Sunny in Boston too, pal."),
            ],
        ),
        (
            "Thanks, that's all.",
            vec![turn::hand_off(VOICE_AGENT), turn::say("Happy to help. Goodbye!")],
        ),
    ]
}

/// Run Scenario 1: Handoff Tour.
pub async fn run_scenario(config: &DeploymentConfig) -> SwitchboardResult<ScenarioOutcome> {
    println!("=== Scenario 1: Handoff Tour ===");
    println!();

    let script = script();
    let model = ScriptedModel::new(script.iter().flat_map(|(_, turns)| turns.clone()));
    let store = InMemoryMemoryStore::new();
    let deployment = VoiceDeployment::new(config.clone())?;

    let mut session = deployment.session(SessionParts {
        model: Box::new(model.clone()),
        credentials: Arc::new(StaticCredentialIssuer::default()),
        approvals: Arc::new(StaticApprovalGate::approve_all()),
        store: Arc::new(store.clone()),
    })?;
    session.connect().await?;

    let mut outcome = ScenarioOutcome::new(AgentName::new(VOICE_AGENT));
    for (user, _) in &script {
        let report = session.run_turn(*user).await?;
        print_turn(user, &report);
        outcome.absorb(&report);
    }

    outcome.sink = session.close().await?;
    outcome.records = session.records().to_vec();
    outcome.stored = store.batches();

    println!();
    println!("  Model requests by agent: {}", model.asked().len());
    println!("  Refused handoffs:        {}", outcome.rejected_handoffs.len());
    print_memory(&outcome.sink, &outcome.stored);
    println!();

    Ok(outcome)
}
