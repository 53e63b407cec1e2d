//! Scenario 3: Daily Check-in
//!
//! A completion-flag interview. The check-in agent records one answer per
//! question and flags the last one; that call finalizes inline, so the
//! record exists before the model has said anything else. The agent then
//! returns the caller to the hub.
//!
//! Spoken numbers arrive as text ("5", "7") and leave as typed values
//! (`5`, `7.0`).

use std::sync::Arc;

use serde_json::json;

use switchboard_contracts::{agent::AgentName, error::SwitchboardResult, session::ModelTurn};
use switchboard_core::{
    config::{Credentials, DeploymentConfig},
    interview::RECORD_FIELD,
    traits::{CredentialIssuer, MemoryStore},
};
use switchboard_memory::InMemoryMemoryStore;
use switchboard_policy::StaticApprovalGate;

use crate::{
    agents::{DAILY_CHECKIN_AGENT, VOICE_AGENT},
    collaborators::{turn, ScriptedModel, StaticCredentialIssuer},
    deployment::{SessionParts, VoiceDeployment},
    mock_data::DAILY_ANSWERS,
    scenarios::{print_memory, print_turn, ScenarioOutcome},
};

fn script() -> Vec<(String, Vec<ModelTurn>)> {
    let mut turns = vec![(
        "I'd like to do my daily check-in.".to_string(),
        vec![
            turn::hand_off(DAILY_CHECKIN_AGENT),
            turn::say("Sure. How many cigarettes did you smoke today?"),
        ],
    )];

    let last = DAILY_ANSWERS.len() - 1;
    for (i, (key, answer)) in DAILY_ANSWERS.iter().enumerate() {
        let arguments = json!({ "key": key, "value": answer, "is_complete": i == last });
        let mut reply = vec![turn::call(&format!("daily-{}", i), RECORD_FIELD, arguments)];
        if i == last {
            reply.push(turn::hand_off(VOICE_AGENT));
            reply.push(turn::say("Thanks, your check-in is saved. Anything else?"));
        } else {
            reply.push(turn::say("Got it. Next question."));
        }
        turns.push((answer.to_string(), reply));
    }
    turns
}

/// Run Scenario 3: Daily Check-in.
pub async fn run_scenario(config: &DeploymentConfig) -> SwitchboardResult<ScenarioOutcome> {
    println!("=== Scenario 3: Daily Check-in ===");
    println!();

    let store = InMemoryMemoryStore::new();
    let deployment = VoiceDeployment::new(config.clone())?;
    let mut outcome = drive(
        &deployment,
        Arc::new(StaticCredentialIssuer::default()),
        Arc::new(store.clone()),
    )
    .await?;
    outcome.stored = store.batches();

    report(&outcome);
    Ok(outcome)
}

/// Run the same conversation against the remote services.
///
/// The model turns are still scripted; the session credential, the record
/// parse and the memory filing go over HTTP.
pub async fn run_live(config: &DeploymentConfig, credentials: &Credentials) -> SwitchboardResult<ScenarioOutcome> {
    println!("=== Scenario 3: Daily Check-in (live services) ===");
    println!();

    let (deployment, services) = VoiceDeployment::remote(config.clone(), credentials)?;
    let outcome = drive(&deployment, services.credentials, services.store).await?;

    report(&outcome);
    Ok(outcome)
}

async fn drive(
    deployment: &VoiceDeployment,
    credentials: Arc<dyn CredentialIssuer>,
    store: Arc<dyn MemoryStore>,
) -> SwitchboardResult<ScenarioOutcome> {
    let script = script();
    let model = ScriptedModel::new(script.iter().flat_map(|(_, turns)| turns.clone()));

    let mut session = deployment.session(SessionParts {
        model: Box::new(model),
        credentials,
        approvals: Arc::new(StaticApprovalGate::approve_all()),
        store,
    })?;
    session.connect().await?;

    let mut outcome = ScenarioOutcome::new(AgentName::new(VOICE_AGENT));
    for (user, _) in &script {
        let report = session.run_turn(user.as_str()).await?;
        print_turn(user, &report);
        outcome.absorb(&report);
    }

    outcome.sink = session.close().await?;
    outcome.records = session.records().to_vec();
    Ok(outcome)
}

fn report(outcome: &ScenarioOutcome) {
    println!();
    for record in &outcome.records {
        println!("  Record ({}): {}", record.schema_id, record.to_value());
    }
    print_memory(&outcome.sink, &outcome.stored);
    println!();
}
