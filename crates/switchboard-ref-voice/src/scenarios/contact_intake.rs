//! Scenario 4: Contact Intake
//!
//! A strict, index-driven interview run through a `SessionHandle`, so the
//! session lives in its own task and the caller only talks to it through
//! the handle.
//!
//! The agent asks for the current field, records answers in order, and
//! finalizes. One answer is filed under a key the plan does not declare;
//! the strict plan rejects it as an input error and nothing is stored for
//! it. The phone number comes back as bare digits.

use std::sync::Arc;

use serde_json::json;

use switchboard_contracts::{agent::AgentName, error::SwitchboardResult, session::ModelTurn};
use switchboard_core::{
    config::DeploymentConfig,
    handle::SessionHandle,
    interview::{FINALIZE_INTERVIEW, GET_CURRENT_FIELD, RECORD_FIELD},
};
use switchboard_memory::InMemoryMemoryStore;
use switchboard_policy::StaticApprovalGate;

use crate::{
    agents::{CONTACT_INTAKE_AGENT, VOICE_AGENT},
    collaborators::{turn, ScriptedModel, StaticCredentialIssuer},
    deployment::{SessionParts, VoiceDeployment},
    mock_data::CONTACT_ANSWERS,
    scenarios::{print_memory, print_turn, ScenarioOutcome},
};

fn script() -> Vec<(String, Vec<ModelTurn>)> {
    let mut turns = vec![
        (
            "I need to update my contact details.".to_string(),
            vec![
                turn::hand_off(CONTACT_INTAKE_AGENT),
                turn::call("contact-cursor", GET_CURRENT_FIELD, json!({})),
                turn::say("Sure. What is today's date?"),
            ],
        ),
        (
            "Friends call me Ada, by the way.".to_string(),
            vec![
                turn::call(
                    "contact-nickname",
                    RECORD_FIELD,
                    json!({ "key": "nickname", "value": "Ada" }),
                ),
                turn::say("Noted, but I only need the date right now."),
            ],
        ),
    ];

    for (i, (key, answer)) in CONTACT_ANSWERS.iter().enumerate() {
        let mut reply = vec![turn::call(
            &format!("contact-{}", i),
            RECORD_FIELD,
            json!({ "key": key, "value": answer }),
        )];
        if i + 1 == CONTACT_ANSWERS.len() {
            reply.push(turn::call("contact-finalize", FINALIZE_INTERVIEW, json!({})));
            reply.push(turn::hand_off(VOICE_AGENT));
            reply.push(turn::say("All set, your details are saved."));
        } else {
            reply.push(turn::say("Thanks. Next one."));
        }
        turns.push((answer.to_string(), reply));
    }
    turns
}

/// Run Scenario 4: Contact Intake.
pub async fn run_scenario(config: &DeploymentConfig) -> SwitchboardResult<ScenarioOutcome> {
    println!("=== Scenario 4: Contact Intake ===");
    println!();

    let script = script();
    let model = ScriptedModel::new(script.iter().flat_map(|(_, turns)| turns.clone()));
    let store = InMemoryMemoryStore::new();
    let deployment = VoiceDeployment::new(config.clone())?;

    let session = deployment.session(SessionParts {
        model: Box::new(model),
        credentials: Arc::new(StaticCredentialIssuer::default()),
        approvals: Arc::new(StaticApprovalGate::approve_all()),
        store: Arc::new(store.clone()),
    })?;
    let handle = SessionHandle::spawn(session);
    handle.connect().await?;

    let mut outcome = ScenarioOutcome::new(AgentName::new(VOICE_AGENT));
    for (user, _) in &script {
        let report = handle.run_turn(user.as_str()).await?;
        print_turn(user, &report);
        outcome.absorb(&report);
    }

    let status = handle.status().await?;
    println!();
    println!("  Session {} is {:?} at {}", handle.session_id(), status.phase, status.active_agent);

    outcome.sink = handle.close().await?;
    let session = handle.join().await?;
    outcome.records = session.records().to_vec();
    outcome.stored = store.batches();

    for record in &outcome.records {
        println!("  Record ({}): {}", record.schema_id, record.to_value());
    }
    print_memory(&outcome.sink, &outcome.stored);
    println!();

    Ok(outcome)
}
