//! Property-based tests for the orchestration loop.
//!
//! These check that the handoff graph is the only thing that can move the
//! active agent, and that a session is a deterministic function of the
//! events it is fed.

use std::sync::Arc;

use proptest::prelude::*;
use serde_json::json;

use switchboard_contracts::{
    agent::AgentName,
    conversation::Content,
    interview::InterviewState,
    session::{DispatchOutcome, SessionEvent},
    tool::{HandoffDirective, ToolCall},
};

use crate::{
    agent::{AgentRegistry, AgentSpec},
    session::Session,
    testing::{collaborators, echo_tool, session, MockModel},
};

const AGENTS: usize = 5;

fn agent_name(index: usize) -> String {
    format!("Agent{}", index)
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

/// Adjacency matrix: `edges[i][j]` means agent i may hand off to agent j.
fn arb_graph() -> impl Strategy<Value = Vec<Vec<bool>>> {
    proptest::collection::vec(proptest::collection::vec(any::<bool>(), AGENTS), AGENTS)
}

/// Handoff targets, including one index past the registry ("Ghost").
fn arb_directives() -> impl Strategy<Value = Vec<usize>> {
    proptest::collection::vec(0..=AGENTS, 1..40)
}

#[derive(Debug, Clone)]
enum Step {
    User(String),
    Assistant(String),
    Tool,
    Handoff(usize),
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        "[a-z ]{0,12}".prop_map(Step::User),
        "[a-z ]{0,12}".prop_map(Step::Assistant),
        Just(Step::Tool),
        (0..=AGENTS).prop_map(Step::Handoff),
    ]
}

fn build_registry(edges: &[Vec<bool>]) -> Arc<AgentRegistry> {
    let mut builder = AgentRegistry::builder();
    for (i, row) in edges.iter().enumerate() {
        let mut spec = AgentSpec::new(agent_name(i), "test agent").with_tool(echo_tool("echo"));
        for (j, permitted) in row.iter().enumerate() {
            if *permitted {
                spec = spec.with_handoff_target(agent_name(j));
            }
        }
        builder = builder.register(spec);
    }
    Arc::new(builder.build().unwrap())
}

fn event(step: &Step) -> SessionEvent {
    match step {
        Step::User(text) => SessionEvent::UserMessage {
            content: Content::text(text.clone()),
        },
        Step::Assistant(text) => SessionEvent::AssistantMessage {
            content: Content::text(text.clone()),
        },
        Step::Tool => SessionEvent::ToolCallRequested(ToolCall::new("c", "echo", json!({ "q": "x" }))),
        Step::Handoff(target) => SessionEvent::HandoffRequested(HandoffDirective::to(agent_name(*target))),
    }
}

async fn replay(registry: Arc<AgentRegistry>, steps: &[Step]) -> (AgentName, usize, Vec<(String, InterviewState)>) {
    let mut s: Session = session(registry, &agent_name(0), collaborators(MockModel::default()));
    s.connect().await.unwrap();
    for step in steps {
        s.dispatch(event(step)).await.unwrap();
    }
    (s.active_agent().clone(), s.history().len(), s.snapshot().resident_interviews)
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_only_permitted_handoffs_move_the_active_agent(
        edges in arb_graph(),
        directives in arb_directives(),
    ) {
        let registry = build_registry(&edges);
        let rt = runtime();

        rt.block_on(async {
            let mut s = session(registry, &agent_name(0), collaborators(MockModel::default()));
            s.connect().await.unwrap();
            let mut expected = 0usize;

            for target in directives {
                let outcome = s
                    .dispatch(SessionEvent::HandoffRequested(HandoffDirective::to(agent_name(target))))
                    .await
                    .unwrap();
                let permitted = target < AGENTS && edges[expected][target];

                if permitted {
                    prop_assert!(
                        matches!(outcome, DispatchOutcome::HandedOff { .. }),
                        "expected handoff {} -> {}", expected, target
                    );
                    expected = target;
                } else {
                    prop_assert!(
                        matches!(outcome, DispatchOutcome::HandoffRejected { .. }),
                        "expected rejection {} -> {}", expected, target
                    );
                }
                prop_assert_eq!(s.active_agent().as_str(), agent_name(expected));
            }

            // Handoffs never write history.
            prop_assert!(s.history().is_empty());
            Ok(())
        })?;
    }

    #[test]
    fn prop_replay_is_deterministic(
        edges in arb_graph(),
        steps in proptest::collection::vec(arb_step(), 0..30),
    ) {
        let registry = build_registry(&edges);
        let rt = runtime();

        let first = rt.block_on(replay(registry.clone(), &steps));
        let second = rt.block_on(replay(registry, &steps));

        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_history_grows_by_one_or_two_per_event(
        edges in arb_graph(),
        steps in proptest::collection::vec(arb_step(), 0..30),
    ) {
        let registry = build_registry(&edges);
        let rt = runtime();

        let (_, len, _) = rt.block_on(replay(registry, &steps));
        let expected: usize = steps
            .iter()
            .map(|step| match step {
                Step::User(_) | Step::Assistant(_) => 1,
                Step::Tool => 2,
                Step::Handoff(_) => 0,
            })
            .sum();

        prop_assert_eq!(len, expected);
    }
}
