//! Hand-written collaborators shared by the unit tests in this crate.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use serde_json::Value;

use switchboard_contracts::{
    agent::{AgentName, UserId},
    error::{SwitchboardError, SwitchboardResult},
    memory::{SessionSnapshot, SinkReport},
    policy::{ApprovalDecision, ApprovalRequest, PolicyContext, PolicyVerdict},
    record::{ParseOutcome, RecordSchema, StructuredRecord},
    session::{ModelTurn, SessionCredential},
    tool::{ParamKind, ParameterField, ParameterSchema, ToolDescriptor},
};

use crate::{
    agent::{AgentRegistry, AgentView},
    config::SessionConfig,
    session::{Collaborators, Session},
    tool::{ToolError, ToolSpec},
    traits::{
        ApprovalGate, ArgumentValidator, CredentialIssuer, ModelCollaborator, ModelRequest,
        ParsingCollaborator, PolicyEngine, RecordValidator, SessionSink,
    },
};

// ── Validators ───────────────────────────────────────────────────────────────

pub struct AcceptAll;

impl ArgumentValidator for AcceptAll {
    fn validate_arguments(&self, _tool: &ToolDescriptor, _arguments: &Value) -> SwitchboardResult<()> {
        Ok(())
    }
}

pub struct RejectAll;

impl ArgumentValidator for RejectAll {
    fn validate_arguments(&self, tool: &ToolDescriptor, _arguments: &Value) -> SwitchboardResult<()> {
        Err(SwitchboardError::ToolInput {
            tool: tool.name.clone(),
            reason: "rejected by test validator".to_string(),
        })
    }
}

pub struct PassRecords;

impl RecordValidator for PassRecords {
    fn validate_record(&self, _schema: &RecordSchema, _record: &StructuredRecord) -> SwitchboardResult<()> {
        Ok(())
    }
}

// ── Parser ───────────────────────────────────────────────────────────────────

/// A parser that returns a fixed outcome and records every input.
pub struct CountingParser {
    outcome: ParseOutcome,
    failure: Option<fn() -> SwitchboardError>,
    inputs: Mutex<Vec<String>>,
}

impl CountingParser {
    pub fn new(outcome: ParseOutcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            failure: None,
            inputs: Mutex::new(Vec::new()),
        })
    }

    /// A parser whose every call fails with the error `make` builds.
    pub fn failing(make: fn() -> SwitchboardError) -> Arc<Self> {
        Arc::new(Self {
            outcome: ParseOutcome::Refused {
                reason: "unused".to_string(),
            },
            failure: Some(make),
            inputs: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.inputs.lock().unwrap().len()
    }

    pub fn last_input(&self) -> Option<String> {
        self.inputs.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ParsingCollaborator for CountingParser {
    async fn parse(&self, raw: &str, _schema: &RecordSchema) -> SwitchboardResult<ParseOutcome> {
        self.inputs.lock().unwrap().push(raw.to_string());
        match self.failure {
            Some(make) => Err(make()),
            None => Ok(self.outcome.clone()),
        }
    }
}

pub fn parsed(schema_id: &str, values: Value) -> ParseOutcome {
    let values = match values {
        Value::Object(map) => map,
        _ => panic!("parsed() needs a JSON object"),
    };
    ParseOutcome::Parsed(StructuredRecord {
        schema_id: schema_id.to_string(),
        values,
    })
}

// ── Tools ────────────────────────────────────────────────────────────────────

/// A stateless tool that echoes its `q` argument.
pub fn echo_tool(name: &str) -> ToolSpec {
    let label = name.to_string();
    ToolSpec::from_fn(
        ToolDescriptor::new(
            name,
            "echo the query",
            ParameterSchema::empty().with_field(ParameterField::optional("q", ParamKind::String, "query")),
        ),
        move |args: Value| {
            let label = label.clone();
            async move {
                Ok::<_, ToolError>(format!("{}: {}", label, args["q"].as_str().unwrap_or_default()))
            }
        },
    )
}

// ── Model ────────────────────────────────────────────────────────────────────

/// A model that replays a fixed list of turns and counts lifecycle calls.
#[derive(Default)]
pub struct MockModel {
    turns: Mutex<VecDeque<ModelTurn>>,
    pub fail_connect: bool,
    pub connects: Arc<Mutex<u32>>,
    pub disconnects: Arc<Mutex<u32>>,
    /// Which agent each `next_turn` request was made for.
    pub asked: Arc<Mutex<Vec<AgentName>>>,
}

impl MockModel {
    pub fn scripted(turns: Vec<ModelTurn>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_connect: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl ModelCollaborator for MockModel {
    async fn connect(&self, _credential: &SessionCredential, _agent: &AgentView) -> SwitchboardResult<()> {
        if self.fail_connect {
            return Err(SwitchboardError::Connection {
                reason: "transport refused".to_string(),
            });
        }
        *self.connects.lock().unwrap() += 1;
        Ok(())
    }

    async fn next_turn(&self, request: &ModelRequest) -> SwitchboardResult<ModelTurn> {
        self.asked.lock().unwrap().push(request.agent.clone());
        self.turns
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| SwitchboardError::Connection {
                reason: "script exhausted".to_string(),
            })
    }

    async fn disconnect(&self) -> SwitchboardResult<()> {
        *self.disconnects.lock().unwrap() += 1;
        Ok(())
    }
}

pub struct MockIssuer;

#[async_trait]
impl CredentialIssuer for MockIssuer {
    async fn issue(&self) -> SwitchboardResult<SessionCredential> {
        Ok(SessionCredential {
            token: "ek_test".to_string(),
            expires_at: None,
        })
    }
}

// ── Policy and approvals ─────────────────────────────────────────────────────

/// A policy that always returns a pre-configured verdict.
pub struct MockPolicy {
    pub verdict: PolicyVerdict,
}

impl MockPolicy {
    pub fn allow() -> Self {
        Self {
            verdict: PolicyVerdict::Allow,
        }
    }
}

impl PolicyEngine for MockPolicy {
    fn evaluate(&self, _ctx: &PolicyContext) -> SwitchboardResult<PolicyVerdict> {
        Ok(self.verdict.clone())
    }
}

/// A gate that answers with a fixed decision after an optional delay.
pub struct MockGate {
    pub decision: ApprovalDecision,
    pub delay: Option<Duration>,
    pub requests: Arc<Mutex<Vec<ApprovalRequest>>>,
}

impl MockGate {
    pub fn answering(decision: ApprovalDecision) -> Self {
        Self {
            decision,
            delay: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn silent() -> Self {
        Self {
            decision: ApprovalDecision::Approved,
            delay: Some(Duration::from_secs(3600)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl ApprovalGate for MockGate {
    async fn request(&self, request: ApprovalRequest) -> ApprovalDecision {
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.decision.clone()
    }
}

// ── Sink ─────────────────────────────────────────────────────────────────────

/// A sink that keeps every snapshot it receives.
#[derive(Default)]
pub struct RecordingSink {
    pub snapshots: Arc<Mutex<Vec<SessionSnapshot>>>,
}

#[async_trait]
impl SessionSink for RecordingSink {
    async fn persist(&self, snapshot: &SessionSnapshot) -> SinkReport {
        self.snapshots.lock().unwrap().push(snapshot.clone());
        SinkReport::empty()
    }
}

// ── Session builder ──────────────────────────────────────────────────────────

/// Collaborators wired with permissive defaults; override fields as needed.
pub fn collaborators(model: MockModel) -> Collaborators {
    Collaborators {
        model: Box::new(model),
        credentials: Arc::new(MockIssuer),
        policy: Arc::new(MockPolicy::allow()),
        approvals: Arc::new(MockGate::answering(ApprovalDecision::Approved)),
        validator: Arc::new(AcceptAll),
        sink: Arc::new(RecordingSink::default()),
    }
}

pub fn fast_config() -> SessionConfig {
    SessionConfig {
        approval_timeout_secs: Some(1),
        max_turns: 8,
        tool_retries: 0,
        retry_backoff_ms: 1,
    }
}

pub fn session(registry: Arc<AgentRegistry>, entry: &str, collaborators: Collaborators) -> Session {
    Session::new(registry, entry, UserId::default(), collaborators, fast_config()).unwrap()
}
