//! The session: one live conversation and its orchestration loop.
//!
//! A session owns the shared history, the active agent, and every piece of
//! tool-visible state. It consumes `SessionEvent`s through a single
//! `dispatch` function, one at a time:
//!
//!   Event → [Message: append]
//!         → [ToolCall: resolve → Policy → Approval → Validate → Invoke → append]
//!         → [Handoff: check graph → swap active agent]
//!
//! The lifecycle is `Idle → Connecting → Active → Closing → Closed`. No event
//! is accepted outside `Active`. Errors raised inside a tool never escape
//! `dispatch`; they come back as a `ToolOutcome` with a non-`Ok` status.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use switchboard_contracts::{
    agent::{AgentName, SessionId, UserId},
    conversation::{Content, ConversationItem, ItemBody, ItemId, Role},
    error::{SwitchboardError, SwitchboardResult},
    interview::InterviewState,
    memory::{SessionSnapshot, SinkReport},
    policy::{ApprovalDecision, ApprovalRequest, PolicyContext, PolicyVerdict},
    record::StructuredRecord,
    session::{DispatchOutcome, ModelTurn, SessionEvent, SessionPhase},
    tool::{HandoffDirective, ToolCall, ToolDescriptor, ToolOutcome, ToolStatus},
};

use crate::{
    agent::{AgentRegistry, AgentSpec},
    config::SessionConfig,
    tool::{ToolContext, ToolState},
    traits::{
        ApprovalGate, ArgumentValidator, CredentialIssuer, ModelCollaborator, ModelRequest,
        PolicyEngine, SessionSink,
    },
};

/// Role reported to approvers when a tool is approval-required by
/// declaration rather than by a policy rule.
pub const DEFAULT_APPROVER_ROLE: &str = "user";

/// The external collaborators one session talks to.
///
/// The model is per-session (it holds a connection); everything else may be
/// shared across sessions.
pub struct Collaborators {
    pub model: Box<dyn ModelCollaborator>,
    pub credentials: Arc<dyn CredentialIssuer>,
    pub policy: Arc<dyn PolicyEngine>,
    pub approvals: Arc<dyn ApprovalGate>,
    pub validator: Arc<dyn ArgumentValidator>,
    pub sink: Arc<dyn SessionSink>,
}

/// What one `run_turn` produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReport {
    /// The assistant content that ended the turn, flattened.
    pub reply: String,
    /// The agent active when the turn ended.
    pub agent: AgentName,
    /// Every dispatch performed, in order, starting with the user message.
    pub outcomes: Vec<DispatchOutcome>,
}

/// One live conversation.
pub struct Session {
    id: SessionId,
    user_id: UserId,
    registry: Arc<AgentRegistry>,
    active: Arc<AgentSpec>,
    phase: SessionPhase,
    history: Vec<ConversationItem>,
    next_item: u64,
    tool_state: ToolState,
    /// The approval being waited on. Held in a watch channel so observers
    /// outside the session see it while the wait is in progress.
    pending_approval: watch::Sender<Option<ApprovalRequest>>,
    /// Set once the transport is gone; the session can then only be closed.
    transport_lost: Option<String>,
    collaborators: Collaborators,
    config: SessionConfig,
    cancel: CancellationToken,
}

impl Session {
    /// Create an idle session whose first active agent is `entry`.
    ///
    /// Returns `SwitchboardError::Config` if `entry` is not registered.
    pub fn new(
        registry: Arc<AgentRegistry>,
        entry: impl Into<String>,
        user_id: UserId,
        collaborators: Collaborators,
        config: SessionConfig,
    ) -> SwitchboardResult<Self> {
        let entry = AgentName::new(entry);
        let active = registry.get(&entry).ok_or_else(|| SwitchboardError::Config {
            reason: format!("entry agent '{}' is not registered", entry),
        })?;

        Ok(Self {
            id: SessionId::new(),
            user_id,
            registry,
            active,
            phase: SessionPhase::Idle,
            history: Vec::new(),
            next_item: 0,
            tool_state: ToolState::default(),
            pending_approval: watch::channel(None).0,
            transport_lost: None,
            collaborators,
            config,
            cancel: CancellationToken::new(),
        })
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn active_agent(&self) -> &AgentName {
        self.active.name()
    }

    pub fn history(&self) -> &[ConversationItem] {
        &self.history
    }

    pub fn interview(&self, interview_id: &str) -> Option<&InterviewState> {
        self.tool_state.interviews.get(interview_id)
    }

    pub fn records(&self) -> &[StructuredRecord] {
        &self.tool_state.records
    }

    /// The most recent finalized record; public session state.
    pub fn latest_record(&self) -> Option<&StructuredRecord> {
        self.tool_state.latest_record()
    }

    /// The approval the session is currently suspended on, if any.
    pub fn pending_approval(&self) -> Option<ApprovalRequest> {
        self.pending_approval.borrow().clone()
    }

    /// Follow the pending approval without access to the session.
    pub fn watch_pending_approval(&self) -> watch::Receiver<Option<ApprovalRequest>> {
        self.pending_approval.subscribe()
    }

    /// Why the transport was lost, if it was. A session in this state
    /// refuses every event until it is closed.
    pub fn transport_lost(&self) -> Option<&str> {
        self.transport_lost.as_deref()
    }

    /// Tripping this token cancels the in-flight tool call or approval wait.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The view of the session handed to the sink at close.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            user_id: self.user_id.clone(),
            history: self.history.clone(),
            resident_interviews: self.tool_state.resident_interviews(),
            records: self.tool_state.records.clone(),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────────────

    /// Obtain a credential and open the model collaborator.
    ///
    /// `Idle → Connecting → Active`. On failure the session returns to
    /// `Idle` and the error is a `SwitchboardError::Connection`.
    pub async fn connect(&mut self) -> SwitchboardResult<()> {
        if self.phase != SessionPhase::Idle {
            return Err(SwitchboardError::SessionState {
                reason: format!("cannot connect from phase {:?}", self.phase),
            });
        }

        self.phase = SessionPhase::Connecting;
        info!(session_id = %self.id, agent = %self.active.name(), "session connecting");

        match self.open().await {
            Ok(()) => {
                self.phase = SessionPhase::Active;
                info!(session_id = %self.id, agent = %self.active.name(), "session active");
                Ok(())
            }
            Err(err) => {
                self.phase = SessionPhase::Idle;
                warn!(session_id = %self.id, error = %err, "session failed to connect");
                Err(match err {
                    SwitchboardError::Connection { .. } => err,
                    other => SwitchboardError::Connection {
                        reason: other.to_string(),
                    },
                })
            }
        }
    }

    async fn open(&self) -> SwitchboardResult<()> {
        let credential = self.collaborators.credentials.issue().await?;
        let view = self.registry.view(self.active.name())?;
        self.collaborators.model.connect(&credential, &view).await
    }

    /// Disconnect, persist, and finish.
    ///
    /// `Active → Closing → Closed`. The sink always runs; its failures are
    /// reported in the returned `SinkReport`, never as an error. A session
    /// can be closed once.
    pub async fn close(&mut self) -> SwitchboardResult<SinkReport> {
        let was_active = match self.phase {
            SessionPhase::Closing | SessionPhase::Closed => return Err(SwitchboardError::SessionClosed),
            SessionPhase::Connecting => {
                return Err(SwitchboardError::SessionState {
                    reason: "cannot close while connecting".to_string(),
                })
            }
            SessionPhase::Active => true,
            SessionPhase::Idle => false,
        };

        self.phase = SessionPhase::Closing;
        info!(session_id = %self.id, items = self.history.len(), "session closing");

        if was_active {
            if let Err(err) = self.collaborators.model.disconnect().await {
                warn!(session_id = %self.id, error = %err, "model disconnect failed");
            }
        }

        let snapshot = self.snapshot();
        let report = self.collaborators.sink.persist(&snapshot).await;
        if report.has_failures() {
            warn!(session_id = %self.id, "memory sink reported failures");
        }

        self.phase = SessionPhase::Closed;
        info!(session_id = %self.id, "session closed");
        Ok(report)
    }

    fn ensure_active(&self) -> SwitchboardResult<()> {
        match self.phase {
            SessionPhase::Active => match &self.transport_lost {
                Some(reason) => Err(SwitchboardError::Connection {
                    reason: format!("transport lost: {}", reason),
                }),
                None => Ok(()),
            },
            SessionPhase::Closing | SessionPhase::Closed => Err(SwitchboardError::SessionClosed),
            phase => Err(SwitchboardError::SessionState {
                reason: format!("session is not active (phase {:?})", phase),
            }),
        }
    }

    // ── Dispatch ─────────────────────────────────────────────────────────────

    /// Process one inbound event.
    ///
    /// # Errors
    ///
    /// `SessionClosed` / `SessionState` outside `Active`, and `Connection`
    /// for `TransportDropped` and for every event after it. Tool failures and rejected handoffs are not
    /// errors; they are reported in the returned `DispatchOutcome`.
    pub async fn dispatch(&mut self, event: SessionEvent) -> SwitchboardResult<DispatchOutcome> {
        self.ensure_active()?;

        match event {
            SessionEvent::UserMessage { content } => Ok(DispatchOutcome::Appended {
                item_id: self.append(ItemBody::Message {
                    role: Role::User,
                    content,
                }),
            }),

            SessionEvent::AssistantMessage { content } => Ok(DispatchOutcome::Appended {
                item_id: self.append(ItemBody::Message {
                    role: Role::Assistant,
                    content,
                }),
            }),

            SessionEvent::ToolCallRequested(call) => {
                Ok(DispatchOutcome::ToolCompleted(self.run_tool_call(call).await))
            }

            SessionEvent::HandoffRequested(directive) => Ok(self.hand_off(directive)),

            SessionEvent::TransportDropped { reason } => {
                Err(self.lose_transport(reason))
            }
        }
    }

    fn append(&mut self, body: ItemBody) -> ItemId {
        let item_id = ItemId(self.next_item);
        self.next_item += 1;
        self.history.push(ConversationItem {
            item_id,
            created_at: Utc::now(),
            body,
        });
        item_id
    }

    async fn run_tool_call(&mut self, call: ToolCall) -> ToolOutcome {
        let agent = self.active.clone();
        debug!(
            session_id = %self.id,
            agent = %agent.name(),
            tool = %call.tool_name,
            call_id = %call.call_id,
            "tool call requested"
        );
        self.append(ItemBody::ToolCall(call.clone()));

        let outcome = match agent.tool(&call.tool_name) {
            None => {
                let err = SwitchboardError::UnknownTool {
                    agent: agent.name().to_string(),
                    tool: call.tool_name.clone(),
                };
                warn!(session_id = %self.id, error = %err, "tool call rejected");
                ToolOutcome::new(&call, ToolStatus::InputError, err.to_string())
            }
            Some(tool) => match self.authorize(&agent, tool.descriptor(), &call).await {
                Some(blocked) => blocked,
                None => {
                    let retry = self.config.retry_policy();
                    let mut ctx = ToolContext::new(
                        self.id,
                        agent.name(),
                        tool.descriptor(),
                        &mut self.tool_state,
                        self.cancel.clone(),
                    )
                    .with_post_finalize_handoff(agent.post_finalize_handoff());
                    tool.invoke(&call, self.collaborators.validator.as_ref(), &mut ctx, retry)
                        .await
                }
            },
        };

        debug!(
            session_id = %self.id,
            tool = %outcome.tool_name,
            status = ?outcome.status,
            "tool call completed"
        );
        self.append(ItemBody::ToolOutput(outcome.clone()));
        outcome
    }

    /// Policy and approval gates. `None` means the call may proceed;
    /// `Some` is the outcome that replaces it.
    async fn authorize(
        &mut self,
        agent: &AgentSpec,
        descriptor: &ToolDescriptor,
        call: &ToolCall,
    ) -> Option<ToolOutcome> {
        let ctx = PolicyContext {
            agent: agent.name().to_string(),
            session_id: self.id.to_string(),
            tool: descriptor.name.clone(),
            arguments: call.arguments.clone(),
            tool_requires_approval: descriptor.requires_approval,
        };

        let verdict = match self.collaborators.policy.evaluate(&ctx) {
            Ok(verdict) => verdict,
            Err(err) => {
                warn!(session_id = %self.id, tool = %descriptor.name, error = %err, "policy evaluation failed");
                return Some(ToolOutcome::new(
                    call,
                    ToolStatus::Denied,
                    format!("tool call denied: policy evaluation failed: {}", err),
                ));
            }
        };

        // A descriptor marked approval-required cannot be waved through by
        // a permissive rule.
        let verdict = match verdict {
            PolicyVerdict::Allow if descriptor.requires_approval => PolicyVerdict::RequireApproval {
                reason: format!("tool '{}' requires approval", descriptor.name),
                approver_role: DEFAULT_APPROVER_ROLE.to_string(),
            },
            other => other,
        };

        match verdict {
            PolicyVerdict::Allow => None,

            PolicyVerdict::Deny { reason } => {
                warn!(session_id = %self.id, tool = %descriptor.name, reason = %reason, "policy denied tool call");
                Some(ToolOutcome::new(
                    call,
                    ToolStatus::Denied,
                    format!("tool call denied: {}", reason),
                ))
            }

            PolicyVerdict::RequireApproval {
                reason,
                approver_role,
            } => {
                let request = ApprovalRequest {
                    session_id: self.id,
                    agent: agent.name().clone(),
                    call: call.clone(),
                    reason,
                    approver_role,
                };
                info!(
                    session_id = %self.id,
                    tool = %descriptor.name,
                    approver_role = %request.approver_role,
                    "tool call suspended awaiting approval"
                );
                self.pending_approval.send_replace(Some(request.clone()));
                let decision = self.await_approval(request).await;
                self.pending_approval.send_replace(None);

                match decision {
                    Some(ApprovalDecision::Approved) => {
                        info!(session_id = %self.id, tool = %descriptor.name, "tool call approved");
                        None
                    }
                    Some(ApprovalDecision::Denied { reason }) => {
                        warn!(session_id = %self.id, tool = %descriptor.name, reason = %reason, "approver denied tool call");
                        Some(ToolOutcome::new(
                            call,
                            ToolStatus::Denied,
                            format!("tool call denied by approver: {}", reason),
                        ))
                    }
                    Some(ApprovalDecision::TimedOut) => {
                        warn!(session_id = %self.id, tool = %descriptor.name, "approval timed out");
                        Some(ToolOutcome::new(
                            call,
                            ToolStatus::Denied,
                            "tool call denied: approval timed out",
                        ))
                    }
                    None => Some(ToolOutcome::new(
                        call,
                        ToolStatus::Cancelled,
                        "tool call cancelled while awaiting approval",
                    )),
                }
            }
        }
    }

    /// Wait for the gate, bounded by the configured timeout. `None` if the
    /// session was cancelled first.
    async fn await_approval(&self, request: ApprovalRequest) -> Option<ApprovalDecision> {
        let gate = self.collaborators.approvals.clone();
        let timeout = self.config.approval_timeout();
        let wait = async move {
            match timeout {
                Some(limit) => tokio::time::timeout(limit, gate.request(request))
                    .await
                    .unwrap_or(ApprovalDecision::TimedOut),
                None => gate.request(request).await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            decision = wait => Some(decision),
        }
    }

    /// Mark the transport gone. Only `close` is accepted afterwards.
    fn lose_transport(&mut self, reason: String) -> SwitchboardError {
        warn!(session_id = %self.id, reason = %reason, "transport lost");
        self.transport_lost = Some(reason.clone());
        SwitchboardError::Connection { reason }
    }

    fn hand_off(&mut self, directive: HandoffDirective) -> DispatchOutcome {
        let from = self.active.name().clone();
        match self.registry.check_handoff(&from, &directive.target) {
            Ok(target) => {
                info!(
                    session_id = %self.id,
                    from = %from,
                    to = %directive.target,
                    reason = directive.reason.as_deref().unwrap_or(""),
                    "handoff"
                );
                self.active = target;
                DispatchOutcome::HandedOff {
                    from,
                    to: directive.target,
                }
            }
            Err(err) => {
                warn!(session_id = %self.id, error = %err, "handoff rejected");
                DispatchOutcome::HandoffRejected {
                    from,
                    target: directive.target,
                    reason: err.to_string(),
                }
            }
        }
    }

    // ── Turn loop ────────────────────────────────────────────────────────────

    /// Drive the model until it answers the user.
    ///
    /// Appends `user_text`, then repeatedly asks the model for a turn and
    /// dispatches it. Content ends the turn; tool calls and handoffs loop.
    ///
    /// Returns `SwitchboardError::MaxTurnsExceeded` if the model has not
    /// produced content after `max_turns` requests.
    pub async fn run_turn(&mut self, user_text: impl Into<String>) -> SwitchboardResult<TurnReport> {
        let mut outcomes = vec![
            self.dispatch(SessionEvent::UserMessage {
                content: Content::text(user_text),
            })
            .await?,
        ];

        for turn_index in 0..self.config.max_turns {
            let view = self.registry.view(self.active.name())?;
            let request = ModelRequest::new(view, self.history.clone());
            let turn = match self.collaborators.model.next_turn(&request).await {
                Ok(turn) => turn,
                Err(SwitchboardError::Connection { reason }) => return Err(self.lose_transport(reason)),
                Err(err) => return Err(err),
            };
            debug!(session_id = %self.id, agent = %self.active.name(), turn_index, "model turn received");

            match turn {
                ModelTurn::Content(content) => {
                    let reply = content.flatten();
                    outcomes.push(self.dispatch(SessionEvent::AssistantMessage { content }).await?);
                    return Ok(TurnReport {
                        reply,
                        agent: self.active.name().clone(),
                        outcomes,
                    });
                }
                other => outcomes.push(self.dispatch(other.into()).await?),
            }
        }

        Err(SwitchboardError::MaxTurnsExceeded {
            max_turns: self.config.max_turns,
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use switchboard_contracts::{
        agent::UserId,
        conversation::{Content, ItemBody, Role},
        error::SwitchboardError,
        policy::{ApprovalDecision, PolicyVerdict},
        session::{DispatchOutcome, ModelTurn, SessionEvent, SessionPhase},
        tool::{HandoffDirective, ParameterSchema, ToolCall, ToolDescriptor, ToolStatus},
    };

    use super::*;
    use crate::{
        agent::{AgentRegistry, AgentSpec},
        testing::{collaborators, echo_tool, fast_config, session, MockGate, MockModel, MockPolicy, RecordingSink},
        tool::{ToolError, ToolSpec},
    };

    fn registry() -> Arc<AgentRegistry> {
        let quote = ToolSpec::from_fn(
            ToolDescriptor::new("get_stock_price", "quote", ParameterSchema::empty()).requiring_approval(),
            |_| async { Ok::<_, ToolError>("The price is $100".to_string()) },
        );
        Arc::new(
            AgentRegistry::builder()
                .register(
                    AgentSpec::new("Hub", "route")
                        .with_handoff_target("Weather")
                        .with_handoff_target("Stock"),
                )
                .register(
                    AgentSpec::new("Weather", "weather")
                        .with_tool(echo_tool("get_weather"))
                        .with_handoff_target("Hub"),
                )
                .register(AgentSpec::new("Stock", "stocks").with_tool(quote).with_handoff_target("Hub"))
                .build()
                .unwrap(),
        )
    }

    async fn active(model: MockModel) -> Session {
        let mut s = session(registry(), "Hub", collaborators(model));
        s.connect().await.unwrap();
        s
    }

    fn user(text: &str) -> SessionEvent {
        SessionEvent::UserMessage {
            content: Content::text(text),
        }
    }

    fn handoff(target: &str) -> SessionEvent {
        SessionEvent::HandoffRequested(HandoffDirective::to(target))
    }

    fn tool_call(name: &str) -> SessionEvent {
        SessionEvent::ToolCallRequested(ToolCall::new("call-1", name, json!({ "q": "Tokyo" })))
    }

    // ── Lifecycle ────────────────────────────────────────────────────────────

    #[test]
    fn unknown_entry_agent_is_a_config_error() {
        let result = Session::new(
            registry(),
            "Nobody",
            UserId::default(),
            collaborators(MockModel::default()),
            fast_config(),
        );
        assert!(matches!(result, Err(SwitchboardError::Config { .. })));
    }

    #[tokio::test]
    async fn connect_moves_idle_to_active() {
        let model = MockModel::default();
        let connects = model.connects.clone();
        let s = active(model).await;

        assert_eq!(s.phase(), SessionPhase::Active);
        assert_eq!(s.active_agent().as_str(), "Hub");
        assert_eq!(*connects.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn failed_connect_returns_to_idle() {
        let mut s = session(registry(), "Hub", collaborators(MockModel::failing()));

        let err = s.connect().await.unwrap_err();

        assert!(matches!(err, SwitchboardError::Connection { .. }));
        assert!(err.is_fatal());
        assert_eq!(s.phase(), SessionPhase::Idle);
    }

    #[tokio::test]
    async fn events_are_refused_before_connect() {
        let mut s = session(registry(), "Hub", collaborators(MockModel::default()));
        let err = s.dispatch(user("hi")).await.unwrap_err();
        assert!(matches!(err, SwitchboardError::SessionState { .. }));
        assert!(s.history().is_empty());
    }

    #[tokio::test]
    async fn close_disconnects_persists_once_and_refuses_further_events() {
        let model = MockModel::default();
        let disconnects = model.disconnects.clone();
        let sink = RecordingSink::default();
        let snapshots = sink.snapshots.clone();
        let mut c = collaborators(model);
        c.sink = Arc::new(sink);
        let mut s = session(registry(), "Hub", c);
        s.connect().await.unwrap();
        s.dispatch(user("hello")).await.unwrap();

        s.close().await.unwrap();

        assert_eq!(s.phase(), SessionPhase::Closed);
        assert_eq!(*disconnects.lock().unwrap(), 1);
        assert_eq!(snapshots.lock().unwrap().len(), 1);
        assert_eq!(snapshots.lock().unwrap()[0].history.len(), 1);
        assert!(matches!(s.dispatch(user("again")).await, Err(SwitchboardError::SessionClosed)));
        assert!(matches!(s.close().await, Err(SwitchboardError::SessionClosed)));
        assert_eq!(snapshots.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn transport_drop_is_fatal() {
        let mut s = active(MockModel::default()).await;
        let err = s
            .dispatch(SessionEvent::TransportDropped {
                reason: "socket closed".to_string(),
            })
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn events_after_transport_drop_are_refused_until_close() {
        let model = MockModel::scripted(vec![ModelTurn::Content(Content::text("unreachable"))]);
        let asked = model.asked.clone();
        let disconnects = model.disconnects.clone();
        let sink = RecordingSink::default();
        let snapshots = sink.snapshots.clone();
        let mut c = collaborators(model);
        c.sink = Arc::new(sink);
        let mut s = session(registry(), "Hub", c);
        s.connect().await.unwrap();
        s.dispatch(user("hello")).await.unwrap();

        s.dispatch(SessionEvent::TransportDropped {
            reason: "gone".to_string(),
        })
        .await
        .unwrap_err();
        assert_eq!(s.transport_lost(), Some("gone"));

        let err = s.dispatch(user("still there?")).await.unwrap_err();
        assert!(matches!(err, SwitchboardError::Connection { .. }));
        let err = s.run_turn("hello again").await.unwrap_err();
        assert!(err.is_fatal());
        assert!(asked.lock().unwrap().is_empty(), "the dead model was asked for a turn");
        assert_eq!(s.history().len(), 1);

        s.close().await.unwrap();
        assert_eq!(s.phase(), SessionPhase::Closed);
        assert_eq!(*disconnects.lock().unwrap(), 1);
        assert_eq!(snapshots.lock().unwrap()[0].history.len(), 1);
    }

    #[tokio::test]
    async fn model_connection_failure_ends_the_turn_loop() {
        let mut s = active(MockModel::default()).await;

        let err = s.run_turn("anyone?").await.unwrap_err();

        assert!(matches!(err, SwitchboardError::Connection { .. }));
        assert!(s.transport_lost().is_some());
        assert!(matches!(
            s.dispatch(user("retry")).await,
            Err(SwitchboardError::Connection { .. })
        ));
    }

    // ── Messages ─────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn item_ids_strictly_increase() {
        let mut s = active(MockModel::default()).await;
        s.dispatch(user("one")).await.unwrap();
        s.dispatch(SessionEvent::AssistantMessage { content: Content::text("two") })
            .await
            .unwrap();
        s.dispatch(user("three")).await.unwrap();

        let ids: Vec<u64> = s.history().iter().map(|i| i.item_id.0).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(s.history()[1].role(), Role::Assistant);
    }

    // ── Handoffs ─────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn permitted_handoff_swaps_agent_and_keeps_history() {
        let mut s = active(MockModel::default()).await;
        s.dispatch(user("weather please")).await.unwrap();

        let outcome = s.dispatch(handoff("Weather")).await.unwrap();

        assert!(matches!(outcome, DispatchOutcome::HandedOff { ref to, .. } if to.as_str() == "Weather"));
        assert_eq!(s.active_agent().as_str(), "Weather");
        assert_eq!(s.history().len(), 1);
    }

    #[tokio::test]
    async fn non_permitted_handoff_keeps_current_agent() {
        let mut s = active(MockModel::default()).await;
        s.dispatch(handoff("Weather")).await.unwrap();

        let outcome = s.dispatch(handoff("Stock")).await.unwrap();

        match outcome {
            DispatchOutcome::HandoffRejected { from, reason, .. } => {
                assert_eq!(from.as_str(), "Weather");
                assert!(reason.contains("not permitted"));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
        assert_eq!(s.active_agent().as_str(), "Weather");
    }

    #[tokio::test]
    async fn handoff_to_unregistered_agent_is_rejected() {
        let mut s = active(MockModel::default()).await;
        let outcome = s.dispatch(handoff("Ghost")).await.unwrap();
        assert!(matches!(outcome, DispatchOutcome::HandoffRejected { .. }));
        assert_eq!(s.active_agent().as_str(), "Hub");
    }

    // ── Tool calls ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn tool_call_appends_call_and_output_items() {
        let mut s = active(MockModel::default()).await;
        s.dispatch(handoff("Weather")).await.unwrap();

        let outcome = s.dispatch(tool_call("get_weather")).await.unwrap();

        match outcome {
            DispatchOutcome::ToolCompleted(o) => {
                assert!(o.is_ok());
                assert_eq!(o.result_text, "get_weather: Tokyo");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(s.history()[0].body, ItemBody::ToolCall(_)));
        assert!(matches!(s.history()[1].body, ItemBody::ToolOutput(_)));
    }

    #[tokio::test]
    async fn tool_of_another_agent_is_unknown() {
        let mut s = active(MockModel::default()).await;

        let outcome = s.dispatch(tool_call("get_weather")).await.unwrap();

        match outcome {
            DispatchOutcome::ToolCompleted(o) => {
                assert_eq!(o.status, ToolStatus::InputError);
                assert!(o.result_text.contains("has no tool"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn policy_denial_never_runs_the_tool() {
        let mut c = collaborators(MockModel::default());
        c.policy = Arc::new(MockPolicy {
            verdict: PolicyVerdict::Deny {
                reason: "weather is off limits".to_string(),
            },
        });
        let mut s = session(registry(), "Hub", c);
        s.connect().await.unwrap();
        s.dispatch(handoff("Weather")).await.unwrap();

        match s.dispatch(tool_call("get_weather")).await.unwrap() {
            DispatchOutcome::ToolCompleted(o) => {
                assert_eq!(o.status, ToolStatus::Denied);
                assert!(o.result_text.contains("off limits"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn approval_required_tool_runs_after_approval() {
        let gate = MockGate::answering(ApprovalDecision::Approved);
        let requests = gate.requests.clone();
        let mut c = collaborators(MockModel::default());
        c.approvals = Arc::new(gate);
        let mut s = session(registry(), "Hub", c);
        s.connect().await.unwrap();
        s.dispatch(handoff("Stock")).await.unwrap();

        match s.dispatch(tool_call("get_stock_price")).await.unwrap() {
            DispatchOutcome::ToolCompleted(o) => assert!(o.is_ok()),
            other => panic!("unexpected {:?}", other),
        }
        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].approver_role, DEFAULT_APPROVER_ROLE);
        assert!(s.pending_approval().is_none());
    }

    #[tokio::test]
    async fn approval_timeout_is_a_denial() {
        let mut c = collaborators(MockModel::default());
        c.approvals = Arc::new(MockGate::silent());
        let mut s = session(registry(), "Hub", c);
        s.connect().await.unwrap();
        s.dispatch(handoff("Stock")).await.unwrap();

        let outcome = s.dispatch(tool_call("get_stock_price")).await.unwrap();

        match outcome {
            DispatchOutcome::ToolCompleted(o) => {
                assert_eq!(o.status, ToolStatus::Denied);
                assert!(o.result_text.contains("timed out"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn approver_denial_reaches_the_agent() {
        let mut c = collaborators(MockModel::default());
        c.approvals = Arc::new(MockGate::answering(ApprovalDecision::Denied {
            reason: "not today".to_string(),
        }));
        let mut s = session(registry(), "Hub", c);
        s.connect().await.unwrap();
        s.dispatch(handoff("Stock")).await.unwrap();

        match s.dispatch(tool_call("get_stock_price")).await.unwrap() {
            DispatchOutcome::ToolCompleted(o) => {
                assert_eq!(o.status, ToolStatus::Denied);
                assert!(o.result_text.contains("not today"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    // ── Turn loop ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn run_turn_follows_handoff_and_tool_call_to_content() {
        let model = MockModel::scripted(vec![
            ModelTurn::Handoff(HandoffDirective::to("Weather")),
            ModelTurn::ToolCall(ToolCall::new("c1", "get_weather", json!({ "q": "Tokyo" }))),
            ModelTurn::Content(Content::text("The weather in Tokyo is sunny.")),
        ]);
        let asked = model.asked.clone();
        let mut s = active(model).await;

        let report = s.run_turn("What is the weather in Tokyo?").await.unwrap();

        assert_eq!(report.reply, "The weather in Tokyo is sunny.");
        assert_eq!(report.agent.as_str(), "Weather");
        assert_eq!(report.outcomes.len(), 4);
        // user, tool call, tool output, assistant
        assert_eq!(s.history().len(), 4);
        let asked: Vec<String> = asked.lock().unwrap().iter().map(|a| a.to_string()).collect();
        assert_eq!(asked, vec!["Hub", "Weather", "Weather"]);
    }

    #[tokio::test]
    async fn run_turn_is_bounded() {
        let turns = (0..20)
            .map(|_| ModelTurn::Handoff(HandoffDirective::to("Ghost")))
            .collect();
        let mut s = active(MockModel::scripted(turns)).await;

        let err = s.run_turn("loop forever").await.unwrap_err();

        assert!(matches!(err, SwitchboardError::MaxTurnsExceeded { max_turns: 8 }));
    }
}
