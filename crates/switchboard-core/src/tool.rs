//! The callable half of a tool and the invocation pipeline around it.
//!
//! A `ToolSpec` pairs a `ToolDescriptor` (what the model sees) with a
//! `ToolHandler` (what runs). `ToolSpec::invoke` is the only call site for a
//! handler:
//!
//!   Validate → [ToolHandler::call] → Retry (idempotent + transient only) → Outcome
//!
//! Every failure is folded into the returned `ToolOutcome`. Nothing a handler
//! does can make `invoke` return an error or panic the session.

use std::{collections::BTreeMap, future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use switchboard_contracts::{
    agent::{AgentName, SessionId},
    error::{SwitchboardError, SwitchboardResult},
    interview::InterviewState,
    record::StructuredRecord,
    tool::{Idempotency, StateScope, ToolCall, ToolDescriptor, ToolOutcome, ToolStatus},
};

use crate::traits::ArgumentValidator;

/// How a handler failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    /// A failure that may succeed on retry (network blip, rate limit).
    #[error("{0}")]
    Transient(String),

    /// A failure that will not go away by retrying.
    #[error("{0}")]
    Failed(String),

    /// The arguments were well-formed but semantically unacceptable.
    #[error("{0}")]
    Input(String),
}

impl From<SwitchboardError> for ToolError {
    fn from(err: SwitchboardError) -> Self {
        match err {
            SwitchboardError::ToolInput { reason, .. } => ToolError::Input(reason),
            SwitchboardError::UnknownField { .. } => ToolError::Input(err.to_string()),
            SwitchboardError::Connection { reason } => ToolError::Transient(reason),
            other => ToolError::Failed(other.to_string()),
        }
    }
}

/// Session-owned state that tools may be granted access to.
///
/// One instance per session. Tools never see it directly, only through the
/// scope-checked accessors on `ToolContext`.
#[derive(Debug, Clone, Default)]
pub struct ToolState {
    /// Interview episodes keyed by interview id.
    pub interviews: BTreeMap<String, InterviewState>,
    /// Records produced by finalize, oldest first.
    pub records: Vec<StructuredRecord>,
}

impl ToolState {
    /// Interviews that still hold collected data.
    pub fn resident_interviews(&self) -> Vec<(String, InterviewState)> {
        self.interviews
            .iter()
            .filter(|(_, state)| !state.is_empty())
            .map(|(id, state)| (id.clone(), state.clone()))
            .collect()
    }

    /// The most recent finalized record, if any.
    pub fn latest_record(&self) -> Option<&StructuredRecord> {
        self.records.last()
    }
}

/// Everything a handler may use during one invocation.
///
/// Access to session state is restricted to the scope the tool declared in
/// its descriptor. Reaching outside it is a `ToolExecution` error.
pub struct ToolContext<'a> {
    session_id: SessionId,
    agent: &'a AgentName,
    tool: &'a str,
    scope: &'a StateScope,
    state: &'a mut ToolState,
    post_finalize_handoff: Option<&'a AgentName>,
    cancel: CancellationToken,
}

impl<'a> ToolContext<'a> {
    pub fn new(
        session_id: SessionId,
        agent: &'a AgentName,
        descriptor: &'a ToolDescriptor,
        state: &'a mut ToolState,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            session_id,
            agent,
            tool: &descriptor.name,
            scope: &descriptor.scope,
            state,
            post_finalize_handoff: None,
            cancel,
        }
    }

    /// Name the agent the owning agent usually hands off to after an
    /// interview is finalized.
    pub fn with_post_finalize_handoff(mut self, target: Option<&'a AgentName>) -> Self {
        self.post_finalize_handoff = target;
        self
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn agent(&self) -> &AgentName {
        self.agent
    }

    pub fn post_finalize_handoff(&self) -> Option<&AgentName> {
        self.post_finalize_handoff
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn check_interview_scope(&self, interview_id: &str) -> SwitchboardResult<()> {
        match self.scope {
            StateScope::Interview(id) if id == interview_id => Ok(()),
            _ => Err(SwitchboardError::ToolExecution {
                tool: self.tool.to_string(),
                reason: format!("tool did not declare access to interview '{}'", interview_id),
            }),
        }
    }

    /// The interview episode `interview_id`, created empty on first access.
    pub fn interview_mut(&mut self, interview_id: &str) -> SwitchboardResult<&mut InterviewState> {
        self.check_interview_scope(interview_id)?;
        Ok(self
            .state
            .interviews
            .entry(interview_id.to_string())
            .or_default())
    }

    /// Store a finalized record as public session state.
    pub fn push_record(&mut self, interview_id: &str, record: StructuredRecord) -> SwitchboardResult<()> {
        self.check_interview_scope(interview_id)?;
        self.state.records.push(record);
        Ok(())
    }
}

/// The code behind a tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Run the tool. The returned text is what the model sees.
    ///
    /// `arguments` has already passed schema validation.
    async fn call(&self, ctx: &mut ToolContext<'_>, arguments: Value) -> Result<String, ToolError>;
}

/// Adapter for stateless tools written as a plain async function.
struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, ToolError>> + Send,
{
    async fn call(&self, _ctx: &mut ToolContext<'_>, arguments: Value) -> Result<String, ToolError> {
        (self.0)(arguments).await
    }
}

/// Retry settings for transient handler failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first.
    pub retries: u32,
    /// Fixed pause between attempts.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            retries: 0,
            backoff: Duration::ZERO,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 2,
            backoff: Duration::from_millis(200),
        }
    }
}

/// A registered tool: descriptor plus handler.
#[derive(Clone)]
pub struct ToolSpec {
    descriptor: ToolDescriptor,
    handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSpec")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

impl ToolSpec {
    pub fn new(descriptor: ToolDescriptor, handler: Arc<dyn ToolHandler>) -> Self {
        Self { descriptor, handler }
    }

    /// A stateless tool backed by an async function of its arguments.
    pub fn from_fn<F, Fut>(descriptor: ToolDescriptor, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, ToolError>> + Send + 'static,
    {
        Self::new(descriptor, Arc::new(FnHandler(f)))
    }

    pub fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Validate, run, and retry as needed.
    ///
    /// The handler is never called with arguments that failed validation.
    /// Transient failures are retried only when the descriptor is
    /// `Idempotent`. A tripped cancellation token resolves the call to
    /// `ToolStatus::Cancelled` at the next await point.
    pub async fn invoke(
        &self,
        call: &ToolCall,
        validator: &dyn ArgumentValidator,
        ctx: &mut ToolContext<'_>,
        retry: RetryPolicy,
    ) -> ToolOutcome {
        let tool = self.descriptor.name.as_str();
        let session_id = ctx.session_id();

        // ── Validation ───────────────────────────────────────────────────────
        if let Err(err) = validator.validate_arguments(&self.descriptor, &call.arguments) {
            warn!(
                session_id = %session_id,
                tool = %tool,
                error = %err,
                "tool arguments failed validation"
            );
            return ToolOutcome::new(call, ToolStatus::InputError, err.to_string());
        }

        // ── Invocation with bounded retries ──────────────────────────────────
        let cancel = ctx.cancel_token();
        let cancelled = || {
            ToolOutcome::new(
                call,
                ToolStatus::Cancelled,
                format!("tool '{}' was cancelled before it completed", tool),
            )
        };
        let retryable = self.descriptor.idempotency == Idempotency::Idempotent;

        let mut attempt: u32 = 0;
        loop {
            debug!(session_id = %session_id, tool = %tool, attempt, "invoking tool handler");

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return cancelled(),
                result = self.handler.call(ctx, call.arguments.clone()) => result,
            };

            match result {
                Ok(text) => return ToolOutcome::ok(call, text),

                Err(ToolError::Transient(reason)) if retryable && attempt < retry.retries => {
                    attempt += 1;
                    debug!(
                        session_id = %session_id,
                        tool = %tool,
                        attempt,
                        reason = %reason,
                        "transient tool failure, retrying"
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return cancelled(),
                        _ = tokio::time::sleep(retry.backoff) => {}
                    }
                }

                Err(ToolError::Input(reason)) => {
                    let err = SwitchboardError::ToolInput {
                        tool: tool.to_string(),
                        reason,
                    };
                    warn!(session_id = %session_id, tool = %tool, error = %err, "tool rejected its input");
                    return ToolOutcome::new(call, ToolStatus::InputError, err.to_string());
                }

                Err(ToolError::Transient(reason)) | Err(ToolError::Failed(reason)) => {
                    let err = SwitchboardError::ToolExecution {
                        tool: tool.to_string(),
                        reason,
                    };
                    warn!(session_id = %session_id, tool = %tool, error = %err, "tool execution failed");
                    return ToolOutcome::new(call, ToolStatus::ExecutionError, err.to_string());
                }
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{json, Value};
    use tokio_util::sync::CancellationToken;

    use switchboard_contracts::{
        agent::{AgentName, SessionId},
        tool::{ParamKind, ParameterField, ParameterSchema, StateScope, ToolCall, ToolDescriptor, ToolStatus},
    };

    use super::*;
    use crate::testing::{AcceptAll, RejectAll};

    /// A handler that fails transiently a fixed number of times, then
    /// succeeds, counting every call.
    struct Flaky {
        failures: u32,
        calls: Arc<Mutex<u32>>,
    }

    #[async_trait]
    impl ToolHandler for Flaky {
        async fn call(&self, _ctx: &mut ToolContext<'_>, _arguments: Value) -> Result<String, ToolError> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if *calls <= self.failures {
                Err(ToolError::Transient("upstream timeout".to_string()))
            } else {
                Ok("done".to_string())
            }
        }
    }

    /// A handler that touches whichever interview it is told to.
    struct Snoop {
        interview: &'static str,
    }

    #[async_trait]
    impl ToolHandler for Snoop {
        async fn call(&self, ctx: &mut ToolContext<'_>, _arguments: Value) -> Result<String, ToolError> {
            ctx.interview_mut(self.interview)?.record("peek", "yes");
            Ok("ok".to_string())
        }
    }

    /// A handler that never finishes on its own.
    struct Hang;

    #[async_trait]
    impl ToolHandler for Hang {
        async fn call(&self, _ctx: &mut ToolContext<'_>, _arguments: Value) -> Result<String, ToolError> {
            std::future::pending::<()>().await;
            Ok("unreachable".to_string())
        }
    }

    fn descriptor(name: &str) -> ToolDescriptor {
        ToolDescriptor::new(
            name,
            "test tool",
            ParameterSchema::empty().with_field(ParameterField::required("q", ParamKind::String, "query")),
        )
    }

    fn call(name: &str) -> ToolCall {
        ToolCall::new("call-1", name, json!({ "q": "x" }))
    }

    fn fast_retry(retries: u32) -> RetryPolicy {
        RetryPolicy {
            retries,
            backoff: Duration::from_millis(1),
        }
    }

    async fn run(spec: &ToolSpec, validator: &dyn ArgumentValidator, state: &mut ToolState, retry: RetryPolicy) -> ToolOutcome {
        let agent = AgentName::new("Tester");
        let descriptor = spec.descriptor().clone();
        let mut ctx = ToolContext::new(SessionId::new(), &agent, &descriptor, state, CancellationToken::new());
        spec.invoke(&call(spec.name()), validator, &mut ctx, retry).await
    }

    // ── Validation ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn invalid_arguments_never_reach_the_handler() {
        let calls = Arc::new(Mutex::new(0));
        let spec = ToolSpec::new(descriptor("lookup"), Arc::new(Flaky { failures: 0, calls: calls.clone() }));

        let outcome = run(&spec, &RejectAll, &mut ToolState::default(), RetryPolicy::none()).await;

        assert_eq!(outcome.status, ToolStatus::InputError);
        assert_eq!(*calls.lock().unwrap(), 0, "handler must not run on invalid input");
    }

    #[tokio::test]
    async fn successful_call_echoes_call_id() {
        let spec = ToolSpec::from_fn(descriptor("echo"), |args: Value| async move {
            Ok::<_, ToolError>(format!("echo {}", args["q"].as_str().unwrap_or_default()))
        });

        let outcome = run(&spec, &AcceptAll, &mut ToolState::default(), RetryPolicy::none()).await;

        assert!(outcome.is_ok());
        assert_eq!(outcome.call_id, "call-1");
        assert_eq!(outcome.result_text, "echo x");
    }

    // ── Retries ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn idempotent_tool_retries_transient_failures() {
        let calls = Arc::new(Mutex::new(0));
        let spec = ToolSpec::new(descriptor("lookup"), Arc::new(Flaky { failures: 2, calls: calls.clone() }));

        let outcome = run(&spec, &AcceptAll, &mut ToolState::default(), fast_retry(2)).await;

        assert!(outcome.is_ok());
        assert_eq!(*calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn non_idempotent_tool_is_never_retried() {
        let calls = Arc::new(Mutex::new(0));
        let spec = ToolSpec::new(
            descriptor("charge").non_idempotent(),
            Arc::new(Flaky { failures: 1, calls: calls.clone() }),
        );

        let outcome = run(&spec, &AcceptAll, &mut ToolState::default(), fast_retry(5)).await;

        assert_eq!(outcome.status, ToolStatus::ExecutionError);
        assert!(outcome.result_text.contains("upstream timeout"));
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let calls = Arc::new(Mutex::new(0));
        let spec = ToolSpec::new(descriptor("lookup"), Arc::new(Flaky { failures: 10, calls: calls.clone() }));

        let outcome = run(&spec, &AcceptAll, &mut ToolState::default(), fast_retry(2)).await;

        assert_eq!(outcome.status, ToolStatus::ExecutionError);
        assert_eq!(*calls.lock().unwrap(), 3);
    }

    // ── Scope ────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn undeclared_scope_is_an_execution_error_and_leaves_state_alone() {
        let spec = ToolSpec::new(
            descriptor("snoop").scoped(StateScope::Interview("mine".to_string())),
            Arc::new(Snoop { interview: "theirs" }),
        );
        let mut state = ToolState::default();

        let outcome = run(&spec, &AcceptAll, &mut state, RetryPolicy::none()).await;

        assert_eq!(outcome.status, ToolStatus::ExecutionError);
        assert!(state.interviews.is_empty());
    }

    #[tokio::test]
    async fn declared_scope_grants_access() {
        let spec = ToolSpec::new(
            descriptor("snoop").scoped(StateScope::Interview("mine".to_string())),
            Arc::new(Snoop { interview: "mine" }),
        );
        let mut state = ToolState::default();

        let outcome = run(&spec, &AcceptAll, &mut state, RetryPolicy::none()).await;

        assert!(outcome.is_ok());
        assert_eq!(state.interviews["mine"].get("peek"), Some("yes"));
    }

    // ── Cancellation ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn cancelled_token_resolves_to_cancelled() {
        let spec = ToolSpec::new(descriptor("hang"), Arc::new(Hang));
        let agent = AgentName::new("Tester");
        let descriptor = spec.descriptor().clone();
        let mut state = ToolState::default();
        let cancel = CancellationToken::new();
        let trip = cancel.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trip.cancel();
        });

        let mut ctx = ToolContext::new(SessionId::new(), &agent, &descriptor, &mut state, cancel);
        let outcome = spec.invoke(&call("hang"), &AcceptAll, &mut ctx, RetryPolicy::none()).await;

        assert_eq!(outcome.status, ToolStatus::Cancelled);
    }

    #[test]
    fn switchboard_errors_map_onto_tool_errors() {
        let unknown = SwitchboardError::UnknownField {
            interview: "contact".to_string(),
            key: "pet".to_string(),
        };
        assert!(matches!(ToolError::from(unknown), ToolError::Input(_)));

        let empty = SwitchboardError::NoDataCollected { interview: "contact".to_string() };
        assert!(matches!(ToolError::from(empty), ToolError::Failed(msg) if msg.contains("no data collected")));

        let rejected = SwitchboardError::Upstream { reason: "HTTP 401".to_string() };
        assert!(matches!(ToolError::from(rejected), ToolError::Failed(_)));

        let unreachable = SwitchboardError::Connection { reason: "timed out".to_string() };
        assert!(matches!(ToolError::from(unreachable), ToolError::Transient(_)));
    }
}
