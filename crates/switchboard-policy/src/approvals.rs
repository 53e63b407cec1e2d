//! Approval gates.
//!
//! A session that hits `RequireApproval` hands an `ApprovalRequest` to its
//! `ApprovalGate` and waits for the decision (the session applies its own
//! timeout on top). Two gates live here:
//!
//! - `StaticApprovalGate` answers every request the same way. Useful for
//!   scripted runs and tests.
//! - `ChannelApprovalGate` forwards each request over an mpsc channel to
//!   whoever holds the matching `ApprovalInbox`, and waits on a oneshot for
//!   the reply.

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use switchboard_contracts::policy::{ApprovalDecision, ApprovalRequest};
use switchboard_core::traits::ApprovalGate;

/// Answers every request with the same decision.
#[derive(Debug, Clone)]
pub struct StaticApprovalGate {
    decision: ApprovalDecision,
}

impl StaticApprovalGate {
    pub fn new(decision: ApprovalDecision) -> Self {
        Self { decision }
    }

    pub fn approve_all() -> Self {
        Self::new(ApprovalDecision::Approved)
    }

    pub fn deny_all(reason: impl Into<String>) -> Self {
        Self::new(ApprovalDecision::Denied { reason: reason.into() })
    }
}

#[async_trait]
impl ApprovalGate for StaticApprovalGate {
    async fn request(&self, request: ApprovalRequest) -> ApprovalDecision {
        debug!(
            tool = %request.call.tool_name,
            decision = ?self.decision,
            "static approval"
        );
        self.decision.clone()
    }
}

/// One request waiting for a human answer.
#[derive(Debug)]
pub struct PendingApproval {
    pub request: ApprovalRequest,
    responder: oneshot::Sender<ApprovalDecision>,
}

impl PendingApproval {
    /// Send the decision back to the waiting session.
    ///
    /// If the session already gave up (timeout or cancellation) the answer
    /// is dropped.
    pub fn respond(self, decision: ApprovalDecision) {
        if self.responder.send(decision).is_err() {
            debug!(call_id = %self.request.call.call_id, "approval answered after the session stopped waiting");
        }
    }

    pub fn approve(self) {
        self.respond(ApprovalDecision::Approved);
    }

    pub fn deny(self, reason: impl Into<String>) {
        self.respond(ApprovalDecision::Denied { reason: reason.into() });
    }
}

/// The receiving end of a `ChannelApprovalGate`.
#[derive(Debug)]
pub struct ApprovalInbox {
    pending: mpsc::Receiver<PendingApproval>,
}

impl ApprovalInbox {
    /// Wait for the next request. `None` once every gate is dropped.
    pub async fn next(&mut self) -> Option<PendingApproval> {
        self.pending.recv().await
    }
}

/// Forwards requests to an `ApprovalInbox`.
#[derive(Debug, Clone)]
pub struct ChannelApprovalGate {
    pending: mpsc::Sender<PendingApproval>,
}

impl ChannelApprovalGate {
    pub fn new(capacity: usize) -> (Self, ApprovalInbox) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { pending: tx }, ApprovalInbox { pending: rx })
    }
}

#[async_trait]
impl ApprovalGate for ChannelApprovalGate {
    async fn request(&self, request: ApprovalRequest) -> ApprovalDecision {
        let (responder, answer) = oneshot::channel();
        let call_id = request.call.call_id.clone();

        if self.pending.send(PendingApproval { request, responder }).await.is_err() {
            warn!(%call_id, "approval inbox is gone; denying");
            return ApprovalDecision::Denied {
                reason: "no approver is listening".to_string(),
            };
        }

        match answer.await {
            Ok(decision) => decision,
            Err(_) => {
                warn!(%call_id, "approval dropped without an answer; denying");
                ApprovalDecision::Denied {
                    reason: "approval request was dropped without an answer".to_string(),
                }
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use switchboard_contracts::{
        agent::{AgentName, SessionId},
        policy::{ApprovalDecision, ApprovalRequest},
        tool::ToolCall,
    };
    use switchboard_core::traits::ApprovalGate;

    use super::*;

    fn request() -> ApprovalRequest {
        ApprovalRequest {
            session_id: SessionId::new(),
            agent: AgentName::new("Stock Agent"),
            call: ToolCall::new("call-1", "get_stock_price", json!({ "ticker": "ACME" })),
            reason: "billed lookup".to_string(),
            approver_role: "user".to_string(),
        }
    }

    #[tokio::test]
    async fn static_gate_answers_every_request_the_same() {
        let gate = StaticApprovalGate::deny_all("closed for the day");
        assert_eq!(
            gate.request(request()).await,
            ApprovalDecision::Denied {
                reason: "closed for the day".to_string()
            }
        );
        assert!(StaticApprovalGate::approve_all().request(request()).await.is_approved());
    }

    #[tokio::test]
    async fn channel_gate_returns_the_inbox_decision() {
        let (gate, mut inbox) = ChannelApprovalGate::new(4);

        let approver = tokio::spawn(async move {
            let pending = inbox.next().await.unwrap();
            assert_eq!(pending.request.call.tool_name, "get_stock_price");
            assert_eq!(pending.request.approver_role, "user");
            pending.approve();
        });

        assert_eq!(gate.request(request()).await, ApprovalDecision::Approved);
        approver.await.unwrap();
    }

    #[tokio::test]
    async fn dropped_inbox_denies() {
        let (gate, inbox) = ChannelApprovalGate::new(1);
        drop(inbox);

        match gate.request(request()).await {
            ApprovalDecision::Denied { reason } => assert!(reason.contains("no approver")),
            other => panic!("expected Denied, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn dropped_pending_request_denies() {
        let (gate, mut inbox) = ChannelApprovalGate::new(1);

        let approver = tokio::spawn(async move {
            let pending = inbox.next().await.unwrap();
            drop(pending);
        });

        assert!(!gate.request(request()).await.is_approved());
        approver.await.unwrap();
    }
}
