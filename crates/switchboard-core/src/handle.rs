//! The session actor.
//!
//! `SessionHandle::spawn` moves a `Session` into its own tokio task. The task
//! owns the session outright and processes one command at a time from an
//! mpsc queue, so the session's interview state and active agent have a
//! single writer without any locking. Callers get results back over oneshot
//! channels.
//!
//! `status()` is queued like every other command, so it answers only after
//! an in-flight call, approval wait included, has finished. The approval a
//! session is suspended on is mirrored into a watch channel instead and read
//! with `pending_approval()`, which never queues.
//!
//! `close()` is queued behind whatever is already in flight, so it waits for
//! an outstanding tool call. `cancel_and_close()` trips the session's
//! cancellation token first, which resolves the in-flight call to
//! `Cancelled`, then queues the close.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use switchboard_contracts::{
    agent::{AgentName, SessionId},
    error::{SwitchboardError, SwitchboardResult},
    memory::{SessionSnapshot, SinkReport},
    policy::ApprovalRequest,
    session::{DispatchOutcome, SessionEvent, SessionPhase},
};

use crate::session::{Session, TurnReport};

const COMMAND_QUEUE_DEPTH: usize = 32;

/// A point-in-time view of a running session.
#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub phase: SessionPhase,
    pub active_agent: AgentName,
    pub snapshot: SessionSnapshot,
}

enum Command {
    Connect {
        reply: oneshot::Sender<SwitchboardResult<()>>,
    },
    Dispatch {
        event: SessionEvent,
        reply: oneshot::Sender<SwitchboardResult<DispatchOutcome>>,
    },
    RunTurn {
        text: String,
        reply: oneshot::Sender<SwitchboardResult<TurnReport>>,
    },
    Status {
        reply: oneshot::Sender<SessionStatus>,
    },
    Close {
        reply: oneshot::Sender<SwitchboardResult<SinkReport>>,
    },
}

/// Handle to a session running in its own task.
pub struct SessionHandle {
    session_id: SessionId,
    commands: mpsc::Sender<Command>,
    cancel: CancellationToken,
    pending_approval: watch::Receiver<Option<ApprovalRequest>>,
    closing: AtomicBool,
    task: JoinHandle<Session>,
}

impl SessionHandle {
    /// Move `session` into a new task and return its handle.
    pub fn spawn(session: Session) -> Self {
        let (commands, rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let session_id = session.id();
        let cancel = session.cancellation_token();
        let pending_approval = session.watch_pending_approval();
        let task = tokio::spawn(run(session, rx));
        Self {
            session_id,
            commands,
            cancel,
            pending_approval,
            closing: AtomicBool::new(false),
            task,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> SwitchboardResult<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| SwitchboardError::SessionClosed)?;
        response.await.map_err(|_| SwitchboardError::SessionClosed)
    }

    fn ensure_open(&self) -> SwitchboardResult<()> {
        if self.closing.load(Ordering::SeqCst) {
            Err(SwitchboardError::SessionClosed)
        } else {
            Ok(())
        }
    }

    pub async fn connect(&self) -> SwitchboardResult<()> {
        self.ensure_open()?;
        self.request(|reply| Command::Connect { reply }).await?
    }

    /// Queue one event and wait for its outcome.
    ///
    /// Returns `SwitchboardError::SessionClosed` once close has begun.
    pub async fn send(&self, event: SessionEvent) -> SwitchboardResult<DispatchOutcome> {
        self.ensure_open()?;
        self.request(|reply| Command::Dispatch { event, reply }).await?
    }

    pub async fn run_turn(&self, text: impl Into<String>) -> SwitchboardResult<TurnReport> {
        self.ensure_open()?;
        let text = text.into();
        self.request(|reply| Command::RunTurn { text, reply }).await?
    }

    /// Waits behind any queued or in-flight command.
    pub async fn status(&self) -> SwitchboardResult<SessionStatus> {
        self.request(|reply| Command::Status { reply }).await
    }

    /// The approval the session is waiting on right now, read without
    /// queuing behind the wait itself.
    pub fn pending_approval(&self) -> Option<ApprovalRequest> {
        self.pending_approval.borrow().clone()
    }

    /// Close after everything already queued has finished.
    pub async fn close(&self) -> SwitchboardResult<SinkReport> {
        if self.closing.swap(true, Ordering::SeqCst) {
            return Err(SwitchboardError::SessionClosed);
        }
        self.request(|reply| Command::Close { reply }).await?
    }

    /// Cancel the in-flight tool call or approval wait, then close.
    pub async fn cancel_and_close(&self) -> SwitchboardResult<SinkReport> {
        debug!(session_id = %self.session_id, "cancelling in-flight work before close");
        self.cancel.cancel();
        self.close().await
    }

    /// Wait for the actor to exit and take the session back.
    ///
    /// The actor exits after processing a close, or when every sender is
    /// gone; this drops the handle's sender so the latter can happen.
    pub async fn join(self) -> SwitchboardResult<Session> {
        let Self { commands, task, .. } = self;
        drop(commands);
        task.await.map_err(|e| SwitchboardError::SessionState {
            reason: format!("session task failed: {}", e),
        })
    }
}

async fn run(mut session: Session, mut commands: mpsc::Receiver<Command>) -> Session {
    debug!(session_id = %session.id(), "session actor started");

    while let Some(command) = commands.recv().await {
        match command {
            Command::Connect { reply } => {
                let _ = reply.send(session.connect().await);
            }
            Command::Dispatch { event, reply } => {
                let _ = reply.send(session.dispatch(event).await);
            }
            Command::RunTurn { text, reply } => {
                let _ = reply.send(session.run_turn(text).await);
            }
            Command::Status { reply } => {
                let _ = reply.send(SessionStatus {
                    phase: session.phase(),
                    active_agent: session.active_agent().clone(),
                    snapshot: session.snapshot(),
                });
            }
            Command::Close { reply } => {
                let _ = reply.send(session.close().await);
                break;
            }
        }
    }

    debug!(session_id = %session.id(), "session actor stopped");
    session
}

// ── Tests ────────────────────────────────────────────────────────────────────
