//! # switchboard-ref-voice
//!
//! Voice assistant reference deployment for the switchboard orchestration
//! runtime.
//!
//! Five agents share one conversation:
//!
//! ```text
//!                 ┌──────────────┐
//!      ┌─────────►│ Voice Agent  │◄───────────┐
//!      │          └──┬───┬───┬───┘            │
//!      │     ┌───────┘   │   └────────┐       │
//!      ▼     ▼           ▼            ▼       │
//!  ┌─────────┐◄──┌─────────┐  ┌──────────┐ ┌──────────────┐
//!  │ Weather │   │  Stock  │  │  Daily   │ │   Contact    │
//!  └─────────┘   └─────────┘  │ Check-in │ │   Intake     │
//!                             └──────────┘ └──────────────┘
//! ```
//!
//! Four scenarios drive it with scripted model turns:
//!
//! 1. **Handoff Tour**: hub and specialists, including one refused handoff.
//! 2. **Tool Approval**: a consent-gated stock quote approved, timed out,
//!    and refused.
//! 3. **Daily Check-in**: a completion-flag interview finalized inline.
//! 4. **Contact Intake**: a strict, index-driven interview run through a
//!    session actor.
//!
//! All data is hardcoded and fictional. No external API calls are made,
//! except by `scenarios::daily_checkin::run_live`, which sends the check-in through
//! the remote parser, credential issuer and memory store.

pub mod agents;
pub mod collaborators;
pub mod deployment;
pub mod mock_data;
pub mod scenarios;

pub use deployment::{RemoteServices, SessionParts, VoiceDeployment};
