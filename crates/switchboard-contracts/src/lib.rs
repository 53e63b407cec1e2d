//! # switchboard-contracts
//!
//! Shared types, schemas, and contracts for the switchboard orchestrator.
//!
//! All crates in the workspace import from here. No orchestration logic
//! lives in this crate, only data definitions and error types.

pub mod agent;
pub mod conversation;
pub mod error;
pub mod interview;
pub mod memory;
pub mod policy;
pub mod record;
pub mod session;
pub mod tool;
