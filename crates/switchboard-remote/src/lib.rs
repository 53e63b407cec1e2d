//! # switchboard-remote
//!
//! HTTP implementations of the collaborator traits in `switchboard-core`:
//!
//! - [`OpenAiCredentialIssuer`] mints the short-lived credential a session
//!   connects with.
//! - [`OpenAiRecordParser`] turns collected interview answers into a typed
//!   record through a strict JSON-schema completion.
//! - [`Mem0Store`] submits memory batches to a mem0-compatible service.
//!
//! All three read their endpoints from `DeploymentConfig` and their secrets
//! from `Credentials`; none of them reads the environment itself.

pub mod http;
pub mod issuer;
pub mod mem0;
pub mod parser;

pub use http::{JsonClient, RemoteError};
pub use issuer::OpenAiCredentialIssuer;
pub use mem0::Mem0Store;
pub use parser::OpenAiRecordParser;
