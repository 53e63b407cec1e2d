//! # switchboard-verify
//!
//! Validation and offline extraction for the switchboard orchestrator.
//!
//! - [`SchemaValidator`] checks tool arguments against the tool's parameter
//!   schema and extracted records against their `RecordSchema`, both via
//!   JSON Schema, then runs any registered custom checks.
//! - [`CoercingParser`] turns collected interview answers into a typed
//!   record without a model call.

pub mod parser;
pub mod schema;

pub use parser::CoercingParser;
pub use schema::{CustomRuleFn, SchemaValidator};
