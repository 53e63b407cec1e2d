//! Schema-based validation for tool arguments and extracted records.
//!
//! `SchemaValidator` implements both `ArgumentValidator` and
//! `RecordValidator` from `switchboard-core`. Validation runs in two phases:
//!
//! 1. **Structural**: the value is checked against the JSON Schema document
//!    rendered from the tool's `ParameterSchema` or the `RecordSchema`, using
//!    the `jsonschema` crate.
//! 2. **Custom**: every function registered for the tool name or record
//!    schema id runs in registration order.
//!
//! All failures are collected before returning, so the model sees every
//! problem with its arguments in one tool result.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, warn};

use switchboard_contracts::{
    error::{SwitchboardError, SwitchboardResult},
    record::{RecordSchema, StructuredRecord},
    tool::ToolDescriptor,
};
use switchboard_core::traits::{ArgumentValidator, RecordValidator};

/// A caller-supplied check.
///
/// Receives the whole argument object (or record). Returns `Some(message)`
/// when the check fails, `None` when it passes.
pub type CustomRuleFn = Box<dyn Fn(&Value) -> Option<String> + Send + Sync>;

#[derive(Default)]
pub struct SchemaValidator {
    /// Keyed by tool name or record schema id.
    custom_rules: HashMap<String, Vec<CustomRuleFn>>,
}

impl SchemaValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a check for the tool or record schema named `target`.
    ///
    /// Several checks may share a target; they all run.
    pub fn register_rule(&mut self, target: impl Into<String>, f: CustomRuleFn) {
        self.custom_rules.entry(target.into()).or_default().push(f);
    }

    pub fn with_rule(mut self, target: impl Into<String>, f: CustomRuleFn) -> Self {
        self.register_rule(target, f);
        self
    }

    /// Run both phases and return every failure message.
    fn failures(&self, target: &str, schema: &Value, value: &Value) -> Vec<String> {
        let mut failures = Vec::new();

        // ── Phase 1: JSON Schema structural validation ───────────────────────
        match jsonschema::validator_for(schema) {
            Ok(validator) => {
                for error in validator.iter_errors(value) {
                    let path = error.instance_path.to_string();
                    let message = if path.is_empty() {
                        error.to_string()
                    } else {
                        format!("{} at {}", error, path)
                    };
                    failures.push(message);
                }
            }
            Err(e) => failures.push(format!("invalid JSON Schema document: {}", e)),
        }

        // ── Phase 2: custom checks ───────────────────────────────────────────
        if let Some(rules) = self.custom_rules.get(target) {
            failures.extend(rules.iter().filter_map(|rule| rule(value)));
        }

        debug!(target, failure_count = failures.len(), "validation complete");
        failures
    }
}

impl ArgumentValidator for SchemaValidator {
    fn validate_arguments(&self, tool: &ToolDescriptor, arguments: &Value) -> SwitchboardResult<()> {
        let failures = self.failures(&tool.name, &tool.parameters.to_json_schema(), arguments);
        if failures.is_empty() {
            return Ok(());
        }
        warn!(tool = %tool.name, failures = ?failures, "tool arguments rejected");
        Err(SwitchboardError::ToolInput {
            tool: tool.name.clone(),
            reason: failures.join("; "),
        })
    }
}

impl RecordValidator for SchemaValidator {
    fn validate_record(&self, schema: &RecordSchema, record: &StructuredRecord) -> SwitchboardResult<()> {
        if record.schema_id != schema.schema_id {
            return Err(SwitchboardError::SchemaValidation {
                reason: format!(
                    "record was extracted for schema '{}', expected '{}'",
                    record.schema_id, schema.schema_id
                ),
            });
        }

        let failures = self.failures(&schema.schema_id, &schema.to_json_schema(), &record.to_value());
        if failures.is_empty() {
            return Ok(());
        }
        warn!(schema_id = %schema.schema_id, failures = ?failures, "record rejected");
        Err(SwitchboardError::SchemaValidation {
            reason: failures.join("; "),
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
