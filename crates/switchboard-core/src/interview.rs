//! The interview state machine, exposed to the model as tools.
//!
//! An interview collects a fixed set of fields from the user over several
//! turns and finalizes them into a `StructuredRecord`. The model drives it
//! through up to three tools:
//!
//! - `record_field`: store one answer (last write per key wins)
//! - `get_current_field`: the question at the cursor (index-driven only)
//! - `finalize_interview`: parse, validate, store the record, reset
//!
//! State lives in the session, keyed by interview id, and is reached only
//! through the scope-checked `ToolContext`. It is reset only after a
//! successful finalize; a refused or invalid parse leaves every collected
//! field in place so the agent can correct and retry.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use switchboard_contracts::{
    error::SwitchboardError,
    interview::{InterviewMode, InterviewPlan, InterviewState},
    record::ParseOutcome,
    tool::{ParamKind, ParameterField, ParameterSchema, StateScope, ToolDescriptor},
};

use crate::{
    tool::{ToolContext, ToolError, ToolHandler, ToolSpec},
    traits::{ParsingCollaborator, RecordValidator},
};

pub const RECORD_FIELD: &str = "record_field";
pub const GET_CURRENT_FIELD: &str = "get_current_field";
pub const FINALIZE_INTERVIEW: &str = "finalize_interview";

struct KitInner {
    plan: InterviewPlan,
    parser: Arc<dyn ParsingCollaborator>,
    validator: Arc<dyn RecordValidator>,
}

/// Builds the tool set for one interview plan.
#[derive(Clone)]
pub struct InterviewKit {
    inner: Arc<KitInner>,
}

impl InterviewKit {
    pub fn new(
        plan: InterviewPlan,
        parser: Arc<dyn ParsingCollaborator>,
        validator: Arc<dyn RecordValidator>,
    ) -> Self {
        Self {
            inner: Arc::new(KitInner {
                plan,
                parser,
                validator,
            }),
        }
    }

    pub fn plan(&self) -> &InterviewPlan {
        &self.inner.plan
    }

    /// The tools an agent needs to run this interview.
    ///
    /// Index-driven plans get all three; completion-flag plans have no
    /// cursor and so no `get_current_field`.
    pub fn tools(&self) -> Vec<ToolSpec> {
        let plan = &self.inner.plan;
        let scope = StateScope::Interview(plan.interview_id.clone());

        let mut record_params = ParameterSchema::empty()
            .with_field(ParameterField::required("key", ParamKind::String, "The field being answered"))
            .with_field(ParameterField::required("value", ParamKind::String, "The user's answer"));
        let record_description = match plan.mode {
            InterviewMode::IndexDriven => {
                "Record the user's answer to one interview field. Returns the next question to ask."
            }
            InterviewMode::CompletionFlag => {
                record_params = record_params.with_field(ParameterField::optional(
                    "is_complete",
                    ParamKind::Boolean,
                    "True when this is the last field; the interview is then finalized",
                ));
                "Record the user's answer to one interview field. Set is_complete on the last one."
            }
        };

        let mut tools = vec![ToolSpec::new(
            ToolDescriptor::new(RECORD_FIELD, record_description, record_params).scoped(scope.clone()),
            Arc::new(RecordField(self.inner.clone())),
        )];

        if plan.mode == InterviewMode::IndexDriven {
            tools.push(ToolSpec::new(
                ToolDescriptor::new(
                    GET_CURRENT_FIELD,
                    "Return the question for the next field that still needs an answer.",
                    ParameterSchema::empty(),
                )
                .scoped(scope.clone()),
                Arc::new(CurrentField(self.inner.clone())),
            ));
        }

        tools.push(ToolSpec::new(
            ToolDescriptor::new(
                FINALIZE_INTERVIEW,
                "Turn the collected answers into a structured record and finish the interview.",
                ParameterSchema::empty(),
            )
            .scoped(scope),
            Arc::new(Finalize(self.inner.clone())),
        ));

        tools
    }
}

/// Index of the first declared field not yet collected.
fn next_uncollected(plan: &InterviewPlan, state: &InterviewState) -> Option<usize> {
    plan.fields.iter().position(|f| !state.contains(&f.key))
}

fn string_arg<'a>(arguments: &'a Value, name: &str) -> Result<&'a str, ToolError> {
    arguments
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::Input(format!("'{}' must be a string", name)))
}

fn all_collected_text() -> String {
    format!("All fields are collected. Call {} to finish.", FINALIZE_INTERVIEW)
}

// ── record_field ─────────────────────────────────────────────────────────────

struct RecordField(Arc<KitInner>);

#[async_trait]
impl ToolHandler for RecordField {
    async fn call(&self, ctx: &mut ToolContext<'_>, arguments: Value) -> Result<String, ToolError> {
        let kit = &self.0;
        let plan = &kit.plan;
        let key = string_arg(&arguments, "key")?;
        let value = string_arg(&arguments, "value")?;
        let is_complete = arguments
            .get("is_complete")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        if plan.strict && !plan.declares(key) {
            return Err(SwitchboardError::UnknownField {
                interview: plan.interview_id.clone(),
                key: key.to_string(),
            }
            .into());
        }

        let state = ctx.interview_mut(&plan.interview_id)?;
        state.record(key, value);
        debug!(interview = %plan.interview_id, key = %key, collected = state.fields.len(), "interview field recorded");

        match plan.mode {
            InterviewMode::IndexDriven => match next_uncollected(plan, state) {
                Some(index) => {
                    state.cursor = index;
                    state.is_complete = false;
                    Ok(format!(
                        "Recorded '{}'. Next question: {}",
                        key, plan.fields[index].prompt
                    ))
                }
                None => {
                    state.cursor = plan.fields.len();
                    state.is_complete = true;
                    Ok(format!("Recorded '{}'. {}", key, all_collected_text()))
                }
            },
            InterviewMode::CompletionFlag => {
                if is_complete {
                    state.is_complete = true;
                    finalize(kit, ctx).await
                } else {
                    Ok(format!("Recorded '{}'.", key))
                }
            }
        }
    }
}

// ── get_current_field ────────────────────────────────────────────────────────

struct CurrentField(Arc<KitInner>);

#[async_trait]
impl ToolHandler for CurrentField {
    async fn call(&self, ctx: &mut ToolContext<'_>, _arguments: Value) -> Result<String, ToolError> {
        let plan = &self.0.plan;
        let state = ctx.interview_mut(&plan.interview_id)?;
        Ok(match plan.fields.get(state.cursor) {
            Some(field) => field.prompt.clone(),
            None => all_collected_text(),
        })
    }
}

// ── finalize_interview ───────────────────────────────────────────────────────

struct Finalize(Arc<KitInner>);

#[async_trait]
impl ToolHandler for Finalize {
    async fn call(&self, ctx: &mut ToolContext<'_>, _arguments: Value) -> Result<String, ToolError> {
        finalize(&self.0, ctx).await
    }
}

async fn finalize(kit: &KitInner, ctx: &mut ToolContext<'_>) -> Result<String, ToolError> {
    let interview_id = kit.plan.interview_id.as_str();
    let session_id = ctx.session_id();

    let state = ctx.interview_mut(interview_id)?;
    if state.is_empty() {
        return Err(SwitchboardError::NoDataCollected {
            interview: interview_id.to_string(),
        }
        .into());
    }
    let raw = state.to_json().to_string();

    let record = match kit.parser.parse(&raw, &kit.plan.schema).await? {
        ParseOutcome::Parsed(record) => record,
        ParseOutcome::Refused { reason } => {
            warn!(session_id = %session_id, interview = %interview_id, reason = %reason, "parser refused interview data");
            return Err(SwitchboardError::ParseFailed {
                reason: format!("parser refused: {}", reason),
            }
            .into());
        }
        ParseOutcome::Failed { reason } => {
            warn!(session_id = %session_id, interview = %interview_id, reason = %reason, "parser failed on interview data");
            return Err(SwitchboardError::ParseFailed { reason }.into());
        }
    };

    kit.validator.validate_record(&kit.plan.schema, &record)?;

    ctx.interview_mut(interview_id)?.reset();
    let json = record.to_value().to_string();
    ctx.push_record(interview_id, record)?;

    info!(session_id = %session_id, interview = %interview_id, "interview finalized");

    Ok(match ctx.post_finalize_handoff() {
        Some(target) => format!("{}\nThe interview is complete. Hand the conversation to {}.", json, target),
        None => json,
    })
}

// ── Tests ────────────────────────────────────────────────────────────────────
