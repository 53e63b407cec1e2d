//! Tool descriptor, parameter schema, and invocation record types.
//!
//! A tool is described declaratively here; the callable half (the handler)
//! lives in switchboard-core. The descriptor is what the model collaborator
//! sees, what the validator checks arguments against, and what the policy
//! engine matches on.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Pattern used for `FieldConstraint::Email`.
///
/// JSON Schema `format` assertions are optional in most validators, so email
/// checks are expressed as a plain pattern.
pub const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

/// Primitive type of a single tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
}

impl ParamKind {
    /// The JSON Schema `type` keyword for this kind.
    pub fn json_type(self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
        }
    }
}

/// A format constraint on a single parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldConstraint {
    /// Inclusive numeric bounds. Either side may be open.
    Range { min: Option<f64>, max: Option<f64> },
    /// The string value must match this regular expression.
    Pattern { regex: String },
    /// The string value must look like an email address.
    Email,
    /// The value must equal one of `values`.
    OneOf { values: Vec<Value> },
}

impl FieldConstraint {
    /// JSON Schema keywords expressing this constraint.
    fn keywords(&self) -> Vec<(&'static str, Value)> {
        match self {
            FieldConstraint::Range { min, max } => {
                let mut out = Vec::new();
                if let Some(min) = min {
                    out.push(("minimum", json!(min)));
                }
                if let Some(max) = max {
                    out.push(("maximum", json!(max)));
                }
                out
            }
            FieldConstraint::Pattern { regex } => vec![("pattern", json!(regex))],
            FieldConstraint::Email => vec![("pattern", json!(EMAIL_PATTERN))],
            FieldConstraint::OneOf { values } => vec![("enum", Value::Array(values.clone()))],
        }
    }
}

/// One declared parameter of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterField {
    pub name: String,
    pub description: String,
    pub kind: ParamKind,
    pub required: bool,
    #[serde(default)]
    pub constraints: Vec<FieldConstraint>,
}

impl ParameterField {
    /// A required parameter with no constraints.
    pub fn required(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind,
            required: true,
            constraints: Vec::new(),
        }
    }

    /// An optional parameter with no constraints.
    pub fn optional(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }

    pub fn with_constraint(mut self, constraint: FieldConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    fn to_json_schema(&self) -> Value {
        let mut schema = Map::new();
        schema.insert("type".to_string(), json!(self.kind.json_type()));
        schema.insert("description".to_string(), json!(self.description));

        // Colliding keywords (two patterns, say) move into an allOf block so
        // neither constraint is silently dropped.
        let mut overflow = Vec::new();
        for constraint in &self.constraints {
            for (keyword, value) in constraint.keywords() {
                if schema.contains_key(keyword) {
                    overflow.push(json!({ keyword: value }));
                } else {
                    schema.insert(keyword.to_string(), value);
                }
            }
        }
        if !overflow.is_empty() {
            schema.insert("allOf".to_string(), Value::Array(overflow));
        }

        Value::Object(schema)
    }
}

/// The ordered parameter list of a tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    pub fields: Vec<ParameterField>,
}

impl ParameterSchema {
    /// A schema that accepts an empty (or any) object.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, field: ParameterField) -> Self {
        self.fields.push(field);
        self
    }

    /// Render this schema as a JSON Schema object document.
    ///
    /// The same document is handed to the model collaborator as the tool's
    /// parameter description and to the validator for argument checks.
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.to_json_schema()))
            .collect();
        let required: Vec<Value> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| json!(f.name))
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Whether a handler may be safely re-run after a transient failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Idempotency {
    #[default]
    Idempotent,
    NonIdempotent,
}

/// The session-owned state a tool is allowed to touch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum StateScope {
    /// The tool reads and writes nothing beyond its own arguments.
    #[default]
    Stateless,
    /// The tool owns the interview episode with this id.
    Interview(String),
}

/// The declarative half of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique within the owning agent's tool set.
    pub name: String,
    pub description: String,
    pub parameters: ParameterSchema,
    /// When true, every call suspends until a human approves or denies it.
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default)]
    pub idempotency: Idempotency,
    #[serde(default)]
    pub scope: StateScope,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ParameterSchema,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            requires_approval: false,
            idempotency: Idempotency::Idempotent,
            scope: StateScope::Stateless,
        }
    }

    pub fn requiring_approval(mut self) -> Self {
        self.requires_approval = true;
        self
    }

    pub fn non_idempotent(mut self) -> Self {
        self.idempotency = Idempotency::NonIdempotent;
        self
    }

    pub fn scoped(mut self, scope: StateScope) -> Self {
        self.scope = scope;
        self
    }
}

/// A tool-call request emitted by the model on behalf of the active agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier assigned by the model collaborator; echoed in the outcome.
    pub call_id: String,
    pub tool_name: String,
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(call_id: impl Into<String>, tool_name: impl Into<String>, arguments: Value) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

/// How a tool invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Ok,
    /// Arguments failed schema validation, or the tool is unknown.
    InputError,
    /// The handler ran and reported a failure.
    ExecutionError,
    /// Policy or a human approver refused the call.
    Denied,
    /// The session was torn down while the call was in flight.
    Cancelled,
}

/// The result of one tool invocation as seen by the issuing agent.
///
/// `result_text` is the only channel through which a tool influences the
/// model's next turn. Errors travel through it too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub call_id: String,
    pub tool_name: String,
    pub result_text: String,
    pub status: ToolStatus,
}

impl ToolOutcome {
    pub fn new(call: &ToolCall, status: ToolStatus, result_text: impl Into<String>) -> Self {
        Self {
            call_id: call.call_id.clone(),
            tool_name: call.tool_name.clone(),
            result_text: result_text.into(),
            status,
        }
    }

    pub fn ok(call: &ToolCall, result_text: impl Into<String>) -> Self {
        Self::new(call, ToolStatus::Ok, result_text)
    }

    pub fn is_ok(&self) -> bool {
        self.status == ToolStatus::Ok
    }
}

/// A request from the active agent to transfer the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffDirective {
    pub target: crate::agent::AgentName,
    pub reason: Option<String>,
}

impl HandoffDirective {
    pub fn to(target: impl Into<String>) -> Self {
        Self {
            target: crate::agent::AgentName::new(target),
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}
