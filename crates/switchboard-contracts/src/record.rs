//! Structured record schema and parse outcome types.
//!
//! A `RecordSchema` is what the parsing collaborator is asked to produce; a
//! `StructuredRecord` is what it returns. The collaborator either returns a
//! conforming record or an explicit refusal / failure, never a value that
//! violates the schema.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// The semantic type of one record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SemanticType {
    Integer,
    Number,
    Text,
    Email,
    /// A string of exactly `len` ASCII digits (e.g. a 10-digit phone number).
    Digits { len: usize },
}

impl SemanticType {
    /// Whether values of this type are JSON numbers.
    pub fn is_numeric(self) -> bool {
        matches!(self, SemanticType::Integer | SemanticType::Number)
    }
}

/// One declared field of a record schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordField {
    pub name: String,
    pub kind: SemanticType,
    pub description: String,
}

impl RecordField {
    pub fn new(name: impl Into<String>, kind: SemanticType, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
        }
    }
}

/// The target shape of an extraction pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSchema {
    /// Unique identifier (e.g. "daily-data-v1").
    pub schema_id: String,
    pub fields: Vec<RecordField>,
}

impl RecordSchema {
    pub fn new(schema_id: impl Into<String>, fields: Vec<RecordField>) -> Self {
        Self {
            schema_id: schema_id.into(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&RecordField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Render the schema as a strict JSON Schema document: every field
    /// required, no additional properties.
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| {
                let schema = match f.kind {
                    SemanticType::Integer => json!({ "type": "integer" }),
                    SemanticType::Number => json!({ "type": "number" }),
                    SemanticType::Text => json!({ "type": "string" }),
                    SemanticType::Email => {
                        json!({ "type": "string", "pattern": crate::tool::EMAIL_PATTERN })
                    }
                    SemanticType::Digits { len } => {
                        json!({ "type": "string", "pattern": format!("^\\d{{{len}}}$") })
                    }
                };
                let mut schema = schema;
                schema["description"] = json!(f.description);
                (f.name.clone(), schema)
            })
            .collect();
        let required: Vec<Value> = self.fields.iter().map(|f| json!(f.name)).collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }
}

/// Typed output of an extraction pass, already checked against its schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredRecord {
    pub schema_id: String,
    pub values: Map<String, Value>,
}

impl StructuredRecord {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone())
    }
}

/// What the parsing collaborator returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ParseOutcome {
    Parsed(StructuredRecord),
    /// The collaborator declined to extract (e.g. a model refusal).
    Refused { reason: String },
    /// The collaborator could not produce a conforming value.
    Failed { reason: String },
}
