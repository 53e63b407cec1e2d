//! A deterministic, offline `ParsingCollaborator`.
//!
//! `CoercingParser` reads the raw interview JSON and shapes it to the record
//! schema without calling a model:
//!
//! - `Integer` / `Number` fields accept numbers or numeric strings; anything
//!   else (including a missing field) becomes `0`.
//! - `Text` fields take strings as-is; other scalars are stringified and a
//!   missing field becomes `""`.
//! - `Digits` fields keep only the digits of the answer.
//! - `Email` fields are trimmed.
//!
//! Keys the schema does not declare are dropped. When an `Email` or `Digits`
//! answer still cannot satisfy its type, the outcome is `Refused`, so the
//! parser never hands back a record that violates the schema.

use async_trait::async_trait;
use serde_json::{Map, Number, Value};
use tracing::debug;

use switchboard_contracts::{
    error::SwitchboardResult,
    record::{ParseOutcome, RecordSchema, SemanticType, StructuredRecord},
};
use switchboard_core::traits::ParsingCollaborator;

#[derive(Debug, Clone, Copy, Default)]
pub struct CoercingParser;

impl CoercingParser {
    pub fn new() -> Self {
        Self
    }
}

fn as_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn coerce_integer(value: Option<&Value>) -> Value {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        }
        _ => None,
    };
    Value::from(parsed.unwrap_or(0))
}

fn coerce_number(value: Option<&Value>) -> Value {
    let parsed = match value {
        Some(Value::Number(n)) => return Value::Number(n.clone()),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().and_then(Number::from_f64),
        _ => None,
    };
    parsed.map(Value::Number).unwrap_or_else(|| Value::from(0))
}

fn looks_like_email(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !s.chars().any(char::is_whitespace)
                && !domain.contains('@')
        }
        None => false,
    }
}

impl CoercingParser {
    /// Shape `raw` into a record for `schema`.
    pub fn coerce(&self, raw: &str, schema: &RecordSchema) -> ParseOutcome {
        let input: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                return ParseOutcome::Failed {
                    reason: format!("interview data is not JSON: {}", e),
                }
            }
        };
        let Some(input) = input.as_object() else {
            return ParseOutcome::Failed {
                reason: "interview data is not a JSON object".to_string(),
            };
        };

        let mut values = Map::new();
        for field in &schema.fields {
            let answer = input.get(&field.name);
            let value = match field.kind {
                SemanticType::Integer => coerce_integer(answer),
                SemanticType::Number => coerce_number(answer),
                SemanticType::Text => Value::String(as_text(answer)),
                SemanticType::Email => {
                    let email = as_text(answer).trim().to_string();
                    if !looks_like_email(&email) {
                        return ParseOutcome::Refused {
                            reason: format!("'{}' is not an email address", email),
                        };
                    }
                    Value::String(email)
                }
                SemanticType::Digits { len } => {
                    let digits: String = as_text(answer).chars().filter(char::is_ascii_digit).collect();
                    if digits.len() != len {
                        return ParseOutcome::Refused {
                            reason: format!("field '{}' needs exactly {} digits, got {}", field.name, len, digits.len()),
                        };
                    }
                    Value::String(digits)
                }
            };
            values.insert(field.name.clone(), value);
        }

        debug!(schema_id = %schema.schema_id, fields = values.len(), "record coerced");
        ParseOutcome::Parsed(StructuredRecord {
            schema_id: schema.schema_id.clone(),
            values,
        })
    }
}

#[async_trait]
impl ParsingCollaborator for CoercingParser {
    async fn parse(&self, raw: &str, schema: &RecordSchema) -> SwitchboardResult<ParseOutcome> {
        Ok(self.coerce(raw, schema))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use switchboard_contracts::record::{ParseOutcome, RecordField, RecordSchema, SemanticType, StructuredRecord};
    use switchboard_core::traits::{ParsingCollaborator, RecordValidator};

    use super::CoercingParser;
    use crate::SchemaValidator;

    fn daily_schema() -> RecordSchema {
        RecordSchema::new(
            "daily-v1",
            vec![
                RecordField::new("daily_cigarettes", SemanticType::Integer, "Cigarettes today"),
                RecordField::new("daily_sleep", SemanticType::Number, "Hours slept"),
                RecordField::new("daily_feeling", SemanticType::Text, "How they feel"),
                RecordField::new("daily_reason", SemanticType::Text, "Why"),
            ],
        )
    }

    fn contact_schema() -> RecordSchema {
        RecordSchema::new(
            "contact-v1",
            vec![
                RecordField::new("email", SemanticType::Email, "Email"),
                RecordField::new("phone", SemanticType::Digits { len: 10 }, "Phone"),
            ],
        )
    }

    fn parsed(outcome: ParseOutcome) -> StructuredRecord {
        match outcome {
            ParseOutcome::Parsed(record) => record,
            other => panic!("expected Parsed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_numeric_strings_are_coerced() {
        let raw = json!({
            "daily_cigarettes": "5",
            "daily_sleep": "7",
            "daily_feeling": "ok",
            "daily_reason": "stress"
        })
        .to_string();

        let record = parsed(CoercingParser::new().parse(&raw, &daily_schema()).await.unwrap());

        assert_eq!(record.schema_id, "daily-v1");
        assert_eq!(record.get("daily_cigarettes"), Some(&json!(5)));
        assert_eq!(record.get("daily_sleep"), Some(&json!(7.0)));
        assert_eq!(record.get("daily_feeling"), Some(&json!("ok")));
        assert_eq!(record.get("daily_reason"), Some(&json!("stress")));
    }

    #[test]
    fn test_malformed_and_missing_values_default() {
        let raw = json!({ "daily_cigarettes": "a few", "daily_feeling": 3, "chatter": "dropped" }).to_string();

        let record = parsed(CoercingParser::new().coerce(&raw, &daily_schema()));

        assert_eq!(record.get("daily_cigarettes"), Some(&json!(0)));
        assert_eq!(record.get("daily_sleep"), Some(&json!(0)));
        assert_eq!(record.get("daily_feeling"), Some(&json!("3")));
        assert_eq!(record.get("daily_reason"), Some(&json!("")));
        assert!(record.get("chatter").is_none());
    }

    #[test]
    fn test_coerced_record_satisfies_its_schema() {
        let schema = daily_schema();
        let raw = json!({ "daily_cigarettes": "12.9", "daily_sleep": "six" }).to_string();
        let record = parsed(CoercingParser::new().coerce(&raw, &schema));

        assert_eq!(record.get("daily_cigarettes"), Some(&json!(12)));
        SchemaValidator::new().validate_record(&schema, &record).unwrap();
    }

    #[test]
    fn test_phone_keeps_only_digits() {
        let raw = json!({ "email": " ada@example.com ", "phone": "(555) 123-4567" }).to_string();
        let record = parsed(CoercingParser::new().coerce(&raw, &contact_schema()));

        assert_eq!(record.get("email"), Some(&json!("ada@example.com")));
        assert_eq!(record.get("phone"), Some(&json!("5551234567")));
    }

    #[test]
    fn test_unusable_answers_are_refused() {
        let parser = CoercingParser::new();

        let bad_email = json!({ "email": "ada at example", "phone": "5551234567" }).to_string();
        assert!(matches!(parser.coerce(&bad_email, &contact_schema()), ParseOutcome::Refused { .. }));

        let short_phone = json!({ "email": "ada@example.com", "phone": "12345" }).to_string();
        match parser.coerce(&short_phone, &contact_schema()) {
            ParseOutcome::Refused { reason } => assert!(reason.contains("10 digits")),
            other => panic!("expected Refused, got {:?}", other),
        }
    }

    #[test]
    fn test_non_object_input_fails() {
        let parser = CoercingParser::new();
        assert!(matches!(parser.coerce("not json", &daily_schema()), ParseOutcome::Failed { .. }));
        assert!(matches!(parser.coerce("[1, 2]", &daily_schema()), ParseOutcome::Failed { .. }));
    }
}
