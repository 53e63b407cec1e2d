//! Structured extraction through a chat-completions model.
//!
//! The record schema goes out as a strict `json_schema` response format at
//! temperature 0, so the model either returns an object that fits the
//! schema or refuses. A refusal becomes `ParseOutcome::Refused`; a reply
//! with no usable content becomes `ParseOutcome::Failed`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use switchboard_contracts::{
    error::SwitchboardResult,
    record::{ParseOutcome, RecordSchema, StructuredRecord},
};
use switchboard_core::{
    config::{Credentials, ModelConfig},
    traits::ParsingCollaborator,
};

use crate::http::JsonClient;

const SYSTEM_PROMPT: &str = "You extract and structure user data from text. \
Extract the information and format it according to the schema.";

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
    refusal: Option<String>,
}

/// Response format names may only use `[A-Za-z0-9_-]`.
fn format_name(schema_id: &str) -> String {
    schema_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

fn request_body(model: &str, raw: &str, schema: &RecordSchema) -> Value {
    json!({
        "model": model,
        "temperature": 0.0,
        "messages": [
            { "role": "system", "content": SYSTEM_PROMPT },
            { "role": "user", "content": format!("Please extract and structure the following data: {}", raw) },
        ],
        "response_format": {
            "type": "json_schema",
            "json_schema": {
                "name": format_name(&schema.schema_id),
                "strict": true,
                "schema": schema.to_json_schema(),
            },
        },
    })
}

fn outcome(response: CompletionResponse, schema: &RecordSchema) -> ParseOutcome {
    let Some(choice) = response.choices.into_iter().next() else {
        return ParseOutcome::Failed {
            reason: "model returned no choices".to_string(),
        };
    };
    if let Some(refusal) = choice.message.refusal {
        return ParseOutcome::Refused { reason: refusal };
    }
    let Some(content) = choice.message.content else {
        return ParseOutcome::Failed {
            reason: "model returned no parsed content".to_string(),
        };
    };
    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(values)) => ParseOutcome::Parsed(StructuredRecord {
            schema_id: schema.schema_id.clone(),
            values,
        }),
        Ok(_) => ParseOutcome::Failed {
            reason: "model content is not a JSON object".to_string(),
        },
        Err(e) => ParseOutcome::Failed {
            reason: format!("model content is not JSON: {}", e),
        },
    }
}

pub struct OpenAiRecordParser {
    http: JsonClient,
    model: String,
}

impl OpenAiRecordParser {
    pub fn new(config: &ModelConfig, credentials: &Credentials) -> SwitchboardResult<Self> {
        Ok(Self {
            http: JsonClient::new(&config.api_base, format!("Bearer {}", credentials.openai_api_key))?,
            model: config.parser_model.clone(),
        })
    }
}

#[async_trait]
impl ParsingCollaborator for OpenAiRecordParser {
    async fn parse(&self, raw: &str, schema: &RecordSchema) -> SwitchboardResult<ParseOutcome> {
        debug!(schema_id = %schema.schema_id, model = %self.model, "parsing interview data");
        let response: CompletionResponse = self
            .http
            .post("chat/completions", &request_body(&self.model, raw, schema))
            .await?;

        let outcome = outcome(response, schema);
        if !matches!(outcome, ParseOutcome::Parsed(_)) {
            warn!(schema_id = %schema.schema_id, outcome = ?outcome, "model did not produce a record");
        }
        Ok(outcome)
    }
}
