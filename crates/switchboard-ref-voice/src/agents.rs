//! The five agents of the voice deployment and their handoff graph.
//!
//! ```text
//!                 ┌──────────────► Weather Agent ──────┐
//!                 │                     ▲              │
//!   Voice Agent ──┼──────────────► Stock Agent ────────┤
//!    (entry)      │                                    │
//!                 ├──────────────► Daily Check-in ─────┤
//!                 │                                    │
//!                 └──────────────► Contact Intake ─────┘──► back to Voice Agent
//! ```
//!
//! Every specialist can hand back to the hub. The stock agent can also
//! move sideways to weather; no other sideways moves exist.

use std::sync::Arc;

use serde_json::Value;

use switchboard_contracts::{
    error::SwitchboardResult,
    interview::{InterviewField, InterviewMode, InterviewPlan},
    record::{RecordField, RecordSchema, SemanticType},
    tool::{ParamKind, ParameterField, ParameterSchema, ToolDescriptor},
};
use switchboard_core::{
    agent::{AgentRegistry, AgentSpec},
    interview::InterviewKit,
    tool::{ToolError, ToolSpec},
    traits::{ParsingCollaborator, RecordValidator},
};

use crate::mock_data::{stock_quote, weather_report};

pub const VOICE_AGENT: &str = "Voice Agent";
pub const WEATHER_AGENT: &str = "Weather Agent";
pub const STOCK_AGENT: &str = "Stock Agent";
pub const DAILY_CHECKIN_AGENT: &str = "Daily Check-in Agent";
pub const CONTACT_INTAKE_AGENT: &str = "Contact Intake Agent";

pub const GET_WEATHER: &str = "get_weather";
pub const GET_STOCK_PRICE: &str = "get_stock_price";

pub const DAILY_CHECKIN: &str = "daily_checkin";
pub const CONTACT_INTAKE: &str = "contact_intake";

fn string_arg(arguments: &Value, name: &str) -> Result<String, ToolError> {
    arguments[name]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ToolError::Input(format!("'{}' must be a string", name)))
}

// ── Tools ─────────────────────────────────────────────────────────────────────

pub fn get_weather() -> ToolSpec {
    ToolSpec::from_fn(
        ToolDescriptor::new(
            GET_WEATHER,
            "Get the weather in a given location",
            ParameterSchema::empty().with_field(ParameterField::required(
                "location",
                ParamKind::String,
                "City or place name",
            )),
        ),
        |arguments: Value| async move { Ok::<_, ToolError>(weather_report(&string_arg(&arguments, "location")?)) },
    )
}

pub fn get_stock_price() -> ToolSpec {
    ToolSpec::from_fn(
        ToolDescriptor::new(
            GET_STOCK_PRICE,
            "Get the price of a given stock",
            ParameterSchema::empty().with_field(ParameterField::required(
                "stock",
                ParamKind::String,
                "Ticker symbol or company name",
            )),
        )
        .requiring_approval(),
        |arguments: Value| async move { Ok::<_, ToolError>(stock_quote(&string_arg(&arguments, "stock")?)) },
    )
}

// ── Interview plans ───────────────────────────────────────────────────────────

/// Four questions about the caller's day; the model flags the last answer.
pub fn daily_checkin_plan() -> InterviewPlan {
    InterviewPlan {
        interview_id: DAILY_CHECKIN.to_string(),
        mode: InterviewMode::CompletionFlag,
        fields: vec![
            InterviewField::new("daily_cigarettes", "How many cigarettes did you smoke today?"),
            InterviewField::new("daily_sleep", "How many hours did you sleep last night?"),
            InterviewField::new("daily_feeling", "How are you feeling today?"),
            InterviewField::new("daily_reason", "What made you smoke today?"),
        ],
        schema: RecordSchema::new(
            "daily_data",
            vec![
                RecordField::new("daily_cigarettes", SemanticType::Integer, "The number of cigarettes smoked today"),
                RecordField::new("daily_sleep", SemanticType::Number, "The number of hours slept last night"),
                RecordField::new("daily_feeling", SemanticType::Text, "How the user felt today"),
                RecordField::new("daily_reason", SemanticType::Text, "The reason for smoking today"),
            ],
        ),
        strict: false,
    }
}

/// Six contact details, asked strictly in order.
pub fn contact_intake_plan() -> InterviewPlan {
    InterviewPlan {
        interview_id: CONTACT_INTAKE.to_string(),
        mode: InterviewMode::IndexDriven,
        fields: vec![
            InterviewField::new("date", "What is today's date?"),
            InterviewField::new("name", "What is your full name?"),
            InterviewField::new("email", "What is your email address?"),
            InterviewField::new("phone", "What is your phone number?"),
            InterviewField::new("address", "What is your street address?"),
            InterviewField::new("city", "Which city do you live in?"),
        ],
        schema: RecordSchema::new(
            "contact_details",
            vec![
                RecordField::new("date", SemanticType::Text, "Date of the intake"),
                RecordField::new("name", SemanticType::Text, "Full name"),
                RecordField::new("email", SemanticType::Email, "Email address"),
                RecordField::new("phone", SemanticType::Digits { len: 10 }, "Ten-digit phone number"),
                RecordField::new("address", SemanticType::Text, "Street address"),
                RecordField::new("city", SemanticType::Text, "City"),
            ],
        ),
        strict: true,
    }
}

// ── Registry ──────────────────────────────────────────────────────────────────

/// Build the deployment's agent registry.
///
/// `parser` and `validator` back the two interviews' finalize step.
pub fn voice_registry(
    parser: Arc<dyn ParsingCollaborator>,
    validator: Arc<dyn RecordValidator>,
) -> SwitchboardResult<AgentRegistry> {
    let daily = InterviewKit::new(daily_checkin_plan(), parser.clone(), validator.clone());
    let contact = InterviewKit::new(contact_intake_plan(), parser, validator);

    AgentRegistry::builder()
        .register(
            AgentSpec::new(
                VOICE_AGENT,
                "You are a voice agent that can answer questions and help with tasks. \
                 When users want to switch topics or need help with different areas, \
                 hand them off to a specialist.",
            )
            .with_handoff_target(WEATHER_AGENT)
            .with_handoff_target(STOCK_AGENT)
            .with_handoff_target(DAILY_CHECKIN_AGENT)
            .with_handoff_target(CONTACT_INTAKE_AGENT),
        )
        .register(
            AgentSpec::new(
                WEATHER_AGENT,
                "Talk with a New York accent. You are an expert in weather. When users want \
                 to ask about other topics like stocks, or want to return to general \
                 assistance, hand them back to the main agent.",
            )
            .with_handoff_description("This agent is an expert in weather")
            .with_tool(get_weather())
            .with_handoff_target(VOICE_AGENT),
        )
        .register(
            AgentSpec::new(
                STOCK_AGENT,
                "You are an expert in stocks. When users want to ask about other topics like \
                 weather, or want to return to general assistance, hand them back to the \
                 main agent.",
            )
            .with_handoff_description("This agent is an expert in stock prices")
            .with_tool(get_stock_price())
            .with_handoff_target(VOICE_AGENT)
            .with_handoff_target(WEATHER_AGENT),
        )
        .register(
            AgentSpec::new(
                DAILY_CHECKIN_AGENT,
                "Ask the user about their day, one question at a time. Record each answer \
                 with record_field and set is_complete on the last one.",
            )
            .with_handoff_description("Runs the short daily smoking and sleep check-in")
            .with_tools(daily.tools())
            .with_handoff_target(VOICE_AGENT)
            .with_post_finalize_handoff(VOICE_AGENT),
        )
        .register(
            AgentSpec::new(
                CONTACT_INTAKE_AGENT,
                "Collect the user's contact details. Call get_current_field to learn what \
                 to ask, record each answer with record_field, and call finalize_interview \
                 once every field is collected.",
            )
            .with_handoff_description("Collects a new caller's contact details")
            .with_tools(contact.tools())
            .with_handoff_target(VOICE_AGENT)
            .with_post_finalize_handoff(VOICE_AGENT),
        )
        .build()
}
