// libs/voice-cell/src/models.rs
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use reminder_cell::models::LookupSource;
use scheduling_cell::SchedulingError;

// ==============================================================================
// WEBHOOK EVENTS
// ==============================================================================

/// Voice platform webhook body, discriminated by `event_name`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event_name", rename_all = "snake_case")]
pub enum WebhookEvent {
    ChatStarted(ChatStartedEvent),
    ChatEnded(ChatEndedEvent),
    ToolCall(ToolCallEvent),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatStartedEvent {
    pub chat_id: String,
    #[serde(default)]
    pub chat_group_id: Option<String>,
    #[serde(default)]
    pub config_id: Option<String>,
    #[serde(default)]
    pub caller_number: Option<String>,
    #[serde(default)]
    pub custom_session_id: Option<String>,
    #[serde(default)]
    pub chat_start_type: Option<String>,
    #[serde(default)]
    pub start_time: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatEndedEvent {
    pub chat_id: String,
    #[serde(default)]
    pub chat_group_id: Option<String>,
    #[serde(default)]
    pub config_id: Option<String>,
    #[serde(default)]
    pub caller_number: Option<String>,
    #[serde(default)]
    pub custom_session_id: Option<String>,
    #[serde(default)]
    pub end_reason: Option<String>,
    #[serde(default)]
    pub duration_seconds: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallEvent {
    pub chat_id: String,
    #[serde(default)]
    pub config_id: Option<String>,
    #[serde(default)]
    pub caller_number: Option<String>,
    #[serde(default)]
    pub custom_session_id: Option<String>,
    pub tool_call_message: ToolCallMessage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallMessage {
    pub tool_call_id: String,
    pub name: String,
    /// Object or JSON-encoded text; see `ToolCall::parse`.
    #[serde(default)]
    pub parameters: Value,
    #[serde(default)]
    pub response_required: Option<bool>,
}

// ==============================================================================
// TOOL CALLS
// ==============================================================================

/// A validated tool invocation. Parameters are checked once, here.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    TellDadJoke,
    GetReminderContext(ReminderContextParams),
    FindPatient(FindPatientParams),
    CheckAvailability(CheckAvailabilityParams),
    BookAppointment(BookAppointmentParams),
    RescheduleAppointment(RescheduleParams),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReminderContextParams {
    #[serde(default)]
    pub correlation_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FindPatientParams {
    pub phone_number: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CheckAvailabilityParams {
    pub date: NaiveDate,
    #[serde(default)]
    pub days: Option<u32>,
    #[serde(default)]
    pub provider_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BookAppointmentParams {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub provider_id: String,
    #[serde(default)]
    pub operatory_id: Option<String>,
    /// RFC 3339, or local wall time interpreted in `timezone`.
    pub start_time: String,
    #[serde(default)]
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RescheduleParams {
    pub appointment_id: String,
    #[serde(default)]
    pub new_start_time: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub cancelled: bool,
}

impl ToolCall {
    pub fn parse(name: &str, parameters: &Value) -> Result<Self, ToolError> {
        // Normalised per arm, so an unknown name is reported as such whatever the parameters.
        let params = || normalize_parameters(name, parameters);

        let call = match name {
            "tell_dad_joke" => {
                params()?;
                ToolCall::TellDadJoke
            }
            "get_reminder_context" => ToolCall::GetReminderContext(typed(name, params()?)?),
            "find_patient" => ToolCall::FindPatient(typed(name, params()?)?),
            "check_availability" => ToolCall::CheckAvailability(typed(name, params()?)?),
            "book_appointment" => ToolCall::BookAppointment(typed(name, params()?)?),
            "reschedule_appointment" => ToolCall::RescheduleAppointment(typed(name, params()?)?),
            other => return Err(ToolError::UnknownTool(other.to_string())),
        };

        Ok(call)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::TellDadJoke => "tell_dad_joke",
            ToolCall::GetReminderContext(_) => "get_reminder_context",
            ToolCall::FindPatient(_) => "find_patient",
            ToolCall::CheckAvailability(_) => "check_availability",
            ToolCall::BookAppointment(_) => "book_appointment",
            ToolCall::RescheduleAppointment(_) => "reschedule_appointment",
        }
    }
}

/// Parameters arrive as an object, as JSON-encoded text, or not at all.
fn normalize_parameters(name: &str, parameters: &Value) -> Result<Value, ToolError> {
    match parameters {
        Value::Null => Ok(Value::Object(Map::new())),
        Value::Object(_) => Ok(parameters.clone()),
        Value::String(text) if text.trim().is_empty() => Ok(Value::Object(Map::new())),
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => Ok(Value::Object(map)),
            Ok(Value::Null) => Ok(Value::Object(Map::new())),
            Ok(other) => Err(ToolError::InvalidParameters {
                tool: name.to_string(),
                message: format!("expected an object, got {}", other),
            }),
            Err(e) => Err(ToolError::InvalidParameters {
                tool: name.to_string(),
                message: format!("parameters are not valid JSON: {}", e),
            }),
        },
        other => Err(ToolError::InvalidParameters {
            tool: name.to_string(),
            message: format!("expected an object, got {}", other),
        }),
    }
}

fn typed<T: DeserializeOwned>(name: &str, params: Value) -> Result<T, ToolError> {
    serde_json::from_value(params).map_err(|e| ToolError::InvalidParameters {
        tool: name.to_string(),
        message: e.to_string(),
    })
}

// ==============================================================================
// TOOL RESULTS
// ==============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Joke(String),
    ReminderContext(ReminderContext),
    NoActiveCall,
    PatientFound { patient_id: String, name: String },
    PatientNotFound,
    Availability(Vec<OpenSlot>),
    Booked(BookedAppointment),
    Rescheduled(BookedAppointment),
    Cancelled { appointment_id: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReminderContext {
    pub appointment_id: String,
    pub patient_name: Option<String>,
    pub provider_id: String,
    /// Appointment time in the appointment's own timezone.
    pub local_time: DateTime<FixedOffset>,
    pub source: LookupSource,
    pub ambiguous: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenSlot {
    pub provider_id: String,
    pub operatory_id: Option<String>,
    pub time: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookedAppointment {
    pub appointment_id: String,
    pub local_time: DateTime<FixedOffset>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid parameters for {tool}: {message}")]
    InvalidParameters { tool: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Scheduling failed: {0}")]
    Scheduling(#[from] SchedulingError),

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl ToolError {
    /// Error code sent on the control channel.
    pub fn code(&self) -> &'static str {
        match self {
            ToolError::UnknownTool(_) => "UnknownTool",
            ToolError::InvalidParameters { .. } => "InvalidParameters",
            ToolError::NotFound(_) => "NotFound",
            ToolError::Scheduling(_) => "SchedulingError",
            ToolError::Unavailable(_) => "ServiceUnavailable",
        }
    }
}

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("Voice platform not configured")]
    NotConfigured,

    #[error("Control channel request failed: {0}")]
    Request(String),

    #[error("Control channel error ({status}): {message}")]
    Api { status: u16, message: String },
}

impl From<reqwest::Error> for VoiceError {
    fn from(e: reqwest::Error) -> Self {
        VoiceError::Request(e.to_string())
    }
}
