// libs/scheduling-cell/src/models.rs
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

// ==============================================================================
// RESPONSE ENVELOPE
// ==============================================================================

/// Every scheduling API response wraps its payload the same way.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub code: bool,
    #[serde(default)]
    pub description: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    /// Human-readable failure reason from `error`, falling back to `description`.
    pub fn failure_message(&self) -> String {
        self.error
            .as_ref()
            .or(self.description.as_ref())
            .map(flatten_message)
            .unwrap_or_else(|| "unknown scheduling API error".to_string())
    }
}

fn flatten_message(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(flatten_message)
            .collect::<Vec<_>>()
            .join("; "),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
pub struct AuthenticateData {
    pub token: String,
}

/// Identifiers arrive as numbers from some endpoints and strings from others.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

// ==============================================================================
// DOMAIN MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub bio: Option<PatientBio>,
}

impl Patient {
    pub fn display_name(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.to_string();
        }
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn phone_number(&self) -> Option<&str> {
        self.bio.as_ref().and_then(|b| b.phone_number.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PatientBio {
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub patient_id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub provider_id: String,
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub operatory_id: Option<String>,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancelled: bool,
    #[serde(default)]
    pub confirmed: bool,
}

/// Open slots for one provider at one location.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSlots {
    #[serde(deserialize_with = "string_or_number")]
    pub lid: String,
    #[serde(deserialize_with = "string_or_number")]
    pub pid: String,
    #[serde(default)]
    pub slots: Vec<Slot>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Slot {
    pub time: DateTime<FixedOffset>,
    #[serde(default)]
    pub end_time: Option<DateTime<FixedOffset>>,
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub operatory_id: Option<String>,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone)]
pub struct SlotQuery {
    pub start_date: NaiveDate,
    pub days: u32,
    pub provider_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub provider_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookingRequest {
    pub patient_id: String,
    pub provider_id: String,
    pub operatory_id: Option<String>,
    pub start_time: DateTime<Utc>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Error)]
pub enum SchedulingError {
    #[error("Scheduling API not configured")]
    NotConfigured,

    #[error("Scheduling API authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Scheduling API request failed: {0}")]
    Request(String),

    #[error("Scheduling API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unexpected scheduling API response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for SchedulingError {
    fn from(e: reqwest::Error) -> Self {
        SchedulingError::Request(e.to_string())
    }
}
