// libs/telephony-cell/src/models.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A call the dispatcher wants placed. `appointment_id` is the correlation identifier threaded
/// through the callback and voice URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundCall {
    pub appointment_id: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedCall {
    pub call_sid: String,
}

#[derive(Debug, Deserialize)]
pub struct TwilioCallResponse {
    pub sid: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TwilioErrorResponse {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Provider call states plus the `answered` callback event name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallStatus {
    Queued,
    Initiated,
    Ringing,
    Answered,
    InProgress,
    Completed,
    Busy,
    NoAnswer,
    Failed,
    Canceled,
}

/// What a callback means for the reminder record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Progress,
    Answered,
    Completed,
    Failed,
}

impl CallStatus {
    /// Lenient parse of the provider's status string. Unknown values yield `None` and must be
    /// ignored by the caller.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace('_', "-");
        let status = match normalized.as_str() {
            "queued" => CallStatus::Queued,
            "initiated" => CallStatus::Initiated,
            "ringing" => CallStatus::Ringing,
            "answered" => CallStatus::Answered,
            "in-progress" => CallStatus::InProgress,
            "completed" => CallStatus::Completed,
            "busy" => CallStatus::Busy,
            "no-answer" => CallStatus::NoAnswer,
            "failed" => CallStatus::Failed,
            "canceled" | "cancelled" => CallStatus::Canceled,
            _ => return None,
        };
        Some(status)
    }

    pub fn outcome(&self) -> CallOutcome {
        match self {
            CallStatus::Queued | CallStatus::Initiated | CallStatus::Ringing => CallOutcome::Progress,
            CallStatus::Answered | CallStatus::InProgress => CallOutcome::Answered,
            CallStatus::Completed => CallOutcome::Completed,
            CallStatus::Busy | CallStatus::NoAnswer | CallStatus::Failed | CallStatus::Canceled => {
                CallOutcome::Failed
            }
        }
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CallStatus::Queued => "queued",
            CallStatus::Initiated => "initiated",
            CallStatus::Ringing => "ringing",
            CallStatus::Answered => "answered",
            CallStatus::InProgress => "in-progress",
            CallStatus::Completed => "completed",
            CallStatus::Busy => "busy",
            CallStatus::NoAnswer => "no-answer",
            CallStatus::Failed => "failed",
            CallStatus::Canceled => "canceled",
        };
        write!(f, "{}", s)
    }
}

/// Form body of both callback classes. Every field is optional so a malformed delivery still
/// deserializes and can be acknowledged.
#[allow(dead_code)]
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TwilioStatusCallback {
    pub account_sid: Option<String>,
    pub call_sid: Option<String>,
    pub call_status: Option<String>,
    pub status_callback_event: Option<String>,
    pub dial_call_sid: Option<String>,
    pub dial_call_status: Option<String>,
    pub call_duration: Option<String>,
    pub to: Option<String>,
    pub from: Option<String>,
}

impl TwilioStatusCallback {
    pub fn from_form(body: &str) -> Result<Self, TelephonyError> {
        serde_urlencoded::from_str(body).map_err(|e| TelephonyError::MalformedCallback(e.to_string()))
    }

    /// Status carried by a call-progress callback.
    pub fn progress_status(&self) -> Option<&str> {
        self.call_status
            .as_deref()
            .or(self.status_callback_event.as_deref())
            .filter(|s| !s.trim().is_empty())
    }

    /// Status carried by a dial-result callback.
    pub fn dial_status(&self) -> Option<&str> {
        self.dial_call_status
            .as_deref()
            .or(self.call_status.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Error)]
pub enum TelephonyError {
    #[error("Telephony not configured")]
    NotConfigured,

    #[error("Invalid destination number: {0}")]
    InvalidNumber(String),

    #[error("Telephony request failed: {0}")]
    Request(String),

    #[error("Telephony API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed callback: {0}")]
    MalformedCallback(String),
}

impl From<reqwest::Error> for TelephonyError {
    fn from(e: reqwest::Error) -> Self {
        TelephonyError::Request(e.to_string())
    }
}
