// libs/reminder-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ==============================================================================
// REMINDER RECORD
// ==============================================================================

/// One outbound reminder attempt cycle for one appointment (`reminder_calls` row).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReminderCall {
    pub appointment_id: String,
    pub patient_id: String,
    #[serde(default)]
    pub patient_name: Option<String>,
    pub phone_number: String,
    pub provider_id: String,
    pub appointment_time: DateTime<Utc>,
    pub timezone: String,
    pub status: ReminderStatus,
    #[serde(default)]
    pub call_sid: Option<String>,
    #[serde(default)]
    pub call_attempts: i32,
    #[serde(default)]
    pub last_attempt_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_call_status: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl ReminderCall {
    /// Fresh `pending` record as the booking flow creates it.
    pub fn from_booking(new: NewReminder, now: DateTime<Utc>) -> Self {
        Self {
            appointment_id: new.appointment_id,
            patient_id: new.patient_id,
            patient_name: new.patient_name,
            phone_number: new.phone_number,
            provider_id: new.provider_id,
            appointment_time: new.appointment_time,
            timezone: new.timezone,
            status: ReminderStatus::Pending,
            call_sid: None,
            call_attempts: 0,
            last_attempt_at: None,
            last_call_status: None,
            created_at: Some(now),
            updated_at: now,
        }
    }

    /// Apply a persisted patch in memory, mirroring what the store does with it.
    pub fn apply_patch(&mut self, patch: &ReminderPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(call_sid) = &patch.call_sid {
            self.call_sid = call_sid.clone();
        }
        if let Some(attempts) = patch.call_attempts {
            self.call_attempts = attempts;
        }
        if let Some(at) = patch.last_attempt_at {
            self.last_attempt_at = Some(at);
        }
        if let Some(status) = &patch.last_call_status {
            self.last_call_status = Some(status.clone());
        }
        if let Some(time) = patch.appointment_time {
            self.appointment_time = time;
        }
        if let Some(patient_id) = &patch.patient_id {
            self.patient_id = patient_id.clone();
        }
        if let Some(name) = &patch.patient_name {
            self.patient_name = Some(name.clone());
        }
        if let Some(phone) = &patch.phone_number {
            self.phone_number = phone.clone();
        }
        if let Some(provider_id) = &patch.provider_id {
            self.provider_id = provider_id.clone();
        }
        if let Some(timezone) = &patch.timezone {
            self.timezone = timezone.clone();
        }
        self.updated_at = patch.updated_at;
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
    Pending,
    Calling,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl ReminderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReminderStatus::Completed | ReminderStatus::Failed | ReminderStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderStatus::Pending => "pending",
            ReminderStatus::Calling => "calling",
            ReminderStatus::InProgress => "in_progress",
            ReminderStatus::Completed => "completed",
            ReminderStatus::Failed => "failed",
            ReminderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ReminderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Partial update of a reminder row. `None` fields are left untouched; `call_sid: Some(None)`
/// clears the column.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReminderPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ReminderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_sid: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_attempts: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_attempt_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_call_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ReminderPatch {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            status: None,
            call_sid: None,
            call_attempts: None,
            last_attempt_at: None,
            last_call_status: None,
            appointment_time: None,
            patient_id: None,
            patient_name: None,
            phone_number: None,
            provider_id: None,
            timezone: None,
            updated_at: now,
        }
    }

    pub fn status(mut self, status: ReminderStatus) -> Self {
        self.status = Some(status);
        self
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

/// What the booking flow knows when it creates a reminder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReminder {
    pub appointment_id: String,
    pub patient_id: String,
    pub patient_name: Option<String>,
    pub phone_number: String,
    pub provider_id: String,
    pub appointment_time: DateTime<Utc>,
    pub timezone: String,
}

/// Dispatcher invocation parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub hours_before: Option<i64>,
    pub calling_hours_start: Option<u32>,
    pub calling_hours_end: Option<u32>,
    pub test_mode: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DispatchSummary {
    pub processed: u32,
    pub skipped: u32,
    pub failed: u32,
    pub results: Vec<DispatchResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DispatchResult {
    pub appointment_id: String,
    pub outcome: DispatchOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_sid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    Placed,
    RetryScheduled,
    Failed,
    /// The attempt could not be recorded, so no call was placed.
    NotAttempted,
    /// The attempt was counted but its result could not be written back.
    Unrecorded,
}

/// A telephony callback reduced to what the lifecycle cares about.
#[derive(Debug, Clone)]
pub struct CallStatusUpdate {
    pub appointment_id: Option<String>,
    pub call_sid: Option<String>,
    /// Raw provider status string; unknown values are ignored.
    pub status: Option<String>,
}

/// Voice platform session-end notification.
#[derive(Debug, Clone)]
pub struct ChatEndedNotice {
    pub chat_id: String,
    pub config_id: Option<String>,
    pub custom_session_id: Option<String>,
}

/// Where the active-call lookup found its record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LookupSource {
    Correlation,
    InProgressFallback,
    CallingFallback,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActiveCall {
    pub record: ReminderCall,
    pub source: LookupSource,
    /// More than one record shared the fallback tier that produced this match.
    pub ambiguous: bool,
}

/// Neutral result of a lifecycle operation. Core operations never fail outward.
#[derive(Debug, Clone, PartialEq)]
pub enum ReminderOutcome {
    Applied(ReminderStatus),
    Unchanged(ReminderStatus),
    Ignored(String),
    Skipped(String),
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Error)]
pub enum ReminderError {
    #[error("Reminder not found for appointment {0}")]
    NotFound(String),

    #[error("Reminder store not configured")]
    StoreUnavailable,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Call placement failed: {0}")]
    PlacementFailed(String),

    #[error("Invalid dispatch window: {0}")]
    InvalidWindow(String),
}
