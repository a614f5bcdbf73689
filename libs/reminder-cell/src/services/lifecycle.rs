// libs/reminder-cell/src/services/lifecycle.rs
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::models::{ReminderCall, ReminderPatch, ReminderStatus};

/// Attempts after which a failed call is no longer retried.
pub const MAX_CALL_ATTEMPTS: i32 = 3;

/// Everything that can move a reminder record.
#[derive(Debug, Clone, PartialEq)]
pub enum ReminderEvent {
    /// The dispatcher is about to dial. Counts the attempt while the record stays pending.
    AttemptStarted,
    /// The dispatcher placed a call.
    CallPlaced { call_sid: String },
    /// The dispatcher tried to place a call and the provider refused.
    PlacementFailed { reason: String },
    /// Queued/initiated/ringing. Recorded, never transitions.
    CallProgress { call_sid: Option<String>, status: String },
    CallAnswered { call_sid: Option<String> },
    CallCompleted { call_sid: Option<String> },
    /// Busy, no-answer, failed or canceled at the provider.
    CallFailed { call_sid: Option<String>, status: String },
    /// Voice session for the outbound config ended.
    SessionEnded,
    Cancelled,
    Rescheduled { appointment_time: DateTime<Utc> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Apply(ReminderPatch),
    NoOp,
    Ignored(String),
}

pub struct ReminderLifecycle;

impl ReminderLifecycle {
    /// Transition table. Pure: the caller persists the patch.
    pub fn apply(record: &ReminderCall, event: ReminderEvent, now: DateTime<Utc>) -> Transition {
        use ReminderStatus::*;

        debug!(
            "Evaluating {:?} for appointment {} in status {}",
            event, record.appointment_id, record.status
        );

        match event {
            ReminderEvent::AttemptStarted => match record.status {
                Pending => Transition::Apply(ReminderPatch {
                    call_attempts: Some(record.call_attempts + 1),
                    last_attempt_at: Some(now),
                    ..ReminderPatch::at(now)
                }),
                other => Transition::Ignored(format!("attempt started while {}", other)),
            },

            // The attempt was already counted by `AttemptStarted`.
            ReminderEvent::CallPlaced { call_sid } => match record.status {
                Pending => Transition::Apply(ReminderPatch {
                    status: Some(Calling),
                    call_sid: Some(Some(call_sid)),
                    ..ReminderPatch::at(now)
                }),
                other => Transition::Ignored(format!("call placed while {}", other)),
            },

            ReminderEvent::PlacementFailed { reason } => match record.status {
                Pending => Transition::Apply(ReminderPatch {
                    status: Some(Self::retry_or_fail(record.call_attempts)),
                    call_sid: Some(None),
                    last_call_status: Some(format!("placement_failed: {}", reason)),
                    ..ReminderPatch::at(now)
                }),
                other => Transition::Ignored(format!("placement failure while {}", other)),
            },

            ReminderEvent::CallProgress { call_sid, status } => {
                if let Some(reason) = Self::stale(record, call_sid.as_deref()) {
                    return Transition::Ignored(reason);
                }
                match record.status {
                    Calling => Transition::Apply(ReminderPatch {
                        last_call_status: Some(status),
                        ..ReminderPatch::at(now)
                    }),
                    _ => Transition::NoOp,
                }
            }

            ReminderEvent::CallAnswered { call_sid } => {
                if let Some(reason) = Self::stale(record, call_sid.as_deref()) {
                    return Transition::Ignored(reason);
                }
                match record.status {
                    Calling => Transition::Apply(ReminderPatch {
                        last_call_status: Some("answered".to_string()),
                        ..ReminderPatch::at(now).status(InProgress)
                    }),
                    InProgress => Transition::NoOp,
                    other => Transition::Ignored(format!("answered while {}", other)),
                }
            }

            ReminderEvent::CallCompleted { call_sid } => {
                if let Some(reason) = Self::stale(record, call_sid.as_deref()) {
                    return Transition::Ignored(reason);
                }
                Self::complete(record, now, Some("completed"))
            }

            ReminderEvent::SessionEnded => Self::complete(record, now, None),

            ReminderEvent::CallFailed { call_sid, status } => {
                if let Some(reason) = Self::stale(record, call_sid.as_deref()) {
                    return Transition::Ignored(reason);
                }
                match record.status {
                    Calling | InProgress => Transition::Apply(ReminderPatch {
                        status: Some(Self::retry_or_fail(record.call_attempts)),
                        call_sid: Some(None),
                        last_call_status: Some(status),
                        ..ReminderPatch::at(now)
                    }),
                    other => Transition::Ignored(format!("call {} while {}", status, other)),
                }
            }

            ReminderEvent::Cancelled => match record.status {
                Cancelled => Transition::NoOp,
                Completed => Transition::Ignored("reminder already completed".to_string()),
                _ => Transition::Apply(ReminderPatch::at(now).status(Cancelled)),
            },

            ReminderEvent::Rescheduled { appointment_time } => Transition::Apply(ReminderPatch {
                status: Some(Pending),
                call_sid: Some(None),
                appointment_time: Some(appointment_time),
                ..ReminderPatch::at(now)
            }),
        }
    }

    fn complete(record: &ReminderCall, now: DateTime<Utc>, raw: Option<&str>) -> Transition {
        match record.status {
            ReminderStatus::Calling | ReminderStatus::InProgress => Transition::Apply(ReminderPatch {
                last_call_status: raw.map(str::to_string),
                ..ReminderPatch::at(now).status(ReminderStatus::Completed)
            }),
            ReminderStatus::Completed => Transition::NoOp,
            other => Transition::Ignored(format!("completion while {}", other)),
        }
    }

    fn retry_or_fail(attempts: i32) -> ReminderStatus {
        if attempts >= MAX_CALL_ATTEMPTS {
            ReminderStatus::Failed
        } else {
            ReminderStatus::Pending
        }
    }

    /// A callback naming a different call than the one on record belongs to an earlier attempt.
    fn stale(record: &ReminderCall, call_sid: Option<&str>) -> Option<String> {
        match (record.call_sid.as_deref(), call_sid) {
            (Some(current), Some(incoming)) if current != incoming => Some(format!(
                "callback for call {} but current call is {}",
                incoming, current
            )),
            _ => None,
        }
    }
}
