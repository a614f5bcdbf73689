// libs/reminder-cell/src/services/eligibility.rs
use chrono::{DateTime, Duration, Timelike, Utc};
use chrono_tz::Tz;
use tracing::{debug, warn};

use crate::models::{DispatchRequest, ReminderCall, ReminderError, ReminderStatus};

pub const DEFAULT_HOURS_BEFORE: i64 = 24;
pub const DEFAULT_CALLING_HOURS_START: u32 = 9;
pub const DEFAULT_CALLING_HOURS_END: u32 = 19;
/// Widest reminder threshold a dispatch request may ask for: one year.
pub const MAX_HOURS_BEFORE: i64 = 366 * 24;

/// Validated dispatcher parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchWindow {
    pub hours_before: i64,
    pub start_hour: u32,
    pub end_hour: u32,
    pub test_mode: bool,
}

impl Default for DispatchWindow {
    fn default() -> Self {
        Self {
            hours_before: DEFAULT_HOURS_BEFORE,
            start_hour: DEFAULT_CALLING_HOURS_START,
            end_hour: DEFAULT_CALLING_HOURS_END,
            test_mode: false,
        }
    }
}

impl DispatchWindow {
    /// Fill defaults and reject windows that can never match.
    pub fn from_request(request: &DispatchRequest, default_test_mode: bool) -> Result<Self, ReminderError> {
        let window = Self {
            hours_before: request.hours_before.unwrap_or(DEFAULT_HOURS_BEFORE),
            start_hour: request.calling_hours_start.unwrap_or(DEFAULT_CALLING_HOURS_START),
            end_hour: request.calling_hours_end.unwrap_or(DEFAULT_CALLING_HOURS_END),
            test_mode: request.test_mode.unwrap_or(default_test_mode),
        };

        if !(0..=MAX_HOURS_BEFORE).contains(&window.hours_before) {
            return Err(ReminderError::InvalidWindow(format!(
                "hours_before must be between 0 and {}",
                MAX_HOURS_BEFORE
            )));
        }
        if window.start_hour > 23 || window.end_hour == 0 || window.end_hour > 24 {
            return Err(ReminderError::InvalidWindow(format!(
                "calling hours {}..{} out of range",
                window.start_hour, window.end_hour
            )));
        }
        if window.start_hour >= window.end_hour {
            return Err(ReminderError::InvalidWindow(format!(
                "calling_hours_start {} must be before calling_hours_end {}",
                window.start_hour, window.end_hour
            )));
        }

        Ok(window)
    }
}

/// Parse an IANA zone name, falling back to the deployment default.
pub fn resolve_timezone(name: &str, default: Tz) -> Tz {
    match name.trim().parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            warn!("Unknown timezone '{}', falling back to {}", name, default);
            default
        }
    }
}

/// Whether the dispatcher should call this record now.
pub fn is_due(record: &ReminderCall, window: &DispatchWindow, now: DateTime<Utc>, default_tz: Tz) -> bool {
    if window.test_mode {
        return true;
    }

    if record.status != ReminderStatus::Pending {
        return false;
    }

    let tz = resolve_timezone(&record.timezone, default_tz);
    let local_now = now.with_timezone(&tz);
    let local_appointment = record.appointment_time.with_timezone(&tz);

    let Some(threshold) = Duration::try_hours(window.hours_before) else {
        return false;
    };
    let until = local_appointment.signed_duration_since(local_now);
    if until < Duration::zero() || until > threshold {
        debug!(
            "Appointment {} is {}s away, outside the {}h window",
            record.appointment_id,
            until.num_seconds(),
            window.hours_before
        );
        return false;
    }

    let local_hour = local_now.hour();
    let within_hours = local_hour >= window.start_hour && local_hour < window.end_hour;
    if !within_hours {
        debug!(
            "Local hour {} in {} outside calling hours {}..{}",
            local_hour, tz, window.start_hour, window.end_hour
        );
    }
    within_hours
}
