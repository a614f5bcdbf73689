// libs/voice-cell/src/services/presentation.rs
//! Spoken text for tool results. Kept apart from the tools so wording can change without
//! touching scheduling or reminder logic.

use chrono::{DateTime, FixedOffset};

use crate::models::{ToolError, ToolOutput};

/// Said when the reminder context cannot be loaded; the caller must never hear an internal error.
pub const CONTEXT_FALLBACK: &str =
    "Hi, this is a courtesy call from your dental office about your upcoming appointment.";

const MAX_SPOKEN_SLOTS: usize = 3;

pub fn render(output: &ToolOutput) -> String {
    match output {
        ToolOutput::Joke(joke) => joke.clone(),
        ToolOutput::ReminderContext(ctx) => {
            let greeting = match ctx.patient_name.as_deref() {
                Some(name) if !name.trim().is_empty() => format!("Hi {}, ", name),
                _ => "Hi, ".to_string(),
            };
            format!(
                "{}this is a reminder about your dental appointment on {}. Appointment reference {}.",
                greeting,
                spoken_time(&ctx.local_time),
                ctx.appointment_id
            )
        }
        ToolOutput::NoActiveCall => CONTEXT_FALLBACK.to_string(),
        ToolOutput::PatientFound { patient_id, name } => {
            format!("I found the patient record for {} (patient ID {}).", name, patient_id)
        }
        ToolOutput::PatientNotFound => {
            "I couldn't find a patient with that phone number.".to_string()
        }
        ToolOutput::Availability(slots) if slots.is_empty() => {
            "There are no open appointments in that range.".to_string()
        }
        ToolOutput::Availability(slots) => {
            let times: Vec<String> = slots
                .iter()
                .take(MAX_SPOKEN_SLOTS)
                .map(|s| spoken_time(&s.time))
                .collect();
            format!("The next open times are {}.", join_spoken(&times))
        }
        ToolOutput::Booked(booked) => format!(
            "You're all set for {}. Your confirmation number is {}.",
            spoken_time(&booked.local_time),
            booked.appointment_id
        ),
        ToolOutput::Rescheduled(booked) => format!(
            "Your appointment has been moved to {}.",
            spoken_time(&booked.local_time)
        ),
        ToolOutput::Cancelled { appointment_id } => {
            format!("Appointment {} has been cancelled.", appointment_id)
        }
    }
}

/// Content of a `tool_error` message.
pub fn render_error(error: &ToolError) -> String {
    match error {
        ToolError::UnknownTool(name) => format!("I don't know how to do '{}'.", name),
        ToolError::InvalidParameters { .. } => {
            "I'm missing some details to do that. Could you repeat them?".to_string()
        }
        ToolError::NotFound(_) => "I couldn't find that appointment.".to_string(),
        ToolError::Scheduling(_) | ToolError::Unavailable(_) => {
            "I'm having trouble reaching the scheduling system right now.".to_string()
        }
    }
}

fn spoken_time(time: &DateTime<FixedOffset>) -> String {
    time.format("%A, %B %-d at %-I:%M %p").to_string()
}

fn join_spoken(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [one] => one.clone(),
        [first, second] => format!("{} or {}", first, second),
        [init @ .., last] => format!("{}, or {}", init.join(", "), last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn spoken_time_uses_local_wall_clock() {
        let time = FixedOffset::west_opt(4 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 3, 10, 10, 0, 0)
            .unwrap();
        assert_eq!(spoken_time(&time), "Monday, March 10 at 10:00 AM");
    }

    #[test]
    fn joins_lists_for_speech() {
        let items = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(join_spoken(&items), "a, b, or c");
        assert_eq!(join_spoken(&items[..1]), "a");
    }
}
