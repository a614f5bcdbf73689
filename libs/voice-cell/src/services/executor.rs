// libs/voice-cell/src/services/executor.rs
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use rand::seq::SliceRandom;
use tracing::{info, instrument, warn};

use reminder_cell::models::{NewReminder, ReminderOutcome};
use reminder_cell::ReminderCallService;
use scheduling_cell::{BookingRequest, LogContext, NewPatient, SchedulingApi, SchedulingError, SlotQuery};
use shared_utils::phone::normalize_phone_number;

use crate::models::{
    BookAppointmentParams, BookedAppointment, CheckAvailabilityParams, FindPatientParams, OpenSlot,
    ReminderContext, ReminderContextParams, RescheduleParams, ToolCall, ToolError, ToolOutput,
};

const DEFAULT_AVAILABILITY_DAYS: u32 = 1;
const MAX_OPEN_SLOTS: usize = 10;

const DAD_JOKES: &[&str] = &[
    "Why don't scientists trust atoms? Because they make up everything.",
    "I only know 25 letters of the alphabet. I don't know y.",
    "Why did the scarecrow win an award? Because he was outstanding in his field.",
    "Why don't eggs tell jokes? They'd crack each other up.",
    "What do you call fake spaghetti? An impasta.",
    "I used to hate facial hair, but then it grew on me.",
    "What do you call a bear with no teeth? A gummy bear!",
    "What's the best thing about Switzerland? I don't know, but the flag is a big plus.",
    "Why did the math book look so sad? Because it was full of problems.",
];

/// Where a tool call came from.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub log: LogContext,
    pub custom_session_id: Option<String>,
    pub now: DateTime<Utc>,
}

/// Runs typed tool calls against the scheduling API and the reminder lifecycle.
pub struct ToolExecutor {
    scheduling: Arc<dyn SchedulingApi>,
    reminders: Arc<ReminderCallService>,
    default_timezone: Tz,
    default_country_code: String,
}

impl ToolExecutor {
    pub fn new(
        scheduling: Arc<dyn SchedulingApi>,
        reminders: Arc<ReminderCallService>,
        default_timezone: Tz,
        default_country_code: String,
    ) -> Self {
        Self {
            scheduling,
            reminders,
            default_timezone,
            default_country_code,
        }
    }

    #[instrument(skip(self, call, ctx), fields(tool = call.name(), chat_id = %ctx.log.chat_id))]
    pub async fn execute(&self, call: ToolCall, ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        match call {
            ToolCall::TellDadJoke => Ok(ToolOutput::Joke(dad_joke())),
            ToolCall::GetReminderContext(params) => Ok(self.reminder_context(params, ctx).await),
            ToolCall::FindPatient(params) => self.find_patient(params, ctx).await,
            ToolCall::CheckAvailability(params) => self.check_availability(params, ctx).await,
            ToolCall::BookAppointment(params) => self.book(params, ctx).await,
            ToolCall::RescheduleAppointment(params) => self.reschedule(params, ctx).await,
        }
    }

    async fn reminder_context(&self, params: ReminderContextParams, ctx: &ToolContext) -> ToolOutput {
        let correlation_id = params
            .correlation_id
            .filter(|id| !id.trim().is_empty())
            .or_else(|| ctx.custom_session_id.clone());

        match self.reminders.find_active_call(correlation_id.as_deref()).await {
            Some(active) => {
                let tz = self.timezone(Some(&active.record.timezone));
                ToolOutput::ReminderContext(ReminderContext {
                    appointment_id: active.record.appointment_id,
                    patient_name: active.record.patient_name,
                    provider_id: active.record.provider_id,
                    local_time: local(active.record.appointment_time, tz),
                    source: active.source,
                    ambiguous: active.ambiguous,
                })
            }
            None => {
                warn!("No active reminder call for chat {}", ctx.log.chat_id);
                ToolOutput::NoActiveCall
            }
        }
    }

    async fn find_patient(&self, params: FindPatientParams, ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        let phone = self.phone(&params.phone_number, "find_patient")?;

        let found = self
            .scheduling
            .find_patient_by_phone(&phone, &ctx.log)
            .await
            .map_err(scheduling_error)?;

        Ok(match found {
            Some(patient) => ToolOutput::PatientFound {
                name: patient.display_name(),
                patient_id: patient.id,
            },
            None => ToolOutput::PatientNotFound,
        })
    }

    async fn check_availability(
        &self,
        params: CheckAvailabilityParams,
        ctx: &ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        let query = SlotQuery {
            start_date: params.date,
            days: params.days.unwrap_or(DEFAULT_AVAILABILITY_DAYS),
            provider_id: params.provider_id,
        };

        let providers = self
            .scheduling
            .available_slots(&query, &ctx.log)
            .await
            .map_err(scheduling_error)?;

        let mut slots: Vec<OpenSlot> = providers
            .into_iter()
            .flat_map(|p| {
                let provider_id = p.pid;
                p.slots.into_iter().map(move |s| OpenSlot {
                    provider_id: provider_id.clone(),
                    operatory_id: s.operatory_id,
                    time: s.time,
                })
            })
            .filter(|s| s.time.with_timezone(&Utc) >= ctx.now)
            .collect();
        slots.sort_by_key(|s| s.time);
        slots.truncate(MAX_OPEN_SLOTS);

        Ok(ToolOutput::Availability(slots))
    }

    async fn book(&self, params: BookAppointmentParams, ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        let tz = self.timezone(params.timezone.as_deref());
        let phone = self.phone(&params.phone_number, "book_appointment")?;
        let start_time = parse_start_time(&params.start_time, tz).ok_or_else(|| ToolError::InvalidParameters {
            tool: "book_appointment".to_string(),
            message: format!("unreadable start_time '{}'", params.start_time),
        })?;
        if start_time <= ctx.now {
            return Err(ToolError::InvalidParameters {
                tool: "book_appointment".to_string(),
                message: "start_time is in the past".to_string(),
            });
        }

        let patient = match self
            .scheduling
            .find_patient_by_phone(&phone, &ctx.log)
            .await
            .map_err(scheduling_error)?
        {
            Some(patient) => patient,
            None => self
                .scheduling
                .create_patient(
                    &NewPatient {
                        first_name: params.first_name.clone(),
                        last_name: params.last_name.clone(),
                        phone_number: phone.clone(),
                        provider_id: params.provider_id.clone(),
                    },
                    &ctx.log,
                )
                .await
                .map_err(scheduling_error)?,
        };

        let appointment = self
            .scheduling
            .book_appointment(
                &BookingRequest {
                    patient_id: patient.id.clone(),
                    provider_id: params.provider_id.clone(),
                    operatory_id: params.operatory_id.clone(),
                    start_time,
                },
                &ctx.log,
            )
            .await
            .map_err(scheduling_error)?;

        let patient_name = Some(patient.display_name()).filter(|n| !n.is_empty());
        let outcome = self
            .reminders
            .create_for_booking(
                NewReminder {
                    appointment_id: appointment.id.clone(),
                    patient_id: patient.id,
                    patient_name,
                    phone_number: phone,
                    provider_id: appointment.provider_id.clone(),
                    appointment_time: appointment.start_time,
                    timezone: tz.name().to_string(),
                },
                ctx.now,
            )
            .await;
        log_reminder_outcome(&appointment.id, &outcome);

        info!("Booked appointment {} via voice", appointment.id);
        Ok(ToolOutput::Booked(BookedAppointment {
            appointment_id: appointment.id,
            local_time: local(appointment.start_time, tz),
        }))
    }

    async fn reschedule(&self, params: RescheduleParams, ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        if params.cancelled {
            self.scheduling
                .cancel_appointment(&params.appointment_id, &ctx.log)
                .await
                .map_err(scheduling_error)?;

            let outcome = self.reminders.cancel(&params.appointment_id, ctx.now).await;
            log_reminder_outcome(&params.appointment_id, &outcome);

            return Ok(ToolOutput::Cancelled {
                appointment_id: params.appointment_id,
            });
        }

        let tz = self.timezone(params.timezone.as_deref());
        let raw = params.new_start_time.as_deref().ok_or_else(|| ToolError::InvalidParameters {
            tool: "reschedule_appointment".to_string(),
            message: "new_start_time is required unless cancelled is true".to_string(),
        })?;
        let start_time = parse_start_time(raw, tz).ok_or_else(|| ToolError::InvalidParameters {
            tool: "reschedule_appointment".to_string(),
            message: format!("unreadable new_start_time '{}'", raw),
        })?;

        let appointment = self
            .scheduling
            .reschedule_appointment(&params.appointment_id, start_time, &ctx.log)
            .await
            .map_err(scheduling_error)?;

        let outcome = self
            .reminders
            .reschedule(&appointment.id, appointment.start_time, ctx.now)
            .await;
        log_reminder_outcome(&appointment.id, &outcome);

        Ok(ToolOutput::Rescheduled(BookedAppointment {
            appointment_id: appointment.id,
            local_time: local(appointment.start_time, tz),
        }))
    }

    fn timezone(&self, name: Option<&str>) -> Tz {
        match name {
            Some(name) => reminder_cell::services::resolve_timezone(name, self.default_timezone),
            None => self.default_timezone,
        }
    }

    fn phone(&self, raw: &str, tool: &str) -> Result<String, ToolError> {
        normalize_phone_number(raw, &self.default_country_code).ok_or_else(|| ToolError::InvalidParameters {
            tool: tool.to_string(),
            message: format!("'{}' is not a dialable phone number", raw),
        })
    }
}

fn dad_joke() -> String {
    DAD_JOKES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(DAD_JOKES[0])
        .to_string()
}

fn scheduling_error(e: SchedulingError) -> ToolError {
    match e {
        SchedulingError::NotFound(what) => ToolError::NotFound(what),
        SchedulingError::NotConfigured => ToolError::Unavailable("scheduling API not configured".to_string()),
        other => ToolError::Scheduling(other),
    }
}

fn log_reminder_outcome(appointment_id: &str, outcome: &ReminderOutcome) {
    match outcome {
        ReminderOutcome::Applied(status) => info!("Reminder for {} is now {}", appointment_id, status),
        ReminderOutcome::Unchanged(status) => info!("Reminder for {} unchanged ({})", appointment_id, status),
        ReminderOutcome::Ignored(reason) | ReminderOutcome::Skipped(reason) => {
            warn!("Reminder for {} not updated: {}", appointment_id, reason)
        }
    }
}

fn local(time: DateTime<Utc>, tz: Tz) -> DateTime<FixedOffset> {
    time.with_timezone(&tz).fixed_offset()
}

/// RFC 3339, or a wall-clock time in `tz`.
pub fn parse_start_time(raw: &str, tz: Tz) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(time) = DateTime::parse_from_rfc3339(raw) {
        return Some(time.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .and_then(|naive| tz.from_local_datetime(&naive).earliest())
        .map(|time| time.with_timezone(&Utc))
}
