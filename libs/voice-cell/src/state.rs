// libs/voice-cell/src/state.rs
use std::sync::Arc;

use reminder_cell::services::resolve_timezone;
use reminder_cell::ReminderCallService;
use scheduling_cell::{InteractionLogger, SchedulingApi, SchedulingClient};
use shared_config::AppConfig;

use crate::services::control::{HumeControlClient, VoiceControl};
use crate::services::executor::ToolExecutor;

/// Everything the voice webhook needs, built once at startup.
pub struct VoiceState {
    pub config: Arc<AppConfig>,
    pub reminders: Arc<ReminderCallService>,
    pub executor: ToolExecutor,
    pub control: Arc<dyn VoiceControl>,
    pub logger: Arc<InteractionLogger>,
}

impl VoiceState {
    pub fn new(config: Arc<AppConfig>, reminders: Arc<ReminderCallService>) -> Self {
        let logger = Arc::new(InteractionLogger::new(&config));
        let scheduling: Arc<dyn SchedulingApi> =
            Arc::new(SchedulingClient::new(&config, logger.clone()));
        let control: Arc<dyn VoiceControl> = Arc::new(HumeControlClient::new(&config));

        Self::with_components(config, reminders, scheduling, control, logger)
    }

    pub fn with_components(
        config: Arc<AppConfig>,
        reminders: Arc<ReminderCallService>,
        scheduling: Arc<dyn SchedulingApi>,
        control: Arc<dyn VoiceControl>,
        logger: Arc<InteractionLogger>,
    ) -> Self {
        let default_timezone = resolve_timezone(&config.default_timezone, chrono_tz::America::New_York);
        let executor = ToolExecutor::new(
            scheduling,
            reminders.clone(),
            default_timezone,
            config.default_country_code.clone(),
        );

        Self {
            config,
            reminders,
            executor,
            control,
            logger,
        }
    }
}
