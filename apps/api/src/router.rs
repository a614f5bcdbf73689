use std::sync::Arc;

use axum::{
    Json, Router,
    routing::get,
};
use serde_json::{json, Value};

use reminder_cell::{reminder_routes, telephony_callback_routes, ReminderCallService};
use shared_config::AppConfig;
use voice_cell::{voice_routes, VoiceState};

pub fn create_router(config: Arc<AppConfig>) -> Router {
    let reminders = Arc::new(ReminderCallService::new(&config));
    let voice = Arc::new(VoiceState::new(config.clone(), reminders.clone()));

    let health_config = config.clone();
    Router::new()
        .route("/", get(|| async { "Reminder bridge is running!" }))
        .route("/health", get(move || health(health_config.clone())))
        .nest("/voice", voice_routes(voice))
        .nest("/twilio", telephony_callback_routes(reminders.clone()))
        .nest("/reminders", reminder_routes(reminders, config))
}

async fn health(config: Arc<AppConfig>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "reminder-bridge",
        "store_configured": config.is_store_configured(),
        "telephony_configured": config.is_telephony_configured(),
        "voice_configured": config.is_voice_configured(),
        "scheduling_configured": config.is_scheduling_configured(),
    }))
}
