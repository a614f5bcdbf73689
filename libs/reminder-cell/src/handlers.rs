// libs/reminder-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, warn};

use shared_models::error::AppError;
use telephony_cell::TwilioStatusCallback;

use crate::models::{CallStatusUpdate, DispatchRequest, DispatchSummary, ReminderError};
use crate::services::ReminderCallService;

pub const EMPTY_TWIML: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Response></Response>"#;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub appointment_id: Option<String>,
}

// ==============================================================================
// DISPATCHER
// ==============================================================================

/// Run one dispatcher pass. An empty body uses the default window.
#[axum::debug_handler]
pub async fn dispatch_reminders(
    State(service): State<Arc<ReminderCallService>>,
    body: Bytes,
) -> Result<Json<DispatchSummary>, AppError> {
    let request: DispatchRequest = if body.iter().all(u8::is_ascii_whitespace) {
        DispatchRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid dispatch request: {}", e)))?
    };

    let summary = service
        .dispatch_due(request, Utc::now())
        .await
        .map_err(|e| match e {
            ReminderError::InvalidWindow(msg) => AppError::BadRequest(msg),
            other => AppError::Internal(other.to_string()),
        })?;

    Ok(Json(summary))
}

// ==============================================================================
// TELEPHONY CALLBACKS
// ==============================================================================

/// Call-progress callback. Always acknowledged with empty TwiML.
#[axum::debug_handler]
pub async fn call_status_callback(
    State(service): State<Arc<ReminderCallService>>,
    Query(query): Query<CallbackQuery>,
    body: String,
) -> impl IntoResponse {
    if let Some(callback) = parse_callback(&body) {
        let update = CallStatusUpdate {
            appointment_id: query.appointment_id,
            call_sid: callback.call_sid.clone(),
            status: callback.progress_status().map(str::to_string),
        };
        let outcome = service.handle_call_status(update, Utc::now()).await;
        debug!("Status callback handled: {:?}", outcome);
    }

    twiml_ack()
}

/// Dial-result callback. Always acknowledged with empty TwiML.
#[axum::debug_handler]
pub async fn dial_result_callback(
    State(service): State<Arc<ReminderCallService>>,
    Query(query): Query<CallbackQuery>,
    body: String,
) -> impl IntoResponse {
    if let Some(callback) = parse_callback(&body) {
        let update = CallStatusUpdate {
            appointment_id: query.appointment_id,
            call_sid: callback.call_sid.clone(),
            status: callback.dial_status().map(str::to_string),
        };
        let outcome = service.handle_call_status(update, Utc::now()).await;
        debug!("Dial-result callback handled: {:?}", outcome);
    }

    twiml_ack()
}

fn parse_callback(body: &str) -> Option<TwilioStatusCallback> {
    match TwilioStatusCallback::from_form(body) {
        Ok(callback) => Some(callback),
        Err(e) => {
            warn!("Ignoring telephony callback: {}", e);
            None
        }
    }
}

fn twiml_ack() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/xml")], EMPTY_TWIML)
}
