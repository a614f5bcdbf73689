// libs/voice-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use reminder_cell::models::ChatEndedNotice;
use scheduling_cell::{InteractionEvent, LogContext};
use shared_models::error::AppError;
use shared_utils::signature::verify_webhook_signature;

use crate::models::{ChatEndedEvent, ChatStartedEvent, ToolCall, ToolCallEvent, WebhookEvent};
use crate::services::control::ControlMessage;
use crate::services::executor::ToolContext;
use crate::services::presentation::{render, render_error};
use crate::state::VoiceState;

pub const SIGNATURE_HEADER: &str = "x-hume-ai-webhook-signature";
pub const TIMESTAMP_HEADER: &str = "x-hume-ai-webhook-timestamp";

/// Voice platform webhook. Every well-signed delivery is acknowledged, whatever happens inside.
#[axum::debug_handler]
pub async fn voice_webhook(
    State(state): State<Arc<VoiceState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    if state.config.hume_webhook_verify {
        verify(&state, &headers, &body)?;
    }

    let event: WebhookEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!("Ignoring unparseable voice webhook: {}", e);
            return Ok(ack());
        }
    };

    match event {
        WebhookEvent::ChatStarted(event) => on_chat_started(&state, event).await,
        WebhookEvent::ChatEnded(event) => on_chat_ended(&state, event).await,
        WebhookEvent::ToolCall(event) => on_tool_call(&state, event).await,
        WebhookEvent::Unknown => debug!("Ignoring unknown voice webhook event"),
    }

    Ok(ack())
}

fn ack() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn verify(state: &VoiceState, headers: &HeaderMap, body: &[u8]) -> Result<(), AppError> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| AppError::Auth(format!("Missing {} header", name)))
    };

    let signature = header(SIGNATURE_HEADER)?;
    let timestamp = header(TIMESTAMP_HEADER)?;

    verify_webhook_signature(body, &timestamp, &signature, &state.config.hume_api_key, Utc::now())
        .map_err(|e| {
            warn!("Rejected voice webhook: {}", e);
            AppError::Auth(e)
        })
}

async fn on_chat_started(state: &VoiceState, event: ChatStartedEvent) {
    info!("Chat started: {} (config {:?})", event.chat_id, event.config_id);
    state
        .logger
        .record(
            &LogContext::for_chat(&event.chat_id),
            InteractionEvent::ChatStarted,
            None,
            serde_json::to_value(&event).unwrap_or(Value::Null),
        )
        .await;
}

async fn on_chat_ended(state: &VoiceState, event: ChatEndedEvent) {
    info!(
        "Chat ended: {} (reason {:?}, {:?}s)",
        event.chat_id, event.end_reason, event.duration_seconds
    );
    state
        .logger
        .record(
            &LogContext::for_chat(&event.chat_id),
            InteractionEvent::ChatEnded,
            None,
            serde_json::to_value(&event).unwrap_or(Value::Null),
        )
        .await;

    let outcome = state
        .reminders
        .handle_chat_ended(
            ChatEndedNotice {
                chat_id: event.chat_id,
                config_id: event.config_id,
                custom_session_id: event.custom_session_id,
            },
            Utc::now(),
        )
        .await;
    debug!("Chat end handled: {:?}", outcome);
}

async fn on_tool_call(state: &VoiceState, event: ToolCallEvent) {
    let message = event.tool_call_message;
    let ctx = ToolContext {
        log: LogContext::for_tool_call(&event.chat_id, &message.tool_call_id),
        custom_session_id: event.custom_session_id,
        now: Utc::now(),
    };

    info!("Tool call {} ({}) in chat {}", message.name, message.tool_call_id, event.chat_id);
    state
        .logger
        .record(
            &ctx.log,
            InteractionEvent::ToolCall,
            Some(&message.name),
            json!({ "parameters": message.parameters }),
        )
        .await;

    let result = match ToolCall::parse(&message.name, &message.parameters) {
        Ok(call) => state.executor.execute(call, &ctx).await,
        Err(e) => Err(e),
    };

    let (reply, event_type) = match result {
        Ok(output) => (
            ControlMessage::ToolResponse {
                tool_call_id: message.tool_call_id.clone(),
                content: render(&output),
            },
            InteractionEvent::ToolResponse,
        ),
        Err(e) => {
            warn!("Tool {} failed: {}", message.name, e);
            (
                ControlMessage::ToolError {
                    tool_call_id: message.tool_call_id.clone(),
                    error: e.code().to_string(),
                    content: render_error(&e),
                },
                InteractionEvent::ToolError,
            )
        }
    };

    state
        .logger
        .record(
            &ctx.log,
            event_type,
            Some(&message.name),
            serde_json::to_value(&reply).unwrap_or(Value::Null),
        )
        .await;

    if let Err(e) = state.control.send(&event.chat_id, &reply).await {
        error!("Failed to deliver tool result for {}: {}", message.tool_call_id, e);
    }
}
