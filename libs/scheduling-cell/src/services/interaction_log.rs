// libs/scheduling-cell/src/services/interaction_log.rs
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

const TABLE_PATH: &str = "/rest/v1/interaction_logs";

/// Which chat and tool call the current work belongs to. Passed explicitly to everything
/// that writes interaction logs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogContext {
    pub chat_id: String,
    pub tool_call_id: Option<String>,
}

impl LogContext {
    pub fn for_chat(chat_id: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            tool_call_id: None,
        }
    }

    pub fn for_tool_call(chat_id: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InteractionEvent {
    ChatStarted,
    ChatEnded,
    ToolCall,
    ToolResponse,
    ToolError,
    SchedulingRequest,
}

#[derive(Debug, Clone, Serialize)]
pub struct InteractionLogEntry {
    pub id: Uuid,
    pub chat_id: String,
    pub tool_call_id: Option<String>,
    pub event_type: InteractionEvent,
    pub tool_name: Option<String>,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

/// Best-effort writer for `interaction_logs`. Failures are logged and swallowed; no write here
/// is ever part of a reminder transition.
pub struct InteractionLogger {
    supabase: Option<SupabaseClient>,
}

impl InteractionLogger {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = SupabaseClient::new(config);
        Self {
            supabase: supabase.is_configured().then_some(supabase),
        }
    }

    /// Logger that drops every entry.
    pub fn disabled() -> Self {
        Self { supabase: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.supabase.is_some()
    }

    pub async fn record(
        &self,
        ctx: &LogContext,
        event_type: InteractionEvent,
        tool_name: Option<&str>,
        payload: Value,
    ) {
        let Some(supabase) = self.supabase.as_ref() else {
            return;
        };

        let entry = InteractionLogEntry {
            id: Uuid::new_v4(),
            chat_id: ctx.chat_id.clone(),
            tool_call_id: ctx.tool_call_id.clone(),
            event_type,
            tool_name: tool_name.map(str::to_string),
            payload,
            created_at: Utc::now(),
        };

        let body = match serde_json::to_value(&entry) {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to encode interaction log: {}", e);
                return;
            }
        };

        match supabase
            .request_with_headers::<Vec<Value>>(
                Method::POST,
                TABLE_PATH,
                Some(body),
                Some(SupabaseClient::return_representation()),
            )
            .await
        {
            Ok(_) => debug!("Logged {:?} for chat {}", event_type, ctx.chat_id),
            Err(e) => warn!("Failed to write interaction log for chat {}: {}", ctx.chat_id, e),
        }
    }
}
