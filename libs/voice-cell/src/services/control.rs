// libs/voice-cell/src/services/control.rs
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, error, instrument};

use shared_config::AppConfig;

use crate::models::VoiceError;

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Messages the bridge can push into a live chat.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    ToolResponse {
        tool_call_id: String,
        content: String,
    },
    ToolError {
        tool_call_id: String,
        error: String,
        content: String,
    },
}

/// Control channel into a running voice chat.
#[async_trait]
pub trait VoiceControl: Send + Sync {
    async fn send(&self, chat_id: &str, message: &ControlMessage) -> Result<(), VoiceError>;
}

pub struct HumeControlClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HumeControlClient {
    pub fn new(config: &AppConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: config.hume_api_base_url.trim_end_matches('/').to_string(),
            api_key: config.hume_api_key.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.base_url.is_empty() && !self.api_key.is_empty()
    }
}

#[async_trait]
impl VoiceControl for HumeControlClient {
    #[instrument(skip(self, message))]
    async fn send(&self, chat_id: &str, message: &ControlMessage) -> Result<(), VoiceError> {
        if !self.is_configured() {
            return Err(VoiceError::NotConfigured);
        }

        let url = format!("{}/v0/evi/chat/{}/send", self.base_url, chat_id);
        debug!("Sending control message to chat {}", chat_id);

        let response = self
            .client
            .post(&url)
            .header("X-Hume-Api-Key", &self.api_key)
            .json(message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!("Control channel error for chat {} ({}): {}", chat_id, status, message);
            return Err(VoiceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }
}
