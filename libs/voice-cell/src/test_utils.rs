use std::sync::Mutex;

use async_trait::async_trait;

use crate::models::VoiceError;
use crate::services::control::{ControlMessage, VoiceControl};

/// Records every control message instead of sending it.
#[derive(Default)]
pub struct RecordingVoiceControl {
    sent: Mutex<Vec<(String, ControlMessage)>>,
}

impl RecordingVoiceControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(chat_id, message)` pairs in send order.
    pub fn sent(&self) -> Vec<(String, ControlMessage)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl VoiceControl for RecordingVoiceControl {
    async fn send(&self, chat_id: &str, message: &ControlMessage) -> Result<(), VoiceError> {
        self.sent
            .lock()
            .unwrap()
            .push((chat_id.to_string(), message.clone()));
        Ok(())
    }
}
