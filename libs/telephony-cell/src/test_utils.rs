use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::models::{OutboundCall, PlacedCall, TelephonyError};
use crate::services::twilio::CallPlacer;

/// In-memory `CallPlacer` that records every call and fails the ones it is told to.
#[derive(Default)]
pub struct RecordingCallPlacer {
    placed: Mutex<Vec<OutboundCall>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingCallPlacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make placement fail for this appointment.
    pub fn fail_for(&self, appointment_id: &str) {
        self.failing.lock().unwrap().insert(appointment_id.to_string());
    }

    pub fn placed_calls(&self) -> Vec<OutboundCall> {
        self.placed.lock().unwrap().clone()
    }
}

#[async_trait]
impl CallPlacer for RecordingCallPlacer {
    async fn place_call(&self, call: &OutboundCall) -> Result<PlacedCall, TelephonyError> {
        if self.failing.lock().unwrap().contains(&call.appointment_id) {
            return Err(TelephonyError::Api {
                status: 400,
                message: "simulated placement failure".to_string(),
            });
        }

        let mut placed = self.placed.lock().unwrap();
        placed.push(call.clone());
        Ok(PlacedCall {
            call_sid: format!("CA{:04}", placed.len()),
        })
    }
}
