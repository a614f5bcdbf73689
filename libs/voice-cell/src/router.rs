// libs/voice-cell/src/router.rs
use std::sync::Arc;

use axum::{routing::post, Router};

use crate::handlers;
use crate::state::VoiceState;

pub fn voice_routes(state: Arc<VoiceState>) -> Router {
    Router::new()
        .route("/webhook", post(handlers::voice_webhook))
        .with_state(state)
}
