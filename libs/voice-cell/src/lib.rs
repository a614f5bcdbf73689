//! # Voice Cell
//!
//! Webhook surface for the conversational voice platform.
//!
//! - `chat_started` is logged.
//! - `chat_ended` on the outbound reminder config completes the active reminder call.
//! - `tool_call` is parsed into a typed `ToolCall`, run by the `ToolExecutor`, rendered to
//!   speech by `presentation`, and answered over the control channel as a `tool_response` or
//!   `tool_error`.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod state;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use models::*;
pub use router::voice_routes;
pub use state::VoiceState;
