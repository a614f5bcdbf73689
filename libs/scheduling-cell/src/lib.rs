//! # Scheduling Cell
//!
//! Client for the dental practice-management API (patients, open slots, appointments) and the
//! interaction-log writer shared by every voice tool.
//!
//! The client owns its `TokenCache`; callers pass a `LogContext` with every request so the
//! request log rows carry the chat and tool call they belong to.

pub mod models;
pub mod services;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use models::*;
pub use services::{
    InteractionEvent, InteractionLogger, LogContext, SchedulingApi, SchedulingClient, TokenCache,
};
