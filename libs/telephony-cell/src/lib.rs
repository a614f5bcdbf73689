//! # Telephony Cell
//!
//! Outbound call placement through the telephony provider's REST API and the types its
//! asynchronous status callbacks arrive as.
//!
//! - `services/twilio.rs`: `TwilioClient`, the production `CallPlacer`
//! - `models.rs`: callback payloads, `CallStatus` and its reminder-relevant `CallOutcome`
//! - `test_utils.rs`: an in-memory `CallPlacer` for tests of the layers above (`test-utils` feature)

pub mod models;
pub mod services;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use models::*;
pub use services::twilio::{CallPlacer, TwilioClient};
