//! # Reminder Cell
//!
//! The outbound reminder-call lifecycle. A `reminder_calls` row is created `pending` by the
//! booking flow, picked up by the dispatcher when due, and driven to `completed`, `failed` or
//! `cancelled` by telephony callbacks, voice session ends and reschedule requests. The
//! persisted `status` is the only coordination point; every transition goes through
//! `ReminderLifecycle::apply`.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use models::*;
pub use router::{reminder_routes, telephony_callback_routes};
pub use services::{ReminderCallService, ReminderStore};
