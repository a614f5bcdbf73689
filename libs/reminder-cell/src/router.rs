// libs/reminder-cell/src/router.rs
use std::sync::Arc;

use axum::{middleware, routing::post, Router};

use shared_config::AppConfig;
use shared_utils::extractor::dispatch_auth_middleware;

use crate::handlers;
use crate::services::ReminderCallService;

/// Dispatcher entry point, guarded by the shared secret.
pub fn reminder_routes(service: Arc<ReminderCallService>, config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/dispatch", post(handlers::dispatch_reminders))
        .route_layer(middleware::from_fn_with_state(config, dispatch_auth_middleware))
        .with_state(service)
}

/// Telephony callbacks. Unauthenticated; correlation comes from the query string.
pub fn telephony_callback_routes(service: Arc<ReminderCallService>) -> Router {
    Router::new()
        .route("/status", post(handlers::call_status_callback))
        .route("/dial-result", post(handlers::dial_result_callback))
        .with_state(service)
}
