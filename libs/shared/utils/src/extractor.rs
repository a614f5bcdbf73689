use std::sync::Arc;

use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
    body::Body,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use tracing::{debug, warn};

use shared_models::error::AppError;
use shared_config::AppConfig;

/// Guards the dispatcher entry point with the shared secret the external scheduler sends.
/// An empty secret leaves the route open, which is only meant for local runs.
pub async fn dispatch_auth_middleware(
    State(config): State<Arc<AppConfig>>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    if config.dispatch_secret.is_empty() {
        debug!("Dispatch secret not configured, skipping auth");
        return Ok(next.run(request).await);
    }

    let TypedHeader(auth) = auth
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    if !constant_time_eq(auth.token().as_bytes(), config.dispatch_secret.as_bytes()) {
        warn!("Rejected dispatcher call with invalid secret");
        return Err(AppError::Auth("Invalid dispatch secret".to_string()));
    }

    Ok(next.run(request).await)
}

pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
