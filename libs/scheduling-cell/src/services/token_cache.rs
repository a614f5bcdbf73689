// libs/scheduling-cell/src/services/token_cache.rs
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// Seconds before expiry at which a cached token is treated as stale.
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Bearer token held by one scheduling client. The clock is always passed in.
#[derive(Debug, Default)]
pub struct TokenCache {
    current: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached token, if it is still valid at `now` with the refresh margin applied.
    pub fn get(&self, now: DateTime<Utc>) -> Option<String> {
        let guard = self.current.lock().ok()?;
        let token = guard.as_ref()?;

        if now + Duration::seconds(REFRESH_MARGIN_SECS) >= token.expires_at {
            debug!("Cached scheduling token expired at {}", token.expires_at);
            return None;
        }

        Some(token.value.clone())
    }

    pub fn store(&self, value: String, expires_at: DateTime<Utc>) {
        if let Ok(mut guard) = self.current.lock() {
            *guard = Some(CachedToken { value, expires_at });
        }
    }

    /// Drop the token, e.g. after the API rejected it.
    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.current.lock() {
            *guard = None;
        }
    }
}
