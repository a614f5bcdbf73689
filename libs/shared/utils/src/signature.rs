use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Webhook deliveries older than this are rejected as replays.
pub const SIGNATURE_TOLERANCE_SECS: u64 = 180;

/// Verify a voice-platform webhook signature.
///
/// The platform signs `"{payload}.{timestamp}"` with HMAC-SHA256 keyed by the API key and sends
/// the lowercase hex digest alongside the unix timestamp it used.
pub fn verify_webhook_signature(
    payload: &[u8],
    timestamp: &str,
    signature_hex: &str,
    api_key: &str,
    now: DateTime<Utc>,
) -> Result<(), String> {
    if api_key.is_empty() {
        return Err("Signing key is not set".to_string());
    }

    let sent_at: i64 = timestamp
        .trim()
        .parse()
        .map_err(|_| "Invalid signature timestamp".to_string())?;

    let skew = now.timestamp().checked_sub(sent_at).map(i64::unsigned_abs);
    if !matches!(skew, Some(skew) if skew <= SIGNATURE_TOLERANCE_SECS) {
        debug!("Webhook timestamp {} outside tolerance (now: {})", sent_at, now.timestamp());
        return Err("Signature timestamp outside tolerance".to_string());
    }

    let expected = hex::decode(signature_hex.trim())
        .map_err(|_| "Invalid signature encoding".to_string())?;

    let mut mac = HmacSha256::new_from_slice(api_key.as_bytes())
        .map_err(|_| "Failed to create HMAC".to_string())?;
    mac.update(payload);
    mac.update(b".");
    mac.update(timestamp.trim().as_bytes());

    mac.verify_slice(&expected).map_err(|_| {
        debug!("Webhook signature verification failed");
        "Invalid webhook signature".to_string()
    })
}

/// Compute the signature the platform would send; used by tests and local tooling.
pub fn sign_webhook_payload(payload: &[u8], timestamp: &str, api_key: &str) -> String {
    let Ok(mut mac) = HmacSha256::new_from_slice(api_key.as_bytes()) else {
        return String::new();
    };
    mac.update(payload);
    mac.update(b".");
    mac.update(timestamp.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
