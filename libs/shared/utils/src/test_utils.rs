use std::sync::Arc;

use serde_json::{json, Value};

use shared_config::AppConfig;

/// Builder for a fully populated configuration pointing at local mock servers.
pub struct TestConfig {
    pub store_url: String,
    pub telephony_url: String,
    pub voice_url: String,
    pub scheduling_url: String,
    pub dispatch_secret: String,
    pub test_mode: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            store_url: "http://localhost:54321".to_string(),
            telephony_url: "http://localhost:54322".to_string(),
            voice_url: "http://localhost:54323".to_string(),
            scheduling_url: "http://localhost:54324".to_string(),
            dispatch_secret: String::new(),
            test_mode: false,
        }
    }
}

impl TestConfig {
    /// Point every collaborator at the same mock server.
    pub fn with_mock_server(uri: &str) -> Self {
        Self {
            store_url: uri.to_string(),
            telephony_url: uri.to_string(),
            voice_url: uri.to_string(),
            scheduling_url: uri.to_string(),
            ..Default::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.store_url.clone(),
            supabase_service_key: "test-service-key".to_string(),
            twilio_account_sid: "ACtest".to_string(),
            twilio_auth_token: "test-auth-token".to_string(),
            twilio_from_number: "+15550001111".to_string(),
            twilio_api_base_url: self.telephony_url.clone(),
            public_base_url: "https://bridge.example.com".to_string(),
            hume_api_key: "test-hume-key".to_string(),
            hume_api_base_url: self.voice_url.clone(),
            hume_outbound_config_id: "outbound-config".to_string(),
            hume_webhook_verify: false,
            scheduling_api_url: self.scheduling_url.clone(),
            scheduling_api_key: "test-scheduling-key".to_string(),
            scheduling_subdomain: "test-practice".to_string(),
            scheduling_location_id: "101".to_string(),
            dispatch_secret: self.dispatch_secret.clone(),
            reminder_test_mode: self.test_mode,
            default_timezone: "America/New_York".to_string(),
            default_country_code: "1".to_string(),
            port: 3000,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

/// Canned rows as the hosted store returns them.
pub struct MockStoreResponses;

impl MockStoreResponses {
    pub fn reminder_row(appointment_id: &str, status: &str, call_attempts: i32) -> Value {
        json!({
            "appointment_id": appointment_id,
            "patient_id": "patient-1",
            "patient_name": "Jane Doe",
            "phone_number": "+15551234567",
            "provider_id": "provider-1",
            "appointment_time": "2025-03-10T14:00:00Z",
            "timezone": "America/New_York",
            "status": status,
            "call_sid": if status == "pending" { Value::Null } else { json!("CA123") },
            "call_attempts": call_attempts,
            "last_attempt_at": null,
            "last_call_status": null,
            "created_at": "2025-03-01T12:00:00Z",
            "updated_at": "2025-03-01T12:00:00Z"
        })
    }
}
