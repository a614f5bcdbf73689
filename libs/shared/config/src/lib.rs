use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_from_number: String,
    pub twilio_api_base_url: String,
    pub public_base_url: String,
    pub hume_api_key: String,
    pub hume_api_base_url: String,
    pub hume_outbound_config_id: String,
    pub hume_webhook_verify: bool,
    pub scheduling_api_url: String,
    pub scheduling_api_key: String,
    pub scheduling_subdomain: String,
    pub scheduling_location_id: String,
    pub dispatch_secret: String,
    pub reminder_test_mode: bool,
    pub default_timezone: String,
    pub default_country_code: String,
    pub port: u16,
}

fn var_or_empty(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| {
        warn!("{} not set, using empty value", name);
        String::new()
    })
}

fn var_or_default(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| {
        warn!("{} not set, using default", name);
        default.to_string()
    })
}

fn var_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: var_or_empty("SUPABASE_URL"),
            supabase_service_key: var_or_empty("SUPABASE_SERVICE_KEY"),
            twilio_account_sid: var_or_empty("TWILIO_ACCOUNT_SID"),
            twilio_auth_token: var_or_empty("TWILIO_AUTH_TOKEN"),
            twilio_from_number: var_or_empty("TWILIO_FROM_NUMBER"),
            twilio_api_base_url: var_or_default("TWILIO_API_BASE_URL", "https://api.twilio.com"),
            public_base_url: var_or_empty("PUBLIC_BASE_URL"),
            hume_api_key: var_or_empty("HUME_API_KEY"),
            hume_api_base_url: var_or_default("HUME_API_BASE_URL", "https://api.hume.ai"),
            hume_outbound_config_id: var_or_empty("HUME_OUTBOUND_CONFIG_ID"),
            hume_webhook_verify: var_flag("HUME_WEBHOOK_VERIFY"),
            scheduling_api_url: var_or_empty("SCHEDULING_API_URL"),
            scheduling_api_key: var_or_empty("SCHEDULING_API_KEY"),
            scheduling_subdomain: var_or_empty("SCHEDULING_SUBDOMAIN"),
            scheduling_location_id: var_or_empty("SCHEDULING_LOCATION_ID"),
            dispatch_secret: env::var("DISPATCH_SECRET").unwrap_or_default(),
            reminder_test_mode: var_flag("REMINDER_TEST_MODE"),
            default_timezone: var_or_default("DEFAULT_TIMEZONE", "America/New_York"),
            default_country_code: var_or_default("DEFAULT_COUNTRY_CODE", "1"),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
        };

        if !config.is_store_configured() {
            warn!("Reminder store not configured - reminder writes will be skipped");
        }
        if config.dispatch_secret.is_empty() {
            warn!("DISPATCH_SECRET not set, dispatcher endpoint is unauthenticated");
        }

        config
    }

    pub fn is_store_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_service_key.is_empty()
    }

    pub fn is_telephony_configured(&self) -> bool {
        !self.twilio_account_sid.is_empty()
            && !self.twilio_auth_token.is_empty()
            && !self.twilio_from_number.is_empty()
            && !self.public_base_url.is_empty()
    }

    pub fn is_voice_configured(&self) -> bool {
        !self.hume_api_key.is_empty() && !self.hume_outbound_config_id.is_empty()
    }

    pub fn is_scheduling_configured(&self) -> bool {
        !self.scheduling_api_url.is_empty() && !self.scheduling_api_key.is_empty()
    }
}
