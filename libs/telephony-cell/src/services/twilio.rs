// libs/telephony-cell/src/services/twilio.rs
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::{debug, error, info, instrument};

use shared_config::AppConfig;

use crate::models::{
    OutboundCall, PlacedCall, TelephonyError, TwilioCallResponse, TwilioErrorResponse,
};

const REQUEST_TIMEOUT_SECS: u64 = 10;
const STATUS_CALLBACK_EVENTS: &[&str] = &["initiated", "ringing", "answered", "completed"];

/// Anything that can start an outbound call.
#[async_trait]
pub trait CallPlacer: Send + Sync {
    async fn place_call(&self, call: &OutboundCall) -> Result<PlacedCall, TelephonyError>;
}

pub struct TwilioClient {
    client: Client,
    api_base_url: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
    public_base_url: String,
    voice_base_url: String,
    voice_api_key: String,
    voice_config_id: String,
}

impl TwilioClient {
    pub fn new(config: &AppConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_base_url: config.twilio_api_base_url.trim_end_matches('/').to_string(),
            account_sid: config.twilio_account_sid.clone(),
            auth_token: config.twilio_auth_token.clone(),
            from_number: config.twilio_from_number.clone(),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
            voice_base_url: config.hume_api_base_url.trim_end_matches('/').to_string(),
            voice_api_key: config.hume_api_key.clone(),
            voice_config_id: config.hume_outbound_config_id.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.account_sid.is_empty()
            && !self.auth_token.is_empty()
            && !self.from_number.is_empty()
            && !self.public_base_url.is_empty()
    }

    /// Progress/outcome callback URL; the query parameter is the only reliable way to tie a
    /// later callback back to its reminder.
    pub fn status_callback_url(&self, appointment_id: &str) -> Result<Url, TelephonyError> {
        let mut url = Url::parse(&format!("{}/twilio/status", self.public_base_url))
            .map_err(|e| TelephonyError::Request(format!("invalid public base url: {}", e)))?;
        url.query_pairs_mut().append_pair("appointment_id", appointment_id);
        Ok(url)
    }

    /// Voice platform endpoint that answers the call with the outbound reminder config.
    pub fn voice_url(&self, appointment_id: &str) -> Result<Url, TelephonyError> {
        let mut url = Url::parse(&format!("{}/v0/evi/twilio", self.voice_base_url))
            .map_err(|e| TelephonyError::Request(format!("invalid voice base url: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("config_id", &self.voice_config_id)
            .append_pair("api_key", &self.voice_api_key)
            .append_pair("custom_session_id", appointment_id);
        Ok(url)
    }

    fn calls_endpoint(&self) -> String {
        format!("{}/2010-04-01/Accounts/{}/Calls.json", self.api_base_url, self.account_sid)
    }
}

#[async_trait]
impl CallPlacer for TwilioClient {
    #[instrument(skip(self, call), fields(appointment_id = %call.appointment_id))]
    async fn place_call(&self, call: &OutboundCall) -> Result<PlacedCall, TelephonyError> {
        if !self.is_configured() {
            return Err(TelephonyError::NotConfigured);
        }

        let status_callback = self.status_callback_url(&call.appointment_id)?;
        let voice_url = self.voice_url(&call.appointment_id)?;

        let mut form: Vec<(&str, String)> = vec![
            ("To", call.to.clone()),
            ("From", self.from_number.clone()),
            ("Url", voice_url.to_string()),
            ("StatusCallback", status_callback.to_string()),
            ("StatusCallbackMethod", "POST".to_string()),
        ];
        for event in STATUS_CALLBACK_EVENTS {
            form.push(("StatusCallbackEvent", event.to_string()));
        }

        debug!("Placing call to {} for appointment {}", call.to, call.appointment_id);

        let response = self
            .client
            .post(self.calls_endpoint())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<TwilioErrorResponse>(&body)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or(body);
            error!("Telephony API error ({}): {}", status, message);
            return Err(TelephonyError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let created: TwilioCallResponse = response.json().await?;
        info!(
            "Placed call {} for appointment {} (status: {:?})",
            created.sid, call.appointment_id, created.status
        );

        Ok(PlacedCall { call_sid: created.sid })
    }
}
