// libs/scheduling-cell/src/services/client.rs
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument, warn};

use shared_config::AppConfig;

use crate::models::{
    ApiEnvelope, Appointment, AuthenticateData, BookingRequest, NewPatient, Patient, ProviderSlots,
    SchedulingError, SlotQuery,
};
use crate::services::interaction_log::{InteractionEvent, InteractionLogger, LogContext};
use crate::services::token_cache::TokenCache;

const REQUEST_TIMEOUT_SECS: u64 = 10;
const TOKEN_TTL_SECS: i64 = 3600;
const ACCEPT_HEADER: &str = "application/vnd.Nexhealth+json;version=2";

/// Source of the current time, injectable so token expiry can be exercised in tests.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// The practice-management operations the voice tools need.
#[async_trait]
pub trait SchedulingApi: Send + Sync {
    async fn find_patient_by_phone(
        &self,
        phone_number: &str,
        ctx: &LogContext,
    ) -> Result<Option<Patient>, SchedulingError>;

    async fn create_patient(&self, patient: &NewPatient, ctx: &LogContext) -> Result<Patient, SchedulingError>;

    async fn available_slots(
        &self,
        query: &SlotQuery,
        ctx: &LogContext,
    ) -> Result<Vec<ProviderSlots>, SchedulingError>;

    async fn book_appointment(
        &self,
        request: &BookingRequest,
        ctx: &LogContext,
    ) -> Result<Appointment, SchedulingError>;

    async fn get_appointment(&self, appointment_id: &str, ctx: &LogContext) -> Result<Appointment, SchedulingError>;

    async fn reschedule_appointment(
        &self,
        appointment_id: &str,
        start_time: DateTime<Utc>,
        ctx: &LogContext,
    ) -> Result<Appointment, SchedulingError>;

    async fn cancel_appointment(&self, appointment_id: &str, ctx: &LogContext) -> Result<Appointment, SchedulingError>;
}

/// REST client for the practice-management scheduling API.
pub struct SchedulingClient {
    client: Client,
    base_url: String,
    api_key: String,
    subdomain: String,
    location_id: String,
    tokens: TokenCache,
    logger: Arc<InteractionLogger>,
    clock: Clock,
}

impl SchedulingClient {
    pub fn new(config: &AppConfig, logger: Arc<InteractionLogger>) -> Self {
        Self::with_clock(config, logger, Arc::new(Utc::now))
    }

    pub fn with_clock(config: &AppConfig, logger: Arc<InteractionLogger>, clock: Clock) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: config.scheduling_api_url.trim_end_matches('/').to_string(),
            api_key: config.scheduling_api_key.clone(),
            subdomain: config.scheduling_subdomain.clone(),
            location_id: config.scheduling_location_id.clone(),
            tokens: TokenCache::new(),
            logger,
            clock,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.base_url.is_empty() && !self.api_key.is_empty() && !self.subdomain.is_empty()
    }

    /// Cached bearer token, authenticating when it is missing or about to expire.
    async fn bearer_token(&self) -> Result<String, SchedulingError> {
        let now = (self.clock)();
        if let Some(token) = self.tokens.get(now) {
            return Ok(token);
        }

        debug!("Authenticating with scheduling API");
        let response = self
            .client
            .post(format!("{}/authenticates", self.base_url))
            .header("Authorization", &self.api_key)
            .header("Accept", ACCEPT_HEADER)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            error!("Scheduling API authentication failed: {} - {}", status, body);
            return Err(SchedulingError::AuthenticationFailed(format!("HTTP {}", status)));
        }

        let envelope: ApiEnvelope<AuthenticateData> = serde_json::from_str(&body)
            .map_err(|e| SchedulingError::InvalidResponse(format!("authenticate: {}", e)))?;
        let token = envelope
            .data
            .map(|d| d.token)
            .ok_or_else(|| SchedulingError::AuthenticationFailed(envelope_message(&body)))?;

        self.tokens
            .store(token.clone(), now + chrono::Duration::seconds(TOKEN_TTL_SECS));
        info!("Scheduling API token refreshed");
        Ok(token)
    }

    async fn send<T>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
        ctx: &LogContext,
    ) -> Result<T, SchedulingError>
    where
        T: DeserializeOwned,
    {
        if !self.is_configured() {
            return Err(SchedulingError::NotConfigured);
        }

        let url = format!("{}{}", self.base_url, path);
        let mut params: Vec<(&str, String)> = vec![
            ("subdomain", self.subdomain.clone()),
            ("location_id", self.location_id.clone()),
        ];
        params.extend(query.iter().cloned());

        // One retry with a fresh token if the cached one was revoked early.
        for attempt in 0..2 {
            let token = self.bearer_token().await?;

            let mut request = self
                .client
                .request(method.clone(), &url)
                .bearer_auth(&token)
                .header("Accept", ACCEPT_HEADER)
                .query(&params);
            if let Some(body) = &body {
                request = request.json(body);
            }

            debug!("Scheduling API {} {}", method, url);
            let response = request.send().await?;
            let status = response.status();
            let text = response.text().await?;

            self.logger
                .record(
                    ctx,
                    InteractionEvent::SchedulingRequest,
                    None,
                    json!({ "method": method.as_str(), "path": path, "status": status.as_u16() }),
                )
                .await;

            if status == StatusCode::UNAUTHORIZED && attempt == 0 {
                warn!("Scheduling API rejected cached token, re-authenticating");
                self.tokens.invalidate();
                continue;
            }

            return Self::parse(status, &text, path);
        }

        Err(SchedulingError::AuthenticationFailed(
            "token rejected after refresh".to_string(),
        ))
    }

    fn parse<T>(status: StatusCode, text: &str, path: &str) -> Result<T, SchedulingError>
    where
        T: DeserializeOwned,
    {
        if status == StatusCode::NOT_FOUND {
            return Err(SchedulingError::NotFound(path.to_string()));
        }

        let envelope: ApiEnvelope<T> = serde_json::from_str(text).map_err(|e| {
            if status.is_success() {
                SchedulingError::InvalidResponse(format!("{}: {}", path, e))
            } else {
                SchedulingError::Api {
                    status: status.as_u16(),
                    message: text.to_string(),
                }
            }
        })?;

        if !status.is_success() || !envelope.code {
            let message = envelope.failure_message();
            error!("Scheduling API error on {} ({}): {}", path, status, message);
            return Err(SchedulingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        envelope
            .data
            .ok_or_else(|| SchedulingError::InvalidResponse(format!("{}: missing data", path)))
    }
}

fn envelope_message(body: &str) -> String {
    serde_json::from_str::<ApiEnvelope<Value>>(body)
        .map(|e| e.failure_message())
        .unwrap_or_else(|_| body.to_string())
}

#[async_trait]
impl SchedulingApi for SchedulingClient {
    #[instrument(skip(self, ctx))]
    async fn find_patient_by_phone(
        &self,
        phone_number: &str,
        ctx: &LogContext,
    ) -> Result<Option<Patient>, SchedulingError> {
        let patients: Vec<Patient> = self
            .send(
                Method::GET,
                "/patients",
                &[("phone_number", phone_number.to_string())],
                None,
                ctx,
            )
            .await?;

        Ok(patients.into_iter().next())
    }

    #[instrument(skip(self, patient, ctx))]
    async fn create_patient(&self, patient: &NewPatient, ctx: &LogContext) -> Result<Patient, SchedulingError> {
        let body = json!({
            "provider": { "provider_id": patient.provider_id },
            "patient": {
                "first_name": patient.first_name,
                "last_name": patient.last_name,
                "bio": { "phone_number": patient.phone_number }
            }
        });

        #[derive(serde::Deserialize)]
        struct Created {
            user: Patient,
        }

        let created: Created = self.send(Method::POST, "/patients", &[], Some(body), ctx).await?;
        info!("Created patient {}", created.user.id);
        Ok(created.user)
    }

    #[instrument(skip(self, ctx))]
    async fn available_slots(
        &self,
        query: &SlotQuery,
        ctx: &LogContext,
    ) -> Result<Vec<ProviderSlots>, SchedulingError> {
        let mut params = vec![
            ("start_date", query.start_date.format("%Y-%m-%d").to_string()),
            ("days", query.days.max(1).to_string()),
            ("lids[]", self.location_id.clone()),
        ];
        if let Some(provider_id) = &query.provider_id {
            params.push(("pids[]", provider_id.clone()));
        }

        self.send(Method::GET, "/appointment_slots", &params, None, ctx).await
    }

    #[instrument(skip(self, ctx))]
    async fn book_appointment(
        &self,
        request: &BookingRequest,
        ctx: &LogContext,
    ) -> Result<Appointment, SchedulingError> {
        let mut appt = json!({
            "patient_id": request.patient_id,
            "provider_id": request.provider_id,
            "start_time": request.start_time.to_rfc3339(),
        });
        if let Some(operatory_id) = &request.operatory_id {
            appt["operatory_id"] = json!(operatory_id);
        }

        #[derive(serde::Deserialize)]
        struct Booked {
            appt: Appointment,
        }

        let booked: Booked = self
            .send(Method::POST, "/appointments", &[], Some(json!({ "appt": appt })), ctx)
            .await?;
        info!("Booked appointment {} for patient {}", booked.appt.id, booked.appt.patient_id);
        Ok(booked.appt)
    }

    #[instrument(skip(self, ctx))]
    async fn get_appointment(&self, appointment_id: &str, ctx: &LogContext) -> Result<Appointment, SchedulingError> {
        self.send(Method::GET, &format!("/appointments/{}", appointment_id), &[], None, ctx)
            .await
    }

    #[instrument(skip(self, ctx))]
    async fn reschedule_appointment(
        &self,
        appointment_id: &str,
        start_time: DateTime<Utc>,
        ctx: &LogContext,
    ) -> Result<Appointment, SchedulingError> {
        let body = json!({ "appt": { "start_time": start_time.to_rfc3339() } });
        self.send(
            Method::PATCH,
            &format!("/appointments/{}", appointment_id),
            &[],
            Some(body),
            ctx,
        )
        .await
    }

    #[instrument(skip(self, ctx))]
    async fn cancel_appointment(&self, appointment_id: &str, ctx: &LogContext) -> Result<Appointment, SchedulingError> {
        let body = json!({ "appt": { "cancelled": true } });
        self.send(
            Method::PATCH,
            &format!("/appointments/{}", appointment_id),
            &[],
            Some(body),
            ctx,
        )
        .await
    }
}
