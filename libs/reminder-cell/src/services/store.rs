// libs/reminder-cell/src/services/store.rs
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{ReminderCall, ReminderError, ReminderPatch, ReminderStatus};

const TABLE_PATH: &str = "/rest/v1/reminder_calls";

/// Persistence for reminder records, keyed by `appointment_id`. Writes are last-writer-wins.
#[async_trait]
pub trait ReminderStore: Send + Sync {
    async fn get(&self, appointment_id: &str) -> Result<Option<ReminderCall>, ReminderError>;

    async fn insert(&self, record: &ReminderCall) -> Result<ReminderCall, ReminderError>;

    /// Returns the updated row, or `None` when no row matched.
    async fn update(
        &self,
        appointment_id: &str,
        patch: &ReminderPatch,
    ) -> Result<Option<ReminderCall>, ReminderError>;

    /// Rows in `status`, most recently updated first.
    async fn list_by_status(&self, status: ReminderStatus) -> Result<Vec<ReminderCall>, ReminderError>;
}

pub struct SupabaseReminderStore {
    supabase: SupabaseClient,
}

impl SupabaseReminderStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.supabase.is_configured()
    }

    fn by_appointment(appointment_id: &str) -> String {
        format!(
            "{}?appointment_id=eq.{}",
            TABLE_PATH,
            urlencoding::encode(appointment_id)
        )
    }

    fn database_error(context: &str, e: anyhow::Error) -> ReminderError {
        error!("{}: {}", context, e);
        ReminderError::DatabaseError(format!("{}: {}", context, e))
    }
}

#[async_trait]
impl ReminderStore for SupabaseReminderStore {
    async fn get(&self, appointment_id: &str) -> Result<Option<ReminderCall>, ReminderError> {
        let path = format!("{}&limit=1", Self::by_appointment(appointment_id));

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| Self::database_error("Failed to fetch reminder", e))?;

        match rows.into_iter().next() {
            Some(row) => serde_json::from_value(row)
                .map(Some)
                .map_err(|e| ReminderError::DatabaseError(format!("Failed to parse reminder: {}", e))),
            None => Ok(None),
        }
    }

    async fn insert(&self, record: &ReminderCall) -> Result<ReminderCall, ReminderError> {
        debug!("Inserting reminder for appointment {}", record.appointment_id);

        let body = serde_json::to_value(record)
            .map_err(|e| ReminderError::DatabaseError(format!("Failed to encode reminder: {}", e)))?;

        let rows: Vec<ReminderCall> = self
            .supabase
            .request_with_headers(
                Method::POST,
                TABLE_PATH,
                Some(body),
                Some(SupabaseClient::return_representation()),
            )
            .await
            .map_err(|e| Self::database_error("Failed to insert reminder", e))?;

        rows.into_iter()
            .next()
            .ok_or_else(|| ReminderError::DatabaseError("Insert returned no rows".to_string()))
    }

    async fn update(
        &self,
        appointment_id: &str,
        patch: &ReminderPatch,
    ) -> Result<Option<ReminderCall>, ReminderError> {
        let body = serde_json::to_value(patch)
            .map_err(|e| ReminderError::DatabaseError(format!("Failed to encode patch: {}", e)))?;

        let rows: Vec<ReminderCall> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &Self::by_appointment(appointment_id),
                Some(body),
                Some(SupabaseClient::return_representation()),
            )
            .await
            .map_err(|e| Self::database_error("Failed to update reminder", e))?;

        Ok(rows.into_iter().next())
    }

    async fn list_by_status(&self, status: ReminderStatus) -> Result<Vec<ReminderCall>, ReminderError> {
        let path = format!("{}?status=eq.{}&order=updated_at.desc", TABLE_PATH, status);

        self.supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| Self::database_error("Failed to list reminders", e))
    }
}
