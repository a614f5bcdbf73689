use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::models::{ReminderCall, ReminderError, ReminderPatch, ReminderStatus};
use crate::services::store::ReminderStore;

/// In-memory `ReminderStore`. `set_unavailable(true)` makes every call fail like a store outage;
/// `fail_updates_after(n)` lets reads through but rejects every write after the first `n`.
#[derive(Default)]
pub struct MemoryReminderStore {
    rows: Mutex<HashMap<String, ReminderCall>>,
    unavailable: AtomicBool,
    update_budget: Mutex<Option<usize>>,
}

impl MemoryReminderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<ReminderCall>) -> Self {
        let store = Self::new();
        for record in records {
            store.put(record);
        }
        store
    }

    pub fn put(&self, record: ReminderCall) {
        self.rows
            .lock()
            .unwrap()
            .insert(record.appointment_id.clone(), record);
    }

    pub fn snapshot(&self, appointment_id: &str) -> Option<ReminderCall> {
        self.rows.lock().unwrap().get(appointment_id).cloned()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn fail_updates_after(&self, successes: usize) {
        *self.update_budget.lock().unwrap() = Some(successes);
    }

    fn check_write(&self) -> Result<(), ReminderError> {
        let mut budget = self.update_budget.lock().unwrap();
        match budget.as_mut() {
            Some(0) => Err(ReminderError::DatabaseError("write rejected".to_string())),
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn check(&self) -> Result<(), ReminderError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ReminderError::DatabaseError("store unreachable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ReminderStore for MemoryReminderStore {
    async fn get(&self, appointment_id: &str) -> Result<Option<ReminderCall>, ReminderError> {
        self.check()?;
        Ok(self.snapshot(appointment_id))
    }

    async fn insert(&self, record: &ReminderCall) -> Result<ReminderCall, ReminderError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        if rows.contains_key(&record.appointment_id) {
            return Err(ReminderError::DatabaseError("duplicate appointment_id".to_string()));
        }
        rows.insert(record.appointment_id.clone(), record.clone());
        Ok(record.clone())
    }

    async fn update(
        &self,
        appointment_id: &str,
        patch: &ReminderPatch,
    ) -> Result<Option<ReminderCall>, ReminderError> {
        self.check()?;
        self.check_write()?;
        let mut rows = self.rows.lock().unwrap();
        Ok(rows.get_mut(appointment_id).map(|row| {
            row.apply_patch(patch);
            row.clone()
        }))
    }

    async fn list_by_status(&self, status: ReminderStatus) -> Result<Vec<ReminderCall>, ReminderError> {
        self.check()?;
        let mut rows: Vec<ReminderCall> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(rows)
    }
}

/// Builder for reminder records in a known state.
pub struct ReminderFixture;

impl ReminderFixture {
    /// A New York appointment at 2025-03-10T14:00:00Z (10:00 local).
    pub fn pending(appointment_id: &str) -> ReminderCall {
        let updated = utc(2025, 3, 1, 12, 0);
        ReminderCall {
            appointment_id: appointment_id.to_string(),
            patient_id: "patient-1".to_string(),
            patient_name: Some("Jane Doe".to_string()),
            phone_number: "(555) 123-4567".to_string(),
            provider_id: "provider-1".to_string(),
            appointment_time: utc(2025, 3, 10, 14, 0),
            timezone: "America/New_York".to_string(),
            status: ReminderStatus::Pending,
            call_sid: None,
            call_attempts: 0,
            last_attempt_at: None,
            last_call_status: None,
            created_at: Some(updated),
            updated_at: updated,
        }
    }

    pub fn in_status(appointment_id: &str, status: ReminderStatus, call_attempts: i32) -> ReminderCall {
        let mut record = Self::pending(appointment_id);
        record.status = status;
        record.call_attempts = call_attempts;
        if status != ReminderStatus::Pending {
            record.call_sid = Some(format!("CA-{}", appointment_id));
        }
        record
    }
}

pub fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .unwrap_or_default()
}
