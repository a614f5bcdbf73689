use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{
    Appointment, BookingRequest, NewPatient, Patient, PatientBio, ProviderSlots, SchedulingError,
    SlotQuery,
};
use crate::services::client::SchedulingApi;
use crate::services::interaction_log::LogContext;

/// In-memory practice: patients keyed by phone number, appointments keyed by id.
#[derive(Default)]
pub struct FakeSchedulingApi {
    patients: Mutex<HashMap<String, Patient>>,
    appointments: Mutex<HashMap<String, Appointment>>,
    slots: Mutex<Vec<ProviderSlots>>,
    calls: Mutex<Vec<(String, LogContext)>>,
    unavailable: Mutex<bool>,
}

impl FakeSchedulingApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_patient(&self, id: &str, name: &str, phone_number: &str) {
        let patient = Patient {
            id: id.to_string(),
            first_name: None,
            last_name: None,
            name: Some(name.to_string()),
            email: None,
            bio: Some(PatientBio {
                phone_number: Some(phone_number.to_string()),
                date_of_birth: None,
            }),
        };
        self.patients
            .lock()
            .unwrap()
            .insert(phone_number.to_string(), patient);
    }

    pub fn add_appointment(&self, appointment: Appointment) {
        self.appointments
            .lock()
            .unwrap()
            .insert(appointment.id.clone(), appointment);
    }

    pub fn set_slots(&self, slots: Vec<ProviderSlots>) {
        *self.slots.lock().unwrap() = slots;
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }

    pub fn appointment(&self, id: &str) -> Option<Appointment> {
        self.appointments.lock().unwrap().get(id).cloned()
    }

    /// Operation names with the context each was called with.
    pub fn calls(&self) -> Vec<(String, LogContext)> {
        self.calls.lock().unwrap().clone()
    }

    fn enter(&self, operation: &str, ctx: &LogContext) -> Result<(), SchedulingError> {
        self.calls
            .lock()
            .unwrap()
            .push((operation.to_string(), ctx.clone()));
        if *self.unavailable.lock().unwrap() {
            return Err(SchedulingError::Request("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SchedulingApi for FakeSchedulingApi {
    async fn find_patient_by_phone(
        &self,
        phone_number: &str,
        ctx: &LogContext,
    ) -> Result<Option<Patient>, SchedulingError> {
        self.enter("find_patient_by_phone", ctx)?;
        Ok(self.patients.lock().unwrap().get(phone_number).cloned())
    }

    async fn create_patient(&self, patient: &NewPatient, ctx: &LogContext) -> Result<Patient, SchedulingError> {
        self.enter("create_patient", ctx)?;
        let mut patients = self.patients.lock().unwrap();
        let created = Patient {
            id: format!("patient-{}", patients.len() + 1),
            first_name: Some(patient.first_name.clone()),
            last_name: Some(patient.last_name.clone()),
            name: None,
            email: None,
            bio: Some(PatientBio {
                phone_number: Some(patient.phone_number.clone()),
                date_of_birth: None,
            }),
        };
        patients.insert(patient.phone_number.clone(), created.clone());
        Ok(created)
    }

    async fn available_slots(
        &self,
        _query: &SlotQuery,
        ctx: &LogContext,
    ) -> Result<Vec<ProviderSlots>, SchedulingError> {
        self.enter("available_slots", ctx)?;
        Ok(self.slots.lock().unwrap().clone())
    }

    async fn book_appointment(
        &self,
        request: &BookingRequest,
        ctx: &LogContext,
    ) -> Result<Appointment, SchedulingError> {
        self.enter("book_appointment", ctx)?;
        let mut appointments = self.appointments.lock().unwrap();
        let appointment = Appointment {
            id: format!("{}", 1000 + appointments.len() + 1),
            patient_id: request.patient_id.clone(),
            provider_id: request.provider_id.clone(),
            operatory_id: request.operatory_id.clone(),
            start_time: request.start_time,
            end_time: None,
            cancelled: false,
            confirmed: false,
        };
        appointments.insert(appointment.id.clone(), appointment.clone());
        Ok(appointment)
    }

    async fn get_appointment(&self, appointment_id: &str, ctx: &LogContext) -> Result<Appointment, SchedulingError> {
        self.enter("get_appointment", ctx)?;
        self.appointment(appointment_id)
            .ok_or_else(|| SchedulingError::NotFound(appointment_id.to_string()))
    }

    async fn reschedule_appointment(
        &self,
        appointment_id: &str,
        start_time: DateTime<Utc>,
        ctx: &LogContext,
    ) -> Result<Appointment, SchedulingError> {
        self.enter("reschedule_appointment", ctx)?;
        let mut appointments = self.appointments.lock().unwrap();
        let appointment = appointments
            .get_mut(appointment_id)
            .ok_or_else(|| SchedulingError::NotFound(appointment_id.to_string()))?;
        appointment.start_time = start_time;
        Ok(appointment.clone())
    }

    async fn cancel_appointment(&self, appointment_id: &str, ctx: &LogContext) -> Result<Appointment, SchedulingError> {
        self.enter("cancel_appointment", ctx)?;
        let mut appointments = self.appointments.lock().unwrap();
        let appointment = appointments
            .get_mut(appointment_id)
            .ok_or_else(|| SchedulingError::NotFound(appointment_id.to_string()))?;
        appointment.cancelled = true;
        Ok(appointment.clone())
    }
}
