// libs/reminder-cell/src/services/reminder.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, error, info, instrument, warn};

use shared_config::AppConfig;
use shared_utils::phone::normalize_phone_number;
use telephony_cell::{CallOutcome, CallPlacer, CallStatus, OutboundCall, TwilioClient};

use crate::models::{
    ActiveCall, CallStatusUpdate, ChatEndedNotice, DispatchOutcome, DispatchRequest,
    DispatchResult, DispatchSummary, LookupSource, NewReminder, ReminderCall, ReminderError,
    ReminderOutcome, ReminderPatch, ReminderStatus,
};
use crate::services::eligibility::{is_due, resolve_timezone, DispatchWindow};
use crate::services::lifecycle::{ReminderEvent, ReminderLifecycle, Transition};
use crate::services::store::{ReminderStore, SupabaseReminderStore};

/// Owns the `status` of every reminder record and reconciles the booking flow, the dispatcher,
/// telephony callbacks and voice session ends against it.
///
/// Every operation degrades to a logged no-op when the store is missing or failing; nothing
/// here returns an error to a webhook caller.
pub struct ReminderCallService {
    store: Option<Arc<dyn ReminderStore>>,
    telephony: Option<Arc<dyn CallPlacer>>,
    default_timezone: Tz,
    default_country_code: String,
    outbound_config_id: String,
    test_mode: bool,
}

impl ReminderCallService {
    pub fn new(config: &AppConfig) -> Self {
        let store: Option<Arc<dyn ReminderStore>> = if config.is_store_configured() {
            Some(Arc::new(SupabaseReminderStore::new(config)))
        } else {
            warn!("Reminder store not configured; reminder operations will be skipped");
            None
        };

        let telephony: Option<Arc<dyn CallPlacer>> = if config.is_telephony_configured() {
            Some(Arc::new(TwilioClient::new(config)))
        } else {
            warn!("Telephony not configured; dispatcher will not place calls");
            None
        };

        Self::with_components(store, telephony, config)
    }

    /// Build with explicit collaborators, used by tests and alternative deployments.
    pub fn with_components(
        store: Option<Arc<dyn ReminderStore>>,
        telephony: Option<Arc<dyn CallPlacer>>,
        config: &AppConfig,
    ) -> Self {
        let default_timezone = resolve_timezone(&config.default_timezone, chrono_tz::America::New_York);

        Self {
            store,
            telephony,
            default_timezone,
            default_country_code: config.default_country_code.clone(),
            outbound_config_id: config.hume_outbound_config_id.clone(),
            test_mode: config.reminder_test_mode,
        }
    }

    pub fn is_store_configured(&self) -> bool {
        self.store.is_some()
    }

    // ==========================================================================
    // BOOKING FLOW
    // ==========================================================================

    /// Create the `pending` record for a new booking. A second booking for the same appointment
    /// reschedules the existing row in place.
    #[instrument(skip(self, new), fields(appointment_id = %new.appointment_id))]
    pub async fn create_for_booking(&self, new: NewReminder, now: DateTime<Utc>) -> ReminderOutcome {
        let Some(store) = self.store.as_ref() else {
            return Self::store_missing();
        };

        let existing = match store.get(&new.appointment_id).await {
            Ok(existing) => existing,
            Err(e) => return Self::store_failed(e),
        };

        match existing {
            Some(record) => {
                let transition = ReminderLifecycle::apply(
                    &record,
                    ReminderEvent::Rescheduled {
                        appointment_time: new.appointment_time,
                    },
                    now,
                );
                let transition = match transition {
                    Transition::Apply(patch) => Transition::Apply(ReminderPatch {
                        patient_id: Some(new.patient_id),
                        patient_name: new.patient_name,
                        phone_number: Some(new.phone_number),
                        provider_id: Some(new.provider_id),
                        timezone: Some(new.timezone),
                        ..patch
                    }),
                    other => other,
                };
                info!("Reminder already exists for {}, rescheduling in place", record.appointment_id);
                self.persist(store.as_ref(), &record, transition).await
            }
            None => {
                let record = ReminderCall::from_booking(new, now);
                match store.insert(&record).await {
                    Ok(inserted) => {
                        info!("Created pending reminder for appointment {}", inserted.appointment_id);
                        ReminderOutcome::Applied(inserted.status)
                    }
                    Err(e) => Self::store_failed(e),
                }
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn reschedule(
        &self,
        appointment_id: &str,
        appointment_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> ReminderOutcome {
        self.apply_event(appointment_id, ReminderEvent::Rescheduled { appointment_time }, now)
            .await
    }

    #[instrument(skip(self))]
    pub async fn cancel(&self, appointment_id: &str, now: DateTime<Utc>) -> ReminderOutcome {
        self.apply_event(appointment_id, ReminderEvent::Cancelled, now).await
    }

    // ==========================================================================
    // DISPATCHER
    // ==========================================================================

    /// One pass over pending records. Placement failures are isolated per record and fed to
    /// the retry counter.
    #[instrument(skip(self, request))]
    pub async fn dispatch_due(
        &self,
        request: DispatchRequest,
        now: DateTime<Utc>,
    ) -> Result<DispatchSummary, ReminderError> {
        let window = DispatchWindow::from_request(&request, self.test_mode)?;
        let mut summary = DispatchSummary::default();

        let (Some(store), Some(telephony)) = (self.store.as_ref(), self.telephony.as_ref()) else {
            warn!("Dispatcher invoked without store or telephony configured");
            return Ok(summary);
        };

        let pending = match store.list_by_status(ReminderStatus::Pending).await {
            Ok(rows) => rows,
            Err(e) => {
                error!("Failed to load pending reminders: {}", e);
                return Ok(summary);
            }
        };

        info!(
            "Dispatching over {} pending reminders (window {}h, hours {}..{}, test_mode={})",
            pending.len(),
            window.hours_before,
            window.start_hour,
            window.end_hour,
            window.test_mode
        );

        for record in pending {
            if !is_due(&record, &window, now, self.default_timezone) {
                summary.skipped += 1;
                continue;
            }

            // Count the attempt before dialling. A store that cannot take this write would
            // never see the call either, and the next pass would dial again.
            let claimed = match ReminderLifecycle::apply(&record, ReminderEvent::AttemptStarted, now) {
                Transition::Apply(patch) => match store.update(&record.appointment_id, &patch).await {
                    Ok(Some(claimed)) => claimed,
                    Ok(None) => {
                        warn!("Reminder {} vanished before dialling", record.appointment_id);
                        summary.skipped += 1;
                        continue;
                    }
                    Err(e) => {
                        error!(
                            "Could not record attempt for {}, stopping dispatch: {}",
                            record.appointment_id, e
                        );
                        summary.failed += 1;
                        summary.results.push(DispatchResult {
                            appointment_id: record.appointment_id,
                            outcome: DispatchOutcome::NotAttempted,
                            call_sid: None,
                            error: Some(e.to_string()),
                        });
                        break;
                    }
                },
                other => {
                    debug!("Not dialling {}: {:?}", record.appointment_id, other);
                    summary.skipped += 1;
                    continue;
                }
            };

            let placement = match normalize_phone_number(&claimed.phone_number, &self.default_country_code) {
                Some(to) => telephony
                    .place_call(&OutboundCall {
                        appointment_id: claimed.appointment_id.clone(),
                        to,
                    })
                    .await
                    .map_err(|e| e.to_string()),
                None => Err(format!("invalid phone number '{}'", claimed.phone_number)),
            };

            let (event, call_sid, error) = match placement {
                Ok(placed) => (
                    ReminderEvent::CallPlaced {
                        call_sid: placed.call_sid.clone(),
                    },
                    Some(placed.call_sid),
                    None,
                ),
                Err(reason) => {
                    warn!("Call placement failed for {}: {}", claimed.appointment_id, reason);
                    (
                        ReminderEvent::PlacementFailed {
                            reason: reason.clone(),
                        },
                        None,
                        Some(reason),
                    )
                }
            };

            let transition = ReminderLifecycle::apply(&claimed, event, now);
            let outcome = match self.persist(store.as_ref(), &claimed, transition).await {
                ReminderOutcome::Applied(ReminderStatus::Calling) => DispatchOutcome::Placed,
                ReminderOutcome::Applied(ReminderStatus::Failed) => DispatchOutcome::Failed,
                ReminderOutcome::Applied(_) => DispatchOutcome::RetryScheduled,
                other => {
                    error!(
                        "Result for {} not recorded ({:?}), stopping dispatch",
                        claimed.appointment_id, other
                    );
                    DispatchOutcome::Unrecorded
                }
            };

            match outcome {
                DispatchOutcome::Placed => summary.processed += 1,
                _ => summary.failed += 1,
            }
            summary.results.push(DispatchResult {
                appointment_id: claimed.appointment_id,
                outcome,
                call_sid,
                error,
            });

            if outcome == DispatchOutcome::Unrecorded {
                break;
            }
        }

        info!(
            "Dispatch complete: {} placed, {} skipped, {} failed",
            summary.processed, summary.skipped, summary.failed
        );
        Ok(summary)
    }

    // ==========================================================================
    // CALLBACKS
    // ==========================================================================

    /// Telephony progress and dial-result callbacks. Unknown statuses and uncorrelated
    /// callbacks leave every record untouched.
    #[instrument(skip(self, update), fields(appointment_id = ?update.appointment_id, call_sid = ?update.call_sid))]
    pub async fn handle_call_status(&self, update: CallStatusUpdate, now: DateTime<Utc>) -> ReminderOutcome {
        let Some(appointment_id) = update.appointment_id.as_deref().filter(|id| !id.trim().is_empty()) else {
            warn!("Telephony callback without appointment_id, ignoring");
            return ReminderOutcome::Ignored("missing appointment_id".to_string());
        };

        let Some(raw_status) = update.status.as_deref() else {
            warn!("Telephony callback for {} without status, ignoring", appointment_id);
            return ReminderOutcome::Ignored("missing status".to_string());
        };

        let Some(status) = CallStatus::parse(raw_status) else {
            warn!("Unknown telephony status '{}' for {}, ignoring", raw_status, appointment_id);
            return ReminderOutcome::Ignored(format!("unknown status '{}'", raw_status));
        };

        let call_sid = update.call_sid.clone();
        let event = match status.outcome() {
            CallOutcome::Progress => ReminderEvent::CallProgress {
                call_sid,
                status: status.to_string(),
            },
            CallOutcome::Answered => ReminderEvent::CallAnswered { call_sid },
            CallOutcome::Completed => ReminderEvent::CallCompleted { call_sid },
            CallOutcome::Failed => ReminderEvent::CallFailed {
                call_sid,
                status: status.to_string(),
            },
        };

        self.apply_event(appointment_id, event, now).await
    }

    /// Voice session end. Only sessions on the outbound reminder config complete a call.
    #[instrument(skip(self, notice), fields(chat_id = %notice.chat_id))]
    pub async fn handle_chat_ended(&self, notice: ChatEndedNotice, now: DateTime<Utc>) -> ReminderOutcome {
        let is_outbound = !self.outbound_config_id.is_empty()
            && notice.config_id.as_deref() == Some(self.outbound_config_id.as_str());
        if !is_outbound {
            debug!("Chat {} ended on config {:?}, not a reminder call", notice.chat_id, notice.config_id);
            return ReminderOutcome::Ignored("not an outbound reminder session".to_string());
        }

        let Some(store) = self.store.as_ref() else {
            return Self::store_missing();
        };

        let Some(active) = self.find_active_call(notice.custom_session_id.as_deref()).await else {
            info!("Chat {} ended with no active reminder call", notice.chat_id);
            return ReminderOutcome::Ignored("no active reminder call".to_string());
        };

        let transition = ReminderLifecycle::apply(&active.record, ReminderEvent::SessionEnded, now);
        self.persist(store.as_ref(), &active.record, transition).await
    }

    // ==========================================================================
    // ACTIVE-CALL LOOKUP
    // ==========================================================================

    /// Correlation id first, then the most recently updated `in_progress` record, then the most
    /// recently updated `calling` record.
    #[instrument(skip(self))]
    pub async fn find_active_call(&self, correlation_id: Option<&str>) -> Option<ActiveCall> {
        let store = self.store.as_ref()?;

        if let Some(id) = correlation_id.filter(|id| !id.trim().is_empty()) {
            match store.get(id).await {
                Ok(Some(record)) => {
                    return Some(ActiveCall {
                        record,
                        source: LookupSource::Correlation,
                        ambiguous: false,
                    })
                }
                Ok(None) => warn!("No reminder for correlation id {}, falling back", id),
                Err(e) => {
                    error!("Active-call lookup failed: {}", e);
                    return None;
                }
            }
        }

        for (status, source) in [
            (ReminderStatus::InProgress, LookupSource::InProgressFallback),
            (ReminderStatus::Calling, LookupSource::CallingFallback),
        ] {
            let candidates = match store.list_by_status(status).await {
                Ok(rows) => rows,
                Err(e) => {
                    error!("Active-call lookup failed: {}", e);
                    return None;
                }
            };

            let ambiguous = candidates.len() > 1;
            if let Some(record) = candidates.into_iter().max_by_key(|r| r.updated_at) {
                warn!(
                    "Active call resolved by {:?} fallback to appointment {}{}",
                    source,
                    record.appointment_id,
                    if ambiguous { " (ambiguous: several candidates)" } else { "" }
                );
                return Some(ActiveCall {
                    record,
                    source,
                    ambiguous,
                });
            }
        }

        None
    }

    // ==========================================================================
    // HELPERS
    // ==========================================================================

    async fn apply_event(&self, appointment_id: &str, event: ReminderEvent, now: DateTime<Utc>) -> ReminderOutcome {
        let Some(store) = self.store.as_ref() else {
            return Self::store_missing();
        };

        let record = match store.get(appointment_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                info!("No reminder for appointment {}", appointment_id);
                return ReminderOutcome::Ignored(format!("no reminder for appointment {}", appointment_id));
            }
            Err(e) => return Self::store_failed(e),
        };

        let transition = ReminderLifecycle::apply(&record, event, now);
        self.persist(store.as_ref(), &record, transition).await
    }

    async fn persist(&self, store: &dyn ReminderStore, record: &ReminderCall, transition: Transition) -> ReminderOutcome {
        match transition {
            Transition::Apply(patch) => {
                let target = patch.status.unwrap_or(record.status);
                match store.update(&record.appointment_id, &patch).await {
                    Ok(Some(_)) => {
                        if target != record.status {
                            info!(
                                "Reminder {} moved {} -> {}",
                                record.appointment_id, record.status, target
                            );
                        }
                        ReminderOutcome::Applied(target)
                    }
                    Ok(None) => {
                        warn!("Reminder {} vanished before update", record.appointment_id);
                        ReminderOutcome::Skipped("record not found on update".to_string())
                    }
                    Err(e) => Self::store_failed(e),
                }
            }
            Transition::NoOp => {
                debug!("Reminder {} already {}", record.appointment_id, record.status);
                ReminderOutcome::Unchanged(record.status)
            }
            Transition::Ignored(reason) => {
                info!("Ignoring event for reminder {}: {}", record.appointment_id, reason);
                ReminderOutcome::Ignored(reason)
            }
        }
    }

    fn store_missing() -> ReminderOutcome {
        warn!("Reminder store not configured, skipping");
        ReminderOutcome::Skipped("store not configured".to_string())
    }

    fn store_failed(e: ReminderError) -> ReminderOutcome {
        error!("Reminder store unavailable: {}", e);
        ReminderOutcome::Skipped(e.to_string())
    }
}
