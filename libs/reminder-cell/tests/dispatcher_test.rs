use std::sync::Arc;

use assert_matches::assert_matches;

use reminder_cell::models::{
    DispatchOutcome, DispatchRequest, NewReminder, ReminderError, ReminderOutcome, ReminderStatus,
};
use reminder_cell::services::{ReminderCallService, ReminderStore};
use reminder_cell::test_utils::{utc, MemoryReminderStore, ReminderFixture};
use shared_utils::test_utils::TestConfig;
use telephony_cell::test_utils::RecordingCallPlacer;
use telephony_cell::CallPlacer;

fn service_with(
    store: Arc<MemoryReminderStore>,
    placer: Arc<RecordingCallPlacer>,
) -> ReminderCallService {
    let config = TestConfig::default().to_app_config();
    ReminderCallService::with_components(
        Some(store as Arc<dyn ReminderStore>),
        Some(placer as Arc<dyn CallPlacer>),
        &config,
    )
}

#[tokio::test]
async fn test_dispatch_places_due_call_and_moves_to_calling() {
    let store = Arc::new(MemoryReminderStore::with_records(vec![ReminderFixture::pending("appt-1")]));
    let placer = Arc::new(RecordingCallPlacer::new());
    let service = service_with(store.clone(), placer.clone());
    let now = utc(2025, 3, 9, 15, 0);

    let summary = service.dispatch_due(DispatchRequest::default(), now).await.unwrap();

    assert_eq!((summary.processed, summary.skipped, summary.failed), (1, 0, 0));
    assert_eq!(summary.results[0].outcome, DispatchOutcome::Placed);

    let placed = placer.placed_calls();
    assert_eq!(placed.len(), 1);
    assert_eq!(placed[0].to, "+15551234567");
    assert_eq!(placed[0].appointment_id, "appt-1");

    let record = store.snapshot("appt-1").unwrap();
    assert_eq!(record.status, ReminderStatus::Calling);
    assert_eq!(record.call_sid.as_deref(), Some("CA0001"));
    assert_eq!(record.call_attempts, 1);
    assert_eq!(record.last_attempt_at, Some(now));
}

#[tokio::test]
async fn test_dispatch_skips_records_outside_calling_hours() {
    let store = Arc::new(MemoryReminderStore::with_records(vec![ReminderFixture::pending("appt-1")]));
    let placer = Arc::new(RecordingCallPlacer::new());
    let service = service_with(store.clone(), placer.clone());

    let summary = service
        .dispatch_due(DispatchRequest::default(), utc(2025, 3, 9, 5, 0))
        .await
        .unwrap();

    assert_eq!((summary.processed, summary.skipped, summary.failed), (0, 1, 0));
    assert!(placer.placed_calls().is_empty());
    assert_eq!(store.snapshot("appt-1").unwrap().status, ReminderStatus::Pending);
}

#[tokio::test]
async fn test_dispatch_test_mode_calls_regardless_of_window() {
    let store = Arc::new(MemoryReminderStore::with_records(vec![ReminderFixture::pending("appt-1")]));
    let placer = Arc::new(RecordingCallPlacer::new());
    let service = service_with(store.clone(), placer.clone());

    let request = DispatchRequest {
        test_mode: Some(true),
        ..Default::default()
    };
    let summary = service.dispatch_due(request, utc(2025, 3, 9, 5, 0)).await.unwrap();

    assert_eq!(summary.processed, 1);
}

#[tokio::test]
async fn test_dispatch_isolates_failing_record() {
    let store = Arc::new(MemoryReminderStore::with_records(vec![
        ReminderFixture::pending("appt-bad"),
        ReminderFixture::pending("appt-good"),
    ]));
    let placer = Arc::new(RecordingCallPlacer::new());
    placer.fail_for("appt-bad");
    let service = service_with(store.clone(), placer.clone());

    let summary = service
        .dispatch_due(DispatchRequest::default(), utc(2025, 3, 9, 15, 0))
        .await
        .unwrap();

    assert_eq!((summary.processed, summary.failed), (1, 1));

    let bad = store.snapshot("appt-bad").unwrap();
    assert_eq!(bad.status, ReminderStatus::Pending);
    assert_eq!(bad.call_attempts, 1);
    assert_eq!(bad.call_sid, None);

    let good = store.snapshot("appt-good").unwrap();
    assert_eq!(good.status, ReminderStatus::Calling);
}

#[tokio::test]
async fn test_third_placement_failure_marks_record_failed() {
    let mut record = ReminderFixture::pending("appt-1");
    record.call_attempts = 2;
    let store = Arc::new(MemoryReminderStore::with_records(vec![record]));
    let placer = Arc::new(RecordingCallPlacer::new());
    placer.fail_for("appt-1");
    let service = service_with(store.clone(), placer);

    let summary = service
        .dispatch_due(DispatchRequest::default(), utc(2025, 3, 9, 15, 0))
        .await
        .unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.results[0].outcome, DispatchOutcome::Failed);

    let record = store.snapshot("appt-1").unwrap();
    assert_eq!(record.call_attempts, 3);
    assert_eq!(record.status, ReminderStatus::Failed);
}

#[tokio::test]
async fn test_invalid_phone_number_counts_as_placement_failure() {
    let mut record = ReminderFixture::pending("appt-1");
    record.phone_number = "n/a".to_string();
    let store = Arc::new(MemoryReminderStore::with_records(vec![record]));
    let placer = Arc::new(RecordingCallPlacer::new());
    let service = service_with(store.clone(), placer.clone());

    let summary = service
        .dispatch_due(DispatchRequest::default(), utc(2025, 3, 9, 15, 0))
        .await
        .unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.results[0].outcome, DispatchOutcome::RetryScheduled);
    assert!(placer.placed_calls().is_empty());
    assert_eq!(store.snapshot("appt-1").unwrap().call_attempts, 1);
}

#[tokio::test]
async fn test_unwritable_store_never_dials() {
    let store = Arc::new(MemoryReminderStore::with_records(vec![
        ReminderFixture::pending("appt-1"),
        ReminderFixture::pending("appt-2"),
    ]));
    store.fail_updates_after(0);
    let placer = Arc::new(RecordingCallPlacer::new());
    let service = service_with(store.clone(), placer.clone());

    for pass in 0..4 {
        let now = utc(2025, 3, 9, 15, 15 * pass);
        let summary = service.dispatch_due(DispatchRequest::default(), now).await.unwrap();

        assert_eq!((summary.processed, summary.failed), (0, 1), "pass {}", pass);
        assert_eq!(summary.results.len(), 1, "pass stops at the first rejected write");
        assert_eq!(summary.results[0].outcome, DispatchOutcome::NotAttempted);
    }

    assert!(placer.placed_calls().is_empty());
    for id in ["appt-1", "appt-2"] {
        let record = store.snapshot(id).unwrap();
        assert_eq!(record.status, ReminderStatus::Pending);
        assert_eq!(record.call_attempts, 0);
    }
}

#[tokio::test]
async fn test_placed_call_that_cannot_be_recorded_is_not_reported_as_placed() {
    let store = Arc::new(MemoryReminderStore::with_records(vec![
        ReminderFixture::pending("appt-1"),
        ReminderFixture::pending("appt-2"),
    ]));
    store.fail_updates_after(1);
    let placer = Arc::new(RecordingCallPlacer::new());
    let service = service_with(store.clone(), placer.clone());

    let summary = service
        .dispatch_due(DispatchRequest::default(), utc(2025, 3, 9, 15, 0))
        .await
        .unwrap();

    assert_eq!((summary.processed, summary.failed), (0, 1));
    assert_eq!(summary.results.len(), 1);
    assert_eq!(summary.results[0].outcome, DispatchOutcome::Unrecorded);
    assert!(summary.results[0].call_sid.is_some());
    assert_eq!(placer.placed_calls().len(), 1);

    // The attempt was counted before dialling, so the retry limit still applies.
    let dialled = &summary.results[0].appointment_id;
    assert_eq!(store.snapshot(dialled).unwrap().call_attempts, 1);
}

#[tokio::test]
async fn test_placement_failure_that_cannot_be_recorded_is_not_a_scheduled_retry() {
    let store = Arc::new(MemoryReminderStore::with_records(vec![ReminderFixture::pending("appt-1")]));
    store.fail_updates_after(1);
    let placer = Arc::new(RecordingCallPlacer::new());
    placer.fail_for("appt-1");
    let service = service_with(store.clone(), placer);

    let summary = service
        .dispatch_due(DispatchRequest::default(), utc(2025, 3, 9, 15, 0))
        .await
        .unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.results[0].outcome, DispatchOutcome::Unrecorded);
    assert!(summary.results[0].error.is_some());
    assert_eq!(store.snapshot("appt-1").unwrap().call_attempts, 1);
}

#[tokio::test]
async fn test_dispatch_without_store_returns_zero_summary() {
    let config = TestConfig::default().to_app_config();
    let placer = Arc::new(RecordingCallPlacer::new());
    let service = ReminderCallService::with_components(None, Some(placer as Arc<dyn CallPlacer>), &config);

    let summary = service
        .dispatch_due(DispatchRequest::default(), utc(2025, 3, 9, 15, 0))
        .await
        .unwrap();

    assert_eq!((summary.processed, summary.skipped, summary.failed), (0, 0, 0));
}

#[tokio::test]
async fn test_dispatch_with_unreachable_store_returns_zero_summary() {
    let store = Arc::new(MemoryReminderStore::with_records(vec![ReminderFixture::pending("appt-1")]));
    store.set_unavailable(true);
    let service = service_with(store, Arc::new(RecordingCallPlacer::new()));

    let summary = service
        .dispatch_due(DispatchRequest::default(), utc(2025, 3, 9, 15, 0))
        .await
        .unwrap();

    assert!(summary.results.is_empty());
}

#[tokio::test]
async fn test_dispatch_rejects_inverted_window() {
    let service = service_with(
        Arc::new(MemoryReminderStore::new()),
        Arc::new(RecordingCallPlacer::new()),
    );

    let request = DispatchRequest {
        calling_hours_start: Some(20),
        calling_hours_end: Some(8),
        ..Default::default()
    };

    assert_matches!(
        service.dispatch_due(request, utc(2025, 3, 9, 15, 0)).await,
        Err(ReminderError::InvalidWindow(_))
    );
}

#[tokio::test]
async fn test_booking_creates_pending_then_reschedules_in_place() {
    let store = Arc::new(MemoryReminderStore::new());
    let service = service_with(store.clone(), Arc::new(RecordingCallPlacer::new()));
    let booking = NewReminder {
        appointment_id: "appt-1".to_string(),
        patient_id: "patient-1".to_string(),
        patient_name: Some("Jane Doe".to_string()),
        phone_number: "+15551234567".to_string(),
        provider_id: "provider-1".to_string(),
        appointment_time: utc(2025, 3, 10, 14, 0),
        timezone: "America/New_York".to_string(),
    };

    let created = service.create_for_booking(booking.clone(), utc(2025, 3, 1, 12, 0)).await;
    assert_eq!(created, ReminderOutcome::Applied(ReminderStatus::Pending));

    // Simulate an attempt cycle in flight, then book the same appointment again.
    let mut calling = store.snapshot("appt-1").unwrap();
    calling.status = ReminderStatus::Calling;
    calling.call_sid = Some("CA9".to_string());
    calling.call_attempts = 1;
    store.put(calling);

    let rebooked = NewReminder {
        appointment_time: utc(2025, 3, 12, 18, 0),
        provider_id: "provider-2".to_string(),
        ..booking
    };
    let outcome = service.create_for_booking(rebooked, utc(2025, 3, 2, 12, 0)).await;
    assert_eq!(outcome, ReminderOutcome::Applied(ReminderStatus::Pending));

    let record = store.snapshot("appt-1").unwrap();
    assert_eq!(record.status, ReminderStatus::Pending);
    assert_eq!(record.call_sid, None);
    assert_eq!(record.call_attempts, 1);
    assert_eq!(record.provider_id, "provider-2");
    assert_eq!(record.appointment_time, utc(2025, 3, 12, 18, 0));
}

#[tokio::test]
async fn test_cancel_and_reschedule_through_service() {
    let store = Arc::new(MemoryReminderStore::with_records(vec![ReminderFixture::in_status(
        "appt-1",
        ReminderStatus::Failed,
        3,
    )]));
    let service = service_with(store.clone(), Arc::new(RecordingCallPlacer::new()));
    let now = utc(2025, 3, 9, 16, 0);

    assert_eq!(
        service.reschedule("appt-1", utc(2025, 3, 20, 14, 0), now).await,
        ReminderOutcome::Applied(ReminderStatus::Pending)
    );
    assert_eq!(
        service.cancel("appt-1", now).await,
        ReminderOutcome::Applied(ReminderStatus::Cancelled)
    );
    assert_eq!(
        service.cancel("appt-1", now).await,
        ReminderOutcome::Unchanged(ReminderStatus::Cancelled)
    );
    assert_matches!(service.cancel("appt-missing", now).await, ReminderOutcome::Ignored(_));
}

#[tokio::test]
async fn test_operations_skip_when_store_missing() {
    let config = TestConfig::default().to_app_config();
    let service = ReminderCallService::with_components(None, None, &config);

    assert_matches!(
        service.cancel("appt-1", utc(2025, 3, 9, 16, 0)).await,
        ReminderOutcome::Skipped(_)
    );
    assert!(service.find_active_call(Some("appt-1")).await.is_none());
}
