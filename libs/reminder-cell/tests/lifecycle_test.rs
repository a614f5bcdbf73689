use assert_matches::assert_matches;

use reminder_cell::models::{ReminderStatus, ReminderPatch};
use reminder_cell::services::lifecycle::{ReminderEvent, ReminderLifecycle, Transition, MAX_CALL_ATTEMPTS};
use reminder_cell::test_utils::{utc, ReminderFixture};

fn applied(transition: Transition) -> ReminderPatch {
    match transition {
        Transition::Apply(patch) => patch,
        other => panic!("expected a patch, got {:?}", other),
    }
}

#[test]
fn test_attempt_started_counts_attempt_without_leaving_pending() {
    let mut record = ReminderFixture::pending("appt-1");
    record.call_attempts = 1;
    let now = utc(2025, 3, 9, 15, 0);

    let patch = applied(ReminderLifecycle::apply(&record, ReminderEvent::AttemptStarted, now));

    assert_eq!(patch.status, None);
    assert_eq!(patch.call_attempts, Some(2));
    assert_eq!(patch.last_attempt_at, Some(now));

    let calling = ReminderFixture::in_status("appt-2", ReminderStatus::Calling, 1);
    assert_matches!(
        ReminderLifecycle::apply(&calling, ReminderEvent::AttemptStarted, now),
        Transition::Ignored(_)
    );
}

#[test]
fn test_call_placed_moves_pending_to_calling() {
    let mut record = ReminderFixture::pending("appt-1");
    record.call_attempts = 1;
    let now = utc(2025, 3, 9, 15, 0);

    let patch = applied(ReminderLifecycle::apply(
        &record,
        ReminderEvent::CallPlaced { call_sid: "CA1".to_string() },
        now,
    ));

    assert_eq!(patch.status, Some(ReminderStatus::Calling));
    assert_eq!(patch.call_sid, Some(Some("CA1".to_string())));
    assert_eq!(patch.call_attempts, None);
}

#[test]
fn test_placement_failure_retries_below_limit_and_fails_at_limit() {
    let now = utc(2025, 3, 9, 15, 0);

    for previous in 0..6 {
        let mut record = ReminderFixture::pending("appt-1");
        record.call_attempts = previous;

        let started = applied(ReminderLifecycle::apply(&record, ReminderEvent::AttemptStarted, now));
        record.apply_patch(&started);

        let patch = applied(ReminderLifecycle::apply(
            &record,
            ReminderEvent::PlacementFailed { reason: "provider down".to_string() },
            now,
        ));

        let attempts = previous + 1;
        assert_eq!(record.call_attempts, attempts);
        assert_eq!(patch.call_attempts, None);
        let expected = if attempts >= MAX_CALL_ATTEMPTS {
            ReminderStatus::Failed
        } else {
            ReminderStatus::Pending
        };
        assert_eq!(patch.status, Some(expected), "after {} attempts", attempts);
    }
}

#[test]
fn test_third_placement_failure_is_terminal() {
    let mut record = ReminderFixture::pending("appt-1");
    record.call_attempts = 2;
    let now = utc(2025, 3, 9, 15, 0);

    record.apply_patch(&applied(ReminderLifecycle::apply(&record, ReminderEvent::AttemptStarted, now)));
    let patch = applied(ReminderLifecycle::apply(
        &record,
        ReminderEvent::PlacementFailed { reason: "invalid number".to_string() },
        now,
    ));

    assert_eq!(record.call_attempts, 3);
    assert_eq!(patch.status, Some(ReminderStatus::Failed));
}

#[test]
fn test_answered_moves_calling_to_in_progress_once() {
    let record = ReminderFixture::in_status("appt-1", ReminderStatus::Calling, 1);
    let now = utc(2025, 3, 9, 15, 1);

    let patch = applied(ReminderLifecycle::apply(
        &record,
        ReminderEvent::CallAnswered { call_sid: record.call_sid.clone() },
        now,
    ));
    assert_eq!(patch.status, Some(ReminderStatus::InProgress));

    let mut answered = record.clone();
    answered.apply_patch(&patch);
    assert_eq!(
        ReminderLifecycle::apply(&answered, ReminderEvent::CallAnswered { call_sid: None }, now),
        Transition::NoOp
    );
}

#[test]
fn test_completed_is_idempotent() {
    let record = ReminderFixture::in_status("appt-1", ReminderStatus::InProgress, 1);
    let now = utc(2025, 3, 9, 15, 5);

    let patch = applied(ReminderLifecycle::apply(&record, ReminderEvent::SessionEnded, now));
    assert_eq!(patch.status, Some(ReminderStatus::Completed));

    let mut completed = record.clone();
    completed.apply_patch(&patch);

    assert_eq!(
        ReminderLifecycle::apply(&completed, ReminderEvent::SessionEnded, now),
        Transition::NoOp
    );
    assert_eq!(
        ReminderLifecycle::apply(
            &completed,
            ReminderEvent::CallCompleted { call_sid: completed.call_sid.clone() },
            now
        ),
        Transition::NoOp
    );
    assert_eq!(completed.status, ReminderStatus::Completed);
}

#[test]
fn test_call_failure_below_limit_returns_to_pending_and_clears_call_sid() {
    let record = ReminderFixture::in_status("appt-1", ReminderStatus::Calling, 1);

    let patch = applied(ReminderLifecycle::apply(
        &record,
        ReminderEvent::CallFailed {
            call_sid: record.call_sid.clone(),
            status: "no-answer".to_string(),
        },
        utc(2025, 3, 9, 15, 2),
    ));

    assert_eq!(patch.status, Some(ReminderStatus::Pending));
    assert_eq!(patch.call_sid, Some(None));
    assert_eq!(patch.call_attempts, None);
    assert_eq!(patch.last_call_status.as_deref(), Some("no-answer"));
}

#[test]
fn test_call_failure_at_limit_is_terminal() {
    let record = ReminderFixture::in_status("appt-1", ReminderStatus::InProgress, 3);

    let patch = applied(ReminderLifecycle::apply(
        &record,
        ReminderEvent::CallFailed { call_sid: None, status: "busy".to_string() },
        utc(2025, 3, 9, 15, 2),
    ));

    assert_eq!(patch.status, Some(ReminderStatus::Failed));
}

#[test]
fn test_callback_for_previous_call_is_ignored() {
    let record = ReminderFixture::in_status("appt-1", ReminderStatus::Calling, 2);

    let transition = ReminderLifecycle::apply(
        &record,
        ReminderEvent::CallFailed {
            call_sid: Some("CA-earlier".to_string()),
            status: "busy".to_string(),
        },
        utc(2025, 3, 9, 15, 2),
    );

    assert_matches!(transition, Transition::Ignored(_));
}

#[test]
fn test_late_failure_after_retry_is_ignored() {
    let record = ReminderFixture::pending("appt-1");

    let transition = ReminderLifecycle::apply(
        &record,
        ReminderEvent::CallFailed { call_sid: Some("CA1".to_string()), status: "busy".to_string() },
        utc(2025, 3, 9, 15, 2),
    );

    assert_matches!(transition, Transition::Ignored(_));
}

#[test]
fn test_cancel_yields_cancelled_from_every_state_but_completed() {
    let now = utc(2025, 3, 9, 16, 0);

    for status in [
        ReminderStatus::Pending,
        ReminderStatus::Calling,
        ReminderStatus::InProgress,
        ReminderStatus::Failed,
    ] {
        let record = ReminderFixture::in_status("appt-1", status, 1);
        let patch = applied(ReminderLifecycle::apply(&record, ReminderEvent::Cancelled, now));
        assert_eq!(patch.status, Some(ReminderStatus::Cancelled), "from {}", status);
    }

    let cancelled = ReminderFixture::in_status("appt-1", ReminderStatus::Cancelled, 1);
    assert_eq!(
        ReminderLifecycle::apply(&cancelled, ReminderEvent::Cancelled, now),
        Transition::NoOp
    );

    // Completed reminders keep their outcome; cancelling one is left unresolved upstream.
    let completed = ReminderFixture::in_status("appt-1", ReminderStatus::Completed, 1);
    assert_matches!(
        ReminderLifecycle::apply(&completed, ReminderEvent::Cancelled, now),
        Transition::Ignored(_)
    );
}

#[test]
fn test_reschedule_resets_to_pending_and_keeps_attempts() {
    let record = ReminderFixture::in_status("appt-1", ReminderStatus::Failed, 3);
    let new_time = utc(2025, 3, 17, 15, 0);

    let patch = applied(ReminderLifecycle::apply(
        &record,
        ReminderEvent::Rescheduled { appointment_time: new_time },
        utc(2025, 3, 9, 16, 0),
    ));

    assert_eq!(patch.status, Some(ReminderStatus::Pending));
    assert_eq!(patch.call_sid, Some(None));
    assert_eq!(patch.appointment_time, Some(new_time));
    assert_eq!(patch.call_attempts, None);
}

#[test]
fn test_progress_records_raw_status_without_transition() {
    let record = ReminderFixture::in_status("appt-1", ReminderStatus::Calling, 1);

    let patch = applied(ReminderLifecycle::apply(
        &record,
        ReminderEvent::CallProgress { call_sid: None, status: "ringing".to_string() },
        utc(2025, 3, 9, 15, 1),
    ));

    assert_eq!(patch.status, None);
    assert_eq!(patch.last_call_status.as_deref(), Some("ringing"));
}

#[test]
fn test_patch_serializes_cleared_call_sid_as_null() {
    let now = utc(2025, 3, 9, 15, 0);
    let patch = ReminderPatch {
        call_sid: Some(None),
        ..ReminderPatch::at(now).status(ReminderStatus::Pending)
    };

    let body = serde_json::to_value(&patch).unwrap();

    assert_eq!(body["status"], "pending");
    assert!(body["call_sid"].is_null());
    assert!(body.get("call_attempts").is_none());
    assert!(body.get("updated_at").is_some());
}
