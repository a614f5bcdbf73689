use assert_matches::assert_matches;
use chrono_tz::Tz;

use reminder_cell::models::{DispatchRequest, ReminderError, ReminderStatus};
use reminder_cell::services::eligibility::{is_due, resolve_timezone, DispatchWindow, MAX_HOURS_BEFORE};
use reminder_cell::test_utils::{utc, ReminderFixture};

const NEW_YORK: Tz = chrono_tz::America::New_York;

#[test]
fn test_due_within_threshold_during_local_calling_hours() {
    // 11:00 EDT, 23 hours before the 10:00 EDT appointment.
    let record = ReminderFixture::pending("appt-1");
    let now = utc(2025, 3, 9, 15, 0);

    assert!(is_due(&record, &DispatchWindow::default(), now, NEW_YORK));
}

#[test]
fn test_not_due_at_local_midnight() {
    // 00:00 EST, within the 24 hour threshold.
    let record = ReminderFixture::pending("appt-1");
    let now = utc(2025, 3, 9, 5, 0);

    assert!(!is_due(&record, &DispatchWindow::default(), now, NEW_YORK));
}

#[test]
fn test_not_due_late_evening_local_time() {
    // 23:00 EDT, 11 hours before the appointment.
    let record = ReminderFixture::pending("appt-1");
    let now = utc(2025, 3, 10, 3, 0);

    assert!(!is_due(&record, &DispatchWindow::default(), now, NEW_YORK));
}

#[test]
fn test_not_due_outside_threshold_or_after_appointment() {
    let record = ReminderFixture::pending("appt-1");
    let window = DispatchWindow::default();

    // Two days out, 10:00 local.
    assert!(!is_due(&record, &window, utc(2025, 3, 8, 15, 0), NEW_YORK));
    // Appointment already started.
    assert!(!is_due(&record, &window, utc(2025, 3, 10, 15, 0), NEW_YORK));
}

#[test]
fn test_calling_hours_end_is_exclusive() {
    let mut record = ReminderFixture::pending("appt-1");
    record.appointment_time = utc(2025, 3, 11, 14, 0);
    let window = DispatchWindow::default();

    // 18:59 EDT is inside, 19:00 EDT is not.
    assert!(is_due(&record, &window, utc(2025, 3, 10, 22, 59), NEW_YORK));
    assert!(!is_due(&record, &window, utc(2025, 3, 10, 23, 0), NEW_YORK));
}

#[test]
fn test_uses_record_timezone_for_local_hour() {
    let mut record = ReminderFixture::pending("appt-1");
    record.timezone = "America/Los_Angeles".to_string();

    // 08:00 PDT, still before calling hours on the west coast.
    assert!(!is_due(&record, &DispatchWindow::default(), utc(2025, 3, 9, 15, 0), NEW_YORK));
}

#[test]
fn test_test_mode_bypasses_every_check() {
    let window = DispatchWindow {
        test_mode: true,
        ..DispatchWindow::default()
    };

    let record = ReminderFixture::pending("appt-1");
    assert!(is_due(&record, &window, utc(2025, 3, 9, 5, 0), NEW_YORK));
    assert!(is_due(&record, &window, utc(2025, 1, 1, 12, 0), NEW_YORK));
    assert!(is_due(&record, &window, utc(2025, 4, 1, 12, 0), NEW_YORK));

    let calling = ReminderFixture::in_status("appt-2", ReminderStatus::Calling, 1);
    assert!(is_due(&calling, &window, utc(2025, 3, 9, 15, 0), NEW_YORK));
}

#[test]
fn test_only_pending_records_are_due() {
    let record = ReminderFixture::in_status("appt-1", ReminderStatus::Calling, 1);

    assert!(!is_due(&record, &DispatchWindow::default(), utc(2025, 3, 9, 15, 0), NEW_YORK));
}

#[test]
fn test_unknown_timezone_falls_back_to_default() {
    assert_eq!(resolve_timezone("Mars/Olympus_Mons", NEW_YORK), NEW_YORK);
    assert_eq!(
        resolve_timezone("Europe/London", NEW_YORK),
        chrono_tz::Europe::London
    );
}

#[test]
fn test_window_defaults_and_validation() {
    let window = DispatchWindow::from_request(&DispatchRequest::default(), false).unwrap();
    assert_eq!(window, DispatchWindow::default());

    let inherited = DispatchWindow::from_request(&DispatchRequest::default(), true).unwrap();
    assert!(inherited.test_mode);

    let inverted = DispatchRequest {
        calling_hours_start: Some(19),
        calling_hours_end: Some(9),
        ..Default::default()
    };
    assert_matches!(
        DispatchWindow::from_request(&inverted, false),
        Err(ReminderError::InvalidWindow(_))
    );

    let out_of_range = DispatchRequest {
        calling_hours_end: Some(25),
        ..Default::default()
    };
    assert_matches!(
        DispatchWindow::from_request(&out_of_range, false),
        Err(ReminderError::InvalidWindow(_))
    );

    let negative = DispatchRequest {
        hours_before: Some(-1),
        ..Default::default()
    };
    assert_matches!(
        DispatchWindow::from_request(&negative, false),
        Err(ReminderError::InvalidWindow(_))
    );
}

#[test]
fn test_oversized_threshold_is_rejected_and_never_overflows() {
    let huge = DispatchRequest {
        hours_before: Some(i64::MAX / 2),
        ..Default::default()
    };
    assert_matches!(
        DispatchWindow::from_request(&huge, false),
        Err(ReminderError::InvalidWindow(_))
    );

    let year = DispatchRequest {
        hours_before: Some(MAX_HOURS_BEFORE),
        ..Default::default()
    };
    assert!(DispatchWindow::from_request(&year, false).is_ok());

    // A window built by hand skips validation; the check must still not panic.
    let window = DispatchWindow {
        hours_before: i64::MAX / 2,
        ..DispatchWindow::default()
    };
    let record = ReminderFixture::pending("appt-1");
    assert!(!is_due(&record, &window, utc(2025, 3, 9, 15, 0), NEW_YORK));
}

#[test]
fn test_not_due_seconds_after_appointment_start() {
    let record = ReminderFixture::pending("appt-1");
    let window = DispatchWindow {
        test_mode: false,
        ..DispatchWindow::default()
    };
    let just_after = utc(2025, 3, 10, 14, 0) + chrono::Duration::seconds(50);
    assert!(!is_due(&record, &window, just_after, NEW_YORK));

    // Fifty seconds past the threshold is outside it too.
    let just_before_window = utc(2025, 3, 9, 14, 0) - chrono::Duration::seconds(50);
    assert!(!is_due(&record, &window, just_before_window, NEW_YORK));

    // Exactly at the threshold is inside.
    assert!(is_due(&record, &window, utc(2025, 3, 9, 14, 0), NEW_YORK));
}
