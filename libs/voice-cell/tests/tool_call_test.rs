use assert_matches::assert_matches;
use chrono::NaiveDate;
use serde_json::json;

use voice_cell::models::{ToolCall, ToolError, WebhookEvent};

#[test]
fn test_parameters_parse_from_object() {
    let call = ToolCall::parse(
        "reschedule_appointment",
        &json!({ "appointment_id": "1001", "cancelled": true }),
    )
    .unwrap();

    assert_matches!(call, ToolCall::RescheduleAppointment(ref p) if p.appointment_id == "1001" && p.cancelled);
}

#[test]
fn test_parameters_parse_from_json_encoded_text() {
    let call = ToolCall::parse(
        "check_availability",
        &json!("{\"date\":\"2025-03-10\",\"days\":2}"),
    )
    .unwrap();

    match call {
        ToolCall::CheckAvailability(params) => {
            assert_eq!(params.date, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
            assert_eq!(params.days, Some(2));
            assert_eq!(params.provider_id, None);
        }
        other => panic!("unexpected call {:?}", other),
    }
}

#[test]
fn test_missing_parameters_are_an_empty_object() {
    assert_eq!(ToolCall::parse("tell_dad_joke", &json!(null)).unwrap(), ToolCall::TellDadJoke);
    assert_eq!(ToolCall::parse("tell_dad_joke", &json!("")).unwrap(), ToolCall::TellDadJoke);
    assert_matches!(
        ToolCall::parse("get_reminder_context", &json!("{}")),
        Ok(ToolCall::GetReminderContext(ref p)) if p.correlation_id.is_none()
    );
}

#[test]
fn test_unknown_tool_is_rejected() {
    let err = ToolCall::parse("order_pizza", &json!({})).unwrap_err();

    assert_matches!(err, ToolError::UnknownTool(ref name) if name == "order_pizza");
    assert_eq!(err.code(), "UnknownTool");

    // The name is checked before the parameters are looked at.
    for params in [json!("[1, 2]"), json!("{not json"), json!(42)] {
        assert_matches!(
            ToolCall::parse("order_pizza", &params),
            Err(ToolError::UnknownTool(ref name)) if name == "order_pizza"
        );
    }
}

#[test]
fn test_invalid_parameters_are_rejected_at_the_boundary() {
    assert_matches!(
        ToolCall::parse("find_patient", &json!({})),
        Err(ToolError::InvalidParameters { ref tool, .. }) if tool == "find_patient"
    );
    assert_matches!(
        ToolCall::parse("find_patient", &json!("{not json")),
        Err(ToolError::InvalidParameters { .. })
    );
    assert_matches!(
        ToolCall::parse("find_patient", &json!("[1, 2]")),
        Err(ToolError::InvalidParameters { .. })
    );
}

#[test]
fn test_webhook_events_are_discriminated_by_event_name() {
    let event: WebhookEvent = serde_json::from_value(json!({
        "event_name": "tool_call",
        "chat_id": "chat-1",
        "custom_session_id": "appt-1",
        "tool_call_message": {
            "tool_call_id": "tool-1",
            "name": "tell_dad_joke",
            "parameters": "{}",
            "type": "tool_call"
        }
    }))
    .unwrap();
    assert_matches!(event, WebhookEvent::ToolCall(ref e) if e.tool_call_message.name == "tell_dad_joke");

    let ended: WebhookEvent = serde_json::from_value(json!({
        "event_name": "chat_ended",
        "chat_id": "chat-1",
        "config_id": "outbound-config",
        "end_reason": "USER_ENDED",
        "duration_seconds": 42
    }))
    .unwrap();
    assert_matches!(ended, WebhookEvent::ChatEnded(ref e) if e.duration_seconds == Some(42));

    let other: WebhookEvent = serde_json::from_value(json!({
        "event_name": "chat_paused",
        "chat_id": "chat-1"
    }))
    .unwrap();
    assert_matches!(other, WebhookEvent::Unknown);
}
