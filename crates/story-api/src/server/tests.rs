use super::*;

use contracts::TimingConfig;

fn fast_config() -> SessionConfig {
    SessionConfig {
        session_id: "session_server_test".to_string(),
        player_name: "Robin Vega".to_string(),
        timing: TimingConfig {
            welcome_delay_ms: 10,
            story_advance_delay_ms: 10,
            ..TimingConfig::default()
        },
        ..SessionConfig::default()
    }
}

#[test]
fn pagination_enforces_max_bounds() {
    let (start, end, next_cursor) = paginate(100, Some(10), Some(20)).expect("page works");
    assert_eq!(start, 10);
    assert_eq!(end, 30);
    assert_eq!(next_cursor, Some(30));

    let (_, end, next_cursor) = paginate(5, None, None).expect("defaults work");
    assert_eq!(end, 5);
    assert_eq!(next_cursor, None);

    let out_of_range = paginate(5, Some(10), Some(1));
    assert!(out_of_range.is_err());
}

#[test]
fn reconnect_tokens_embed_position() {
    assert_eq!(reconnect_token(12, Some(3), "event"), "event:12:3");
    assert_eq!(reconnect_token(12, None, "status"), "status:12");
}

#[test]
fn collect_delta_messages_tracks_emitted_count() {
    let mut inner = ServerInner {
        session: Some(SessionApi::from_config(fast_config()).expect("session builds")),
        origin: None,
        emitted_event_count: 0,
    };

    inner.session.as_mut().expect("session").advance_by(10);
    let first = collect_delta_messages(&mut inner);
    assert!(first
        .iter()
        .any(|message| message.message_type == "event.appended"));

    // A second collection without new activity emits nothing.
    let second = collect_delta_messages(&mut inner);
    assert!(second.is_empty());
}

#[test]
fn require_session_rejects_mismatched_id() {
    let inner = ServerInner {
        session: Some(SessionApi::from_config(fast_config()).expect("session builds")),
        origin: None,
        emitted_event_count: 0,
    };

    assert!(require_session(&inner, "session_server_test").is_ok());
    let err = require_session(&inner, "someone_else").expect_err("mismatch rejected");
    assert_eq!(err.status, StatusCode::NOT_FOUND);
}

#[test]
fn welcome_delivery_reaches_the_stream_payload() {
    let mut inner = ServerInner {
        session: Some(SessionApi::from_config(fast_config()).expect("session builds")),
        origin: None,
        emitted_event_count: 0,
    };

    inner.session.as_mut().expect("session").advance_by(10);
    let messages = collect_delta_messages(&mut inner);
    let delivered = messages.iter().find(|message| {
        message.payload.get("kind").and_then(Value::as_str) == Some("email_delivered")
    });
    assert!(delivered.is_some());
}
