use chrono::{Duration, Utc};
use ghostwire_relay::models::{MessageKind, Room, DISAPPEARED_CONTENT};

fn room_with_message() -> (Room, String) {
    let mut r = Room::new("r1".to_string(), "r1".to_string(), "alice".to_string());
    r.join("s1", "u1", "alice", None, None, 200);
    r.post("s1", MessageKind::Text, "ephemeral".into(), None, None);
    let id = r.messages[0].id.clone();
    (r, id)
}

#[test]
fn disappear_redacts_content_and_is_not_attributed_to_a_session() {
    let (mut r, id) = room_with_message();
    let result = r.disappear(&id);
    assert!(result.dirty);
    assert_eq!(r.messages[0].content, DISAPPEARED_CONTENT);
    assert!(r.messages[0].deleted);

    // Firing twice on an already-redacted message is a no-op.
    let result = r.disappear(&id);
    assert!(!result.dirty);
}

#[test]
fn redact_elapsed_on_load_redacts_in_place_without_dispatch() {
    let (mut r, _id) = room_with_message();
    let past_deadline = Utc::now() - Duration::seconds(1);
    r.messages[0].disappear_at = Some(past_deadline.to_rfc3339());

    r.redact_elapsed_on_load(Utc::now());
    assert!(r.messages[0].deleted);
    assert_eq!(r.messages[0].content, DISAPPEARED_CONTENT);
}

#[test]
fn redact_elapsed_on_load_leaves_future_deadlines_alone() {
    let (mut r, _id) = room_with_message();
    let future_deadline = Utc::now() + Duration::hours(1);
    r.messages[0].disappear_at = Some(future_deadline.to_rfc3339());

    r.redact_elapsed_on_load(Utc::now());
    assert!(!r.messages[0].deleted);
}

#[test]
fn pending_disappearances_only_reports_future_non_deleted_messages() {
    let (mut r, id) = room_with_message();
    let future_deadline = Utc::now() + Duration::hours(1);
    r.messages[0].disappear_at = Some(future_deadline.to_rfc3339());

    let pending = r.pending_disappearances(Utc::now());
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].0, id);

    r.disappear(&id);
    let pending = r.pending_disappearances(Utc::now());
    assert!(pending.is_empty(), "a redacted message has no outstanding timer");
}
