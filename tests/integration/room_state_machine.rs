use ghostwire_relay::models::{MessageKind, Room, SettingsPatch};
use ghostwire_relay::room::Recipient;

fn room() -> Room {
    Room::new("room-1".to_string(), "room-1".to_string(), "alice".to_string())
}

#[test]
fn join_adds_member_and_notifies_others() {
    let mut r = room();
    let result = r.join("s1", "u1", "alice", None, None, 200);
    assert!(result.dirty);
    assert_eq!(r.members.len(), 1);
    // First dispatch is the joiner's own RoomJoined; second is UserJoined to everyone else.
    assert!(matches!(result.dispatch[0].to, Recipient::Target(ref id) if id == "s1"));
    assert!(matches!(result.dispatch[1].to, Recipient::AllExcept(ref id) if id == "s1"));
}

#[test]
fn join_dedupes_by_persistent_user_id() {
    let mut r = room();
    r.join("s1", "u1", "alice", None, None, 200);
    r.join("s2", "u1", "alice", None, None, 200);
    assert_eq!(r.members.len(), 1);
    assert!(r.members.contains_key("s2"));
    assert!(!r.members.contains_key("s1"));
}

#[test]
fn post_requires_membership() {
    let mut r = room();
    let result = r.post("ghost", MessageKind::Text, "hi".into(), None, None);
    assert!(!result.dirty);
    assert!(result.dispatch.is_empty());
    assert!(r.messages.is_empty());
}

#[test]
fn post_appends_message_and_broadcasts_to_all_members() {
    let mut r = room();
    r.join("s1", "u1", "alice", None, None, 200);
    let result = r.post("s1", MessageKind::Text, "hello".into(), None, None);
    assert!(result.dirty);
    assert_eq!(r.messages.len(), 1);
    assert!(matches!(result.dispatch[0].to, Recipient::AllMembers));
    assert!(result.schedule_disappearance.is_none());
}

#[test]
fn post_drops_dangling_reply_to() {
    let mut r = room();
    r.join("s1", "u1", "alice", None, None, 200);
    r.post("s1", MessageKind::Text, "hello".into(), Some("nonexistent".into()), None);
    assert_eq!(r.messages[0].reply_to, None);
}

#[test]
fn post_schedules_disappearance_when_settings_enable_it() {
    let mut r = room();
    r.join("s1", "u1", "alice", None, None, 200);
    r.update_settings("s1", &SettingsPatch { disappearing_messages: Some(Some(5_000)), ..Default::default() });
    let result = r.post("s1", MessageKind::Text, "ephemeral".into(), None, None);
    let message_id = r.messages[0].id.clone();
    let (id, _at) = result.schedule_disappearance.expect("disappearance should be scheduled");
    assert_eq!(id, message_id);
}

#[test]
fn react_toggles_and_prunes_empty_buckets() {
    let mut r = room();
    r.join("s1", "u1", "alice", None, None, 200);
    r.post("s1", MessageKind::Text, "hi".into(), None, None);
    let message_id = r.messages[0].id.clone();

    r.react("s1", &message_id, "👍");
    assert!(r.messages[0].reactions.get("👍").unwrap().contains("s1"));

    r.react("s1", &message_id, "👍");
    assert!(!r.messages[0].reactions.contains_key("👍"));
}

#[test]
fn edit_is_sender_only() {
    let mut r = room();
    r.join("s1", "u1", "alice", None, None, 200);
    r.join("s2", "u2", "bob", None, None, 200);
    r.post("s1", MessageKind::Text, "original".into(), None, None);
    let message_id = r.messages[0].id.clone();

    let result = r.edit("s2", &message_id, "hijacked".into());
    assert!(!result.dirty);
    assert_eq!(r.messages[0].content, "original");

    let result = r.edit("s1", &message_id, "edited".into());
    assert!(result.dirty);
    assert_eq!(r.messages[0].content, "edited");
    assert!(r.messages[0].edited);
}

#[test]
fn delete_is_sender_only_and_idempotent() {
    let mut r = room();
    r.join("s1", "u1", "alice", None, None, 200);
    r.post("s1", MessageKind::Text, "bye".into(), None, None);
    let message_id = r.messages[0].id.clone();

    let result = r.delete("s1", &message_id);
    assert!(result.dirty);
    assert!(r.messages[0].deleted);
    assert_eq!(r.messages[0].content, ghostwire_relay::models::DELETED_CONTENT);

    let result = r.delete("s1", &message_id);
    assert!(!result.dirty, "deleting an already-deleted message is a no-op");
}

#[test]
fn mark_read_broadcasts_only_for_newly_read_and_excludes_reader() {
    let mut r = room();
    r.join("s1", "u1", "alice", None, None, 200);
    r.join("s2", "u2", "bob", None, None, 200);
    r.post("s1", MessageKind::Text, "hi".into(), None, None);
    let message_id = r.messages[0].id.clone();

    let result = r.mark_read("s2", &[message_id.clone()]);
    assert!(result.dirty);
    assert!(matches!(result.dispatch[0].to, Recipient::AllExcept(ref id) if id == "s2"));

    let result = r.mark_read("s2", &[message_id]);
    assert!(!result.dirty, "re-marking an already-read message broadcasts nothing");
}

#[test]
fn evict_is_creator_only_by_display_name() {
    let mut r = room(); // creator_identity == "alice"
    r.join("s1", "u1", "alice", None, None, 200);
    r.join("s2", "u2", "bob", None, None, 200);

    let result = r.evict("s2", "s1");
    assert!(!result.dirty, "a non-creator cannot evict");
    assert_eq!(r.members.len(), 2);

    let result = r.evict("s1", "s2");
    assert!(result.dirty);
    assert_eq!(r.members.len(), 1);
    assert!(!r.members.contains_key("s2"));
}

#[test]
fn disconnect_removes_member_and_notifies_remaining() {
    let mut r = room();
    r.join("s1", "u1", "alice", None, None, 200);
    r.join("s2", "u2", "bob", None, None, 200);

    let result = r.disconnect("s1");
    assert!(result.dirty);
    assert_eq!(r.members.len(), 1);

    let result = r.disconnect("s1");
    assert!(!result.dirty, "disconnecting twice is a no-op");
}

#[test]
fn update_settings_has_no_creator_gate() {
    let mut r = room();
    r.join("s1", "u1", "alice", None, None, 200);
    r.join("s2", "u2", "bob", None, None, 200);

    let result = r.update_settings("s2", &SettingsPatch { max_members: Some(5), ..Default::default() });
    assert!(result.dirty);
    assert_eq!(r.settings.max_members, 5);
}
