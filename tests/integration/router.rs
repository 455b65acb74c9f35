use ghostwire_relay::protocol::{InboundEvent, OutboundEvent};
use ghostwire_relay::registry::ConnectionRegistry;
use ghostwire_relay::room::RoomStore;
use ghostwire_relay::router::{Router, SessionContext};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

struct Harness {
    router: Router,
    registry: Arc<ConnectionRegistry>,
}

impl Harness {
    fn new() -> Self {
        let rooms = Arc::new(RoomStore::new());
        let registry = Arc::new(ConnectionRegistry::new());
        let router = Router::new(Arc::clone(&rooms), Arc::clone(&registry), 200);
        Self { router, registry }
    }

    fn connect(&self, session_id: &str) -> UnboundedReceiver<OutboundEvent> {
        self.registry.register(session_id.to_string())
    }

    fn ctx(&self, session_id: &str) -> SessionContext {
        SessionContext {
            session_id: session_id.to_string(),
            room_id: None,
            persistent_user_id: None,
            display_name: None,
        }
    }
}

fn drain<T>(rx: &mut UnboundedReceiver<T>) -> Vec<T> {
    let mut out = Vec::new();
    while let Ok(v) = rx.try_recv() {
        out.push(v);
    }
    out
}

#[test]
fn join_room_delivers_room_joined_to_joiner_and_user_joined_to_others() {
    let h = Harness::new();
    let mut rx1 = h.connect("s1");
    let mut ctx1 = h.ctx("s1");
    h.router.handle(
        &mut ctx1,
        InboundEvent::JoinRoom {
            room_id: "r1".into(),
            user_id: "u1".into(),
            user_name: "alice".into(),
            avatar: None,
            color: None,
        },
    );
    let events = drain(&mut rx1);
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], OutboundEvent::RoomJoined { .. }));
    assert_eq!(ctx1.room_id.as_deref(), Some("r1"));

    let mut rx2 = h.connect("s2");
    let mut ctx2 = h.ctx("s2");
    h.router.handle(
        &mut ctx2,
        InboundEvent::JoinRoom {
            room_id: "r1".into(),
            user_id: "u2".into(),
            user_name: "bob".into(),
            avatar: None,
            color: None,
        },
    );
    // s1 should now have seen bob's UserJoined.
    let events = drain(&mut rx1);
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], OutboundEvent::UserJoined { .. }));

    let events = drain(&mut rx2);
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], OutboundEvent::RoomJoined { .. }));
}

#[test]
fn send_message_outside_a_room_is_dropped_silently() {
    let h = Harness::new();
    let mut rx1 = h.connect("s1");
    let mut ctx1 = h.ctx("s1");
    let outcome = h.router.handle(
        &mut ctx1,
        InboundEvent::SendMessage {
            content: "hi".into(),
            kind: ghostwire_relay::models::MessageKind::Text,
            reply_to: None,
            file_data: None,
        },
    );
    assert!(outcome.dirty_room.is_none());
    assert!(drain(&mut rx1).is_empty());
}

#[test]
fn typing_fans_out_to_everyone_except_sender() {
    let h = Harness::new();
    let mut ctx1 = h.ctx("s1");
    h.router.handle(
        &mut ctx1,
        InboundEvent::JoinRoom { room_id: "r1".into(), user_id: "u1".into(), user_name: "alice".into(), avatar: None, color: None },
    );
    let mut rx2 = h.connect("s2");
    let mut ctx2 = h.ctx("s2");
    h.router.handle(
        &mut ctx2,
        InboundEvent::JoinRoom { room_id: "r1".into(), user_id: "u2".into(), user_name: "bob".into(), avatar: None, color: None },
    );
    let _ = drain(&mut rx2); // discard RoomJoined noise

    h.router.handle(&mut ctx1, InboundEvent::TypingStart);
    let events = drain(&mut rx2);
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], OutboundEvent::UserTyping { .. }));
}

#[test]
fn targeted_signal_requires_target_to_be_connected() {
    let h = Harness::new();
    let mut ctx1 = h.ctx("s1");
    h.router.handle(
        &mut ctx1,
        InboundEvent::JoinRoom { room_id: "r1".into(), user_id: "u1".into(), user_name: "alice".into(), avatar: None, color: None },
    );

    // s2 never connected: delivery must be a silent no-op.
    let outcome = h.router.handle(
        &mut ctx1,
        InboundEvent::CallSignal { target_id: "s2".into(), signal: serde_json::json!({"sdp": "..."}) },
    );
    assert!(outcome.dirty_room.is_none());

    // s2 connected but never joined any room: still not a valid target.
    let mut rx2 = h.connect("s2");
    h.router.handle(
        &mut ctx1,
        InboundEvent::CallSignal { target_id: "s2".into(), signal: serde_json::json!({"sdp": "offer"}) },
    );
    assert!(drain(&mut rx2).is_empty());

    // s2 joins the sender's room: now a valid target.
    let mut ctx2 = h.ctx("s2");
    h.router.handle(
        &mut ctx2,
        InboundEvent::JoinRoom { room_id: "r1".into(), user_id: "u2".into(), user_name: "bob".into(), avatar: None, color: None },
    );
    let _ = drain(&mut rx2); // discard RoomJoined noise
    h.router.handle(
        &mut ctx1,
        InboundEvent::CallSignal { target_id: "s2".into(), signal: serde_json::json!({"sdp": "offer"}) },
    );
    let events = drain(&mut rx2);
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], OutboundEvent::CallSignal { .. }));
}

#[test]
fn targeted_signal_drops_when_target_is_in_a_different_room() {
    let h = Harness::new();
    let mut ctx1 = h.ctx("s1");
    h.router.handle(
        &mut ctx1,
        InboundEvent::JoinRoom { room_id: "r1".into(), user_id: "u1".into(), user_name: "alice".into(), avatar: None, color: None },
    );

    let mut rx2 = h.connect("s2");
    let mut ctx2 = h.ctx("s2");
    h.router.handle(
        &mut ctx2,
        InboundEvent::JoinRoom { room_id: "r2".into(), user_id: "u2".into(), user_name: "bob".into(), avatar: None, color: None },
    );
    let _ = drain(&mut rx2); // discard RoomJoined noise

    h.router.handle(
        &mut ctx1,
        InboundEvent::CallSignal { target_id: "s2".into(), signal: serde_json::json!({"sdp": "offer"}) },
    );
    assert!(drain(&mut rx2).is_empty());
}

#[test]
fn evicted_target_stays_connected_and_reachable() {
    let h = Harness::new();
    let mut ctx1 = h.ctx("s1"); // creator (display_name "alice" == creator_identity)
    h.router.handle(
        &mut ctx1,
        InboundEvent::JoinRoom { room_id: "r1".into(), user_id: "u1".into(), user_name: "alice".into(), avatar: None, color: None },
    );
    let _rx2 = h.connect("s2");
    let mut ctx2 = h.ctx("s2");
    h.router.handle(
        &mut ctx2,
        InboundEvent::JoinRoom { room_id: "r1".into(), user_id: "u2".into(), user_name: "bob".into(), avatar: None, color: None },
    );

    h.router.handle(&mut ctx1, InboundEvent::KickMember { target_id: "s2".into() });

    // s2 is still a registered connection (evict doesn't disconnect the transport).
    assert!(h.registry.is_connected("s2"));
}
