//! Connection Registry (`spec.md` §4.1): maps session ids to a send handle
//! plus the session's current room/identity. Mirrors the teacher's
//! `PresenceTracker` ownership style (`Arc<RwLock<HashMap<...>>>`) but keyed
//! by session id rather than room id, since it is written from the
//! WebSocket accept/disconnect path and read from the event router.

use crate::protocol::OutboundEvent;
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::mpsc;

/// What the event router knows about a live connection.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub room_id: Option<String>,
    pub persistent_user_id: Option<String>,
    pub display_name: Option<String>,
}

struct SessionEntry {
    sender: mpsc::UnboundedSender<OutboundEvent>,
    state: SessionState,
}

#[derive(Default)]
pub struct ConnectionRegistry {
    sessions: RwLock<HashMap<String, SessionEntry>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new session and returns the receiver half the
    /// WebSocket write task should drain.
    pub fn register(&self, session_id: String) -> mpsc::UnboundedReceiver<OutboundEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.sessions.write().unwrap().insert(
            session_id,
            SessionEntry {
                sender: tx,
                state: SessionState::default(),
            },
        );
        rx
    }

    pub fn remove(&self, session_id: &str) -> Option<SessionState> {
        self.sessions
            .write()
            .unwrap()
            .remove(session_id)
            .map(|e| e.state)
    }

    pub fn state(&self, session_id: &str) -> Option<SessionState> {
        self.sessions
            .read()
            .unwrap()
            .get(session_id)
            .map(|e| e.state.clone())
    }

    pub fn set_room(&self, session_id: &str, room_id: Option<String>) {
        if let Some(entry) = self.sessions.write().unwrap().get_mut(session_id) {
            entry.state.room_id = room_id;
        }
    }

    pub fn set_identity(&self, session_id: &str, persistent_user_id: String, display_name: String) {
        if let Some(entry) = self.sessions.write().unwrap().get_mut(session_id) {
            entry.state.persistent_user_id = Some(persistent_user_id);
            entry.state.display_name = Some(display_name);
        }
    }

    /// Deliver one event to one session. Silently drops on a dead channel
    /// (the WebSocket write task has already exited) — this is normal on
    /// disconnect races, not an error.
    pub fn send(&self, session_id: &str, event: OutboundEvent) {
        if let Some(entry) = self.sessions.read().unwrap().get(session_id) {
            let _ = entry.sender.send(event);
        }
    }

    pub fn is_connected(&self, session_id: &str) -> bool {
        self.sessions.read().unwrap().contains_key(session_id)
    }
}
