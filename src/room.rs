//! Room State Machine (`spec.md` §4.3): the operations that mutate a `Room`
//! aggregate. Every method takes `&mut Room` plus the acting session id and
//! returns the outbound fan-out as a dispatch plan rather than sending
//! anything itself — this keeps the state machine synchronous and trivially
//! testable, and lets the caller (the event router) resolve `Recipient`s
//! against the `ConnectionRegistry` in one place.

use crate::models::{
    FileData, Member, MemberView, Message, MessageKind, Room, Settings, SettingsPatch,
    DELETED_CONTENT, DISAPPEARED_CONTENT,
};
use crate::protocol::OutboundEvent;
use std::collections::HashMap;
use std::sync::Mutex;

/// Recipients a dispatched `OutboundEvent` can target. Resolved against
/// `Room::members` / `ConnectionRegistry` by the caller — the state machine
/// never touches the registry directly.
#[derive(Debug, Clone)]
pub enum Recipient {
    Sender,
    AllMembers,
    AllExcept(String),
    Target(String),
}

#[derive(Debug, Clone)]
pub struct Dispatch {
    pub to: Recipient,
    pub event: OutboundEvent,
}

fn to(recipient: Recipient, event: OutboundEvent) -> Dispatch {
    Dispatch { to: recipient, event }
}

/// Outcome of a state machine operation: the fan-out plan, whether durable
/// state changed (should trip the Snapshot Coalescer), and an optional
/// disappearance deadline for a message just posted.
#[derive(Debug, Default)]
pub struct OpResult {
    pub dispatch: Vec<Dispatch>,
    pub dirty: bool,
    pub schedule_disappearance: Option<(String, chrono::DateTime<chrono::Utc>)>,
}

impl OpResult {
    fn dirty(dispatch: Vec<Dispatch>) -> Self {
        Self { dispatch, dirty: true, schedule_disappearance: None }
    }

    fn quiet(dispatch: Vec<Dispatch>) -> Self {
        Self { dispatch, dirty: false, schedule_disappearance: None }
    }

    fn noop() -> Self {
        Self::default()
    }
}

/// Palette cycled for members that don't supply a color — matches the
/// teacher's habit of deriving small cosmetic defaults server-side rather
/// than rejecting the request.
const DEFAULT_COLORS: [&str; 6] = ["#ef4444", "#3b82f6", "#22c55e", "#f59e0b", "#a855f7", "#06b6d4"];

fn initials_of(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|w| w.chars().next())
        .take(2)
        .collect::<String>()
        .to_uppercase()
}

impl Room {
    /// join(session, user_id, name, avatar) — `spec.md` §4.3.
    pub fn join(
        &mut self,
        session_id: &str,
        persistent_user_id: &str,
        display_name: &str,
        avatar: Option<String>,
        color: Option<String>,
        history_page_size: usize,
    ) -> OpResult {
        // De-duplicate: at most one Member per persistent_user_id.
        if let Some(stale_session) = self.member_session_for_user(persistent_user_id)
            && stale_session != session_id
        {
            self.members.remove(&stale_session);
        }

        let color = color.unwrap_or_else(|| {
            let idx = self.members.len() % DEFAULT_COLORS.len();
            DEFAULT_COLORS[idx].to_string()
        });
        let avatar_initials = avatar.unwrap_or_else(|| initials_of(display_name));

        let member = Member {
            session_id: session_id.to_string(),
            persistent_user_id: persistent_user_id.to_string(),
            display_name: display_name.to_string(),
            avatar_initials,
            color,
            joined_at: chrono::Utc::now().to_rfc3339(),
            is_online: true,
        };
        self.members.insert(session_id.to_string(), member.clone());

        let members: Vec<MemberView> = self.members.values().map(MemberView::from).collect();
        let recent_start = self.messages.len().saturating_sub(history_page_size);

        let mut dispatch = vec![to(
            Recipient::Target(session_id.to_string()),
            OutboundEvent::RoomJoined {
                room_name: self.name.clone(),
                members,
                messages: self.messages[recent_start..].to_vec(),
                settings: self.settings.clone(),
            },
        )];
        dispatch.push(to(
            Recipient::AllExcept(session_id.to_string()),
            OutboundEvent::UserJoined { user: MemberView::from(&member) },
        ));

        OpResult::dirty(dispatch)
    }

    /// post(session, kind, content, reply_to?, file_data?) — `spec.md` §4.3.
    pub fn post(
        &mut self,
        session_id: &str,
        kind: MessageKind,
        content: String,
        reply_to: Option<String>,
        file_data: Option<FileData>,
    ) -> OpResult {
        let Some(member) = self.members.get(session_id) else {
            // Dropped silently: posting to a room this session no longer
            // holds membership in (e.g. evicted mid-flight).
            return OpResult::noop();
        };

        // reply_to must name a message already in the log at post time; a
        // dangling reference is dropped to null, not retro-validated later.
        let reply_to = reply_to.filter(|id| self.message(id).is_some());

        let disappear_ms = self.settings.disappearing_messages;
        let now = chrono::Utc::now();
        let disappear_at = disappear_ms.map(|ms| now + chrono::Duration::milliseconds(ms as i64));

        let message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            room_id: self.id.clone(),
            sender_session_id: session_id.to_string(),
            sender_display_name: member.display_name.clone(),
            sender_avatar: member.avatar_initials.clone(),
            content,
            kind,
            timestamp: now.to_rfc3339(),
            reply_to,
            reactions: HashMap::new(),
            read_by: Default::default(),
            edited: false,
            edited_at: None,
            deleted: false,
            disappear_at: disappear_at.map(|d| d.to_rfc3339()),
            file_data,
        };
        self.messages.push(message.clone());

        let mut result = OpResult::dirty(vec![to(
            Recipient::AllMembers,
            OutboundEvent::Message(message.clone()),
        )]);
        if let Some(at) = disappear_at {
            result.schedule_disappearance = Some((message.id, at));
        }
        result
    }

    /// react(session, message_id, emoji) — toggle, empty buckets pruned.
    pub fn react(&mut self, session_id: &str, message_id: &str, emoji: &str) -> OpResult {
        if !self.members.contains_key(session_id) {
            return OpResult::noop();
        }
        let Some(message) = self.message_mut(message_id) else {
            return OpResult::noop();
        };
        let bucket = message.reactions.entry(emoji.to_string()).or_default();
        if !bucket.insert(session_id.to_string()) {
            bucket.remove(session_id);
        }
        if bucket.is_empty() {
            message.reactions.remove(emoji);
        }
        let reactions: HashMap<String, Vec<String>> = message
            .reactions
            .iter()
            .map(|(k, v)| (k.clone(), v.iter().cloned().collect()))
            .collect();

        OpResult::dirty(vec![to(
            Recipient::AllMembers,
            OutboundEvent::ReactionUpdated { message_id: message_id.to_string(), reactions },
        )])
    }

    /// edit(session, message_id, new_content) — sender-only, no-op if
    /// deleted or message is missing.
    pub fn edit(&mut self, session_id: &str, message_id: &str, new_content: String) -> OpResult {
        let Some(message) = self.message_mut(message_id) else {
            return OpResult::noop();
        };
        if message.sender_session_id != session_id || message.deleted {
            return OpResult::noop();
        }
        message.content = new_content;
        message.edited = true;
        message.edited_at = Some(chrono::Utc::now().to_rfc3339());
        let snapshot = message.clone();

        OpResult::dirty(vec![to(Recipient::AllMembers, OutboundEvent::MessageEdited(snapshot))])
    }

    /// delete(session, message_id) — sender-only, idempotent.
    pub fn delete(&mut self, session_id: &str, message_id: &str) -> OpResult {
        let Some(message) = self.message_mut(message_id) else {
            return OpResult::noop();
        };
        if message.sender_session_id != session_id || message.deleted {
            return OpResult::noop();
        }
        message.deleted = true;
        message.content = DELETED_CONTENT.to_string();

        OpResult::dirty(vec![to(
            Recipient::AllMembers,
            OutboundEvent::MessageDeleted { message_id: message_id.to_string() },
        )])
    }

    /// Disappearance Scheduler fire (`spec.md` §4.4): server-initiated,
    /// not attributed to any session.
    pub fn disappear(&mut self, message_id: &str) -> OpResult {
        let Some(message) = self.message_mut(message_id) else {
            return OpResult::noop();
        };
        if message.deleted {
            return OpResult::noop();
        }
        message.deleted = true;
        message.content = DISAPPEARED_CONTENT.to_string();

        OpResult::dirty(vec![to(
            Recipient::AllMembers,
            OutboundEvent::MessageDeleted { message_id: message_id.to_string() },
        )])
    }

    /// mark-read(session, ids[]) — broadcast only for newly-added reads,
    /// never to the reader itself.
    pub fn mark_read(&mut self, session_id: &str, ids: &[String]) -> OpResult {
        let Some(member) = self.members.get(session_id).cloned() else {
            return OpResult::noop();
        };
        let mut dispatch = Vec::new();
        let mut any = false;
        for id in ids {
            let Some(message) = self.message_mut(id) else { continue };
            if message.read_by.insert(session_id.to_string()) {
                any = true;
                dispatch.push(to(
                    Recipient::AllExcept(session_id.to_string()),
                    OutboundEvent::MessageRead {
                        message_id: id.clone(),
                        user_id: member.persistent_user_id.clone(),
                        user_name: member.display_name.clone(),
                    },
                ));
            }
        }
        if any {
            OpResult::dirty(dispatch)
        } else {
            OpResult::noop()
        }
    }

    /// update-settings(session, patch) — no creator-only gate (source
    /// behavior, preserved per `spec.md` §9 open question).
    pub fn update_settings(&mut self, session_id: &str, patch: &SettingsPatch) -> OpResult {
        if !self.members.contains_key(session_id) {
            return OpResult::noop();
        }
        self.settings.apply(patch);
        OpResult::dirty(vec![to(
            Recipient::AllMembers,
            OutboundEvent::SettingsUpdated(self.settings.clone()),
        )])
    }

    /// evict(session, target_session_id) — creator-only (by display name,
    /// source behavior). Target is removed from the room but not
    /// disconnected from the server.
    pub fn evict(&mut self, session_id: &str, target_session_id: &str) -> OpResult {
        let Some(acting) = self.members.get(session_id) else {
            return OpResult::noop();
        };
        if acting.display_name != self.creator_identity {
            return OpResult::noop();
        }
        if self.members.remove(target_session_id).is_none() {
            return OpResult::noop();
        }
        let members: Vec<MemberView> = self.members.values().map(MemberView::from).collect();

        OpResult::dirty(vec![
            to(Recipient::Target(target_session_id.to_string()), OutboundEvent::Kicked),
            to(
                Recipient::AllMembers,
                OutboundEvent::UserLeft { id: target_session_id.to_string(), members },
            ),
        ])
    }

    /// disconnect(session) — orderly leave, also used for the evicted
    /// session's own transport-level disconnect.
    pub fn disconnect(&mut self, session_id: &str) -> OpResult {
        if self.members.remove(session_id).is_none() {
            return OpResult::noop();
        }
        let members: Vec<MemberView> = self.members.values().map(MemberView::from).collect();
        OpResult::dirty(vec![to(
            Recipient::AllMembers,
            OutboundEvent::UserLeft { id: session_id.to_string(), members },
        )])
    }

    /// Redact any message whose `disappear_at` has already elapsed,
    /// in-line, without broadcasting — used only during persistence load
    /// (`spec.md` §4.4).
    pub fn redact_elapsed_on_load(&mut self, now: chrono::DateTime<chrono::Utc>) {
        for message in self.messages.iter_mut() {
            if message.deleted {
                continue;
            }
            let Some(ref at) = message.disappear_at else { continue };
            let Ok(at) = chrono::DateTime::parse_from_rfc3339(at) else { continue };
            if at.with_timezone(&chrono::Utc) <= now {
                message.deleted = true;
                message.content = DISAPPEARED_CONTENT.to_string();
            }
        }
    }

    /// Outstanding disappearance timers to reconstruct on load: every
    /// non-deleted message whose deadline is still in the future.
    pub fn pending_disappearances(
        &self,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Vec<(String, chrono::DateTime<chrono::Utc>)> {
        self.messages
            .iter()
            .filter(|m| !m.deleted)
            .filter_map(|m| {
                let at = chrono::DateTime::parse_from_rfc3339(m.disappear_at.as_ref()?).ok()?;
                let at = at.with_timezone(&chrono::Utc);
                (at > now).then_some((m.id.clone(), at))
            })
            .collect()
    }
}

/// Room Store (`spec.md` §2, §5): in-memory authoritative mapping of
/// room-id to `Room`, serialized per-room (mirrors the teacher's
/// `Mutex<Connection>` ownership around `Db`, generalized to one mutex per
/// room so operations on different rooms never contend).
#[derive(Default)]
pub struct RoomStore {
    rooms: Mutex<HashMap<String, Mutex<Room>>>,
}

impl RoomStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` against the room, creating it first if absent (the
    /// "implicit creation on first join-room for an unknown id" rule).
    pub fn with_room_or_create<R>(
        &self,
        room_id: &str,
        creator_identity: impl FnOnce() -> String,
        f: impl FnOnce(&mut Room) -> R,
    ) -> R {
        let mut rooms = self.rooms.lock().unwrap();
        let room_mutex = rooms.entry(room_id.to_string()).or_insert_with(|| {
            Mutex::new(Room::new(room_id.to_string(), room_id.to_string(), creator_identity()))
        });
        let mut room = room_mutex.lock().unwrap();
        f(&mut room)
    }

    pub fn with_room<R>(&self, room_id: &str, f: impl FnOnce(&mut Room) -> R) -> Option<R> {
        let rooms = self.rooms.lock().unwrap();
        let room_mutex = rooms.get(room_id)?;
        let mut room = room_mutex.lock().unwrap();
        Some(f(&mut room))
    }

    pub fn insert_loaded(&self, room: Room) {
        self.rooms.lock().unwrap().insert(room.id.clone(), Mutex::new(room));
    }

    pub fn snapshot_all(&self) -> Vec<Room> {
        self.rooms
            .lock()
            .unwrap()
            .values()
            .map(|m| m.lock().unwrap().clone())
            .collect()
    }

    pub fn room_descriptor(&self, room_id: &str) -> Option<(String, usize, String, Settings)> {
        self.with_room(room_id, |room| {
            (room.name.clone(), room.members.len(), room.created_at.clone(), room.settings.clone())
        })
    }

    pub fn create_room(&self, id: String, name: String, creator_identity: String) {
        self.rooms.lock().unwrap().insert(id.clone(), Mutex::new(Room::new(id, name, creator_identity)));
    }

    pub fn exists(&self, room_id: &str) -> bool {
        self.rooms.lock().unwrap().contains_key(room_id)
    }

    pub fn room_ids(&self) -> Vec<String> {
        self.rooms.lock().unwrap().keys().cloned().collect()
    }
}
