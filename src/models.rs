use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A chat room: the authoritative aggregate. Mutated only through
/// `crate::room::RoomStateMachine`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub name: String,
    pub creator_identity: String,
    pub created_at: String,
    /// Serialized as an array of `[session_id, member]` pairs, not a JSON
    /// object, per the local snapshot schema (`spec.md` §6) — sessions are
    /// advisory on load (all dead after a restart) so there's no wire
    /// consumer relying on object-keyed lookup here.
    #[serde(with = "members_as_pairs")]
    pub members: HashMap<String, Member>,
    pub messages: Vec<Message>,
    pub settings: Settings,
}

mod members_as_pairs {
    use super::Member;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::HashMap;

    pub fn serialize<S>(members: &HashMap<String, Member>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        members.iter().collect::<Vec<(&String, &Member)>>().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<HashMap<String, Member>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Vec::<(String, Member)>::deserialize(deserializer)?.into_iter().collect())
    }
}

impl Room {
    pub fn new(id: String, name: String, creator_identity: String) -> Self {
        Self {
            id,
            name,
            creator_identity,
            created_at: chrono::Utc::now().to_rfc3339(),
            members: HashMap::new(),
            messages: Vec::new(),
            settings: Settings::default(),
        }
    }

    /// Find the member keyed by a stale session whose `persistent_user_id`
    /// matches. Used to evict a reconnecting user's old slot on join.
    pub fn member_session_for_user(&self, persistent_user_id: &str) -> Option<String> {
        self.members
            .values()
            .find(|m| m.persistent_user_id == persistent_user_id)
            .map(|m| m.session_id.clone())
    }

    pub fn message_mut(&mut self, message_id: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == message_id)
    }

    pub fn message(&self, message_id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == message_id)
    }
}

/// A connected participant. Transient — lives only for the duration of the
/// session; never persisted in a way that survives a restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub session_id: String,
    pub persistent_user_id: String,
    pub display_name: String,
    pub avatar_initials: String,
    pub color: String,
    pub joined_at: String,
    pub is_online: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Voice,
    File,
    Image,
    System,
}

/// An append-only log entry. `deleted`/`edited` flip in place; the record
/// itself is never removed so ordering and reply references stay intact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub room_id: String,
    #[serde(rename = "senderId")]
    pub sender_session_id: String,
    #[serde(rename = "senderName")]
    pub sender_display_name: String,
    pub sender_avatar: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    /// emoji -> set of session ids that reacted. An emoji with an empty set
    /// is always pruned immediately (see `Room::react`), never stored empty.
    pub reactions: HashMap<String, HashSet<String>>,
    pub read_by: HashSet<String>,
    pub edited: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<String>,
    pub deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disappear_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_data: Option<FileData>,
}

pub const DELETED_CONTENT: &str = "This message was deleted";
pub const DISAPPEARED_CONTENT: &str = "This message has disappeared";

/// Opaque descriptor carried alongside a message. Files carry url/name/
/// size/mime; voice clips carry a base64 payload plus duration/waveform.
/// The server never inspects any of these fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "audioData")]
    pub audio_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waveform: Option<Vec<f32>>,
}

/// Recognized `disappearingMessages` values, in milliseconds.
pub const DISAPPEAR_VALUES: [u64; 4] = [5_000, 60_000, 3_600_000, 86_400_000];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disappearing_messages: Option<u64>,
    pub max_members: u32,
    pub is_private: bool,
    pub allow_file_sharing: bool,
    pub allow_voice_messages: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            disappearing_messages: None,
            max_members: 50,
            is_private: false,
            allow_file_sharing: true,
            allow_voice_messages: true,
        }
    }
}

/// Partial update to `Settings`; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, deserialize_with = "de_double_option", rename = "disappearingMessages")]
    pub disappearing_messages: Option<Option<u64>>,
    #[serde(default)]
    pub max_members: Option<u32>,
    #[serde(default)]
    pub is_private: Option<bool>,
    #[serde(default)]
    pub allow_file_sharing: Option<bool>,
    #[serde(default)]
    pub allow_voice_messages: Option<bool>,
}

/// Distinguishes "field absent" from "field explicitly set to null" so a
/// patch can clear `disappearing_messages` back to "off".
fn de_double_option<'de, D>(deserializer: D) -> Result<Option<Option<u64>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

impl Settings {
    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(v) = patch.disappearing_messages {
            self.disappearing_messages = v;
        }
        if let Some(v) = patch.max_members {
            self.max_members = v;
        }
        if let Some(v) = patch.is_private {
            self.is_private = v;
        }
        if let Some(v) = patch.allow_file_sharing {
            self.allow_file_sharing = v;
        }
        if let Some(v) = patch.allow_voice_messages {
            self.allow_voice_messages = v;
        }
    }
}

/// A lightweight read view of `Member`, used in outbound payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub avatar: String,
    pub color: String,
}

impl From<&Member> for MemberView {
    fn from(m: &Member) -> Self {
        Self {
            id: m.session_id.clone(),
            user_id: m.persistent_user_id.clone(),
            name: m.display_name.clone(),
            avatar: m.avatar_initials.clone(),
            color: m.color.clone(),
        }
    }
}

// --- HTTP-facing request/response shapes ---

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub name: String,
    #[serde(rename = "creatorName")]
    pub creator_name: String,
}

#[derive(Debug, Serialize)]
pub struct CreateRoomResponse {
    pub success: bool,
    #[serde(rename = "roomId")]
    pub room_id: String,
    #[serde(rename = "inviteLink")]
    pub invite_link: String,
}

#[derive(Debug, Serialize)]
pub struct RoomDescriptor {
    pub id: String,
    pub name: String,
    #[serde(rename = "memberCount")]
    pub member_count: usize,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    pub settings: Settings,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub filename: String,
    #[serde(rename = "originalName")]
    pub original_name: String,
    pub size: u64,
    pub mimetype: String,
    pub url: String,
}
