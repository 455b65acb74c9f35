//! Wire shapes for the bidirectional event channel. Every inbound frame is
//! `{"event": "<kebab-case-kind>", ...fields}`; outbound frames use the
//! same envelope. Field names are camelCase to match the client's wire
//! format (see `spec.md` §6).

use crate::models::{FileData, MemberView, Message, MessageKind, Settings, SettingsPatch};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum InboundEvent {
    JoinRoom {
        #[serde(rename = "roomId")]
        room_id: String,
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "userName")]
        user_name: String,
        #[serde(default)]
        avatar: Option<String>,
        #[serde(default)]
        color: Option<String>,
    },
    SendMessage {
        content: String,
        #[serde(rename = "type", default = "default_text_kind")]
        kind: MessageKind,
        #[serde(default, rename = "replyTo")]
        reply_to: Option<String>,
        #[serde(default, rename = "fileData")]
        file_data: Option<FileData>,
    },
    VoiceMessage {
        #[serde(default)]
        content: String,
        #[serde(rename = "fileData")]
        file_data: FileData,
        #[serde(default, rename = "replyTo")]
        reply_to: Option<String>,
    },
    TypingStart,
    TypingStop,
    AddReaction {
        #[serde(rename = "messageId")]
        message_id: String,
        emoji: String,
    },
    MarkRead {
        ids: Vec<String>,
    },
    EditMessage {
        #[serde(rename = "messageId")]
        message_id: String,
        #[serde(rename = "newContent")]
        new_content: String,
    },
    DeleteMessage {
        #[serde(rename = "messageId")]
        message_id: String,
    },
    UpdateSettings {
        #[serde(flatten)]
        patch: SettingsPatch,
    },
    KickMember {
        #[serde(rename = "targetId")]
        target_id: String,
    },
    CanvasStroke {
        #[serde(flatten)]
        stroke: Value,
    },
    JoinVoice,
    LeaveVoice,
    VoiceSignal {
        #[serde(rename = "targetId")]
        target_id: String,
        signal: Value,
    },
    CallSignal {
        #[serde(rename = "targetId")]
        target_id: String,
        signal: Value,
    },
    CallInvite {
        #[serde(rename = "targetId")]
        target_id: String,
        #[serde(default)]
        signal: Value,
    },
    CallAccept {
        #[serde(rename = "targetId")]
        target_id: String,
        #[serde(default)]
        signal: Value,
    },
    CallReject {
        #[serde(rename = "targetId")]
        target_id: String,
    },
    CallEnd {
        #[serde(rename = "targetId")]
        target_id: String,
    },
    CallMediaHandshake {
        #[serde(rename = "targetId")]
        target_id: String,
        #[serde(default, rename = "mediaPk")]
        media_pk: Option<String>,
        #[serde(default, rename = "mediaSecret")]
        media_secret: Option<String>,
    },
    HandshakeInit {
        pk: String,
    },
    HandshakeResponse {
        #[serde(rename = "targetId")]
        target_id: String,
        ciphertext: String,
        #[serde(rename = "encryptedKey")]
        encrypted_key: String,
    },
}

fn default_text_kind() -> MessageKind {
    MessageKind::Text
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum OutboundEvent {
    RoomJoined {
        #[serde(rename = "roomName")]
        room_name: String,
        members: Vec<MemberView>,
        messages: Vec<Message>,
        settings: Settings,
    },
    Message(Message),
    UserJoined {
        user: MemberView,
    },
    UserLeft {
        id: String,
        members: Vec<MemberView>,
    },
    UserTyping {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "userName")]
        user_name: String,
    },
    UserStoppedTyping {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "userName")]
        user_name: String,
    },
    ReactionUpdated {
        #[serde(rename = "messageId")]
        message_id: String,
        reactions: HashMap<String, Vec<String>>,
    },
    MessageEdited(Message),
    MessageDeleted {
        #[serde(rename = "messageId")]
        message_id: String,
    },
    MessageRead {
        #[serde(rename = "messageId")]
        message_id: String,
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "userName")]
        user_name: String,
    },
    SettingsUpdated(Settings),
    Kicked,
    HandshakeRequest {
        #[serde(rename = "senderId")]
        sender_id: String,
        pk: String,
    },
    HandshakeComplete {
        ciphertext: String,
        #[serde(rename = "encryptedKey")]
        encrypted_key: String,
    },
    UserJoinedVoice {
        #[serde(rename = "userId")]
        user_id: String,
    },
    UserLeftVoice {
        #[serde(rename = "userId")]
        user_id: String,
    },
    CanvasStroke {
        #[serde(rename = "senderId")]
        sender_id: String,
        #[serde(flatten)]
        stroke: Value,
    },
    VoiceSignal {
        #[serde(rename = "senderId")]
        sender_id: String,
        signal: Value,
    },
    CallSignal {
        #[serde(rename = "senderId")]
        sender_id: String,
        signal: Value,
    },
    CallInvite {
        #[serde(rename = "senderId")]
        sender_id: String,
        #[serde(rename = "senderName")]
        sender_name: String,
        signal: Value,
    },
    CallAccept {
        #[serde(rename = "senderId")]
        sender_id: String,
        signal: Value,
    },
    CallReject {
        #[serde(rename = "senderId")]
        sender_id: String,
    },
    CallEnd {
        #[serde(rename = "senderId")]
        sender_id: String,
    },
    CallMediaHandshake {
        #[serde(rename = "senderId")]
        sender_id: String,
        #[serde(skip_serializing_if = "Option::is_none", rename = "mediaPk")]
        media_pk: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none", rename = "mediaSecret")]
        media_secret: Option<String>,
    },
}
