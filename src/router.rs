//! Event Router (`spec.md` §4.2): the single place that decides, for each
//! inbound frame, what the Room State Machine should do and who should hear
//! about it. Resolution of `room::Recipient` against live sessions is the
//! router's job; the actual send happens through `ConnectionRegistry`.

use crate::models::{FileData, MessageKind, SettingsPatch};
use crate::protocol::{InboundEvent, OutboundEvent};
use crate::registry::ConnectionRegistry;
use crate::room::{Recipient, RoomStore};
use std::sync::Arc;

/// Everything the router needs to know about the socket a frame arrived on.
pub struct SessionContext {
    pub session_id: String,
    pub room_id: Option<String>,
    pub persistent_user_id: Option<String>,
    pub display_name: Option<String>,
}

/// A disappearance timer the caller (the WebSocket task, which owns a
/// `DisappearanceScheduler` handle) must arm after the router returns.
pub struct PendingTimer {
    pub room_id: String,
    pub message_id: String,
    pub at: chrono::DateTime<chrono::Utc>,
}

/// Side effects the caller must perform after `Router::handle` returns:
/// events delivered, whether the room's durable state changed (trips the
/// coalescer), and any new disappearance timer to arm.
#[derive(Default)]
pub struct RouteOutcome {
    pub dirty_room: Option<String>,
    pub timer: Option<PendingTimer>,
    /// Set when a `join-room` event moved the session into a new room, so
    /// the caller can update its own bookkeeping (it already updated the
    /// registry during this call).
    pub joined_room: Option<String>,
}

pub struct Router {
    rooms: Arc<RoomStore>,
    registry: Arc<ConnectionRegistry>,
    history_page_size: usize,
}

impl Router {
    pub fn new(rooms: Arc<RoomStore>, registry: Arc<ConnectionRegistry>, history_page_size: usize) -> Self {
        Self { rooms, registry, history_page_size }
    }

    pub fn rooms(&self) -> &RoomStore {
        &self.rooms
    }

    /// Dispatch one inbound frame. Unauthorized or malformed actions are
    /// dropped silently (`spec.md` §7) — no error frame is ever sent back.
    pub fn handle(&self, ctx: &mut SessionContext, event: InboundEvent) -> RouteOutcome {
        match event {
            InboundEvent::JoinRoom { room_id, user_id, user_name, avatar, color } => {
                self.join_room(ctx, room_id, user_id, user_name, avatar, color)
            }
            InboundEvent::SendMessage { content, kind, reply_to, file_data } => {
                self.post(ctx, kind, content, reply_to, file_data)
            }
            InboundEvent::VoiceMessage { content, file_data, reply_to } => {
                self.post(ctx, MessageKind::Voice, content, reply_to, Some(file_data))
            }
            InboundEvent::TypingStart => self.typing(ctx, true),
            InboundEvent::TypingStop => self.typing(ctx, false),
            InboundEvent::AddReaction { message_id, emoji } => self.in_room(ctx, |room| {
                room.react(&ctx_session(ctx), &message_id, &emoji)
            }),
            InboundEvent::MarkRead { ids } => {
                self.in_room(ctx, |room| room.mark_read(&ctx_session(ctx), &ids))
            }
            InboundEvent::EditMessage { message_id, new_content } => self.in_room(ctx, |room| {
                room.edit(&ctx_session(ctx), &message_id, new_content)
            }),
            InboundEvent::DeleteMessage { message_id } => {
                self.in_room(ctx, |room| room.delete(&ctx_session(ctx), &message_id))
            }
            InboundEvent::UpdateSettings { patch } => self.update_settings(ctx, patch),
            InboundEvent::KickMember { target_id } => {
                self.in_room(ctx, |room| room.evict(&ctx_session(ctx), &target_id))
            }
            InboundEvent::JoinVoice => self.voice_presence(ctx, true),
            InboundEvent::LeaveVoice => self.voice_presence(ctx, false),
            InboundEvent::CanvasStroke { stroke } => self.broadcast_except_sender(
                ctx,
                OutboundEvent::CanvasStroke { sender_id: ctx.session_id.clone(), stroke },
            ),
            InboundEvent::VoiceSignal { target_id, signal } => self.targeted(
                ctx,
                &target_id,
                OutboundEvent::VoiceSignal { sender_id: ctx.session_id.clone(), signal },
            ),
            InboundEvent::CallSignal { target_id, signal } => self.targeted(
                ctx,
                &target_id,
                OutboundEvent::CallSignal { sender_id: ctx.session_id.clone(), signal },
            ),
            InboundEvent::CallInvite { target_id, signal } => self.targeted(
                ctx,
                &target_id,
                OutboundEvent::CallInvite {
                    sender_id: ctx.session_id.clone(),
                    sender_name: ctx.display_name.clone().unwrap_or_default(),
                    signal,
                },
            ),
            InboundEvent::CallAccept { target_id, signal } => self.targeted(
                ctx,
                &target_id,
                OutboundEvent::CallAccept { sender_id: ctx.session_id.clone(), signal },
            ),
            InboundEvent::CallReject { target_id } => self.targeted(
                ctx,
                &target_id,
                OutboundEvent::CallReject { sender_id: ctx.session_id.clone() },
            ),
            InboundEvent::CallEnd { target_id } => self.targeted(
                ctx,
                &target_id,
                OutboundEvent::CallEnd { sender_id: ctx.session_id.clone() },
            ),
            InboundEvent::CallMediaHandshake { target_id, media_pk, media_secret } => self.targeted(
                ctx,
                &target_id,
                OutboundEvent::CallMediaHandshake {
                    sender_id: ctx.session_id.clone(),
                    media_pk,
                    media_secret,
                },
            ),
            InboundEvent::HandshakeInit { pk } => self.broadcast_except_sender(
                ctx,
                OutboundEvent::HandshakeRequest { sender_id: ctx.session_id.clone(), pk },
            ),
            InboundEvent::HandshakeResponse { target_id, ciphertext, encrypted_key } => self.targeted(
                ctx,
                &target_id,
                OutboundEvent::HandshakeComplete { ciphertext, encrypted_key },
            ),
        }
    }

    fn join_room(
        &self,
        ctx: &mut SessionContext,
        room_id: String,
        user_id: String,
        user_name: String,
        avatar: Option<String>,
        color: Option<String>,
    ) -> RouteOutcome {
        let user_name_for_creator = user_name.clone();
        let result = self.rooms.with_room_or_create(
            &room_id,
            move || user_name_for_creator,
            |room| room.join(&ctx.session_id, &user_id, &user_name, avatar, color, self.history_page_size),
        );

        self.registry.set_room(&ctx.session_id, Some(room_id.clone()));
        self.registry.set_identity(&ctx.session_id, user_id.clone(), user_name.clone());
        ctx.room_id = Some(room_id.clone());
        ctx.persistent_user_id = Some(user_id);
        ctx.display_name = Some(user_name);

        let dirty = self.deliver(&room_id, result.dispatch, &ctx.session_id);
        RouteOutcome {
            dirty_room: dirty.then(|| room_id.clone()),
            timer: None,
            joined_room: Some(room_id),
        }
    }

    fn post(
        &self,
        ctx: &SessionContext,
        kind: MessageKind,
        content: String,
        reply_to: Option<String>,
        file_data: Option<FileData>,
    ) -> RouteOutcome {
        let Some(room_id) = ctx.room_id.clone() else { return RouteOutcome::default() };
        let session = ctx.session_id.clone();
        let result = self
            .rooms
            .with_room(&room_id, move |room| room.post(&session, kind, content, reply_to, file_data));
        let Some(result) = result else { return RouteOutcome::default() };

        let dirty = self.deliver(&room_id, result.dispatch, &ctx.session_id);
        let timer = result.schedule_disappearance.map(|(message_id, at)| PendingTimer {
            room_id: room_id.clone(),
            message_id,
            at,
        });
        RouteOutcome { dirty_room: dirty.then(|| room_id), timer, joined_room: None }
    }

    fn update_settings(&self, ctx: &SessionContext, patch: SettingsPatch) -> RouteOutcome {
        self.in_room(ctx, move |room| room.update_settings(&ctx_session(ctx), &patch))
    }

    fn typing(&self, ctx: &SessionContext, starting: bool) -> RouteOutcome {
        let Some(room_id) = ctx.room_id.clone() else { return RouteOutcome::default() };
        let Some(user_id) = ctx.persistent_user_id.clone() else { return RouteOutcome::default() };
        let Some(user_name) = ctx.display_name.clone() else { return RouteOutcome::default() };
        let event = if starting {
            OutboundEvent::UserTyping { user_id, user_name }
        } else {
            OutboundEvent::UserStoppedTyping { user_id, user_name }
        };
        self.fanout_if_member(ctx, &room_id, Recipient::AllExcept(ctx.session_id.clone()), event);
        RouteOutcome::default()
    }

    fn voice_presence(&self, ctx: &SessionContext, joining: bool) -> RouteOutcome {
        let Some(room_id) = ctx.room_id.clone() else { return RouteOutcome::default() };
        let Some(user_id) = ctx.persistent_user_id.clone() else { return RouteOutcome::default() };
        let event = if joining {
            OutboundEvent::UserJoinedVoice { user_id }
        } else {
            OutboundEvent::UserLeftVoice { user_id }
        };
        self.fanout_if_member(ctx, &room_id, Recipient::AllExcept(ctx.session_id.clone()), event);
        RouteOutcome::default()
    }

    fn broadcast_except_sender(&self, ctx: &SessionContext, event: OutboundEvent) -> RouteOutcome {
        let Some(room_id) = ctx.room_id.clone() else { return RouteOutcome::default() };
        self.fanout_if_member(ctx, &room_id, Recipient::AllExcept(ctx.session_id.clone()), event);
        RouteOutcome::default()
    }

    /// Targeted delivery (voice/call/PQC signal): the sender must currently
    /// be in a room, and the target must be connected AND currently in that
    /// same room. A `target_id` that has moved to another room, left
    /// entirely, or never joined one is an authorization failure and the
    /// event is dropped silently — signaling is scoped to the sender's room
    /// the same way broadcast and typing events are.
    fn targeted(&self, ctx: &SessionContext, target_id: &str, event: OutboundEvent) -> RouteOutcome {
        let Some(sender_room) = ctx.room_id.as_deref() else { return RouteOutcome::default() };
        let Some(target_state) = self.registry.state(target_id) else { return RouteOutcome::default() };
        if target_state.room_id.as_deref() != Some(sender_room) {
            return RouteOutcome::default();
        }
        self.registry.send(target_id, event);
        RouteOutcome::default()
    }

    /// Run `f` against the session's current room, deliver the resulting
    /// dispatch plan, and report dirtiness. No-op if the session isn't in a
    /// room.
    fn in_room(
        &self,
        ctx: &SessionContext,
        f: impl FnOnce(&mut crate::models::Room) -> crate::room::OpResult,
    ) -> RouteOutcome {
        let Some(room_id) = ctx.room_id.clone() else { return RouteOutcome::default() };
        let Some(result) = self.rooms.with_room(&room_id, f) else { return RouteOutcome::default() };
        let dirty = self.deliver(&room_id, result.dispatch, &ctx.session_id);
        RouteOutcome { dirty_room: dirty.then(|| room_id), timer: None, joined_room: None }
    }

    fn fanout_if_member(&self, ctx: &SessionContext, room_id: &str, to: Recipient, event: OutboundEvent) {
        let is_member = self
            .rooms
            .with_room(room_id, |room| room.members.contains_key(&ctx.session_id))
            .unwrap_or(false);
        if !is_member {
            return;
        }
        self.deliver(room_id, vec![crate::room::Dispatch { to, event }], &ctx.session_id);
    }

    /// Resolves each `Dispatch`'s `Recipient` against the room's current
    /// membership and hands the event to the registry. Returns whether any
    /// dispatch actually happened. `pub(crate)` so the Disappearance
    /// Scheduler, which fires outside the inbound-frame path, can reuse the
    /// same recipient-resolution logic instead of duplicating it.
    pub(crate) fn deliver(&self, room_id: &str, dispatch: Vec<crate::room::Dispatch>, sender: &str) -> bool {
        if dispatch.is_empty() {
            return false;
        }
        let member_ids: Vec<String> =
            self.rooms.with_room(room_id, |room| room.members.keys().cloned().collect()).unwrap_or_default();

        for d in dispatch {
            match d.to {
                Recipient::Sender => self.registry.send(sender, d.event),
                Recipient::Target(id) => self.registry.send(&id, d.event),
                Recipient::AllMembers => {
                    for id in &member_ids {
                        self.registry.send(id, d.event.clone());
                    }
                }
                Recipient::AllExcept(exclude) => {
                    for id in &member_ids {
                        if *id != exclude {
                            self.registry.send(id, d.event.clone());
                        }
                    }
                }
            }
        }
        true
    }
}

fn ctx_session(ctx: &SessionContext) -> String {
    ctx.session_id.clone()
}
