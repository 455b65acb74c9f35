//! Disappearance Scheduler (`spec.md` §4.4): one-shot redaction timers for
//! messages posted under a room's `disappearingMessages` setting. Mirrors
//! the teacher's periodic-task style (`retention.rs`'s `tokio::spawn` +
//! `sleep` loop) but one `tokio::spawn` per message instead of a recurring
//! sweep, since each message has its own independent deadline rather than a
//! shared retention window.

use crate::coalescer::Coalescer;
use crate::room::RoomStore;
use crate::router::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub struct DisappearanceScheduler {
    router: Arc<Router>,
    coalescer: Arc<Coalescer>,
}

impl DisappearanceScheduler {
    pub fn new(router: Arc<Router>, coalescer: Arc<Coalescer>) -> Self {
        Self { router, coalescer }
    }

    /// Arms a single timer. Safe to call with a deadline already in the
    /// past — the sleep resolves immediately.
    pub fn arm(self: &Arc<Self>, room_id: String, message_id: String, at: DateTime<Utc>) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let delay = (at - Utc::now()).to_std().unwrap_or(std::time::Duration::ZERO);
            tokio::time::sleep(delay).await;
            this.fire(&room_id, &message_id);
        });
    }

    fn fire(&self, room_id: &str, message_id: &str) {
        let Some(result) = self
            .router
            .rooms()
            .with_room(room_id, |room| room.disappear(message_id))
        else {
            return;
        };
        if result.dirty {
            self.router.deliver(room_id, result.dispatch, "");
            self.coalescer.mark_dirty(room_id.to_string());
            println!("🧊 disappearance: redacted message {message_id} in room {room_id}");
        }
    }

    /// Rehydrates timers for every message loaded from a snapshot whose
    /// deadline hasn't passed yet. Messages whose deadline already elapsed
    /// were redacted in-line by `Room::redact_elapsed_on_load` before this
    /// runs, so they never reach here.
    pub fn rehydrate(self: &Arc<Self>, rooms: &RoomStore) {
        let now = Utc::now();
        for room_id in rooms.room_ids() {
            let pending = rooms.with_room(&room_id, |room| room.pending_disappearances(now)).unwrap_or_default();
            for (message_id, at) in pending {
                self.arm(room_id.clone(), message_id, at);
            }
        }
    }
}
