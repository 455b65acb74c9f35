//! Snapshot Coalescer (`spec.md` §4.8): collapses bursts of room mutations
//! into one persistence write every `coalesce_window`, the way the teacher
//! collapses periodic work into a single background task in `retention.rs`
//! — here debounced rather than fixed-interval, since a write should follow
//! shortly after the *last* mutation in a burst, not tick on a clock.

use crate::persistence::PersistenceAdapter;
use crate::room::RoomStore;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

pub struct Coalescer {
    dirty: Notify,
    dirty_rooms: Mutex<HashSet<String>>,
}

impl Coalescer {
    pub fn new() -> Self {
        Self { dirty: Notify::new(), dirty_rooms: Mutex::new(HashSet::new()) }
    }

    /// Marks `room_id` dirty. Several calls for the same or different rooms
    /// before the debounce window fires all land in the same save — the
    /// adapter sees the union, not one call per mutation.
    pub fn mark_dirty(&self, room_id: impl Into<String>) {
        self.dirty_rooms.lock().unwrap().insert(room_id.into());
        self.dirty.notify_one();
    }

    /// Spawns the debounce loop. Lives for the life of the process;
    /// there's no graceful-shutdown flush since Rocket itself doesn't
    /// expose one here (the teacher makes the same tradeoff for mDNS in
    /// `lib.rs`).
    pub fn spawn(self: Arc<Self>, rooms: Arc<RoomStore>, adapter: Arc<dyn PersistenceAdapter>, window: Duration) {
        tokio::spawn(async move {
            loop {
                self.dirty.notified().await;
                tokio::time::sleep(window).await;

                let dirty_ids: Vec<String> = self.dirty_rooms.lock().unwrap().drain().collect();
                let snapshot = rooms.snapshot_all();
                match adapter.save(&snapshot, &dirty_ids).await {
                    Ok(()) => println!("💾 snapshot coalescer: saved {} dirty room(s)", dirty_ids.len()),
                    Err(e) => eprintln!("⚠️  snapshot coalescer: save failed: {e}"),
                }
            }
        });
    }
}

impl Default for Coalescer {
    fn default() -> Self {
        Self::new()
    }
}
