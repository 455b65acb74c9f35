use super::{PersistenceAdapter, PersistenceError};
use crate::models::Room;
use async_trait::async_trait;
use futures_util::future::try_join_all;

/// Cloud document store adapter: each room is its own document at
/// `rooms/{room_id}`, read/written with plain GET/PUT — mirrors the
/// teacher's `webhooks.rs` use of a bare `reqwest::Client` for outbound
/// delivery, here repurposed for snapshot persistence instead of webhook
/// fan-out. `load` lists the whole `rooms` collection; `save` only PUTs the
/// documents named dirty, run concurrently as a batch.
pub struct CloudDocumentAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl CloudDocumentAdapter {
    pub fn new(base_url: String, api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build persistence HTTP client");
        Self { client, base_url, api_key }
    }

    fn collection_url(&self) -> String {
        format!("{}/rooms", self.base_url.trim_end_matches('/'))
    }

    fn room_url(&self, room_id: &str) -> String {
        format!("{}/rooms/{}", self.base_url.trim_end_matches('/'), room_id)
    }

    async fn put_room(&self, room: &Room) -> Result<(), PersistenceError> {
        let resp = self
            .client
            .put(self.room_url(&room.id))
            .bearer_auth(&self.api_key)
            .json(room)
            .send()
            .await
            .map_err(|e| PersistenceError::Backend(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(PersistenceError::Backend(format!("save failed for room {}: {}", room.id, resp.status())));
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceAdapter for CloudDocumentAdapter {
    async fn load(&self) -> Result<Vec<Room>, PersistenceError> {
        let resp = self
            .client
            .get(self.collection_url())
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| PersistenceError::Backend(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !resp.status().is_success() {
            return Err(PersistenceError::Backend(format!("load failed: {}", resp.status())));
        }
        resp.json::<Vec<Room>>().await.map_err(|e| PersistenceError::Backend(e.to_string()))
    }

    async fn save(&self, rooms: &[Room], dirty_ids: &[String]) -> Result<(), PersistenceError> {
        // On the very first save after startup, the coalescer may not have
        // per-room dirty ids yet (e.g. a room mutated before this adapter
        // was wired up); fall back to upserting everything rather than
        // silently writing nothing.
        let dirty: Vec<&Room> = if dirty_ids.is_empty() {
            rooms.iter().collect()
        } else {
            rooms.iter().filter(|r| dirty_ids.contains(&r.id)).collect()
        };
        try_join_all(dirty.iter().map(|room| self.put_room(room))).await?;
        Ok(())
    }
}
