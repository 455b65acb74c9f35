//! Persistence Adapter (`spec.md` §4.8): pluggable snapshot storage behind a
//! trait, so the rest of the crate never knows whether rooms are sitting in
//! a local JSON file or a cloud document store. Selection happens once at
//! startup based on `Config` (see `select`).

mod cloud;
mod local;

pub use cloud::CloudDocumentAdapter;
pub use local::LocalSnapshotAdapter;

use crate::models::Room;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("persistence backend error: {0}")]
    Backend(String),
}

/// The Snapshot Coalescer decides *when* to call `save`; the adapter only
/// knows how. `rooms` is always the full current room set; `dirty_ids` names
/// the subset that actually changed since the last save. A local snapshot
/// adapter persists the whole set regardless (it's one file, one document);
/// a cloud document adapter, one document per room, only needs to touch the
/// rooms named in `dirty_ids`.
#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    async fn load(&self) -> Result<Vec<Room>, PersistenceError>;
    async fn save(&self, rooms: &[Room], dirty_ids: &[String]) -> Result<(), PersistenceError>;
}

/// Picks the cloud document store when `FIREBASE_SERVICE_ACCOUNT` is set,
/// otherwise falls back to the local JSON snapshot file — mirrors the
/// teacher's habit of gating optional subsystems on an environment
/// variable's presence (see `mdns::start_mdns`'s `MDNS_ENABLED` check).
pub fn select(config: &crate::config::Config) -> Box<dyn PersistenceAdapter> {
    match &config.cloud_document_store {
        Some(cloud) => {
            println!("💾 persistence: cloud document store at {}", cloud.base_url);
            Box::new(CloudDocumentAdapter::new(cloud.base_url.clone(), cloud.api_key.clone()))
        }
        None => {
            println!("💾 persistence: local snapshot file at {}", config.snapshot_path.display());
            Box::new(LocalSnapshotAdapter::new(config.snapshot_path.clone()))
        }
    }
}
