use super::{PersistenceAdapter, PersistenceError};
use crate::models::Room;
use async_trait::async_trait;
use std::io::Write;
use std::path::PathBuf;

/// Local JSON snapshot file. Writes go through a temp file in the same
/// directory followed by a rename, so a crash mid-write never leaves a
/// truncated snapshot behind.
pub struct LocalSnapshotAdapter {
    path: PathBuf,
}

impl LocalSnapshotAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl PersistenceAdapter for LocalSnapshotAdapter {
    async fn load(&self) -> Result<Vec<Room>, PersistenceError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            if !path.exists() {
                return Ok(Vec::new());
            }
            let data = std::fs::read_to_string(&path)?;
            if data.trim().is_empty() {
                return Ok(Vec::new());
            }
            let rooms: Vec<Room> = serde_json::from_str(&data)?;
            Ok(rooms)
        })
        .await
        .map_err(|e| PersistenceError::Backend(e.to_string()))?
    }

    async fn save(&self, rooms: &[Room], _dirty_ids: &[String]) -> Result<(), PersistenceError> {
        let path = self.path.clone();
        let data = serde_json::to_vec_pretty(rooms)?;
        tokio::task::spawn_blocking(move || {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
            let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
            tmp.write_all(&data)?;
            tmp.flush()?;
            tmp.persist(&path).map_err(|e| std::io::Error::other(e.to_string()))?;
            Ok::<(), std::io::Error>(())
        })
        .await
        .map_err(|e| PersistenceError::Backend(e.to_string()))??;
        Ok(())
    }
}
