use ghostwire_relay::models::{MessageKind, Room};
use ghostwire_relay::persistence::{LocalSnapshotAdapter, PersistenceAdapter};

fn temp_snapshot_path() -> std::path::PathBuf {
    std::env::temp_dir().join(format!("ghostwire_snapshot_{}.json", uuid::Uuid::new_v4()))
}

#[tokio::test]
async fn load_on_a_missing_file_returns_an_empty_snapshot() {
    let path = temp_snapshot_path();
    let adapter = LocalSnapshotAdapter::new(path);
    let rooms = adapter.load().await.unwrap();
    assert!(rooms.is_empty());
}

#[tokio::test]
async fn save_then_load_round_trips_room_state() {
    let path = temp_snapshot_path();
    let adapter = LocalSnapshotAdapter::new(path.clone());

    let mut room = Room::new("r1".to_string(), "my room".to_string(), "alice".to_string());
    room.join("s1", "u1", "alice", None, None, 200);
    room.post("s1", MessageKind::Text, "hello".into(), None, None);

    adapter.save(&[room.clone()], &["r1".to_string()]).await.unwrap();
    let loaded = adapter.load().await.unwrap();

    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].id, "r1");
    assert_eq!(loaded[0].messages.len(), 1);
    assert_eq!(loaded[0].messages[0].content, "hello");

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn save_creates_parent_dirs_and_writes_valid_json() {
    let path = temp_snapshot_path().parent().unwrap().join("nested").join("rooms.json");
    let adapter = LocalSnapshotAdapter::new(path.clone());
    adapter.save(&[], &[]).await.unwrap();

    assert!(path.exists());
    let raw = std::fs::read_to_string(&path).unwrap();
    let parsed: Vec<Room> = serde_json::from_str(&raw).unwrap();
    assert!(parsed.is_empty());

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}
