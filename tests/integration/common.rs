use ghostwire_relay::config::Config;
use rocket::local::blocking::Client;
use std::path::PathBuf;

/// Wrapper around `Client` that auto-deletes its temp snapshot directory on
/// drop (the JSON-snapshot analogue of the teacher's `.db`/`-wal`/`-shm`
/// cleanup in `tests/integration/common.rs`).
pub struct TestClient {
    client: Option<Client>,
    dir: PathBuf,
}

impl Drop for TestClient {
    fn drop(&mut self) {
        drop(self.client.take());
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

impl std::ops::Deref for TestClient {
    type Target = Client;
    fn deref(&self) -> &Client {
        self.client.as_ref().unwrap()
    }
}

fn temp_dir() -> PathBuf {
    std::env::temp_dir().join(format!("ghostwire_test_{}", uuid::Uuid::new_v4()))
}

pub fn test_client() -> TestClient {
    let dir = temp_dir();
    let config = Config::for_testing(dir.join("rooms.json"));
    let rocket = ghostwire_relay::rocket_with_config(config);
    let client = Client::tracked(rocket).expect("valid rocket instance");
    TestClient { client: Some(client), dir }
}

/// A test client with a shrunk rate limit, for exercising 429 responses
/// without sending hundreds of requests.
pub fn test_client_with_rate_limits(
    rate_limit: ghostwire_relay::rate_limit::RateLimitConfig,
) -> TestClient {
    let dir = temp_dir();
    let mut config = Config::for_testing(dir.join("rooms.json"));
    config.rate_limit = rate_limit;
    let rocket = ghostwire_relay::rocket_with_config(config);
    let client = Client::tracked(rocket).expect("valid rocket instance");
    TestClient { client: Some(client), dir }
}
