//! Keep-Alive Probe (`spec.md` §4.9): periodically pings the server's own
//! public URL so a free-tier host that spins down idle instances never
//! sees a quiet period. Only runs when `RENDER_EXTERNAL_URL` is set —
//! mirrors the teacher's `mdns::start_mdns` gating: optional subsystem,
//! silently absent rather than failing when its precondition is unmet.

use std::time::Duration;

pub fn spawn(external_url: String, interval: Duration) {
    tokio::spawn(async move {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build keep-alive HTTP client");
        let ping_url = format!("{}/ping", external_url.trim_end_matches('/'));

        loop {
            tokio::time::sleep(interval).await;
            match client.get(&ping_url).send().await {
                Ok(resp) if resp.status().is_success() => {}
                Ok(resp) => eprintln!("⚠️  keep-alive probe: {} returned {}", ping_url, resp.status()),
                Err(e) => eprintln!("⚠️  keep-alive probe: {e}"),
            }
        }
    });
}
