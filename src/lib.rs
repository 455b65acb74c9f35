pub mod coalescer;
pub mod config;
pub mod disappearance;
pub mod keepalive;
pub mod models;
pub mod persistence;
pub mod protocol;
pub mod rate_limit;
pub mod registry;
pub mod room;
pub mod router;
pub mod routes;
pub mod ws;

use coalescer::Coalescer;
use config::Config;
use disappearance::DisappearanceScheduler;
use persistence::PersistenceAdapter;
use registry::ConnectionRegistry;
use rocket_cors::CorsOptions;
use room::RoomStore;
use router::Router;
use std::sync::Arc;

pub fn rocket() -> rocket::Rocket<rocket::Build> {
    let config = Config::from_env();
    build_rocket(config)
}

/// Used by integration tests to inject an isolated `Config` (a temp
/// snapshot path, a shrunk history page size, etc.) without env var races —
/// the same role the teacher's `rocket_with_db_and_config` plays for a
/// custom `RateLimitConfig`.
pub fn rocket_with_config(config: Config) -> rocket::Rocket<rocket::Build> {
    build_rocket(config)
}

fn build_rocket(config: Config) -> rocket::Rocket<rocket::Build> {
    let rooms = Arc::new(RoomStore::new());
    let registry = Arc::new(ConnectionRegistry::new());
    let router = Arc::new(Router::new(Arc::clone(&rooms), Arc::clone(&registry), config.history_page_size));
    let coalescer = Arc::new(Coalescer::new());
    let disappearance = Arc::new(DisappearanceScheduler::new(Arc::clone(&router), Arc::clone(&coalescer)));
    let rate_limiter = rate_limit::RateLimiter::new();
    let rate_limit_config = config.rate_limit.clone();
    let persistence_adapter: Arc<dyn PersistenceAdapter> = Arc::from(persistence::select(&config));

    let cors = CorsOptions::default().to_cors().expect("failed to create CORS");

    // Base64-encoded voice clips and file descriptors can push a plain JSON
    // event well past Rocket's default body limit; widen it the way the
    // teacher widens it for base64 file uploads in `lib.rs`.
    let figment = rocket::Config::figment()
        .merge(("limits.json", 10 * 1024 * 1024))
        .merge(("limits.file", 50 * 1024 * 1024))
        .merge(("port", config.port));

    let external_url = config.external_url.clone();
    let keepalive_interval = config.keepalive_interval;
    let coalesce_window = config.coalesce_window;
    let static_dir = config.static_dir.clone();

    let load_adapter = Arc::clone(&persistence_adapter);
    let coalescer_adapter = Arc::clone(&persistence_adapter);

    let mut build = rocket::custom(figment)
        .manage(Arc::clone(&rooms))
        .manage(Arc::clone(&registry))
        .manage(Arc::clone(&router))
        .manage(Arc::clone(&coalescer))
        .manage(Arc::clone(&disappearance))
        .manage(rate_limiter)
        .manage(rate_limit_config)
        .manage(config)
        .attach(cors)
        .register("/", rocket::catchers![routes::too_many_requests, routes::not_found])
        .mount(
            "/",
            rocket::routes![
                routes::landing,
                routes::room_shell,
                routes::create_room,
                routes::get_room,
                routes::upload,
                routes::download_upload,
                routes::ping,
                routes::health,
                ws::ws,
            ],
        )
        .attach(rocket::fairing::AdHoc::on_liftoff("Snapshot Load", move |rkt| {
            Box::pin(async move {
                let rooms: &Arc<RoomStore> = rkt.state().expect("RoomStore not managed");
                let disappearance: &Arc<DisappearanceScheduler> =
                    rkt.state().expect("DisappearanceScheduler not managed");
                match load_adapter.load().await {
                    Ok(loaded) => {
                        let now = chrono::Utc::now();
                        let count = loaded.len();
                        for mut room in loaded {
                            room.redact_elapsed_on_load(now);
                            rooms.insert_loaded(room);
                        }
                        disappearance.rehydrate(rooms);
                        println!("💾 persistence: loaded {count} room(s) from snapshot");
                    }
                    Err(e) => eprintln!("⚠️  persistence: failed to load snapshot: {e}"),
                }
            })
        }))
        .attach(rocket::fairing::AdHoc::on_liftoff("Snapshot Coalescer", move |rkt| {
            Box::pin(async move {
                let rooms: &Arc<RoomStore> = rkt.state().expect("RoomStore not managed");
                let coalescer: &Arc<Coalescer> = rkt.state().expect("Coalescer not managed");
                Arc::clone(coalescer).spawn(Arc::clone(rooms), coalescer_adapter, coalesce_window);
                println!("💾 snapshot coalescer started ({}ms debounce)", coalesce_window.as_millis());
            })
        }))
        .attach(rocket::fairing::AdHoc::on_liftoff("Keep-Alive Probe", move |_rkt| {
            Box::pin(async move {
                match external_url {
                    Some(url) => {
                        keepalive::spawn(url, keepalive_interval);
                        println!("📡 keep-alive probe started");
                    }
                    None => println!("📡 keep-alive probe disabled (RENDER_EXTERNAL_URL not set)"),
                }
            })
        }));

    if static_dir.is_dir() {
        println!("📦 serving frontend from: {}", static_dir.display());
        build = build.mount("/", rocket::routes![routes::spa_fallback]);
    } else {
        println!("⚠️  frontend directory not found: {} (API-only mode)", static_dir.display());
    }

    build
}
