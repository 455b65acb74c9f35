//! HTTP surface (`spec.md` §6): room creation/lookup, file upload/download,
//! the keep-alive ping, health, and the landing/room HTML shells. Route
//! functions keep the teacher's `Result<Json<T>, (Status, Json<Value>)>`
//! convention (`routes/rooms.rs`) rather than a typed error enum — these
//! responses are HTTP-facing, so a `{"error": ...}` body is the right
//! shape, unlike the internal `PersistenceError`.

use crate::config::Config;
use crate::models::{CreateRoomRequest, CreateRoomResponse, RoomDescriptor, UploadResponse};
use crate::rate_limit::{RateLimitConfig, RateLimited, RateLimiter};
use crate::room::RoomStore;
use rocket::fs::{NamedFile, TempFile};
use rocket::form::Form;
use rocket::http::{ContentType, Status};
use rocket::request::{FromRequest, Outcome, Request};
use rocket::serde::json::Json;
use rocket::{get, post, State};
use std::path::PathBuf;

pub struct ClientIp(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ClientIp {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let ip = req
            .headers()
            .get_one("X-Forwarded-For")
            .and_then(|s| s.split(',').next())
            .map(|s| s.trim().to_string())
            .or_else(|| req.remote().map(|r| r.ip().to_string()))
            .unwrap_or_else(|| "unknown".to_string());
        Outcome::Success(ClientIp(ip))
    }
}

#[post("/api/rooms", format = "json", data = "<body>")]
pub fn create_room(
    rooms: &State<std::sync::Arc<RoomStore>>,
    rate_limiter: &State<RateLimiter>,
    rate_config: &State<RateLimitConfig>,
    config: &State<Config>,
    ip: ClientIp,
    body: Json<CreateRoomRequest>,
) -> Result<RateLimited<CreateRoomResponse>, (Status, Json<serde_json::Value>)> {
    let rl = rate_limiter.check_with_info(
        &format!("create_room:{}", ip.0),
        rate_config.rooms_max,
        rate_config.rooms_window_secs,
    );
    if !rl.allowed {
        return Err((
            Status::TooManyRequests,
            Json(serde_json::json!({
                "error": format!("Rate limited: max {} rooms per hour", rate_config.rooms_max),
                "retry_after_secs": rl.retry_after_secs,
                "limit": rl.limit,
                "remaining": 0
            })),
        ));
    }

    let name = body.name.trim().to_string();
    if name.is_empty() || name.len() > 100 {
        return Err((Status::BadRequest, Json(serde_json::json!({"error": "Room name must be 1-100 characters"}))));
    }
    let creator_name = body.creator_name.trim().to_string();
    if creator_name.is_empty() || creator_name.len() > 100 {
        return Err((Status::BadRequest, Json(serde_json::json!({"error": "Creator name must be 1-100 characters"}))));
    }

    let id = uuid::Uuid::new_v4().to_string();
    rooms.create_room(id.clone(), name, creator_name);

    let invite_link = match &config.external_url {
        Some(base) => format!("{}/room/{}", base.trim_end_matches('/'), id),
        None => format!("/room/{id}"),
    };

    Ok(RateLimited::new(
        Json(CreateRoomResponse { success: true, room_id: id, invite_link }),
        rl,
    ))
}

#[get("/api/rooms/<id>")]
pub fn get_room(
    rooms: &State<std::sync::Arc<RoomStore>>,
    id: &str,
) -> Result<Json<RoomDescriptor>, Status> {
    let (name, member_count, created_at, settings) = rooms.room_descriptor(id).ok_or(Status::NotFound)?;
    Ok(Json(RoomDescriptor { id: id.to_string(), name, member_count, created_at, settings }))
}

#[derive(rocket::FromForm)]
pub struct UploadForm<'r> {
    file: TempFile<'r>,
}

/// Upload byte cap (`spec.md` §6): 50 MB.
const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

#[post("/api/upload", data = "<form>")]
pub async fn upload(
    config: &State<Config>,
    rate_limiter: &State<RateLimiter>,
    rate_config: &State<RateLimitConfig>,
    ip: ClientIp,
    mut form: Form<UploadForm<'_>>,
) -> Result<Json<UploadResponse>, (Status, Json<serde_json::Value>)> {
    let rl = rate_limiter.check_with_info(
        &format!("upload:{}", ip.0),
        rate_config.uploads_max,
        rate_config.uploads_window_secs,
    );
    if !rl.allowed {
        return Err((
            Status::TooManyRequests,
            Json(serde_json::json!({
                "error": format!("Rate limited: max {} uploads per minute", rate_config.uploads_max),
                "retry_after_secs": rl.retry_after_secs,
            })),
        ));
    }

    let size = form.file.len();
    if size > MAX_UPLOAD_BYTES {
        return Err((Status::PayloadTooLarge, Json(serde_json::json!({"error": "File exceeds 50MB limit"}))));
    }

    let original_name = form.file.raw_name().map(|n| n.dangerous_unsafe_unsanitized_raw().to_string()).unwrap_or_default();
    let mime = form.file.content_type().map(|ct| ct.to_string()).unwrap_or_else(|| "application/octet-stream".to_string());
    let ext = PathBuf::from(&original_name).extension().and_then(|e| e.to_str()).map(|e| format!(".{e}")).unwrap_or_default();
    let stored_name = format!("{}{}", uuid::Uuid::new_v4(), ext);

    std::fs::create_dir_all(&config.uploads_dir)
        .map_err(|e| (Status::InternalServerError, Json(serde_json::json!({"error": e.to_string()}))))?;
    let dest = config.uploads_dir.join(&stored_name);
    form.file
        .copy_to(&dest)
        .await
        .map_err(|e| (Status::InternalServerError, Json(serde_json::json!({"error": e.to_string()}))))?;

    let url = format!("/uploads/{stored_name}");
    Ok(Json(UploadResponse {
        success: true,
        filename: stored_name,
        original_name,
        size,
        mimetype: mime,
        url,
    }))
}

#[get("/uploads/<name>")]
pub async fn download_upload(config: &State<Config>, name: &str) -> Option<NamedFile> {
    NamedFile::open(config.uploads_dir.join(name)).await.ok()
}

/// Keep-Alive Probe endpoint (`spec.md` §4.9): any 200 response keeps the
/// host from treating the server as idle.
#[get("/ping")]
pub fn ping() -> &'static str {
    "pong"
}

#[get("/api/health")]
pub fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

const LANDING_HTML: &str = "<!doctype html><html><head><title>relay</title></head><body><h1>It's running.</h1></body></html>";

#[get("/")]
pub fn landing(config: &State<Config>) -> (ContentType, Vec<u8>) {
    serve_or_fallback(&config.static_dir.join("index.html"), LANDING_HTML)
}

#[get("/room/<_room_id>")]
pub fn room_shell(config: &State<Config>, _room_id: &str) -> (ContentType, Vec<u8>) {
    serve_or_fallback(&config.static_dir.join("index.html"), LANDING_HTML)
}

fn serve_or_fallback(path: &std::path::Path, fallback: &str) -> (ContentType, Vec<u8>) {
    match std::fs::read(path) {
        Ok(bytes) => (ContentType::HTML, bytes),
        Err(_) => (ContentType::HTML, fallback.as_bytes().to_vec()),
    }
}

#[get("/<_path..>", rank = 20)]
pub fn spa_fallback(config: &State<Config>, _path: std::path::PathBuf) -> Option<(ContentType, Vec<u8>)> {
    std::fs::read(config.static_dir.join("index.html")).ok().map(|bytes| (ContentType::HTML, bytes))
}

#[rocket::catch(429)]
pub fn too_many_requests() -> Json<serde_json::Value> {
    Json(serde_json::json!({"error": "Too many requests"}))
}

#[rocket::catch(404)]
pub fn not_found() -> Json<serde_json::Value> {
    Json(serde_json::json!({"error": "Not found"}))
}
