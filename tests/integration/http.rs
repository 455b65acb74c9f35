use crate::common::{test_client, test_client_with_rate_limits};
use ghostwire_relay::rate_limit::RateLimitConfig;
use rocket::http::{ContentType, Status};

#[test]
fn test_health() {
    let client = test_client();
    let res = client.get("/api/health").dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "ghostwire-relay");
}

#[test]
fn test_ping() {
    let client = test_client();
    let res = client.get("/ping").dispatch();
    assert_eq!(res.status(), Status::Ok);
    assert_eq!(res.into_string().unwrap(), "pong");
}

#[test]
fn test_create_room() {
    let client = test_client();
    let res = client
        .post("/api/rooms")
        .header(ContentType::JSON)
        .body(r#"{"name": "test-room", "creatorName": "nanook"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["success"], true);
    assert!(!body["roomId"].as_str().unwrap().is_empty());
    assert!(body["inviteLink"].as_str().unwrap().contains(body["roomId"].as_str().unwrap()));
}

#[test]
fn test_create_room_empty_name() {
    let client = test_client();
    let res = client
        .post("/api/rooms")
        .header(ContentType::JSON)
        .body(r#"{"name": "", "creatorName": "nanook"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::BadRequest);
}

#[test]
fn test_create_room_empty_creator_name() {
    let client = test_client();
    let res = client
        .post("/api/rooms")
        .header(ContentType::JSON)
        .body(r#"{"name": "room", "creatorName": ""}"#)
        .dispatch();
    assert_eq!(res.status(), Status::BadRequest);
}

#[test]
fn test_get_room() {
    let client = test_client();
    let res = client
        .post("/api/rooms")
        .header(ContentType::JSON)
        .body(r#"{"name": "get-test", "creatorName": "nanook"}"#)
        .dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    let id = body["roomId"].as_str().unwrap();

    let res = client.get(format!("/api/rooms/{id}")).dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["name"], "get-test");
    assert_eq!(body["memberCount"], 0);
}

#[test]
fn test_get_room_not_found() {
    let client = test_client();
    let res = client.get("/api/rooms/nonexistent-id").dispatch();
    assert_eq!(res.status(), Status::NotFound);
}

#[test]
fn test_create_room_rate_limited() {
    let client = test_client_with_rate_limits(RateLimitConfig {
        rooms_max: 1,
        rooms_window_secs: 3600,
        uploads_max: 10,
        uploads_window_secs: 60,
    });

    let res = client
        .post("/api/rooms")
        .header(ContentType::JSON)
        .body(r#"{"name": "first", "creatorName": "nanook"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::Ok);

    let res = client
        .post("/api/rooms")
        .header(ContentType::JSON)
        .body(r#"{"name": "second", "creatorName": "nanook"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::TooManyRequests);
}

#[test]
fn test_not_found_catcher() {
    let client = test_client();
    let res = client.get("/api/rooms/a/b/c/does-not-exist").dispatch();
    assert_eq!(res.status(), Status::NotFound);
}
