/// Integration tests for the social hub HTTP API
///
/// Every test runs the real route table against a fresh in-memory store.
use actix_web::{http::StatusCode, test, web, App};
use async_trait::async_trait;
use serde_json::{json, Value};
use social_hub_service::{
    handlers::register_routes,
    services::{MediaStore, MediaUpload},
    AppState, Config,
};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Keeps uploads off the filesystem and remembers what it was asked to write
#[derive(Default)]
struct FixedUrlMediaStore {
    written: Mutex<Vec<String>>,
}

#[async_trait]
impl MediaStore for FixedUrlMediaStore {
    async fn store(&self, upload: MediaUpload) -> social_hub_service::Result<String> {
        let name = upload.filename.unwrap_or_else(|| "upload".to_string());
        let url = format!("/images/{}", name);
        self.written.lock().unwrap().push(url.clone());
        Ok(url)
    }

    async fn remove(&self, url: &str) -> social_hub_service::Result<()> {
        self.written.lock().unwrap().retain(|u| u != url);
        Ok(())
    }
}

fn test_state_with_media() -> (web::Data<AppState>, Arc<FixedUrlMediaStore>) {
    let config = Config::for_memory_backend();
    let repos = social_hub_service::repository::Repositories::in_memory();
    let media = Arc::new(FixedUrlMediaStore::default());
    let state = web::Data::new(AppState::with_media(config, repos, media.clone()));
    (state, media)
}

fn test_state() -> web::Data<AppState> {
    test_state_with_media().0
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data($state.clone())
                .route("/health", web::get().to(social_hub_service::handlers::health))
                .configure(register_routes),
        )
        .await
    };
}

macro_rules! call_json {
    ($app:expr, $req:expr) => {{
        let resp = test::call_service(&$app, $req.to_request()).await;
        let status = resp.status();
        let body: Value = test::read_body_json(resp).await;
        (status, body)
    }};
}

macro_rules! register {
    ($app:expr, $username:expr) => {{
        let (status, body) = call_json!(
            $app,
            test::TestRequest::post().uri("/api/register").set_json(json!({
                "username": $username,
                "password": "hunter22",
                "name": format!("{} Display", $username),
            }))
        );
        assert_eq!(status, StatusCode::CREATED, "register {}: {}", $username, body);
        body["user_id"]
            .as_str()
            .and_then(|id| id.parse::<Uuid>().ok())
            .expect("user_id in register response")
    }};
}

const BOUNDARY: &str = "socialhubboundary";

fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((name, filename, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, name, filename, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn multipart_request(uri: &str, body: Vec<u8>) -> test::TestRequest {
    test::TestRequest::post()
        .uri(uri)
        .insert_header((
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        ))
        .set_payload(body)
}

#[actix_web::test]
async fn test_health() {
    let state = test_state();
    let app = app!(state);
    let (status, body) = call_json!(app, test::TestRequest::get().uri("/health"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[actix_web::test]
async fn test_register_and_login() {
    let state = test_state();
    let app = app!(state);
    let alice = register!(app, "alice");

    let (status, body) = call_json!(
        app,
        test::TestRequest::post()
            .uri("/api/login")
            .set_json(json!({ "username": "alice", "password": "hunter22" }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], alice.to_string());
    assert_eq!(body["name"], "alice Display");
    assert!(body.get("password_hash").is_none());

    let (status, body) = call_json!(
        app,
        test::TestRequest::post()
            .uri("/api/login")
            .set_json(json!({ "username": "alice", "password": "wrong" }))
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = call_json!(
        app,
        test::TestRequest::post()
            .uri("/api/login")
            .set_json(json!({ "username": "nobody", "password": "hunter22" }))
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_register_validation_and_conflict() {
    let state = test_state();
    let app = app!(state);

    let (status, body) = call_json!(
        app,
        test::TestRequest::post()
            .uri("/api/register")
            .set_json(json!({ "username": "bob", "password": "" }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "All fields are required");

    register!(app, "bob");
    let (status, _) = call_json!(
        app,
        test::TestRequest::post().uri("/api/register").set_json(json!({
            "username": "bob",
            "password": "other-password",
            "name": "Second Bob",
        }))
    );
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn test_malformed_json_uses_error_shape() {
    let state = test_state();
    let app = app!(state);

    let (status, body) = call_json!(
        app,
        test::TestRequest::post()
            .uri("/api/likes")
            .set_json(json!({ "post_id": "not-a-uuid", "user_id": Uuid::new_v4() }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid request body"));
}

#[actix_web::test]
async fn test_get_unknown_user_is_not_found() {
    let state = test_state();
    let app = app!(state);
    let (status, body) = call_json!(
        app,
        test::TestRequest::get().uri(&format!("/api/users/{}", Uuid::new_v4()))
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found");
}

#[actix_web::test]
async fn test_update_profile_with_avatar() {
    let (state, media) = test_state_with_media();
    let app = app!(state);
    let alice = register!(app, "alice");

    let body = multipart_body(
        &[("user_id", &alice.to_string()), ("name", "Alice A."), ("bio", "   ")],
        Some(("profile_picture", "me.png", "image/png", b"\x89PNG")),
    );
    let (status, body) = call_json!(app, multipart_request("/api/profile", body));
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["message"], "Profile updated");
    assert_eq!(body["user"]["name"], "Alice A.");
    assert_eq!(body["user"]["bio"], Value::Null);
    assert_eq!(body["user"]["profile_picture"], "/images/me.png");
    assert_eq!(*media.written.lock().unwrap(), vec!["/images/me.png"]);

    let (_, fetched) = call_json!(
        app,
        test::TestRequest::get().uri(&format!("/api/users/{}", alice))
    );
    assert_eq!(fetched["profile_picture"], "/images/me.png");
}

#[actix_web::test]
async fn test_update_profile_requires_name() {
    let state = test_state();
    let app = app!(state);
    let alice = register!(app, "alice");

    let body = multipart_body(&[("user_id", &alice.to_string()), ("bio", "hi")], None);
    let (status, body) = call_json!(app, multipart_request("/api/profile", body));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "User ID and name are required");
}

#[actix_web::test]
async fn test_update_profile_unknown_user_writes_no_avatar() {
    let (state, media) = test_state_with_media();
    let app = app!(state);

    let body = multipart_body(
        &[("user_id", &Uuid::new_v4().to_string()), ("name", "Ghost")],
        Some(("profile_picture", "ghost.png", "image/png", b"\x89PNG")),
    );
    let (status, body) = call_json!(app, multipart_request("/api/profile", body));
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found");
    assert!(media.written.lock().unwrap().is_empty());
}

#[actix_web::test]
async fn test_create_post_with_media_and_feed() {
    let state = test_state();
    let app = app!(state);
    let alice = register!(app, "alice");
    let alice_id = alice.to_string();

    let body = multipart_body(
        &[("user_id", &alice_id), ("content", "hello world")],
        Some(("media", "cat.png", "image/png", b"\x89PNG")),
    );
    let (status, created) = call_json!(app, multipart_request("/api/posts", body));
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["post"]["media_url"], "/images/cat.png");
    assert_eq!(created["post"]["privacy"], "public");
    assert_eq!(created["post"]["username"], "alice");

    let (status, feed) = call_json!(
        app,
        test::TestRequest::get().uri(&format!("/api/posts?user_id={}", alice))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feed.as_array().unwrap().len(), 1);
    assert_eq!(feed[0]["content"], "hello world");
}

#[actix_web::test]
async fn test_create_post_requires_content_or_media() {
    let state = test_state();
    let app = app!(state);
    let alice = register!(app, "alice").to_string();

    let body = multipart_body(&[("user_id", &alice), ("content", "   ")], None);
    let (status, body) = call_json!(app, multipart_request("/api/posts", body));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "User ID and either content or media are required"
    );
}

#[actix_web::test]
async fn test_friends_only_post_hidden_from_strangers() {
    let state = test_state();
    let app = app!(state);
    let alice = register!(app, "alice").to_string();
    let carol = register!(app, "carol");

    let body = multipart_body(
        &[("user_id", &alice), ("content", "for friends"), ("privacy", "friends")],
        None,
    );
    let (status, _) = call_json!(app, multipart_request("/api/posts", body));
    assert_eq!(status, StatusCode::CREATED);

    let (_, feed) = call_json!(
        app,
        test::TestRequest::get().uri(&format!("/api/posts?user_id={}", carol))
    );
    assert!(feed.as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn test_double_like_conflicts_and_notifies_once() {
    let state = test_state();
    let app = app!(state);
    let alice = register!(app, "alice");
    let bob = register!(app, "bob");

    let body = multipart_body(&[("user_id", &alice.to_string()), ("content", "like me")], None);
    let (_, created) = call_json!(app, multipart_request("/api/posts", body));
    let post_id = created["post"]["id"].as_str().unwrap().to_string();

    let like = json!({ "post_id": post_id, "user_id": bob });
    let (status, _) = call_json!(
        app,
        test::TestRequest::post().uri("/api/likes").set_json(&like)
    );
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call_json!(
        app,
        test::TestRequest::post().uri("/api/likes").set_json(&like)
    );
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "You have already liked this post");

    let (_, count) = call_json!(
        app,
        test::TestRequest::get().uri(&format!("/api/posts/{}/likes", post_id))
    );
    assert_eq!(count["likes"], 1);

    let (_, inbox) = call_json!(
        app,
        test::TestRequest::get().uri(&format!("/api/notifications?user_id={}", alice))
    );
    let inbox = inbox.as_array().unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0]["kind"], "like");
    assert_eq!(inbox[0]["actor_username"], "bob");
    assert_eq!(inbox[0]["post_id"], post_id.as_str());
}

#[actix_web::test]
async fn test_like_unknown_post() {
    let state = test_state();
    let app = app!(state);
    let bob = register!(app, "bob");

    let (status, body) = call_json!(
        app,
        test::TestRequest::post()
            .uri("/api/likes")
            .set_json(json!({ "post_id": Uuid::new_v4(), "user_id": bob }))
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Post not found");
}

#[actix_web::test]
async fn test_share_records_every_time_and_notifies_once() {
    let state = test_state();
    let app = app!(state);
    let alice = register!(app, "alice");
    let bob = register!(app, "bob");

    let body = multipart_body(&[("user_id", &alice.to_string()), ("content", "share me")], None);
    let (_, created) = call_json!(app, multipart_request("/api/posts", body));
    let post_id = created["post"]["id"].as_str().unwrap().to_string();

    let share = json!({ "post_id": post_id, "user_id": bob });
    let (status, first) = call_json!(
        app,
        test::TestRequest::post().uri("/api/shares").set_json(&share)
    );
    assert_eq!(status, StatusCode::CREATED, "{}", first);
    assert_eq!(first["message"], "Post shared");

    let (status, second) = call_json!(
        app,
        test::TestRequest::post().uri("/api/shares").set_json(&share)
    );
    assert_eq!(status, StatusCode::CREATED);
    assert!(second["share_id"].is_string());
    assert_ne!(first["share_id"], second["share_id"]);

    let (_, inbox) = call_json!(
        app,
        test::TestRequest::get().uri(&format!("/api/notifications?user_id={}", alice))
    );
    let inbox = inbox.as_array().unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0]["kind"], "share");
    assert_eq!(inbox[0]["actor_username"], "bob");
}

#[actix_web::test]
async fn test_share_validation_and_unknown_post() {
    let state = test_state();
    let app = app!(state);
    let bob = register!(app, "bob");

    let (status, body) = call_json!(
        app,
        test::TestRequest::post()
            .uri("/api/shares")
            .set_json(json!({ "post_id": Uuid::new_v4(), "user_id": bob }))
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Post not found");

    let (status, body) = call_json!(
        app,
        test::TestRequest::post()
            .uri("/api/shares")
            .set_json(json!({ "user_id": bob }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Post ID and user ID are required");
}

#[actix_web::test]
async fn test_comments_are_listed_in_order() {
    let state = test_state();
    let app = app!(state);
    let alice = register!(app, "alice");
    let bob = register!(app, "bob");

    let body = multipart_body(&[("user_id", &alice.to_string()), ("content", "discuss")], None);
    let (_, created) = call_json!(app, multipart_request("/api/posts", body));
    let post_id = created["post"]["id"].as_str().unwrap().to_string();

    for text in ["first", "second"] {
        let (status, _) = call_json!(
            app,
            test::TestRequest::post().uri("/api/comments").set_json(json!({
                "post_id": post_id,
                "user_id": bob,
                "content": text,
            }))
        );
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, comments) = call_json!(
        app,
        test::TestRequest::get().uri(&format!("/api/comments?post_id={}", post_id))
    );
    let comments = comments.as_array().unwrap();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0]["content"], "first");
    assert_eq!(comments[1]["username"], "bob");

    // one comment notification per commenter
    let (_, inbox) = call_json!(
        app,
        test::TestRequest::get().uri(&format!("/api/notifications?user_id={}", alice))
    );
    assert_eq!(inbox.as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn test_friend_request_accept_flow() {
    let state = test_state();
    let app = app!(state);
    let alice = register!(app, "alice");
    let bob = register!(app, "bob");

    let (status, sent) = call_json!(
        app,
        test::TestRequest::post()
            .uri("/api/friend_requests")
            .set_json(json!({ "user_id": alice, "friend_id": bob }))
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sent["auto_accepted"], false);

    let (_, pending) = call_json!(
        app,
        test::TestRequest::get().uri(&format!("/api/friend_requests?user_id={}", bob))
    );
    assert_eq!(pending[0]["from_user_id"], alice.to_string());

    // reverse request while one is pending
    let (status, _) = call_json!(
        app,
        test::TestRequest::post()
            .uri("/api/friend_requests")
            .set_json(json!({ "user_id": bob, "friend_id": alice }))
    );
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call_json!(
        app,
        test::TestRequest::post()
            .uri("/api/friend_requests/accept")
            .set_json(json!({ "user_id": bob, "friend_id": alice }))
    );
    assert_eq!(status, StatusCode::OK);

    for (user, other) in [(alice, "bob"), (bob, "alice")] {
        let (_, friends) = call_json!(
            app,
            test::TestRequest::get().uri(&format!("/api/friends?user_id={}", user))
        );
        let friends = friends.as_array().unwrap();
        assert_eq!(friends.len(), 1);
        assert_eq!(friends[0]["username"], other);
    }

    let (status, _) = call_json!(
        app,
        test::TestRequest::post()
            .uri("/api/friend_requests/accept")
            .set_json(json!({ "user_id": bob, "friend_id": alice }))
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_self_friend_request_rejected() {
    let state = test_state();
    let app = app!(state);
    let alice = register!(app, "alice");

    let (status, body) = call_json!(
        app,
        test::TestRequest::post()
            .uri("/api/friend_requests")
            .set_json(json!({ "user_id": alice, "friend_id": alice }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid user or friend ID");
}

#[actix_web::test]
async fn test_reject_friend_request() {
    let state = test_state();
    let app = app!(state);
    let alice = register!(app, "alice");
    let bob = register!(app, "bob");

    let (_, sent) = call_json!(
        app,
        test::TestRequest::post()
            .uri("/api/friend_requests")
            .set_json(json!({ "user_id": alice, "friend_id": bob }))
    );
    let request_id = sent["request_id"].as_str().unwrap().to_string();

    let (status, _) = call_json!(
        app,
        test::TestRequest::delete().uri(&format!("/api/friend_requests/{}", request_id))
    );
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call_json!(
        app,
        test::TestRequest::delete().uri(&format!("/api/friend_requests/{}", request_id))
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Request not found");

    // both users are suggestable again
    let (_, suggestions) = call_json!(
        app,
        test::TestRequest::get().uri(&format!("/api/suggestions?user_id={}", alice))
    );
    assert_eq!(suggestions[0]["username"], "bob");
}

#[actix_web::test]
async fn test_robot_prefix_auto_accepts() {
    let state = test_state();
    let app = app!(state);
    let alice = register!(app, "alice");
    let robot = register!(app, "robotbot");

    let (_, sent) = call_json!(
        app,
        test::TestRequest::post()
            .uri("/api/friend_requests")
            .set_json(json!({ "user_id": alice, "friend_id": robot }))
    );
    assert_eq!(sent["auto_accepted"], true);

    let (_, friends) = call_json!(
        app,
        test::TestRequest::get().uri(&format!("/api/friends?user_id={}", alice))
    );
    assert_eq!(friends[0]["username"], "robotbot");
}

#[actix_web::test]
async fn test_group_invite_requires_admin() {
    let state = test_state();
    let app = app!(state);
    let alice = register!(app, "alice");
    let bob = register!(app, "bob");
    let carol = register!(app, "carol");

    let (status, created) = call_json!(
        app,
        test::TestRequest::post().uri("/api/groups").set_json(json!({
            "name": "Rustaceans",
            "description": "crabs only",
            "user_id": alice,
        }))
    );
    assert_eq!(status, StatusCode::CREATED);
    let group_id = created["group"]["id"].as_str().unwrap().to_string();

    let (status, _) = call_json!(
        app,
        test::TestRequest::post()
            .uri("/api/user_groups")
            .set_json(json!({ "user_id": bob, "group_id": group_id }))
    );
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call_json!(
        app,
        test::TestRequest::post().uri("/api/groups/invite").set_json(json!({
            "user_id": bob,
            "friend_id": carol,
            "group_id": group_id,
        }))
    );
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Only group admins can invite members");

    let (status, _) = call_json!(
        app,
        test::TestRequest::post().uri("/api/groups/invite").set_json(json!({
            "user_id": alice,
            "friend_id": carol,
            "group_id": group_id,
        }))
    );
    assert_eq!(status, StatusCode::CREATED);

    let (_, members) = call_json!(
        app,
        test::TestRequest::get().uri(&format!("/api/groups/{}/members", group_id))
    );
    assert_eq!(members.as_array().unwrap().len(), 3);

    let (_, inbox) = call_json!(
        app,
        test::TestRequest::get().uri(&format!("/api/notifications?user_id={}", carol))
    );
    assert_eq!(inbox[0]["kind"], "group_invite");
    assert_eq!(inbox[0]["group_id"], group_id.as_str());
}

#[actix_web::test]
async fn test_messages_round_trip() {
    let state = test_state();
    let app = app!(state);
    let alice = register!(app, "alice");
    let bob = register!(app, "bob");

    for (from, to, text) in [(alice, bob, "hi bob"), (bob, alice, "hi alice")] {
        let (status, _) = call_json!(
            app,
            test::TestRequest::post().uri("/api/messages").set_json(json!({
                "sender_id": from,
                "receiver_id": to,
                "content": text,
            }))
        );
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, conversation) = call_json!(
        app,
        test::TestRequest::get().uri(&format!(
            "/api/messages?user_id={}&friend_id={}",
            bob, alice
        ))
    );
    let conversation = conversation.as_array().unwrap();
    assert_eq!(conversation.len(), 2);
    assert_eq!(conversation[0]["content"], "hi bob");

    let (status, body) = call_json!(
        app,
        test::TestRequest::post().uri("/api/messages").set_json(json!({
            "sender_id": alice,
            "receiver_id": Uuid::new_v4(),
            "content": "hello?",
        }))
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Receiver not found");
}

#[actix_web::test]
async fn test_missing_user_query_param() {
    let state = test_state();
    let app = app!(state);
    let (status, body) = call_json!(app, test::TestRequest::get().uri("/api/friends"));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "User ID is required");
}

#[actix_web::test]
async fn test_ws_status_reports_presence() {
    let state = test_state();
    let app = app!(state);
    let user_id = Uuid::new_v4();

    let (status, body) = call_json!(
        app,
        test::TestRequest::get().uri(&format!("/api/ws/status/{}", user_id))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["connected"], false);

    let (channel_id, _rx) = state.registry.connect().await;
    state.registry.join(user_id, channel_id).await.unwrap();

    let (_, body) = call_json!(
        app,
        test::TestRequest::get().uri(&format!("/api/ws/status/{}", user_id))
    );
    assert_eq!(body["connected"], true);
    assert_eq!(body["connection_count"], 1);
    assert_eq!(body["channels"], json!([channel_id.to_string()]));

    let (_, metrics) = call_json!(app, test::TestRequest::get().uri("/api/ws/metrics"));
    assert_eq!(metrics["total_channels"], 1);
    assert_eq!(metrics["connected_users"], 1);
}
