use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use forum_gate::{
    build_router,
    clock::ManualClock,
    config::Args,
    error_pages::ErrorPages,
    metrics::POSTING_LATENCY,
    models::{Capability, UserId},
    state::AppState,
};
use std::sync::Arc;
use tower::ServiceExt;

const TOKEN: &str = "test-token";

struct Forum {
    app: Router,
    clock: Arc<ManualClock>,
    state: Arc<AppState>,
    bob: UserId,
    admin: UserId,
    troll: UserId,
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
}

fn forum_with(args: Args, pages: Option<ErrorPages>) -> Forum {
    let clock = Arc::new(ManualClock::new(start()));
    let mut state = AppState::new(&args, clock.clone()).unwrap();
    if let Some(pages) = pages {
        state.error_pages = Arc::new(pages);
    }

    let bob = state.users.create_user("bob", start()).unwrap().id;
    let admin = state.users.create_user("admin", start()).unwrap().id;
    let troll = state.users.create_user("troll", start()).unwrap().id;
    state.acl.grant(admin, Capability::CanOmitFloodProtection);
    state
        .users
        .set_ban(troll, Some("Banned for test!".to_string()))
        .unwrap();

    let state = Arc::new(state);
    Forum {
        app: build_router(state.clone()),
        clock,
        state,
        bob,
        admin,
        troll,
    }
}

fn forum() -> Forum {
    forum_with(Args::default(), None)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_as(user: Option<UserId>, uri: &str, json: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::COOKIE, format!("csrftoken={TOKEN}"))
        .header("x-csrftoken", TOKEN);
    if let Some(id) = user {
        builder = builder.header("x-forum-user", id.to_string());
    }
    builder.body(Body::from(json.to_string())).unwrap()
}

fn new_post(user: UserId, thread: u64, content: &str) -> Request<Body> {
    post_as(
        Some(user),
        &format!("/api/threads/{thread}/posts"),
        serde_json::json!({ "content": content }),
    )
}

fn detail(body: &str) -> String {
    let value: serde_json::Value = serde_json::from_str(body).unwrap();
    value["detail"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn first_post_is_accepted_and_recorded() {
    let forum = forum();

    let (status, _, body) = send(&forum.app, new_post(forum.bob, 1, "Hello world")).await;
    assert_eq!(status, StatusCode::CREATED);

    let post: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(post["content"], "Hello world");
    assert_eq!(post["thread_id"], 1);

    let bob = forum.state.users.get(forum.bob).unwrap();
    assert_eq!(bob.last_posted_on, Some(start()));
}

#[tokio::test]
async fn flood_is_rejected_until_cooldown_passes() {
    let forum = forum();
    send(&forum.app, new_post(forum.bob, 1, "First message")).await;

    forum.clock.advance(TimeDelta::seconds(59));
    let (status, headers, body) = send(&forum.app, new_post(forum.bob, 1, "Second message")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(headers[header::RETRY_AFTER], "1");
    assert_eq!(detail(&body), "You can't post message so quickly after previous one.");
    assert_eq!(
        forum.state.users.get(forum.bob).unwrap().last_posted_on,
        Some(start())
    );

    forum.clock.advance(TimeDelta::seconds(1));
    let (status, _, _) = send(&forum.app, new_post(forum.bob, 1, "Second message")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        forum.state.users.get(forum.bob).unwrap().last_posted_on,
        Some(start() + TimeDelta::seconds(60))
    );
}

#[tokio::test]
async fn exempt_user_can_post_back_to_back() {
    let forum = forum();

    for content in ["Announcement one", "Announcement two"] {
        let (status, _, _) = send(&forum.app, new_post(forum.admin, 1, content)).await;
        assert_eq!(status, StatusCode::CREATED);
    }
    assert_eq!(
        forum.state.users.get(forum.admin).unwrap().last_posted_on,
        Some(start())
    );
}

#[tokio::test]
async fn invalid_message_does_not_start_cooldown() {
    let forum = forum();

    let (status, _, body) = send(&forum.app, new_post(forum.bob, 1, "hi")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(detail(&body).contains("at least 5 characters"));
    assert!(forum.state.users.get(forum.bob).unwrap().last_posted_on.is_none());

    let (status, _, _) = send(&forum.app, new_post(forum.bob, 1, "hi there, all")).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn anonymous_and_unknown_posters_are_refused() {
    let forum = forum();

    let request = post_as(None, "/api/threads/1/posts", serde_json::json!({ "content": "Hello world" }));
    let (status, _, body) = send(&forum.app, request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(detail(&body), "You have to sign in to post.");

    let (status, _, _) = send(&forum.app, new_post(999, 1, "Hello world")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn banned_user_sees_ban_message() {
    let forum = forum();

    let (status, _, body) = send(&forum.app, new_post(forum.troll, 1, "Hello world")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(detail(&body), "Banned for test!");
    assert!(forum.state.users.get(forum.troll).unwrap().last_posted_on.is_none());
}

#[tokio::test]
async fn missing_csrf_token_blocks_request() {
    let forum = forum();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/forum/threads/1")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&forum.app, request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("Request blocked"));
}

#[tokio::test]
async fn wrong_method_returns_405() {
    let args = Args {
        no_csrf: true,
        ..Args::default()
    };
    let forum = forum_with(args, None);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/forum/")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&forum.app, request).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert!(body.contains("Wrong way"));

    let (status, _, body) = send(&forum.app, get("/api/users")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert!(!detail(&body).is_empty());
}

#[tokio::test]
async fn unknown_pages_use_site_or_forum_404() {
    let pages = ErrorPages::new("/forum").with_site_404("<h1>Custom 404</h1>");
    let forum = forum_with(Args::default(), Some(pages));

    let (status, _, body) = send(&forum.app, get("/about")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Custom 404"));

    let (status, _, body) = send(&forum.app, get("/forum/threads/42")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Page not found"));
    assert!(!body.contains("Custom 404"));
}

#[tokio::test]
async fn forum_pages_list_threads_and_posts() {
    let forum = forum();
    send(&forum.app, new_post(forum.bob, 7, "<b>bold</b> claim")).await;
    send(&forum.app, new_post(forum.admin, 7, "Admin reply here")).await;

    let (status, _, body) = send(&forum.app, get("/forum/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Thread #7"));
    assert!(body.contains("2 posts"));

    let (status, _, body) = send(&forum.app, get("/forum/threads/7")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("&lt;b&gt;bold&lt;/b&gt; claim"));
    assert!(body.contains("admin"));

    let (_, _, body) = send(&forum.app, get("/api/threads/7/posts")).await;
    let posts: Vec<serde_json::Value> = serde_json::from_str(&body).unwrap();
    assert_eq!(posts.len(), 2);
}

#[tokio::test]
async fn users_can_register_once() {
    let forum = forum();

    let request = post_as(None, "/api/users", serde_json::json!({ "username": "carol" }));
    let (status, _, body) = send(&forum.app, request).await;
    assert_eq!(status, StatusCode::CREATED);
    let user: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(user["username"], "carol");
    assert!(user["last_posted_on"].is_null());

    let request = post_as(None, "/api/users", serde_json::json!({ "username": "Carol" }));
    let (status, _, body) = send(&forum.app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(detail(&body).contains("already taken"));

    let (status, _, body) = send(&forum.app, get(&format!("/api/users/{}", user["id"]))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("carol"));
}

#[tokio::test]
async fn health_and_metrics_respond() {
    let forum = forum();
    send(&forum.app, new_post(forum.bob, 1, "Hello world")).await;

    let (status, _, body) = send(&forum.app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("healthy"));

    let (status, _, body) = send(&forum.app, get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("forum_posts_accepted_total"));
}

#[tokio::test]
async fn rejected_posts_are_timed() {
    let forum = forum();
    send(&forum.app, new_post(forum.bob, 1, "First message")).await;

    let before = POSTING_LATENCY.get_sample_count();
    let (status, _, _) = send(&forum.app, new_post(forum.bob, 1, "Too soon")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(POSTING_LATENCY.get_sample_count() > before);
}
