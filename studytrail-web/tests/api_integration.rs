//! Integration tests for the studytrail HTTP API
//!
//! Drives the full router (session middleware included) against a fresh
//! SQLite database in a temp directory. The AI client is constructed
//! without an API key, so AI endpoints fail fast without touching the
//! network; their validation paths are still exercised.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use studytrail_web::services::llm_client::{LlmClient, LlmConfig};
use studytrail_web::{build_router, AppState};
use tempfile::TempDir;
use tower::ServiceExt;

/// Test server: router plus the temp dir keeping the database alive
struct TestServer {
    app: axum::Router,
    _root: TempDir,
}

async fn setup_test_server() -> TestServer {
    let root = TempDir::new().expect("temp root folder");
    studytrail_common::config::ensure_root_folder(root.path()).unwrap();

    let db_path = studytrail_common::config::database_path(root.path());
    let pool = studytrail_common::db::init_database(&db_path)
        .await
        .expect("database init");

    // No API key: AI endpoints report not-configured instead of calling out
    let llm = LlmClient::new(
        LlmConfig {
            base_url: "http://127.0.0.1:9/unreachable".to_string(),
            model: "test-model".to_string(),
            max_tokens: 64,
            request_timeout_ms: 1000,
            rate_limit_ms: 0,
        },
        None,
    )
    .unwrap();

    let state = AppState::new(pool, root.path().to_path_buf(), Arc::new(llm), 1024 * 1024);

    TestServer {
        app: build_router(state),
        _root: root,
    }
}

/// Make a JSON request; returns status, parsed body, and any Set-Cookie value
async fn make_request(
    app: &axum::Router,
    method: Method,
    path: &str,
    body: Option<Value>,
    cookie: Option<&str>,
) -> (StatusCode, Option<Value>, Option<String>) {
    let mut request = Request::builder().method(method).uri(path);

    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }

    let request = if let Some(json_body) = body {
        request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json_body.to_string()))
            .unwrap()
    } else {
        request.body(Body::empty()).unwrap()
    };

    let response = app.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json_body = if bytes.is_empty() {
        None
    } else {
        serde_json::from_slice(&bytes).ok()
    };

    (status, json_body, set_cookie)
}

/// Register a user and return the session cookie pair ("name=token")
async fn register(app: &axum::Router, email: &str) -> String {
    let (status, _, set_cookie) = make_request(
        app,
        Method::POST,
        "/api/auth/register",
        Some(json!({
            "email": email,
            "password": "correct horse battery",
            "display_name": "Test User",
        })),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK, "registration failed");

    let set_cookie = set_cookie.expect("registration sets a session cookie");
    set_cookie
        .split(';')
        .next()
        .expect("cookie pair")
        .to_string()
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = setup_test_server().await;

    let (status, body, _) = make_request(&server.app, Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "studytrail-web");
}

#[tokio::test]
async fn test_protected_routes_require_session() {
    let server = setup_test_server().await;

    let (status, _, _) = make_request(&server.app, Method::GET, "/api/subjects", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = make_request(
        &server.app,
        Method::GET,
        "/api/subjects",
        None,
        Some("studytrail_session=bogus-token"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_login_me_logout() {
    let server = setup_test_server().await;

    let cookie = register(&server.app, "ada@example.com").await;

    let (status, body, _) = make_request(
        &server.app,
        Method::GET,
        "/api/auth/me",
        None,
        Some(&cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["user"]["email"], "ada@example.com");

    // Duplicate registration is rejected
    let (status, _, _) = make_request(
        &server.app,
        Method::POST,
        "/api/auth/register",
        Some(json!({ "email": "ada@example.com", "password": "correct horse battery" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Wrong password is rejected
    let (status, _, _) = make_request(
        &server.app,
        Method::POST,
        "/api/auth/login",
        Some(json!({ "email": "ada@example.com", "password": "wrong password!" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Correct login issues a fresh session
    let (status, _, set_cookie) = make_request(
        &server.app,
        Method::POST,
        "/api/auth/login",
        Some(json!({ "email": "ada@example.com", "password": "correct horse battery" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(set_cookie.unwrap().starts_with("studytrail_session="));

    // Logout invalidates the session
    let (status, _, _) = make_request(
        &server.app,
        Method::POST,
        "/api/auth/logout",
        None,
        Some(&cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = make_request(
        &server.app,
        Method::GET,
        "/api/auth/me",
        None,
        Some(&cookie),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_validation() {
    let server = setup_test_server().await;

    let (status, _, _) = make_request(
        &server.app,
        Method::POST,
        "/api/auth/register",
        Some(json!({ "email": "not-an-email", "password": "long enough pass" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = make_request(
        &server.app,
        Method::POST,
        "/api/auth/register",
        Some(json!({ "email": "ok@example.com", "password": "short" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_subject_crud_and_slug_uniqueness() {
    let server = setup_test_server().await;
    let cookie = register(&server.app, "ada@example.com").await;

    let (status, body, _) = make_request(
        &server.app,
        Method::POST,
        "/api/subjects",
        Some(json!({ "title": "Linear Algebra", "description": "Vectors and matrices" })),
        Some(&cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let first = body.unwrap();
    assert_eq!(first["slug"], "linear-algebra");

    // Same title gets a suffixed slug
    let (status, body, _) = make_request(
        &server.app,
        Method::POST,
        "/api/subjects",
        Some(json!({ "title": "Linear Algebra" })),
        Some(&cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["slug"], "linear-algebra-1");

    let (status, body, _) = make_request(
        &server.app,
        Method::GET,
        "/api/subjects",
        None,
        Some(&cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap().as_array().unwrap().len(), 2);

    let subject_id = first["guid"].as_str().unwrap().to_string();

    let (status, body, _) = make_request(
        &server.app,
        Method::GET,
        &format!("/api/subjects/{}", subject_id),
        None,
        Some(&cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let detail = body.unwrap();
    assert_eq!(detail["title"], "Linear Algebra");
    assert_eq!(detail["chapters"].as_array().unwrap().len(), 0);

    let (status, _, _) = make_request(
        &server.app,
        Method::DELETE,
        &format!("/api/subjects/{}", subject_id),
        None,
        Some(&cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = make_request(
        &server.app,
        Method::GET,
        &format!("/api/subjects/{}", subject_id),
        None,
        Some(&cookie),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_other_users_rows_are_invisible() {
    let server = setup_test_server().await;
    let ada = register(&server.app, "ada@example.com").await;
    let bob = register(&server.app, "bob@example.com").await;

    let (_, body, _) = make_request(
        &server.app,
        Method::POST,
        "/api/subjects",
        Some(json!({ "title": "Private Notes" })),
        Some(&ada),
    )
    .await;
    let subject_id = body.unwrap()["guid"].as_str().unwrap().to_string();

    let (status, _, _) = make_request(
        &server.app,
        Method::GET,
        &format!("/api/subjects/{}", subject_id),
        None,
        Some(&bob),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = make_request(
        &server.app,
        Method::DELETE,
        &format!("/api/subjects/{}", subject_id),
        None,
        Some(&bob),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_chapter_and_task_flow() {
    let server = setup_test_server().await;
    let cookie = register(&server.app, "ada@example.com").await;

    let (_, body, _) = make_request(
        &server.app,
        Method::POST,
        "/api/subjects",
        Some(json!({ "title": "Calculus" })),
        Some(&cookie),
    )
    .await;
    let subject_id = body.unwrap()["guid"].as_str().unwrap().to_string();

    let (status, body, _) = make_request(
        &server.app,
        Method::POST,
        "/api/chapters",
        Some(json!({ "subject_id": subject_id, "title": "Limits" })),
        Some(&cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let chapter = body.unwrap();
    assert_eq!(chapter["slug"], "limits");
    let chapter_id = chapter["guid"].as_str().unwrap().to_string();

    let (status, body, _) = make_request(
        &server.app,
        Method::POST,
        "/api/tasks",
        Some(json!({ "chapter_id": chapter_id, "description": "Read section 2.1" })),
        Some(&cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let task_id = body.unwrap()["guid"].as_str().unwrap().to_string();

    let (status, body, _) = make_request(
        &server.app,
        Method::POST,
        &format!("/api/tasks/{}/toggle", task_id),
        None,
        Some(&cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["is_completed"], true);

    let (status, body, _) = make_request(
        &server.app,
        Method::POST,
        &format!("/api/chapters/{}/complete", chapter_id),
        None,
        Some(&cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["is_completed"], true);

    let (status, body, _) = make_request(
        &server.app,
        Method::GET,
        &format!("/api/chapters/{}", chapter_id),
        None,
        Some(&cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let detail = body.unwrap();
    assert_eq!(detail["subject_title"], "Calculus");
    assert_eq!(detail["is_completed"], true);
    assert_eq!(detail["tasks"].as_array().unwrap().len(), 1);
    assert_eq!(detail["tasks"][0]["is_completed"], true);

    // Deleting the chapter cascades away its tasks
    let (status, body, _) = make_request(
        &server.app,
        Method::DELETE,
        &format!("/api/chapters/{}", chapter_id),
        None,
        Some(&cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["subject_id"], subject_id.as_str());

    let (status, _, _) = make_request(
        &server.app,
        Method::POST,
        &format!("/api/tasks/{}/toggle", task_id),
        None,
        Some(&cookie),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_checkin_streak_lifecycle() {
    let server = setup_test_server().await;
    let cookie = register(&server.app, "ada@example.com").await;

    let (status, body, _) = make_request(
        &server.app,
        Method::POST,
        "/api/study/checkin",
        None,
        Some(&cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["message"], "Streak started");

    let (_, body, _) = make_request(
        &server.app,
        Method::POST,
        "/api/study/checkin",
        None,
        Some(&cookie),
    )
    .await;
    assert_eq!(body.unwrap()["message"], "Already checked in today");

    let (status, body, _) = make_request(
        &server.app,
        Method::GET,
        "/api/study/streak",
        None,
        Some(&cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["current_streak"], 1);
}

#[tokio::test]
async fn test_study_session_and_progress() {
    let server = setup_test_server().await;
    let cookie = register(&server.app, "ada@example.com").await;

    let (_, body, _) = make_request(
        &server.app,
        Method::POST,
        "/api/subjects",
        Some(json!({ "title": "Calculus" })),
        Some(&cookie),
    )
    .await;
    let subject_id = body.unwrap()["guid"].as_str().unwrap().to_string();

    let (_, body, _) = make_request(
        &server.app,
        Method::POST,
        "/api/chapters",
        Some(json!({ "subject_id": subject_id, "title": "Limits" })),
        Some(&cookie),
    )
    .await;
    let chapter_id = body.unwrap()["guid"].as_str().unwrap().to_string();

    // Rejects nonsense durations
    let (status, _, _) = make_request(
        &server.app,
        Method::POST,
        "/api/study/session",
        Some(json!({ "chapter_id": chapter_id, "duration": 0 })),
        Some(&cookie),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body, _) = make_request(
        &server.app,
        Method::POST,
        "/api/study/session",
        Some(json!({ "chapter_id": chapter_id, "duration": 25 })),
        Some(&cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["session"]["duration_minutes"], 25);

    let (status, body, _) = make_request(
        &server.app,
        Method::GET,
        "/api/study/progress",
        None,
        Some(&cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let progress = body.unwrap();
    assert_eq!(progress["total_subjects"], 1);
    assert_eq!(progress["total_chapters"], 1);
    assert_eq!(progress["total_study_minutes"], 25);
    assert_eq!(progress["current_streak"], 1);
    assert_eq!(progress["subjects"][0]["chapter_count"], 1);
}

#[tokio::test]
async fn test_ai_endpoints_without_api_key() {
    let server = setup_test_server().await;
    let cookie = register(&server.app, "ada@example.com").await;

    let (_, body, _) = make_request(
        &server.app,
        Method::POST,
        "/api/subjects",
        Some(json!({ "title": "Calculus" })),
        Some(&cookie),
    )
    .await;
    let subject_id = body.unwrap()["guid"].as_str().unwrap().to_string();

    let (_, body, _) = make_request(
        &server.app,
        Method::POST,
        "/api/chapters",
        Some(json!({ "subject_id": subject_id, "title": "Limits" })),
        Some(&cookie),
    )
    .await;
    let chapter_id = body.unwrap()["guid"].as_str().unwrap().to_string();

    // Intuition generation needs the key
    let (status, body, _) = make_request(
        &server.app,
        Method::POST,
        "/api/ai/intuition",
        Some(json!({ "chapter_id": chapter_id })),
        Some(&cookie),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.unwrap()["error"]
        .as_str()
        .unwrap()
        .contains("API key"));

    // Overview generation degrades to the deterministic fallback
    let (status, body, _) = make_request(
        &server.app,
        Method::POST,
        "/api/ai/subject-overview",
        Some(json!({ "subject_id": subject_id })),
        Some(&cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let overview = body.unwrap()["overview"].as_str().unwrap().to_string();
    assert!(overview.contains("Calculus"));
    assert!(overview.contains("1 chapter"));

    // The stored fallback is now retrievable and fresh
    let (status, body, _) = make_request(
        &server.app,
        Method::GET,
        &format!("/api/ai/subject-overview?subject_id={}", subject_id),
        None,
        Some(&cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let stored = body.unwrap();
    assert_eq!(stored["overview"].as_str().unwrap(), overview);
    assert_eq!(stored["needs_regeneration"], false);

    // Transitions: too few tasks is a 400 before any network call
    let (status, _, _) = make_request(
        &server.app,
        Method::POST,
        "/api/ai/transitions",
        Some(json!({ "chapter_id": chapter_id, "tasks": ["only one"] })),
        Some(&cookie),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Nothing saved yet
    let (status, body, _) = make_request(
        &server.app,
        Method::GET,
        &format!("/api/ai/transitions?chapter_id={}", chapter_id),
        None,
        Some(&cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let stored = body.unwrap();
    assert_eq!(stored["saved"], false);
    assert_eq!(stored["transitions"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_admin_stats_requires_flag() {
    let server = setup_test_server().await;
    let cookie = register(&server.app, "ada@example.com").await;

    let (status, _, _) = make_request(
        &server.app,
        Method::GET,
        "/api/admin/stats",
        None,
        Some(&cookie),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_resource_upload_and_delete() {
    let server = setup_test_server().await;
    let cookie = register(&server.app, "ada@example.com").await;

    let (_, body, _) = make_request(
        &server.app,
        Method::POST,
        "/api/subjects",
        Some(json!({ "title": "Calculus" })),
        Some(&cookie),
    )
    .await;
    let subject_id = body.unwrap()["guid"].as_str().unwrap().to_string();

    let (_, body, _) = make_request(
        &server.app,
        Method::POST,
        "/api/chapters",
        Some(json!({ "subject_id": subject_id, "title": "Limits" })),
        Some(&cookie),
    )
    .await;
    let chapter_id = body.unwrap()["guid"].as_str().unwrap().to_string();

    // Hand-rolled multipart body
    let boundary = "studytrail-test-boundary";
    let multipart_body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nLecture notes\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"chapter_id\"\r\n\r\n{chapter}\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"week 1 notes.pdf\"\r\n\
         Content-Type: application/pdf\r\n\r\n%PDF-1.4 fake content\r\n\
         --{b}--\r\n",
        b = boundary,
        chapter = chapter_id,
    );

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/resources/upload")
        .header(header::COOKIE, cookie.as_str())
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(multipart_body))
        .unwrap();

    let response = server.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    let resource = &body["resource"];
    let url = resource["url"].as_str().unwrap();
    assert!(url.starts_with("/uploads/"));
    assert!(url.ends_with("week_1_notes.pdf"));

    // The chapter detail now lists the resource
    let (_, body, _) = make_request(
        &server.app,
        Method::GET,
        &format!("/api/chapters/{}", chapter_id),
        None,
        Some(&cookie),
    )
    .await;
    assert_eq!(body.unwrap()["resources"].as_array().unwrap().len(), 1);

    let resource_id = resource["guid"].as_str().unwrap();
    let (status, _, _) = make_request(
        &server.app,
        Method::DELETE,
        &format!("/api/resources/{}", resource_id),
        None,
        Some(&cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body, _) = make_request(
        &server.app,
        Method::GET,
        &format!("/api/chapters/{}", chapter_id),
        None,
        Some(&cookie),
    )
    .await;
    assert_eq!(body.unwrap()["resources"].as_array().unwrap().len(), 0);
}
