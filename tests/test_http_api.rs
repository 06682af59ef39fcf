//! HTTP API tests — drive the router in-process with `tower::ServiceExt::oneshot`.

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use voxdesk::briefing::Briefings;
use voxdesk::image::ImageProvider;
use voxdesk::image::dummy::{DummyImages, PIXEL_PNG_BASE64};
use voxdesk::llm::providers::dummy::DummyProvider;
use voxdesk::llm::{GenerationChain, LlmProvider};
use voxdesk::prefs::PreferenceStore;
use voxdesk::search::dummy::DummySearch;
use voxdesk::search::{SearchChain, SearchProvider, SearchResult};
use voxdesk::server::build_router;
use voxdesk::services::Services;
use voxdesk::social::SocialProvider;
use voxdesk::social::dummy::{DummySocial, SocialCall};

const PIXEL_URI: &str = "data:image/png;base64,iVBORw0KGgo=";

struct App {
    router: Router,
    social: DummySocial,
    _dir: TempDir,
}

fn app_with(llm: DummyProvider, social: DummySocial) -> App {
    let dir = TempDir::new().unwrap();
    let hit = SearchResult::new("Rust 2024", "Edition released", "https://blog.example/rust");
    let search = DummySearch::new("s").web_results(vec![hit.clone()]).news_results(vec![hit]);
    let services = Services {
        briefings: Briefings::new(
            SearchChain::new(vec![SearchProvider::Dummy(search)]),
            GenerationChain::new(vec![LlmProvider::Dummy(llm)]),
            dir.path().join("prompts"),
        ),
        images: ImageProvider::Dummy(DummyImages::new()),
        social: SocialProvider::Dummy(social.clone()),
        prefs: PreferenceStore::open(&dir.path().join("prefs.db")).unwrap(),
        max_post_chars: 280,
    };
    App { router: build_router("test-desk", services), social, _dir: dir }
}

fn app() -> App {
    app_with(DummyProvider::echo(), DummySocial::new("https://x.com/i/web/status"))
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, bytes) = send_raw(router, method, uri, body.map(|b| b.to_string())).await;
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn send_raw(router: &Router, method: &str, uri: &str, body: Option<String>) -> (StatusCode, Vec<u8>) {
    let mut req = Request::builder().method(method).uri(uri);
    if body.is_some() {
        req = req.header(header::CONTENT_TYPE, "application/json");
    }
    let req = req.body(body.map(Body::from).unwrap_or_else(Body::empty)).unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

// ── /post ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn post_returns_id_and_permalink() {
    let app = app();
    let (status, body) = send(&app.router, "POST", "/post", Some(json!({"content": "hello world"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let id = body["data"]["id"].as_str().unwrap();
    assert_eq!(body["data"]["permalink"], format!("https://x.com/i/web/status/{id}"));
}

#[tokio::test]
async fn post_with_image_uploads_then_posts() {
    let app = app();
    let (status, _) =
        send(&app.router, "POST", "/post", Some(json!({"content": "look", "image": PIXEL_URI}))).await;
    assert_eq!(status, StatusCode::OK);
    let calls = app.social.calls();
    assert!(matches!(calls[0], SocialCall::Upload { .. }));
    assert_eq!(calls[1], SocialCall::Post { text: "look".into(), media_id: Some("media-1".into()) });
}

#[tokio::test]
async fn post_requires_content() {
    let app = app();
    for body in [json!({}), json!({"content": "   "})] {
        let (status, resp) = send(&app.router, "POST", "/post", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp, json!({"success": false, "error": "Content is required"}));
    }
    assert!(app.social.calls().is_empty());
}

#[tokio::test]
async fn post_malformed_json_is_bad_request() {
    let app = app();
    let (status, bytes) = send_raw(&app.router, "POST", "/post", Some("{not json".into())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn post_invalid_image_is_bad_request() {
    let app = app();
    let (status, body) =
        send(&app.router, "POST", "/post", Some(json!({"content": "x", "image": "data:image/png;base64,@@@"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(app.social.calls().is_empty());
}

#[tokio::test]
async fn post_vendor_rejection_carries_details() {
    let social = DummySocial::new("https://x.com/i/web/status")
        .post_fails(403, json!({"detail": "You are not allowed to create a Tweet with duplicate content."}));
    let app = app_with(DummyProvider::echo(), social);
    let (status, body) = send(&app.router, "POST", "/post", Some(json!({"content": "again"}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("duplicate content"));
    assert_eq!(body["details"]["detail"], "You are not allowed to create a Tweet with duplicate content.");
}

#[tokio::test]
async fn post_upload_failure_is_server_error() {
    let app = app_with(DummyProvider::echo(), DummySocial::new("https://x.com/i/web/status").upload_fails("boom"));
    let (status, body) =
        send(&app.router, "POST", "/post", Some(json!({"content": "look", "image": PIXEL_URI}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.get("details").is_none());
    assert_eq!(app.social.calls().len(), 1);
}

// ── /api ──────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_providers() {
    let app = app();
    let (status, body) = send(&app.router, "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["name"], "test-desk");
    assert_eq!(body["providers"], json!({"search": true, "generation": true, "image": true, "social": true}));
}

#[tokio::test]
async fn command_fetches_bucket_content() {
    let app = app();
    let (status, body) = send(&app.router, "POST", "/api/command", Some(json!({"transcript": "latest news"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["intent"], "news");
    assert_eq!(body["bucket"], "news");
    assert!(body["content"].as_str().unwrap().starts_with("[echo] "));
}

#[tokio::test]
async fn command_post_intent_has_no_content() {
    let app = app();
    let (status, body) =
        send(&app.router, "POST", "/api/command", Some(json!({"transcript": "post it to twitter"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"intent": "post_to_social"}));
    assert!(app.social.calls().is_empty());
}

#[tokio::test]
async fn briefing_buckets() {
    let app = app();
    let (status, body) = send(&app.router, "GET", "/api/briefing/papers", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bucket"], "papers");

    let (status, _) = send(&app.router, "GET", "/api/briefing/search", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app.router, "GET", "/api/briefing/weather", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn search_returns_raw_results() {
    let app = app();
    let (status, body) = send(&app.router, "POST", "/api/search", Some(json!({"query": "rust"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"][0]["link"], "https://blog.example/rust");

    let (status, _) = send(&app.router, "POST", "/api/search", Some(json!({"query": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn generate_maps_provider_errors() {
    let app = app();
    let (status, body) = send(&app.router, "POST", "/api/generate", Some(json!({"prompt": "hi"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "[echo] hi");

    let (status, _) = send(&app.router, "POST", "/api/generate", Some(json!({"prompt": " "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let unconfigured = app_with(DummyProvider::echo().unconfigured(), DummySocial::new("https://x.com/i/web/status"));
    let (status, body) = send(&unconfigured.router, "POST", "/api/generate", Some(json!({"prompt": "hi"}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "not_configured");

    let failing = app_with(DummyProvider::echo().failing("quota"), DummySocial::new("https://x.com/i/web/status"));
    let (status, _) = send(&failing.router, "POST", "/api/generate", Some(json!({"prompt": "hi"}))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn generate_stream_emits_sse_events() {
    let app = app_with(DummyProvider::echo().chunks(["Hel", "lo"]), DummySocial::new("https://x.com/i/web/status"));
    let req = Request::builder()
        .method("POST")
        .uri("/api/generate/stream")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"prompt": "hi"}).to_string()))
        .unwrap();
    let resp = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/event-stream");

    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    let hel = text.find("data: Hel\n\n").unwrap();
    let lo = text.find("data: lo\n\n").unwrap();
    let done = text.find("event: done\ndata: [DONE]\n\n").unwrap();
    assert!(hel < lo && lo < done);
}

#[tokio::test]
async fn generate_stream_degrades_to_apology() {
    let app = app_with(DummyProvider::echo().failing("down"), DummySocial::new("https://x.com/i/web/status"));
    let (status, bytes) =
        send_raw(&app.router, "POST", "/api/generate/stream", Some(json!({"prompt": "hi"}).to_string())).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.contains(voxdesk::llm::STREAM_UNAVAILABLE_MSG));
}

#[tokio::test]
async fn image_returns_base64() {
    let app = app();
    let (status, body) = send(&app.router, "POST", "/api/image", Some(json!({"prompt": "a robot"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"base64": PIXEL_PNG_BASE64}));
}

#[tokio::test]
async fn analyze_uses_default_prompt() {
    let app = app();
    let (status, body) = send(&app.router, "POST", "/api/analyze", Some(json!({"image": PIXEL_URI}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "[echo] Describe this image in detail. (image/png)");

    let (status, _) = send(&app.router, "POST", "/api/analyze", Some(json!({"image": "data:image/png;base64,!!"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn preferences_round_trip() {
    let app = app();
    let (status, _) = send(&app.router, "GET", "/api/preferences/alice", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) =
        send(&app.router, "PUT", "/api/preferences/alice", Some(json!({"preferences": ["not", "an", "object"]}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let prefs = json!({"voice": "calm", "topics": ["ai", "robotics"]});
    let (status, saved) =
        send(&app.router, "PUT", "/api/preferences/alice", Some(json!({"preferences": prefs.clone()}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["user_id"], "alice");
    assert_eq!(saved["preferences"], prefs);

    let (status, fetched) = send(&app.router, "GET", "/api/preferences/alice", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, saved);
}
