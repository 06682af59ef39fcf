//! Axum handlers.
//!
//! `/post` answers with the `{success, data | error}` envelope; the
//! `/api/*` routes return plain JSON bodies and `{error, message}` on failure.

use std::convert::Infallible;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, Sse},
    },
};
use futures::{StreamExt, stream};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info, warn};

use crate::briefing::Bucket;
use crate::intent::{self, Intent};
use crate::media::InlineImage;
use crate::provider::ProviderError;

use super::AppState;

const DEFAULT_ANALYZE_PROMPT: &str = "Describe this image in detail.";

// ── Request types ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct PostRequest {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    image: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct CommandRequest {
    transcript: String,
}

#[derive(Deserialize)]
pub(super) struct QueryRequest {
    query: String,
}

#[derive(Deserialize)]
pub(super) struct PromptRequest {
    prompt: String,
}

#[derive(Deserialize)]
pub(super) struct AnalyzeRequest {
    image: String,
    #[serde(default)]
    prompt: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct PreferencesRequest {
    preferences: Value,
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Build a JSON error response body.
fn json_error(code: &str, msg: impl std::fmt::Display) -> Json<Value> {
    Json(json!({ "error": code, "message": format!("{msg}") }))
}

fn bad_request(msg: impl std::fmt::Display) -> Response {
    (StatusCode::BAD_REQUEST, json_error("bad_request", msg)).into_response()
}

/// Map a provider failure onto an HTTP status.
fn provider_failure(e: ProviderError) -> Response {
    let (status, code) = match &e {
        ProviderError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
        ProviderError::Configuration(_) => (StatusCode::SERVICE_UNAVAILABLE, "not_configured"),
        _ => (StatusCode::BAD_GATEWAY, "provider"),
    };
    warn!(%status, error = %e, "provider call failed");
    (status, json_error(code, e)).into_response()
}

fn blank(s: &str) -> bool {
    s.trim().is_empty()
}

// ── /post ─────────────────────────────────────────────────────────────────────

/// POST /post
pub(super) async fn post_to_social(
    State(state): State<AppState>,
    body: Result<Json<PostRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, Json(json!({ "success": false, "error": e.body_text() })))
                .into_response();
        }
    };
    let Some(content) = req.content.filter(|c| !blank(c)) else {
        return (StatusCode::BAD_REQUEST, Json(json!({ "success": false, "error": "Content is required" })))
            .into_response();
    };

    match state.services.social.post(&content, req.image.as_deref()).await {
        Ok(receipt) => {
            info!(channel_id = %state.channel_id, id = %receipt.id, "posted via http");
            (StatusCode::OK, Json(json!({ "success": true, "data": receipt }))).into_response()
        }
        Err(ProviderError::Validation(msg)) => {
            (StatusCode::BAD_REQUEST, Json(json!({ "success": false, "error": msg }))).into_response()
        }
        Err(e) => {
            error!(channel_id = %state.channel_id, error = %e, "post failed");
            let mut body = json!({ "success": false, "error": e.to_string() });
            if let Some(details) = e.payload() {
                body["details"] = details.clone();
            }
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

// ── /api ──────────────────────────────────────────────────────────────────────

/// GET /api/health
pub(super) async fn health(State(state): State<AppState>) -> Response {
    let body = json!({
        "status": "ok",
        "name": &*state.name,
        "providers": state.services.status(),
    });
    (StatusCode::OK, Json(body)).into_response()
}

/// POST /api/command: route a transcript and run its fetch, if any.
pub(super) async fn command(State(state): State<AppState>, Json(req): Json<CommandRequest>) -> Response {
    let intent = intent::classify(&req.transcript);
    let bucket = match intent {
        Intent::News => Bucket::News,
        Intent::Papers => Bucket::Papers,
        Intent::Trends => Bucket::Trends,
        Intent::Search => Bucket::Search,
        // Posting and illustrating act on session content, which lives only
        // in the console channel.
        Intent::PostToSocial | Intent::GenerateImage => {
            return (StatusCode::OK, Json(json!({ "intent": intent }))).into_response();
        }
    };

    match state.services.briefings.fetch(bucket, &req.transcript).await {
        Ok(content) => {
            (StatusCode::OK, Json(json!({ "intent": intent, "bucket": bucket, "content": content })))
                .into_response()
        }
        Err(e) => provider_failure(e),
    }
}

/// GET /api/briefing/{bucket}
pub(super) async fn briefing(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let bucket = match Bucket::from_name(&name) {
        Some(Bucket::Search) => return bad_request("the search bucket needs a query; use POST /api/search"),
        Some(b) => b,
        None => return (StatusCode::NOT_FOUND, json_error("not_found", format!("unknown bucket: {name}"))).into_response(),
    };
    match state.services.briefings.fetch(bucket, "").await {
        Ok(content) => (StatusCode::OK, Json(json!({ "bucket": bucket, "content": content }))).into_response(),
        Err(e) => provider_failure(e),
    }
}

/// POST /api/search: raw search results, no generation.
pub(super) async fn search(State(state): State<AppState>, Json(req): Json<QueryRequest>) -> Response {
    if blank(&req.query) {
        return bad_request("query is required");
    }
    match state.services.briefings.search_chain().search(&req.query).await {
        Ok(results) => (StatusCode::OK, Json(json!({ "results": results }))).into_response(),
        Err(e) => provider_failure(e),
    }
}

/// POST /api/generate
pub(super) async fn generate(State(state): State<AppState>, Json(req): Json<PromptRequest>) -> Response {
    if blank(&req.prompt) {
        return bad_request("prompt is required");
    }
    match state.services.briefings.generation_chain().generate(&req.prompt).await {
        Ok(text) => (StatusCode::OK, Json(json!({ "text": text }))).into_response(),
        Err(e) => provider_failure(e),
    }
}

/// POST /api/generate/stream: one SSE `data:` event per chunk, then `done`.
pub(super) async fn generate_stream(State(state): State<AppState>, Json(req): Json<PromptRequest>) -> Response {
    if blank(&req.prompt) {
        return bad_request("prompt is required");
    }
    let chunks = match state.services.briefings.generation_chain().generate_stream(&req.prompt) {
        Ok(s) => s,
        Err(e) => return provider_failure(e),
    };
    let events = chunks
        .map(|chunk| Ok::<_, Infallible>(Event::default().data(chunk)))
        .chain(stream::once(async { Ok(Event::default().event("done").data("[DONE]")) }));
    Sse::new(events).into_response()
}

/// POST /api/image
pub(super) async fn image(State(state): State<AppState>, Json(req): Json<PromptRequest>) -> Response {
    if blank(&req.prompt) {
        return bad_request("prompt is required");
    }
    match state.services.images.generate(&req.prompt).await {
        Ok(image) => (StatusCode::OK, Json(image)).into_response(),
        Err(e) => provider_failure(e),
    }
}

/// POST /api/analyze
pub(super) async fn analyze(State(state): State<AppState>, Json(req): Json<AnalyzeRequest>) -> Response {
    let image = match InlineImage::from_data_uri(&req.image) {
        Ok(i) => i,
        Err(e) => return bad_request(e),
    };
    let prompt = req.prompt.filter(|p| !blank(p));
    let prompt = prompt.as_deref().unwrap_or(DEFAULT_ANALYZE_PROMPT);
    match state.services.briefings.generation_chain().analyze_image(&image, prompt).await {
        Ok(text) => (StatusCode::OK, Json(json!({ "text": text }))).into_response(),
        Err(e) => provider_failure(e),
    }
}

/// GET /api/preferences/{user_id}
pub(super) async fn get_preferences(State(state): State<AppState>, Path(user_id): Path<String>) -> Response {
    let store = state.services.prefs.clone();
    let lookup = user_id.clone();
    match tokio::task::spawn_blocking(move || store.get(&lookup)).await {
        Ok(Ok(Some(prefs))) => (StatusCode::OK, Json(prefs)).into_response(),
        Ok(Ok(None)) => {
            (StatusCode::NOT_FOUND, json_error("not_found", format!("no preferences for {user_id}"))).into_response()
        }
        Ok(Err(e)) => {
            error!(%user_id, error = %e, "preferences read failed");
            (StatusCode::INTERNAL_SERVER_ERROR, json_error("store", e)).into_response()
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, json_error("internal", e)).into_response(),
    }
}

/// PUT /api/preferences/{user_id}
pub(super) async fn put_preferences(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<PreferencesRequest>,
) -> Response {
    if blank(&user_id) {
        return bad_request("user_id is required");
    }
    if !req.preferences.is_object() {
        return bad_request("preferences must be a JSON object");
    }
    let store = state.services.prefs.clone();
    let id = user_id.clone();
    match tokio::task::spawn_blocking(move || store.save(&id, &req.preferences)).await {
        Ok(Ok(saved)) => (StatusCode::OK, Json(saved)).into_response(),
        Ok(Err(e)) => {
            error!(%user_id, error = %e, "preferences write failed");
            (StatusCode::INTERNAL_SERVER_ERROR, json_error("store", e)).into_response()
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, json_error("internal", e)).into_response(),
    }
}
