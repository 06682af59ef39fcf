//! Axum HTTP channel.
//!
//! ## URL layout
//!
//! ```text
//! POST /post                         publish {content, image?}
//! GET  /api/health
//! POST /api/command                  {transcript}, stateless
//! GET  /api/briefing/{bucket}        news | papers | trends
//! POST /api/search                   {query}
//! POST /api/generate                 {prompt}
//! POST /api/generate/stream          {prompt}, text/event-stream
//! POST /api/image                    {prompt}
//! POST /api/analyze                  {image, prompt}
//! GET  /api/preferences/{user_id}
//! PUT  /api/preferences/{user_id}    {preferences}
//! ```
//!
//! Every request is independent; no session state lives here.

mod api;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::AppError;
use crate::runtime::{Component, ComponentFuture};
use crate::services::Services;

/// Router state injected into every handler. Cheap to clone.
#[derive(Clone)]
pub(crate) struct AppState {
    pub channel_id: Arc<str>,
    pub name: Arc<str>,
    pub services: Services,
}

pub struct HttpChannel {
    channel_id: String,
    name: String,
    bind_addr: String,
    services: Services,
}

impl HttpChannel {
    pub fn new(
        channel_id: impl Into<String>,
        name: impl Into<String>,
        bind_addr: impl Into<String>,
        services: Services,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            name: name.into(),
            bind_addr: bind_addr.into(),
            services,
        }
    }
}

impl Component for HttpChannel {
    fn id(&self) -> &str {
        &self.channel_id
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
        Box::pin(run_http(*self, shutdown))
    }
}

async fn run_http(channel: HttpChannel, shutdown: CancellationToken) -> Result<(), AppError> {
    let HttpChannel { channel_id, name, bind_addr, services } = channel;
    let router = build_router(&name, services);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| AppError::Comms(format!("http bind failed on {bind_addr}: {e}")))?;

    info!(%channel_id, %bind_addr, "http channel listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Comms(format!("http server error: {e}")))?;

    info!(%channel_id, "http channel shut down");
    Ok(())
}

/// Build the full router. Public so tests can drive it in-process.
pub fn build_router(name: &str, services: Services) -> Router {
    let state = AppState {
        channel_id: Arc::from("http0"),
        name: Arc::from(name),
        services,
    };

    Router::new()
        .route("/post",                        post(api::post_to_social))
        .route("/api/health",                  get(api::health))
        .route("/api/command",                 post(api::command))
        .route("/api/briefing/{bucket}",       get(api::briefing))
        .route("/api/search",                  post(api::search))
        .route("/api/generate",                post(api::generate))
        .route("/api/generate/stream",         post(api::generate_stream))
        .route("/api/image",                   post(api::image))
        .route("/api/analyze",                 post(api::analyze))
        .route("/api/preferences/{user_id}",   get(api::get_preferences).put(api::put_preferences))
        .with_state(state)
}
