//! Offline social provider that records what would have been sent.

use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::media::InlineImage;
use crate::provider::ProviderError;

use super::PostReceipt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocialCall {
    Upload { mime_type: String, bytes: usize },
    Post { text: String, media_id: Option<String> },
}

#[derive(Debug, Clone)]
pub struct DummySocial {
    permalink_base: String,
    upload_error: Option<String>,
    post_error: Option<(u16, Value)>,
    configured: bool,
    calls: Arc<Mutex<Vec<SocialCall>>>,
}

impl DummySocial {
    pub fn new(permalink_base: &str) -> Self {
        Self {
            permalink_base: permalink_base.to_string(),
            upload_error: None,
            post_error: None,
            configured: true,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn upload_fails(mut self, message: impl Into<String>) -> Self {
        self.upload_error = Some(message.into());
        self
    }

    /// Make the post call fail with this HTTP status and JSON body.
    pub fn post_fails(mut self, status: u16, payload: Value) -> Self {
        self.post_error = Some((status, payload));
        self
    }

    pub fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    pub fn calls(&self) -> Vec<SocialCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn push(&self, call: SocialCall) -> usize {
        match self.calls.lock() {
            Ok(mut c) => {
                c.push(call);
                c.len()
            }
            Err(_) => 0,
        }
    }

    pub(crate) fn credential_check(&self) -> Result<(), ProviderError> {
        if self.configured {
            Ok(())
        } else {
            Err(ProviderError::Configuration("X_ACCESS_TOKEN is not set".into()))
        }
    }

    pub async fn upload_media(&self, image: &InlineImage) -> Result<String, ProviderError> {
        let n = self.push(SocialCall::Upload { mime_type: image.mime_type.clone(), bytes: image.byte_len() });
        match &self.upload_error {
            Some(m) => Err(ProviderError::Transport { provider: "dummy", message: m.clone() }),
            None => Ok(format!("media-{n}")),
        }
    }

    pub async fn create_post(&self, text: &str, media_id: Option<&str>) -> Result<PostReceipt, ProviderError> {
        let n = self.push(SocialCall::Post { text: text.to_string(), media_id: media_id.map(str::to_string) });
        if let Some((status, payload)) = &self.post_error {
            let message = payload
                .get("detail")
                .and_then(Value::as_str)
                .unwrap_or("post rejected")
                .to_string();
            return Err(ProviderError::Status {
                provider: "dummy",
                status: *status,
                message,
                payload: Some(payload.clone()),
            });
        }
        let id = format!("{}", 1_000_000 + n);
        Ok(PostReceipt { permalink: super::permalink(&self.permalink_base, &id), id })
    }
}
