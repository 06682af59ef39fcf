//! Offline image provider: returns a fixed tiny PNG or a scripted failure.

use std::sync::{Arc, Mutex};

use crate::provider::ProviderError;

use super::GeneratedImage;

/// 1×1 transparent PNG.
pub const PIXEL_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

#[derive(Debug, Clone)]
pub struct DummyImages {
    fail: Option<String>,
    configured: bool,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl Default for DummyImages {
    fn default() -> Self {
        Self::new()
    }
}

impl DummyImages {
    pub fn new() -> Self {
        Self { fail: None, configured: true, prompts: Arc::new(Mutex::new(Vec::new())) }
    }

    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.fail = Some(message.into());
        self
    }

    pub fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub async fn generate(&self, prompt: &str) -> Result<GeneratedImage, ProviderError> {
        if !self.configured {
            return Err(ProviderError::Configuration("FREEPIK_API_KEY is not set".into()));
        }
        if let Ok(mut p) = self.prompts.lock() {
            p.push(prompt.to_string());
        }
        match &self.fail {
            Some(m) => Err(ProviderError::Transport { provider: "dummy", message: m.clone() }),
            None => Ok(GeneratedImage { url: None, base64: Some(PIXEL_PNG_BASE64.to_string()) }),
        }
    }
}
