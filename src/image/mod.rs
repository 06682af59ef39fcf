//! Text-to-image generation.
//!
//! A single provider, no fallback tier: any failure is returned to the
//! caller as-is.

pub mod dummy;
pub mod freepik;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::{ImageBackend, ImageConfig, Secrets};
use crate::provider::ProviderError;

/// One generated image. Vendors return either inline base64 or a URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
}

impl GeneratedImage {
    /// `data:image/png;base64,…` when inline bytes are present.
    pub fn data_uri(&self) -> Option<String> {
        self.base64
            .as_deref()
            .filter(|b| !b.is_empty())
            .map(|b| format!("data:image/png;base64,{b}"))
    }
}

#[derive(Debug, Clone)]
pub enum ImageProvider {
    Freepik(freepik::FreepikImages),
    Dummy(dummy::DummyImages),
}

impl ImageProvider {
    pub fn from_config(config: &ImageConfig, secrets: &Secrets, client: &Client) -> Self {
        match config.backend {
            ImageBackend::Freepik => ImageProvider::Freepik(freepik::FreepikImages::new(
                client.clone(),
                config.endpoint.clone(),
                secrets.freepik_api_key.clone(),
            )),
            ImageBackend::Dummy => ImageProvider::Dummy(dummy::DummyImages::new()),
        }
    }

    pub fn is_configured(&self) -> bool {
        match self {
            ImageProvider::Freepik(p) => p.api_key().is_ok(),
            ImageProvider::Dummy(p) => p.is_configured(),
        }
    }

    pub async fn generate(&self, prompt: &str) -> Result<GeneratedImage, ProviderError> {
        if prompt.trim().is_empty() {
            return Err(ProviderError::Validation("image prompt is empty".into()));
        }
        match self {
            ImageProvider::Freepik(p) => p.generate(prompt).await,
            ImageProvider::Dummy(p) => p.generate(prompt).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_uri_only_for_inline_bytes() {
        let img = GeneratedImage { url: None, base64: Some("QUJD".into()) };
        assert_eq!(img.data_uri().as_deref(), Some("data:image/png;base64,QUJD"));
        let img = GeneratedImage { url: Some("https://cdn/x.png".into()), base64: None };
        assert_eq!(img.data_uri(), None);
    }

    #[tokio::test]
    async fn blank_prompt_is_rejected() {
        let p = ImageProvider::Dummy(dummy::DummyImages::new());
        let err = p.generate("   ").await.unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
    }

    #[test]
    fn serialises_without_absent_fields() {
        let v = serde_json::to_value(GeneratedImage { url: None, base64: Some("A".into()) }).unwrap();
        assert_eq!(v, serde_json::json!({"base64": "A"}));
    }
}
