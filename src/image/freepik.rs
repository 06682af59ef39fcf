//! Freepik text-to-image (`POST /v1/ai/text-to-image`).

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::provider::{self, ProviderError};

use super::GeneratedImage;

const PROVIDER: &str = "freepik";

#[derive(Debug, Clone)]
pub struct FreepikImages {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl FreepikImages {
    pub fn new(client: Client, endpoint: String, api_key: Option<String>) -> Self {
        Self { client, endpoint, api_key }
    }

    pub(crate) fn api_key(&self) -> Result<&str, ProviderError> {
        provider::require(self.api_key.as_deref(), "FREEPIK_API_KEY")
    }

    pub async fn generate(&self, prompt: &str) -> Result<GeneratedImage, ProviderError> {
        let key = self.api_key()?;
        let preview: String = prompt.chars().take(100).collect();
        info!(prompt = %preview, "generating image");

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-freepik-api-key", key)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&TextToImageRequest { prompt })
            .send()
            .await
            .map_err(|e| ProviderError::transport(PROVIDER, e))?;
        let response = provider::check_status(PROVIDER, response).await?;

        let body = response
            .json::<TextToImageResponse>()
            .await
            .map_err(|e| ProviderError::decode(PROVIDER, e))?;
        debug!(images = body.data.len(), "freepik response received");

        first_image(body)
    }
}

fn first_image(body: TextToImageResponse) -> Result<GeneratedImage, ProviderError> {
    let item = body
        .data
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::decode(PROVIDER, "no image data received"))?;
    let image = GeneratedImage {
        url: item.url.filter(|u| !u.is_empty()),
        base64: item.base64.filter(|b| !b.is_empty()),
    };
    if image.url.is_none() && image.base64.is_none() {
        return Err(ProviderError::decode(PROVIDER, "image entry has neither url nor base64"));
    }
    Ok(image)
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct TextToImageRequest<'a> {
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct TextToImageResponse {
    #[serde(default)]
    data: Vec<ImageItem>,
}

#[derive(Debug, Deserialize)]
struct ImageItem {
    #[serde(default)]
    base64: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> TextToImageResponse {
        serde_json::from_str(s).unwrap()
    }

    #[test]
    fn takes_first_entry() {
        let img = first_image(parse(
            r#"{"data":[{"base64":"AAA","has_nsfw":false},{"base64":"BBB"}],"meta":{"seed":1}}"#,
        ))
        .unwrap();
        assert_eq!(img.base64.as_deref(), Some("AAA"));
        assert_eq!(img.url, None);
    }

    #[test]
    fn empty_data_is_an_error() {
        let err = first_image(parse(r#"{"data":[]}"#)).unwrap_err();
        assert!(err.to_string().contains("no image data"));
    }

    #[tokio::test]
    async fn missing_key_is_configuration_error() {
        let f = FreepikImages::new(Client::new(), "http://localhost:0".into(), None);
        assert!(f.generate("cat").await.unwrap_err().is_configuration());
    }
}
