//! X API v2: media upload and post creation with an OAuth 2.0 user token.
//!
//! - `POST {base}/media/upload` with `{media, media_category, media_type}`
//! - `POST {base}/tweets` with `{text, media?: {media_ids}}`
//!
//! Both answer `{"data": {"id": …}}`.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::media::InlineImage;
use crate::provider::{self, ProviderError};

use super::PostReceipt;

const PROVIDER: &str = "x";

#[derive(Debug, Clone)]
pub struct XClient {
    client: Client,
    api_base_url: String,
    permalink_base: String,
    access_token: Option<String>,
}

impl XClient {
    pub fn new(client: Client, api_base_url: String, permalink_base: String, access_token: Option<String>) -> Self {
        Self { client, api_base_url, permalink_base, access_token }
    }

    pub(crate) fn token(&self) -> Result<&str, ProviderError> {
        provider::require(self.access_token.as_deref(), "X_ACCESS_TOKEN")
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.api_base_url.trim_end_matches('/'))
    }

    async fn send<B: Serialize>(&self, path: &str, body: &B) -> Result<String, ProviderError> {
        let token = self.token()?;
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::transport(PROVIDER, e))?;
        let response = provider::check_status(PROVIDER, response).await?;

        let envelope = response
            .json::<DataEnvelope>()
            .await
            .map_err(|e| ProviderError::decode(PROVIDER, e))?;
        envelope
            .data
            .map(|d| d.id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ProviderError::decode(PROVIDER, format!("{path}: response has no data.id")))
    }

    pub async fn upload_media(&self, image: &InlineImage) -> Result<String, ProviderError> {
        debug!(mime = %image.mime_type, "uploading media");
        let body = MediaUpload {
            media: &image.data_base64,
            media_category: "tweet_image",
            media_type: &image.mime_type,
        };
        self.send("media/upload", &body).await
    }

    pub async fn create_post(&self, text: &str, media_id: Option<&str>) -> Result<PostReceipt, ProviderError> {
        let body = CreatePost {
            text,
            media: media_id.map(|id| PostMedia { media_ids: vec![id] }),
        };
        let id = self.send("tweets", &body).await?;
        Ok(PostReceipt { permalink: super::permalink(&self.permalink_base, &id), id })
    }
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct MediaUpload<'a> {
    media: &'a str,
    media_category: &'static str,
    media_type: &'a str,
}

#[derive(Debug, Serialize)]
struct CreatePost<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    media: Option<PostMedia<'a>>,
}

#[derive(Debug, Serialize)]
struct PostMedia<'a> {
    media_ids: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct DataEnvelope {
    #[serde(default)]
    data: Option<DataId>,
}

#[derive(Debug, Deserialize)]
struct DataId {
    #[serde(default)]
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn post_body_omits_media_when_absent() {
        let v = serde_json::to_value(CreatePost { text: "hi", media: None }).unwrap();
        assert_eq!(v, json!({"text": "hi"}));
        let v = serde_json::to_value(CreatePost { text: "hi", media: Some(PostMedia { media_ids: vec!["9"] }) })
            .unwrap();
        assert_eq!(v, json!({"text": "hi", "media": {"media_ids": ["9"]}}));
    }

    #[tokio::test]
    async fn missing_token_is_configuration_error() {
        let x = XClient::new(Client::new(), "http://localhost:0/2".into(), "https://x.com/i/web/status".into(), None);
        let err = x.create_post("hi", None).await.unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("X_ACCESS_TOKEN"));
    }
}
