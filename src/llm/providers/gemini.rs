//! Gemini `generateContent` / `streamGenerateContent` REST provider.
//!
//! One instance per model tier. The API key travels in the
//! `x-goog-api-key` header. Wire types are private to this module.

use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::llm::{sse, ChunkStream, InlineImage};
use crate::provider::{self, ProviderError};

const PROVIDER: &str = "gemini";

#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: Client,
    api_base_url: String,
    model: String,
    temperature: Option<f32>,
    api_key: Option<String>,
}

impl GeminiProvider {
    pub fn new(
        client: Client,
        api_base_url: String,
        model: String,
        temperature: Option<f32>,
        api_key: Option<String>,
    ) -> Self {
        Self { client, api_base_url, model, temperature, api_key }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub(crate) fn api_key(&self) -> Result<&str, ProviderError> {
        provider::require(self.api_key.as_deref(), "GOOGLE_GEMINI_API_KEY")
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/models/{}:{method}", self.api_base_url.trim_end_matches('/'), self.model)
    }

    fn request<'a>(&self, parts: Vec<Part<'a>>) -> GenerateRequest<'a> {
        GenerateRequest {
            contents: vec![Content { role: "user", parts }],
            generation_config: self.temperature.map(|temperature| GenerationConfig { temperature }),
        }
    }

    pub async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        self.generate(vec![Part::Text { text: prompt }]).await
    }

    pub async fn analyze_image(&self, image: &InlineImage, prompt: &str) -> Result<String, ProviderError> {
        self.generate(vec![
            Part::Text { text: prompt },
            Part::Inline {
                inline_data: InlineData { mime_type: &image.mime_type, data: &image.data_base64 },
            },
        ])
        .await
    }

    async fn generate(&self, parts: Vec<Part<'_>>) -> Result<String, ProviderError> {
        let key = self.api_key()?;
        let payload = self.request(parts);
        debug!(model = %self.model, "sending gemini request");
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string(&payload)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(payload = %json, "full gemini request payload");
        }

        let response = self
            .client
            .post(self.endpoint("generateContent"))
            .header("x-goog-api-key", key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::transport(PROVIDER, e))?;
        let response = provider::check_status(PROVIDER, response).await?;

        let parsed = response
            .json::<GenerateResponse>()
            .await
            .map_err(|e| ProviderError::decode(PROVIDER, e))?;

        let text = parsed.text();
        let text = text.trim();
        if text.is_empty() {
            return Err(ProviderError::decode(PROVIDER, "empty or missing content in response"));
        }
        debug!(model = %self.model, chars = text.len(), "received gemini response");
        Ok(text.to_string())
    }

    pub async fn complete_stream(&self, prompt: &str) -> Result<ChunkStream, ProviderError> {
        let key = self.api_key()?;
        let payload = self.request(vec![Part::Text { text: prompt }]);
        debug!(model = %self.model, "opening gemini stream");

        let response = self
            .client
            .post(format!("{}?alt=sse", self.endpoint("streamGenerateContent")))
            .header("x-goog-api-key", key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::transport(PROVIDER, e))?;
        let response = provider::check_status(PROVIDER, response).await?;

        let chunks = sse::data_events(PROVIDER, response).filter_map(|event| async move {
            match event {
                Err(e) => Some(Err(e)),
                Ok(data) => match serde_json::from_str::<GenerateResponse>(&data) {
                    Ok(chunk) => {
                        let text = chunk.text();
                        (!text.is_empty()).then_some(Ok(text))
                    }
                    Err(e) => Some(Err(ProviderError::decode(PROVIDER, e))),
                },
            }
        });
        Ok(Box::pin(chunks))
    }
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}
