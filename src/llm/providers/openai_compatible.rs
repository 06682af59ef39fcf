//! OpenAI-compatible chat completion provider (`/v1/chat/completions`).
//!
//! Exposes `complete` and `complete_stream` over a single user message. All
//! OpenAI wire types are private to this module. Works against OpenAI
//! itself and local servers (Ollama, LM Studio…); the key is optional.

use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::llm::{sse, ChunkStream};
use crate::provider::{self, ProviderError};

const PROVIDER: &str = "openai";

/// Adapter for any HTTP endpoint implementing `/v1/chat/completions`.
///
/// Cheap to clone because `reqwest::Client` is an `Arc` internally.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    client: Client,
    api_base_url: String,
    model: String,
    temperature: Option<f32>,
    api_key: Option<String>,
}

impl OpenAiCompatibleProvider {
    /// `api_key` is `None` for keyless local models. When present it is sent
    /// as `Authorization: Bearer <key>`.
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

    fn request<'a>(&'a self, content: &'a str, stream: bool) -> ChatCompletionRequest<'a> {
        // Some models (gpt-5 family) do not accept a temperature parameter.
        let temperature = if self.model.starts_with("gpt-5") { None } else { self.temperature };
        ChatCompletionRequest {
            model: &self.model,
            messages: vec![Message { role: "user", content }],
            temperature,
            stream,
        }
    }

    async fn send(&self, payload: &ChatCompletionRequest<'_>) -> Result<reqwest::Response, ProviderError> {
        debug!(
            model = %payload.model,
            temperature = ?payload.temperature,
            stream = payload.stream,
            "sending LLM request"
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(payload)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(payload = %json, "full LLM request payload");
        }

        let mut req = self.client.post(&self.api_base_url).json(payload);
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.is_empty()) {
            req = req.bearer_auth(key);
        }
        let response = req.send().await.map_err(|e| ProviderError::transport(PROVIDER, e))?;
        provider::check_status(PROVIDER, response).await
    }

    pub async fn complete(&self, content: &str) -> Result<String, ProviderError> {
        let response = self.send(&self.request(content, false)).await?;

        let parsed = response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|e| ProviderError::decode(PROVIDER, format!("failed to parse response body: {e}")))?;

        debug!(choices = parsed.choices.len(), "received LLM response");

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ProviderError::decode(PROVIDER, "empty or missing content in response"))
    }

    pub async fn complete_stream(&self, content: &str) -> Result<ChunkStream, ProviderError> {
        let response = self.send(&self.request(content, true)).await?;

        let chunks = sse::data_events(PROVIDER, response).filter_map(|event| async move {
            match event {
                Err(e) => Some(Err(e)),
                Ok(data) => match serde_json::from_str::<ChatCompletionChunk>(&data) {
                    Ok(chunk) => chunk
                        .choices
                        .into_iter()
                        .next()
                        .and_then(|c| c.delta.content)
                        .filter(|s| !s.is_empty())
                        .map(Ok),
                    Err(e) => Some(Err(ProviderError::decode(PROVIDER, e))),
                },
            }
        });
        Ok(Box::pin(chunks))
    }
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider(model: &str) -> OpenAiCompatibleProvider {
        OpenAiCompatibleProvider::new(
            Client::new(),
            "http://localhost:0/v1/chat/completions".into(),
            model.into(),
            Some(0.2),
            None,
        )
    }

    #[test]
    fn gpt5_omits_temperature() {
        let p = provider("gpt-5-mini");
        let v = serde_json::to_value(p.request("hi", false)).unwrap();
        assert!(v.get("temperature").is_none());
        assert!(v.get("stream").is_none());
    }

    #[test]
    fn streaming_request_sets_flag() {
        let p = provider("gpt-4o-mini");
        let v = serde_json::to_value(p.request("hi", true)).unwrap();
        assert_eq!(v["stream"], true);
        assert_eq!(v["messages"], json!([{"role": "user", "content": "hi"}]));
        assert!((v["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn chunk_without_content_decodes() {
        let c: ChatCompletionChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#).unwrap();
        assert!(c.choices[0].delta.content.is_none());
    }
}
