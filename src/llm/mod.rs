//! Text generation behind an ordered model chain.
//!
//! `LlmProvider` is an enum over concrete provider implementations. Add a
//! new variant + module in `providers/` for each additional backend.
//!
//! `GenerationChain` walks the configured tiers (primary model first) for
//! one-shot completions, streaming completions and image analysis.

pub mod providers;
pub(crate) mod sse;

use std::pin::Pin;

use futures::{Stream, StreamExt};
use reqwest::Client;
use tracing::{info, warn};

use crate::chain::{self, Tier};
use crate::config::{LlmConfig, Secrets};
use crate::provider::ProviderError;

pub use crate::media::InlineImage;

/// Emitted as the only chunk when no tier could open a stream.
pub const STREAM_UNAVAILABLE_MSG: &str =
    "I'm sorry, I'm unable to stream a response right now. Please try again later.";

/// Returned when every tier failed to analyse an image.
pub const IMAGE_ANALYSIS_UNAVAILABLE_MSG: &str =
    "Unable to analyze image at this time. Please try again later.";

/// Raw chunks from one provider; an `Err` ends the stream.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

/// Text fragments delivered to the caller; errors are already handled.
pub type TextStream = Pin<Box<dyn Stream<Item = String> + Send>>;

// ── Provider enum ─────────────────────────────────────────────────────────────

/// All available provider backends.
///
/// Enum dispatch avoids `dyn` trait objects and the `async-trait` dependency.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    Gemini(providers::gemini::GeminiProvider),
    OpenAiCompatible(providers::openai_compatible::OpenAiCompatibleProvider),
    Dummy(providers::dummy::DummyProvider),
}

impl LlmProvider {
    /// Send `prompt` to the provider and return its text reply.
    pub async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        match self {
            LlmProvider::Gemini(p) => p.complete(prompt).await,
            LlmProvider::OpenAiCompatible(p) => p.complete(prompt).await,
            LlmProvider::Dummy(p) => p.complete(prompt).await,
        }
    }

    /// Open a streaming completion. Errors here mean nothing was produced.
    pub async fn complete_stream(&self, prompt: &str) -> Result<ChunkStream, ProviderError> {
        match self {
            LlmProvider::Gemini(p) => p.complete_stream(prompt).await,
            LlmProvider::OpenAiCompatible(p) => p.complete_stream(prompt).await,
            LlmProvider::Dummy(p) => p.complete_stream(prompt).await,
        }
    }

    pub async fn analyze_image(&self, image: &InlineImage, prompt: &str) -> Result<String, ProviderError> {
        match self {
            LlmProvider::Gemini(p) => p.analyze_image(image, prompt).await,
            LlmProvider::OpenAiCompatible(_) => {
                Err(ProviderError::Unsupported { provider: "openai", feature: "image analysis" })
            }
            LlmProvider::Dummy(p) => p.analyze_image(image, prompt).await,
        }
    }
}

impl Tier for LlmProvider {
    fn label(&self) -> String {
        match self {
            LlmProvider::Gemini(p) => format!("gemini:{}", p.model()),
            LlmProvider::OpenAiCompatible(p) => format!("openai:{}", p.model()),
            LlmProvider::Dummy(p) => format!("dummy:{}", p.name()),
        }
    }

    fn credential_check(&self) -> Result<(), ProviderError> {
        match self {
            LlmProvider::Gemini(p) => p.api_key().map(|_| ()),
            // Local servers run keyless.
            LlmProvider::OpenAiCompatible(_) => Ok(()),
            LlmProvider::Dummy(p) => p.credential_check(),
        }
    }
}

// ── Chain ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct GenerationChain {
    tiers: Vec<LlmProvider>,
}

impl GenerationChain {
    pub fn new(tiers: Vec<LlmProvider>) -> Self {
        Self { tiers }
    }

    pub fn from_config(config: &LlmConfig, secrets: &Secrets, client: &Client) -> Self {
        let tiers = config
            .tiers
            .iter()
            .map(|t| providers::build(t, secrets, client))
            .collect();
        Self { tiers }
    }

    pub fn is_configured(&self) -> bool {
        chain::any_configured(&self.tiers)
    }

    pub fn tiers(&self) -> &[LlmProvider] {
        &self.tiers
    }

    /// One-shot completion; the same prompt goes to each tier in turn.
    pub async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        chain::walk("generation", &self.tiers, |p| p.complete(prompt)).await
    }

    /// Streaming completion with per-tier fallback.
    ///
    /// A tier that fails before its first chunk hands over to the next one.
    /// Once any chunk has been emitted the stream is committed to that tier:
    /// a later error just ends it. If no tier produces anything the stream
    /// yields [`STREAM_UNAVAILABLE_MSG`] once.
    ///
    /// Returns `Err(Configuration)` up front when no tier is configured.
    pub fn generate_stream(&self, prompt: &str) -> Result<TextStream, ProviderError> {
        if !self.is_configured() {
            return Err(ProviderError::Configuration(
                "generation: no configured provider".to_string(),
            ));
        }
        let tiers = self.tiers.clone();
        let prompt = prompt.to_string();

        Ok(Box::pin(async_stream::stream! {
            for tier in &tiers {
                let label = tier.label();
                if let Err(e) = tier.credential_check() {
                    warn!(tier = %label, error = %e, "stream tier not configured, skipping");
                    continue;
                }
                let mut chunks = match tier.complete_stream(&prompt).await {
                    Ok(s) => s,
                    Err(e) => {
                        warn!(tier = %label, error = %e, "stream failed to open, trying next");
                        continue;
                    }
                };

                let mut emitted = false;
                while let Some(item) = chunks.next().await {
                    match item {
                        Ok(text) => {
                            emitted = true;
                            yield text;
                        }
                        Err(e) if emitted => {
                            warn!(tier = %label, error = %e, "stream ended early");
                            break;
                        }
                        Err(e) => {
                            warn!(tier = %label, error = %e, "stream failed before first chunk, trying next");
                            break;
                        }
                    }
                }
                if emitted {
                    info!(tier = %label, "stream complete");
                    return;
                }
            }
            warn!("all stream tiers failed");
            yield STREAM_UNAVAILABLE_MSG.to_string();
        }))
    }

    /// Describe an image. Total failure degrades to a fixed message; only a
    /// missing configuration is an error.
    pub async fn analyze_image(&self, image: &InlineImage, prompt: &str) -> Result<String, ProviderError> {
        match chain::walk("image-analysis", &self.tiers, |p| p.analyze_image(image, prompt)).await {
            Ok(text) => Ok(text),
            Err(e) if e.is_configuration() => Err(e),
            Err(e) => {
                warn!(error = %e, "image analysis unavailable");
                Ok(IMAGE_ANALYSIS_UNAVAILABLE_MSG.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use providers::dummy::DummyProvider;

    fn chain(tiers: Vec<DummyProvider>) -> GenerationChain {
        GenerationChain::new(tiers.into_iter().map(LlmProvider::Dummy).collect())
    }

    async fn collect(stream: TextStream) -> Vec<String> {
        stream.collect().await
    }

    #[tokio::test]
    async fn primary_failure_falls_back_with_same_prompt() {
        let a = DummyProvider::echo().named("a").failing("quota");
        let b = DummyProvider::echo().named("b").replying("from b");
        let out = chain(vec![a.clone(), b.clone()]).generate("summarise").await.unwrap();
        assert_eq!(out, "from b");
        assert_eq!(a.prompts(), vec!["summarise".to_string()]);
        assert_eq!(b.prompts(), vec!["summarise".to_string()]);
    }

    #[tokio::test]
    async fn primary_success_never_touches_fallback() {
        let a = DummyProvider::echo().named("a");
        let b = DummyProvider::echo().named("b");
        let out = chain(vec![a, b.clone()]).generate("hi").await.unwrap();
        assert_eq!(out, "[echo] hi");
        assert!(b.prompts().is_empty());
    }

    #[tokio::test]
    async fn all_tiers_failing_is_exhausted() {
        let err = chain(vec![
            DummyProvider::echo().named("a").failing("x"),
            DummyProvider::echo().named("b").failing("y"),
        ])
        .generate("hi")
        .await
        .unwrap_err();
        assert!(matches!(err, ProviderError::Exhausted { chain: "generation", ref failures } if failures.len() == 2));
    }

    #[tokio::test]
    async fn no_configured_tier_is_configuration_error() {
        let c = chain(vec![DummyProvider::echo().unconfigured()]);
        assert!(!c.is_configured());
        assert!(c.generate("hi").await.unwrap_err().is_configuration());
        assert!(c.generate_stream("hi").is_err());
    }

    #[tokio::test]
    async fn stream_falls_back_when_primary_fails_on_open() {
        let a = DummyProvider::echo().named("a").failing("down");
        let b = DummyProvider::echo().named("b").chunks(["x", "y"]);
        let out = collect(chain(vec![a, b]).generate_stream("p").unwrap()).await;
        assert_eq!(out, vec!["x", "y"]);
    }

    #[tokio::test]
    async fn stream_falls_back_when_primary_fails_before_first_chunk() {
        let a = DummyProvider::echo().named("a").chunks_then_fail(Vec::<String>::new(), "reset");
        let b = DummyProvider::echo().named("b").chunks(["ok"]);
        let out = collect(chain(vec![a, b]).generate_stream("p").unwrap()).await;
        assert_eq!(out, vec!["ok"]);
    }

    #[tokio::test]
    async fn mid_stream_error_ends_without_fallback() {
        let a = DummyProvider::echo().named("a").chunks_then_fail(["partial"], "cut");
        let b = DummyProvider::echo().named("b").chunks(["never"]);
        let out = collect(chain(vec![a, b.clone()]).generate_stream("p").unwrap()).await;
        assert_eq!(out, vec!["partial"]);
        assert!(b.prompts().is_empty());
    }

    #[tokio::test]
    async fn stream_all_failing_yields_single_message() {
        let out = collect(
            chain(vec![
                DummyProvider::echo().named("a").failing("x"),
                DummyProvider::echo().named("b").failing("y"),
            ])
            .generate_stream("p")
            .unwrap(),
        )
        .await;
        assert_eq!(out, vec![STREAM_UNAVAILABLE_MSG.to_string()]);
    }

    #[tokio::test]
    async fn image_analysis_degrades_to_fixed_message() {
        let image = InlineImage { mime_type: "image/png".into(), data_base64: "AAAA".into() };
        let out = chain(vec![DummyProvider::echo().failing("x")])
            .analyze_image(&image, "what is this")
            .await
            .unwrap();
        assert_eq!(out, IMAGE_ANALYSIS_UNAVAILABLE_MSG);
    }
}
