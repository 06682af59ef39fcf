//! LLM provider implementations.
//!
//! `build(tier, secrets, client)` is the factory, called once per
//! `[[llm.tiers]]` entry at startup. Adding a backend = new module + new
//! match arm.

pub mod dummy;
pub mod gemini;
pub mod openai_compatible;

use reqwest::Client;

use crate::config::{LlmBackend, Secrets, TierConfig};
use crate::llm::LlmProvider;

/// Construct one tier. Keys come from the environment (never TOML) and may
/// be absent; a missing key surfaces later as a configuration error.
pub fn build(tier: &TierConfig, secrets: &Secrets, client: &Client) -> LlmProvider {
    match tier.backend {
        LlmBackend::Gemini => LlmProvider::Gemini(gemini::GeminiProvider::new(
            client.clone(),
            tier.api_base_url.clone(),
            tier.model.clone(),
            tier.temperature,
            secrets.gemini_api_key.clone(),
        )),
        LlmBackend::OpenAiCompatible => {
            LlmProvider::OpenAiCompatible(openai_compatible::OpenAiCompatibleProvider::new(
                client.clone(),
                tier.api_base_url.clone(),
                tier.model.clone(),
                tier.temperature,
                secrets.llm_api_key.clone(),
            ))
        }
        LlmBackend::Dummy => LlmProvider::Dummy(dummy::DummyProvider::echo().named(tier.model.clone())),
    }
}
