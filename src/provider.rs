//! Vendor-call error taxonomy shared by every provider chain.
//!
//! - `Configuration`: a credential is missing; raised before any network
//!   call and never retried.
//! - `Transport` / `Status` / `Decode`: one vendor call failed; the chain
//!   moves on to its next tier if there is one.
//! - `Exhausted`: every configured tier failed.
//! - `Validation`: the caller supplied unusable input.

use serde_json::Value;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("{provider} request failed: {message}")]
    Transport { provider: &'static str, message: String },

    #[error("{provider} returned HTTP {status}: {message}")]
    Status {
        provider: &'static str,
        status: u16,
        message: String,
        /// Structured error body, when the vendor sent JSON.
        payload: Option<Value>,
    },

    #[error("{provider} response could not be decoded: {message}")]
    Decode { provider: &'static str, message: String },

    #[error("{provider} does not support {feature}")]
    Unsupported { provider: &'static str, feature: &'static str },

    #[error("all {chain} providers failed: {}", failures.join("; "))]
    Exhausted { chain: &'static str, failures: Vec<String> },
}

impl ProviderError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, ProviderError::Configuration(_))
    }

    /// The vendor's JSON error body, if one was captured.
    pub fn payload(&self) -> Option<&Value> {
        match self {
            ProviderError::Status { payload, .. } => payload.as_ref(),
            _ => None,
        }
    }

    pub(crate) fn transport(provider: &'static str, err: impl std::fmt::Display) -> Self {
        ProviderError::Transport { provider, message: err.to_string() }
    }

    pub(crate) fn decode(provider: &'static str, err: impl std::fmt::Display) -> Self {
        ProviderError::Decode { provider, message: err.to_string() }
    }
}

/// Return `Some(value)` or a `Configuration` error naming the env var.
pub(crate) fn require<'a>(value: Option<&'a str>, env_name: &str) -> Result<&'a str, ProviderError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ProviderError::Configuration(format!("{env_name} is not set")))
}

/// Consume the response and return it if successful, or a structured error.
///
/// The error message is pulled from the common vendor envelopes
/// (`{"error": {"message"}}`, `{"detail"}`, `{"message"}`); the full JSON body
/// is kept as the error payload.
pub(crate) async fn check_status(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());

    let payload = serde_json::from_str::<Value>(&body).ok();
    let message = payload
        .as_ref()
        .and_then(error_message)
        .unwrap_or_else(|| truncate(&body, 300));

    error!(provider, %status, %message, "provider returned HTTP error");
    Err(ProviderError::Status { provider, status: status.as_u16(), message, payload })
}

fn error_message(v: &Value) -> Option<String> {
    let pick = |v: &Value| v.as_str().map(str::to_string);
    v.pointer("/error/message")
        .and_then(pick)
        .or_else(|| v.get("detail").and_then(pick))
        .or_else(|| v.get("message").and_then(pick))
        .or_else(|| v.get("error").and_then(pick))
        .or_else(|| v.get("title").and_then(pick))
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}
