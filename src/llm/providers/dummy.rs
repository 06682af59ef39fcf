//! Dummy LLM provider: echoes input back prefixed with `[echo]`.
//!
//! Used for offline runs and for exercising the fallback chain in tests:
//! it can also return a canned reply, fail, or stream scripted chunks.
//! Clones share the prompt log.

use std::sync::{Arc, Mutex};

use futures::stream;

use crate::llm::{ChunkStream, InlineImage};
use crate::provider::ProviderError;

#[derive(Debug, Clone)]
enum Mode {
    Echo,
    Reply(String),
    Fail(String),
    /// Stream these chunks, then fail with the message if one is given.
    Chunks(Vec<String>, Option<String>),
}

#[derive(Debug, Clone)]
pub struct DummyProvider {
    name: String,
    mode: Mode,
    configured: bool,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl Default for DummyProvider {
    fn default() -> Self {
        Self::echo()
    }
}

impl DummyProvider {
    pub fn echo() -> Self {
        Self {
            name: "dummy".into(),
            mode: Mode::Echo,
            configured: true,
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn replying(mut self, text: impl Into<String>) -> Self {
        self.mode = Mode::Reply(text.into());
        self
    }

    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.mode = Mode::Fail(message.into());
        self
    }

    pub fn chunks<I, S>(mut self, chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mode = Mode::Chunks(chunks.into_iter().map(Into::into).collect(), None);
        self
    }

    /// Stream `chunks`, then end with an error.
    pub fn chunks_then_fail<I, S>(mut self, chunks: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mode = Mode::Chunks(chunks.into_iter().map(Into::into).collect(), Some(message.into()));
        self
    }

    pub fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Prompts received so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub(crate) fn credential_check(&self) -> Result<(), ProviderError> {
        if self.configured {
            Ok(())
        } else {
            Err(ProviderError::Configuration(format!("{} credentials are not set", self.name)))
        }
    }

    fn record(&self, prompt: &str) -> Result<(), ProviderError> {
        self.credential_check()?;
        if let Ok(mut p) = self.prompts.lock() {
            p.push(prompt.to_string());
        }
        Ok(())
    }

    fn failure(message: &str) -> ProviderError {
        ProviderError::Transport { provider: "dummy", message: message.to_string() }
    }

    pub async fn complete(&self, content: &str) -> Result<String, ProviderError> {
        self.record(content)?;
        match &self.mode {
            Mode::Echo => Ok(format!("[echo] {content}")),
            Mode::Reply(text) => Ok(text.clone()),
            Mode::Fail(m) | Mode::Chunks(_, Some(m)) => Err(Self::failure(m)),
            Mode::Chunks(chunks, None) => Ok(chunks.concat()),
        }
    }

    pub async fn complete_stream(&self, content: &str) -> Result<ChunkStream, ProviderError> {
        self.record(content)?;
        let items: Vec<Result<String, ProviderError>> = match &self.mode {
            Mode::Echo => vec![Ok(format!("[echo] {content}"))],
            Mode::Reply(text) => vec![Ok(text.clone())],
            Mode::Fail(m) => return Err(Self::failure(m)),
            Mode::Chunks(chunks, tail) => chunks
                .iter()
                .cloned()
                .map(Ok)
                .chain(tail.as_deref().map(|m| Err(Self::failure(m))))
                .collect(),
        };
        Ok(Box::pin(stream::iter(items)))
    }

    pub async fn analyze_image(&self, image: &InlineImage, prompt: &str) -> Result<String, ProviderError> {
        self.record(prompt)?;
        match &self.mode {
            Mode::Fail(m) => Err(Self::failure(m)),
            Mode::Reply(text) => Ok(text.clone()),
            _ => Ok(format!("[echo] {prompt} ({})", image.mime_type)),
        }
    }
}
