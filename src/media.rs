//! Inline images carried as base64, optionally wrapped in a data URI.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::provider::ProviderError;

pub const DEFAULT_MIME: &str = "image/png";

/// Base64 image bytes plus their MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data_base64: String,
}

impl InlineImage {
    /// Accepts `data:image/<type>;base64,<payload>` or a bare base64 payload.
    ///
    /// The MIME type comes from the prefix and defaults to `image/png`. The
    /// payload must decode; an unusable image is a validation error.
    pub fn from_data_uri(raw: &str) -> Result<Self, ProviderError> {
        let raw = raw.trim();
        let (mime_type, payload) = match split_data_uri(raw) {
            Some((mime, payload)) => (mime.to_string(), payload),
            None => (DEFAULT_MIME.to_string(), raw),
        };
        if payload.is_empty() {
            return Err(ProviderError::Validation("image data is empty".into()));
        }
        STANDARD
            .decode(payload)
            .map_err(|e| ProviderError::Validation(format!("image is not valid base64: {e}")))?;
        Ok(Self { mime_type, data_base64: payload.to_string() })
    }

    /// Decoded byte length.
    pub fn byte_len(&self) -> usize {
        STANDARD.decode(&self.data_base64).map(|b| b.len()).unwrap_or(0)
    }
}

/// `Some((mime, payload))` when `raw` starts with `data:image/<word>;base64,`.
fn split_data_uri(raw: &str) -> Option<(&str, &str)> {
    let rest = raw.strip_prefix("data:")?;
    let (mime, payload) = rest.split_once(";base64,")?;
    let subtype = mime.strip_prefix("image/")?;
    let word = !subtype.is_empty() && subtype.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    word.then_some((mime, payload))
}
