//! Publishing a text post, optionally with one image, to a social platform.
//!
//! The image is uploaded first. If the upload fails the text is never
//! posted. Vendor errors are returned unchanged so callers can surface the
//! platform's JSON error body.

pub mod dummy;
pub mod x;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::{Secrets, SocialBackend, SocialConfig};
use crate::media::InlineImage;
use crate::provider::ProviderError;

/// Identifier and public URL of a published post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostReceipt {
    pub id: String,
    pub permalink: String,
}

#[derive(Debug, Clone)]
pub enum SocialProvider {
    X(x::XClient),
    Dummy(dummy::DummySocial),
}

impl SocialProvider {
    pub fn from_config(config: &SocialConfig, secrets: &Secrets, client: &Client) -> Self {
        match config.backend {
            SocialBackend::X => SocialProvider::X(x::XClient::new(
                client.clone(),
                config.api_base_url.clone(),
                config.permalink_base.clone(),
                secrets.x_access_token.clone(),
            )),
            SocialBackend::Dummy => SocialProvider::Dummy(dummy::DummySocial::new(&config.permalink_base)),
        }
    }

    fn credential_check(&self) -> Result<(), ProviderError> {
        match self {
            SocialProvider::X(p) => p.token().map(|_| ()),
            SocialProvider::Dummy(p) => p.credential_check(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credential_check().is_ok()
    }

    async fn upload(&self, image: &InlineImage) -> Result<String, ProviderError> {
        match self {
            SocialProvider::X(p) => p.upload_media(image).await,
            SocialProvider::Dummy(p) => p.upload_media(image).await,
        }
    }

    async fn create(&self, text: &str, media_id: Option<&str>) -> Result<PostReceipt, ProviderError> {
        match self {
            SocialProvider::X(p) => p.create_post(text, media_id).await,
            SocialProvider::Dummy(p) => p.create_post(text, media_id).await,
        }
    }

    /// Publish `text`, attaching `image` (data URI or bare base64) if given.
    pub async fn post(&self, text: &str, image: Option<&str>) -> Result<PostReceipt, ProviderError> {
        if text.trim().is_empty() {
            return Err(ProviderError::Validation("post content is empty".into()));
        }
        self.credential_check()?;

        let media_id = match image.filter(|i| !i.trim().is_empty()) {
            Some(raw) => {
                let image = InlineImage::from_data_uri(raw)?;
                let id = self.upload(&image).await.inspect_err(|e| {
                    error!(error = %e, "media upload failed; post not sent");
                })?;
                info!(media_id = %id, mime = %image.mime_type, "media uploaded");
                Some(id)
            }
            None => None,
        };

        let receipt = self.create(text, media_id.as_deref()).await?;
        info!(id = %receipt.id, with_media = media_id.is_some(), "post published");
        Ok(receipt)
    }
}

pub(crate) fn permalink(base: &str, id: &str) -> String {
    format!("{}/{id}", base.trim_end_matches('/'))
}
