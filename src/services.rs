//! Provider handles built once at startup and cloned into every channel.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tracing::info;

use crate::briefing::Briefings;
use crate::config::Config;
use crate::error::AppError;
use crate::image::ImageProvider;
use crate::llm::GenerationChain;
use crate::prefs::PreferenceStore;
use crate::search::SearchChain;
use crate::social::SocialProvider;

/// Everything a request handler may call out to.
///
/// Cheap to clone: the HTTP client and the store are reference counted or
/// path-only.
#[derive(Debug, Clone)]
pub struct Services {
    pub briefings: Briefings,
    pub images: ImageProvider,
    pub social: SocialProvider,
    pub prefs: PreferenceStore,
    pub max_post_chars: usize,
}

/// Which outbound integrations have credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProviderStatus {
    pub search: bool,
    pub generation: bool,
    pub image: bool,
    pub social: bool,
}

impl Services {
    pub fn build(config: &Config) -> Result<Self, AppError> {
        let client = http_client(config.http_timeout_seconds)?;

        let search = SearchChain::from_config(&config.search, &config.secrets, &client);
        let generation = GenerationChain::from_config(&config.llm, &config.secrets, &client);
        let briefings = Briefings::new(search, generation, config.prompts_dir.clone());
        let images = ImageProvider::from_config(&config.image, &config.secrets, &client);
        let social = SocialProvider::from_config(&config.social, &config.secrets, &client);
        let prefs = PreferenceStore::open(&config.preferences_db_path())?;

        let services = Self { briefings, images, social, prefs, max_post_chars: config.social.max_post_chars };
        let status = services.status();
        info!(
            search = status.search,
            generation = status.generation,
            image = status.image,
            social = status.social,
            prefs = %services.prefs.path().display(),
            "services ready"
        );
        Ok(services)
    }

    pub fn status(&self) -> ProviderStatus {
        ProviderStatus {
            search: self.briefings.search_chain().is_configured(),
            generation: self.briefings.generation_chain().is_configured(),
            image: self.images.is_configured(),
            social: self.social.is_configured(),
        }
    }
}

fn http_client(timeout_seconds: Option<u64>) -> Result<Client, AppError> {
    let mut builder = Client::builder();
    if let Some(secs) = timeout_seconds {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder
        .build()
        .map_err(|e| AppError::Config(format!("failed to build HTTP client: {e}")))
}
