//! Google Custom Search JSON API (`/customsearch/v1`).
//!
//! News queries add `sort=date` and the configured `dateRestrict` window.
//! A body without `items` means zero results, not an error.

use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::provider::{self, ProviderError};

use super::{SearchKind, SearchResult};

const PROVIDER: &str = "google";

#[derive(Debug, Clone)]
pub struct GoogleSearch {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    engine_id: Option<String>,
    num: u8,
    news_date_restrict: String,
}

impl GoogleSearch {
    pub fn new(
        client: Client,
        endpoint: String,
        api_key: Option<String>,
        engine_id: Option<String>,
        num: u8,
        news_date_restrict: String,
    ) -> Self {
        Self { client, endpoint, api_key, engine_id, num, news_date_restrict }
    }

    /// `(key, cx)` or a configuration error naming the missing variable.
    pub(crate) fn credentials(&self) -> Result<(&str, &str), ProviderError> {
        let key = provider::require(self.api_key.as_deref(), "GOOGLE_SEARCH_API_KEY")?;
        let cx = provider::require(self.engine_id.as_deref(), "GOOGLE_SEARCH_ENGINE_ID")?;
        Ok((key, cx))
    }

    fn request_url(&self, query: &str, kind: SearchKind) -> Result<Url, ProviderError> {
        let (key, cx) = self.credentials()?;
        let mut url = Url::parse(&self.endpoint)
            .map_err(|e| ProviderError::Configuration(format!("invalid google endpoint: {e}")))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("key", key)
                .append_pair("cx", cx)
                .append_pair("q", query)
                .append_pair("num", &self.num.to_string());
            if kind == SearchKind::News {
                pairs
                    .append_pair("sort", "date")
                    .append_pair("dateRestrict", &self.news_date_restrict);
            }
        }
        Ok(url)
    }

    pub async fn search(&self, query: &str, kind: SearchKind) -> Result<Vec<SearchResult>, ProviderError> {
        let url = self.request_url(query, kind)?;
        debug!(%query, ?kind, "google custom search request");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProviderError::transport(PROVIDER, e))?;
        let response = provider::check_status(PROVIDER, response).await?;

        let body = response
            .json::<SearchResponse>()
            .await
            .map_err(|e| ProviderError::decode(PROVIDER, e))?;

        if body.items.is_empty() {
            warn!(%query, ?kind, "google custom search: no results");
        }

        Ok(body
            .items
            .into_iter()
            .map(|item| SearchResult { title: item.title, snippet: item.snippet, link: item.link })
            .collect())
    }
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    link: String,
}
