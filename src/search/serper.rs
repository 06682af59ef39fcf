//! Serper (`google.serper.dev`) search and news endpoints.
//!
//! Both take `POST {q, num, tbs}` with an `X-API-KEY` header. Web results
//! come back under `organic`, news results under `news`.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::provider::{self, ProviderError};

use super::{SearchKind, SearchResult};

const PROVIDER: &str = "serper";

/// News is always limited to the past day.
const NEWS_TIME_FILTER: &str = "qdr:d";

#[derive(Debug, Clone)]
pub struct SerperSearch {
    client: Client,
    search_endpoint: String,
    news_endpoint: String,
    api_key: Option<String>,
    num: u8,
    time_filter: String,
}

impl SerperSearch {
    pub fn new(
        client: Client,
        search_endpoint: String,
        news_endpoint: String,
        api_key: Option<String>,
        num: u8,
        time_filter: String,
    ) -> Self {
        Self { client, search_endpoint, news_endpoint, api_key, num, time_filter }
    }

    pub(crate) fn api_key(&self) -> Result<&str, ProviderError> {
        provider::require(self.api_key.as_deref(), "SERPER_API_KEY")
    }

    pub async fn search(&self, query: &str, kind: SearchKind) -> Result<Vec<SearchResult>, ProviderError> {
        let key = self.api_key()?;
        let (endpoint, tbs) = match kind {
            SearchKind::Web => (&self.search_endpoint, self.time_filter.as_str()),
            SearchKind::News => (&self.news_endpoint, NEWS_TIME_FILTER),
        };
        let payload = SerperRequest { q: query, num: self.num, tbs };
        debug!(%query, ?kind, tbs, "serper request");

        let response = self
            .client
            .post(endpoint)
            .header("X-API-KEY", key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::transport(PROVIDER, e))?;
        let response = provider::check_status(PROVIDER, response).await?;

        let body = response
            .json::<SerperResponse>()
            .await
            .map_err(|e| ProviderError::decode(PROVIDER, e))?;

        let items = match kind {
            SearchKind::Web => body.organic,
            SearchKind::News => body.news,
        };
        if items.is_empty() {
            warn!(%query, ?kind, "serper: no results");
        }

        Ok(items
            .into_iter()
            .map(|item| SearchResult { title: item.title, snippet: item.snippet, link: item.link })
            .collect())
    }
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct SerperRequest<'a> {
    q: &'a str,
    num: u8,
    tbs: &'a str,
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<Item>,
    #[serde(default)]
    news: Vec<Item>,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_is_configuration_error() {
        let s = SerperSearch::new(
            Client::new(),
            "http://localhost:0/search".into(),
            "http://localhost:0/news".into(),
            None,
            10,
            "qdr:d".into(),
        );
        let err = s.search("q", SearchKind::News).await.unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("SERPER_API_KEY"));
    }

    #[test]
    fn request_serialises_vendor_fields() {
        let body = serde_json::to_value(SerperRequest { q: "ai", num: 10, tbs: "qdr:d" }).unwrap();
        assert_eq!(body, serde_json::json!({"q": "ai", "num": 10, "tbs": "qdr:d"}));
    }

    #[test]
    fn response_tolerates_missing_sections() {
        let body: SerperResponse =
            serde_json::from_str(r#"{"searchParameters":{},"organic":[{"title":"a","link":"l"}]}"#).unwrap();
        assert_eq!(body.organic.len(), 1);
        assert_eq!(body.organic[0].snippet, "");
        assert!(body.news.is_empty());
    }
}
