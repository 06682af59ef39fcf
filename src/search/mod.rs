//! Web and news search behind an ordered provider chain.
//!
//! `SearchProvider` is an enum over concrete backends (enum dispatch, no
//! trait objects). `SearchChain` walks them in configured order: Google
//! Custom Search first, Serper as the fallback.
//!
//! Zero results is a successful answer and never moves the chain to the next
//! tier. The only empty-result rule is in [`SearchChain::search_news`], which
//! retries an empty news answer against the generic web chain.

pub mod dummy;
pub mod google;
pub mod serper;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::chain::{self, Tier};
use crate::config::{SearchBackend, SearchConfig, Secrets};
use crate::provider::ProviderError;

/// One hit, normalised across vendors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub snippet: String,
    pub link: String,
}

impl SearchResult {
    pub fn new(title: impl Into<String>, snippet: impl Into<String>, link: impl Into<String>) -> Self {
        Self { title: title.into(), snippet: snippet.into(), link: link.into() }
    }
}

/// Which vendor endpoint family to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Web,
    /// Restricted to the recency window via the vendor's date filter.
    News,
}

#[derive(Debug, Clone)]
pub enum SearchProvider {
    Google(google::GoogleSearch),
    Serper(serper::SerperSearch),
    Dummy(dummy::DummySearch),
}

impl SearchProvider {
    pub async fn search(&self, query: &str, kind: SearchKind) -> Result<Vec<SearchResult>, ProviderError> {
        match self {
            SearchProvider::Google(p) => p.search(query, kind).await,
            SearchProvider::Serper(p) => p.search(query, kind).await,
            SearchProvider::Dummy(p) => p.search(query, kind).await,
        }
    }
}

impl Tier for SearchProvider {
    fn label(&self) -> String {
        match self {
            SearchProvider::Google(_) => "google".to_string(),
            SearchProvider::Serper(_) => "serper".to_string(),
            SearchProvider::Dummy(p) => p.name().to_string(),
        }
    }

    fn credential_check(&self) -> Result<(), ProviderError> {
        match self {
            SearchProvider::Google(p) => p.credentials().map(|_| ()),
            SearchProvider::Serper(p) => p.api_key().map(|_| ()),
            SearchProvider::Dummy(p) => p.credential_check(),
        }
    }
}

/// Ordered list of search providers.
#[derive(Debug, Clone)]
pub struct SearchChain {
    tiers: Vec<SearchProvider>,
}

impl SearchChain {
    pub fn new(tiers: Vec<SearchProvider>) -> Self {
        Self { tiers }
    }

    /// Build the chain from config, sharing one HTTP client across tiers.
    pub fn from_config(config: &SearchConfig, secrets: &Secrets, client: &Client) -> Self {
        let tiers = config
            .providers
            .iter()
            .map(|backend| match backend {
                SearchBackend::Google => SearchProvider::Google(google::GoogleSearch::new(
                    client.clone(),
                    config.google.endpoint.clone(),
                    secrets.google_search_api_key.clone(),
                    secrets.google_search_engine_id.clone(),
                    config.num_results,
                    config.google.news_date_restrict.clone(),
                )),
                SearchBackend::Serper => SearchProvider::Serper(serper::SerperSearch::new(
                    client.clone(),
                    config.serper.search_endpoint.clone(),
                    config.serper.news_endpoint.clone(),
                    secrets.serper_api_key.clone(),
                    config.num_results,
                    config.serper.time_filter.clone(),
                )),
                SearchBackend::Dummy => SearchProvider::Dummy(dummy::DummySearch::new("dummy")),
            })
            .collect();
        Self { tiers }
    }

    pub fn is_configured(&self) -> bool {
        chain::any_configured(&self.tiers)
    }

    pub fn tiers(&self) -> &[SearchProvider] {
        &self.tiers
    }

    /// Generic web search across the chain.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>, ProviderError> {
        info!(%query, "search");
        chain::walk("search", &self.tiers, |p| p.search(query, SearchKind::Web)).await
    }

    /// Recency-restricted search. An empty or failed news answer falls back
    /// to [`SearchChain::search`] with the same query; a missing-credential
    /// error does not.
    pub async fn search_news(&self, query: &str) -> Result<Vec<SearchResult>, ProviderError> {
        info!(%query, "news search");
        match chain::walk("news", &self.tiers, |p| p.search(query, SearchKind::News)).await {
            Ok(results) if !results.is_empty() => Ok(results),
            Ok(_) => {
                info!(%query, "news search returned no results, falling back to web search");
                self.search(query).await
            }
            Err(e) if e.is_configuration() => Err(e),
            Err(e) => {
                warn!(%query, error = %e, "news search failed, falling back to web search");
                self.search(query).await
            }
        }
    }
}

/// Render results as the bullet list fed to the generation prompt.
pub fn format_context(results: &[SearchResult], with_links: bool) -> String {
    results
        .iter()
        .map(|r| {
            if with_links {
                format!("- {}: {} ({})", r.title, r.snippet, r.link)
            } else {
                format!("- {}: {}", r.title, r.snippet)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use dummy::DummySearch;

    fn hits(n: usize) -> Vec<SearchResult> {
        (1..=n)
            .map(|i| SearchResult::new(format!("t{i}"), format!("s{i}"), format!("https://e/{i}")))
            .collect()
    }

    #[tokio::test]
    async fn primary_failure_calls_secondary_once_with_identical_query() {
        let google = DummySearch::new("google").web_fails("HTTP 500");
        let serper = DummySearch::new("serper").web_results(hits(2));
        let chain = SearchChain::new(vec![
            SearchProvider::Dummy(google.clone()),
            SearchProvider::Dummy(serper.clone()),
        ]);

        let out = chain.search("rust async").await.unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(google.calls(), vec![(SearchKind::Web, "rust async".to_string())]);
        assert_eq!(serper.calls(), vec![(SearchKind::Web, "rust async".to_string())]);
    }

    #[tokio::test]
    async fn empty_success_does_not_fall_back() {
        let google = DummySearch::new("google");
        let serper = DummySearch::new("serper").web_results(hits(3));
        let chain = SearchChain::new(vec![
            SearchProvider::Dummy(google.clone()),
            SearchProvider::Dummy(serper.clone()),
        ]);

        let out = chain.search("nothing here").await.unwrap();
        assert!(out.is_empty());
        assert!(serper.calls().is_empty());
    }

    #[tokio::test]
    async fn both_failing_is_exhausted() {
        let chain = SearchChain::new(vec![
            SearchProvider::Dummy(DummySearch::new("google").web_fails("a")),
            SearchProvider::Dummy(DummySearch::new("serper").web_fails("b")),
        ]);
        let err = chain.search("q").await.unwrap_err();
        assert!(matches!(err, ProviderError::Exhausted { chain: "search", .. }));
    }

    #[tokio::test]
    async fn empty_news_falls_back_to_web_with_same_query() {
        let google = DummySearch::new("google").web_results(hits(3));
        let chain = SearchChain::new(vec![SearchProvider::Dummy(google.clone())]);

        let out = chain.search_news("latest AI news").await.unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(
            google.calls(),
            vec![
                (SearchKind::News, "latest AI news".to_string()),
                (SearchKind::Web, "latest AI news".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn news_results_are_returned_without_web_call() {
        let google = DummySearch::new("google").news_results(hits(1));
        let chain = SearchChain::new(vec![SearchProvider::Dummy(google.clone())]);
        assert_eq!(chain.search_news("q").await.unwrap().len(), 1);
        assert_eq!(google.calls().len(), 1);
    }

    #[tokio::test]
    async fn failed_news_chain_falls_back_to_web() {
        let google = DummySearch::new("google").news_fails("down").web_results(hits(1));
        let serper = DummySearch::new("serper").news_fails("down");
        let chain = SearchChain::new(vec![
            SearchProvider::Dummy(google.clone()),
            SearchProvider::Dummy(serper.clone()),
        ]);
        assert_eq!(chain.search_news("q").await.unwrap().len(), 1);
        assert_eq!(serper.calls(), vec![(SearchKind::News, "q".to_string())]);
    }

    #[tokio::test]
    async fn unconfigured_chain_fails_before_any_call() {
        let google = DummySearch::new("google").unconfigured();
        let serper = DummySearch::new("serper").unconfigured();
        let chain = SearchChain::new(vec![
            SearchProvider::Dummy(google.clone()),
            SearchProvider::Dummy(serper.clone()),
        ]);
        assert!(chain.search("q").await.unwrap_err().is_configuration());
        assert!(chain.search_news("q").await.unwrap_err().is_configuration());
        assert!(google.calls().is_empty() && serper.calls().is_empty());
        assert!(!chain.is_configured());
    }

    #[test]
    fn context_lines_include_links_when_asked() {
        let r = hits(2);
        assert_eq!(format_context(&r, true), "- t1: s1 (https://e/1)\n- t2: s2 (https://e/2)");
        assert_eq!(format_context(&r, false), "- t1: s1\n- t2: s2");
        assert_eq!(format_context(&[], true), "");
    }
}
