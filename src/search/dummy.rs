//! Dummy search provider: answers from a fixed script, no network.
//!
//! Selected with `providers = ["dummy"]` for offline runs and used by tests
//! to observe which tier received which query. Clones share the call log.

use std::sync::{Arc, Mutex};

use crate::provider::ProviderError;

use super::{SearchKind, SearchResult};

#[derive(Debug, Clone)]
enum Reply {
    Results(Vec<SearchResult>),
    Fail(String),
}

#[derive(Debug, Clone)]
pub struct DummySearch {
    name: String,
    web: Reply,
    news: Reply,
    configured: bool,
    calls: Arc<Mutex<Vec<(SearchKind, String)>>>,
}

impl DummySearch {
    /// Configured provider that returns zero results for every query.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            web: Reply::Results(Vec::new()),
            news: Reply::Results(Vec::new()),
            configured: true,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn web_results(mut self, results: Vec<SearchResult>) -> Self {
        self.web = Reply::Results(results);
        self
    }

    pub fn web_fails(mut self, message: impl Into<String>) -> Self {
        self.web = Reply::Fail(message.into());
        self
    }

    pub fn news_results(mut self, results: Vec<SearchResult>) -> Self {
        self.news = Reply::Results(results);
        self
    }

    pub fn news_fails(mut self, message: impl Into<String>) -> Self {
        self.news = Reply::Fail(message.into());
        self
    }

    /// Behave as if the provider's credentials were absent.
    pub fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Every `(kind, query)` this provider (or a clone of it) received.
    pub fn calls(&self) -> Vec<(SearchKind, String)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub(crate) fn credential_check(&self) -> Result<(), ProviderError> {
        if self.configured {
            Ok(())
        } else {
            Err(ProviderError::Configuration(format!("{} credentials are not set", self.name)))
        }
    }

    pub async fn search(&self, query: &str, kind: SearchKind) -> Result<Vec<SearchResult>, ProviderError> {
        self.credential_check()?;
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((kind, query.to_string()));
        }
        let reply = match kind {
            SearchKind::Web => &self.web,
            SearchKind::News => &self.news,
        };
        match reply {
            Reply::Results(r) => Ok(r.clone()),
            Reply::Fail(m) => Err(ProviderError::Transport { provider: "dummy", message: m.clone() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_returns_empty_for_both_kinds() {
        let p = DummySearch::new("d");
        assert!(p.search("q", SearchKind::Web).await.unwrap().is_empty());
        assert!(p.search("q", SearchKind::News).await.unwrap().is_empty());
        assert_eq!(p.calls().len(), 2);
    }

    #[tokio::test]
    async fn unconfigured_records_nothing() {
        let p = DummySearch::new("d").unconfigured();
        assert!(p.search("q", SearchKind::Web).await.unwrap_err().is_configuration());
        assert!(p.calls().is_empty());
    }

    #[tokio::test]
    async fn clones_share_call_log() {
        let p = DummySearch::new("d");
        let q = p.clone();
        q.search("from clone", SearchKind::Web).await.unwrap();
        assert_eq!(p.calls(), vec![(SearchKind::Web, "from clone".to_string())]);
    }
}
