//! Search-then-summarise pipelines behind the content buckets.
//!
//! Each bucket runs one fixed query (or the user's own, for `search`)
//! through the search chain, renders the hits into a prompt template from
//! `config/prompts/` and sends it through the generation chain.
//!
//! Failures degrade instead of erroring: missing search results give a fixed
//! apology, an exhausted generation chain shows the raw search context.
//! Only a generation chain with no credentials at all is an error.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::llm::GenerationChain;
use crate::provider::ProviderError;
use crate::search::{self, SearchChain};

/// One content bucket. Holds the last fetched Markdown in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    News,
    Papers,
    Trends,
    Search,
}

impl Bucket {
    pub const ALL: [Bucket; 4] = [Bucket::News, Bucket::Papers, Bucket::Trends, Bucket::Search];

    pub fn as_str(self) -> &'static str {
        match self {
            Bucket::News => "news",
            Bucket::Papers => "papers",
            Bucket::Trends => "trends",
            Bucket::Search => "search",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.as_str().eq_ignore_ascii_case(name))
    }

    /// Subject phrase used when illustrating this bucket.
    pub fn image_topic(self) -> &'static str {
        match self {
            Bucket::News => "Futuristic AI News",
            Bucket::Papers => "Scientific Research Abstract",
            Bucket::Trends => "Data Analytics Visualization",
            Bucket::Search => "Abstract AI Concept",
        }
    }
}

pub const NEWS_QUERY: &str = "latest trending AI news today";
pub const PAPERS_QUERY: &str = "latest AI research papers arxiv neurips 2025";
pub const TRENDS_QUERY: &str = "trending topics in artificial intelligence today discussions";

pub const NEWS_UNAVAILABLE: &str = "Unable to retrieve trending AI news at this time. \
Please check your search API configuration or internet connection.";
pub const PAPERS_UNAVAILABLE: &str = "Unable to retrieve latest research papers at this time. \
Please check your search API configuration.";
pub const TRENDS_UNAVAILABLE: &str = "Unable to analyze trending topics at this time. \
Please check your search API configuration.";

const RAW_RESULTS_NOTE: &str = "**Note: AI generation limit reached. Showing raw search results:**";

/// Static description of one bucket's pipeline.
struct Pipeline {
    query: Option<&'static str>,
    recent: bool,
    links: bool,
    empty_message: Option<&'static str>,
    template_file: &'static str,
    builtin_template: &'static str,
}

fn pipeline(bucket: Bucket) -> Pipeline {
    match bucket {
        Bucket::News => Pipeline {
            query: Some(NEWS_QUERY),
            recent: true,
            links: true,
            empty_message: Some(NEWS_UNAVAILABLE),
            template_file: "news_brief.txt",
            builtin_template: "Summarise the top trending AI news stories from these search results, \
as a bulleted list with headlines, short summaries and links:\n\n{{context}}",
        },
        Bucket::Papers => Pipeline {
            query: Some(PAPERS_QUERY),
            recent: false,
            links: true,
            empty_message: Some(PAPERS_UNAVAILABLE),
            template_file: "papers_brief.txt",
            builtin_template: "List the latest AI research papers found in these search results, \
with titles, authors, short abstracts and dates:\n\n{{context}}",
        },
        Bucket::Trends => Pipeline {
            query: Some(TRENDS_QUERY),
            recent: false,
            links: false,
            empty_message: Some(TRENDS_UNAVAILABLE),
            template_file: "trends_brief.txt",
            builtin_template: "Analyse today's trending AI topics based on these search results:\n\n{{context}}",
        },
        Bucket::Search => Pipeline {
            query: None,
            recent: false,
            links: true,
            empty_message: None,
            template_file: "general_search.txt",
            builtin_template: "Answer the user's query in Markdown.\n\nUser Query: \"{{query}}\"\n\n\
Real-time Search Context:\n{{context}}\n\nResponse:",
        },
    }
}

#[derive(Debug, Clone)]
pub struct Briefings {
    search: SearchChain,
    generation: GenerationChain,
    templates: Arc<HashMap<Bucket, String>>,
}

impl Briefings {
    /// Prompt templates are read from `prompts_dir` here, once; a missing
    /// file falls back to the bucket's built-in template.
    pub fn new(search: SearchChain, generation: GenerationChain, prompts_dir: PathBuf) -> Self {
        let templates = Bucket::ALL
            .into_iter()
            .map(|b| (b, load_template(&prompts_dir, &pipeline(b))))
            .collect();
        Self { search, generation, templates: Arc::new(templates) }
    }

    pub fn search_chain(&self) -> &SearchChain {
        &self.search
    }

    pub fn generation_chain(&self) -> &GenerationChain {
        &self.generation
    }

    pub async fn news(&self) -> Result<String, ProviderError> {
        self.fetch(Bucket::News, "").await
    }

    pub async fn papers(&self) -> Result<String, ProviderError> {
        self.fetch(Bucket::Papers, "").await
    }

    pub async fn trends(&self) -> Result<String, ProviderError> {
        self.fetch(Bucket::Trends, "").await
    }

    /// Answer a free-form question grounded in a web search.
    pub async fn answer(&self, query: &str) -> Result<String, ProviderError> {
        self.fetch(Bucket::Search, query).await
    }

    /// Run `bucket`'s pipeline. `query` is only used by [`Bucket::Search`].
    pub async fn fetch(&self, bucket: Bucket, query: &str) -> Result<String, ProviderError> {
        if !self.generation.is_configured() {
            return Err(ProviderError::Configuration(
                "generation: no configured provider".to_string(),
            ));
        }
        let p = pipeline(bucket);
        let query = p.query.unwrap_or(query);
        info!(bucket = bucket.as_str(), %query, "briefing");

        let results = if p.recent {
            self.search.search_news(query).await
        } else {
            self.search.search(query).await
        };
        let results = results.unwrap_or_else(|e| {
            warn!(bucket = bucket.as_str(), error = %e, "search failed, continuing without context");
            Vec::new()
        });

        let context = search::format_context(&results, p.links);
        if context.is_empty() {
            if let Some(message) = p.empty_message {
                return Ok(message.to_string());
            }
        }

        let prompt = self.render(bucket, &p, &context, query);
        debug!(bucket = bucket.as_str(), prompt_len = prompt.len(), "briefing prompt built");

        match self.generation.generate(&prompt).await {
            Ok(text) => Ok(text),
            Err(e) if e.is_configuration() => Err(e),
            Err(e) if !context.is_empty() => {
                warn!(bucket = bucket.as_str(), error = %e, "generation exhausted, returning raw results");
                Ok(format!("{RAW_RESULTS_NOTE}\n\n{context}"))
            }
            Err(e) => {
                warn!(bucket = bucket.as_str(), error = %e, "generation exhausted without context");
                Ok(format!("Unable to perform search. API Error: {e}"))
            }
        }
    }

    fn render(&self, bucket: Bucket, p: &Pipeline, context: &str, query: &str) -> String {
        let template = self.templates.get(&bucket).map_or(p.builtin_template, String::as_str);
        fill(template, &[("context", context), ("query", query)])
    }
}

fn load_template(dir: &Path, p: &Pipeline) -> String {
    let path = dir.join(p.template_file);
    fs::read_to_string(&path).unwrap_or_else(|_| {
        debug!(path = %path.display(), "prompt file missing, using built-in template");
        p.builtin_template.to_string()
    })
}

/// Substitute `{{name}}` placeholders in one pass. Substituted text is never
/// rescanned, and unknown placeholders are left as they are.
fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let value = after
            .find("}}")
            .and_then(|end| vars.iter().find(|(name, _)| *name == &after[..end]).map(|(_, v)| (end, *v)));
        match value {
            Some((end, v)) => {
                out.push_str(v);
                rest = &after[end + 2..];
            }
            None => {
                out.push_str("{{");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
