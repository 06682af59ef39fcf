//! Transcript → intent classification.
//!
//! An ordered table of keyword rules, evaluated once, first match wins.
//! Matching is case-insensitive and substring based, so "trending news"
//! routes to News before Trends is ever considered.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    News,
    Papers,
    Trends,
    PostToSocial,
    GenerateImage,
    Search,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Intent::News => "news",
            Intent::Papers => "papers",
            Intent::Trends => "trends",
            Intent::PostToSocial => "post_to_social",
            Intent::GenerateImage => "generate_image",
            Intent::Search => "search",
        }
    }
}

/// A routed transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub intent: Intent,
    /// The transcript asked for fresh data ("refresh").
    pub refresh: bool,
}

type Rule = (fn(&str) -> bool, Intent);

const RULES: &[Rule] = &[
    (is_news, Intent::News),
    (is_papers, Intent::Papers),
    (is_trends, Intent::Trends),
    (is_post, Intent::PostToSocial),
    (is_image, Intent::GenerateImage),
];

fn is_news(t: &str) -> bool {
    t.contains("news")
}

fn is_papers(t: &str) -> bool {
    t.contains("papers")
}

fn is_trends(t: &str) -> bool {
    t.contains("trends")
}

fn is_post(t: &str) -> bool {
    t.contains("post") && (t.contains("twitter") || has_word(t, "x"))
}

fn is_image(t: &str) -> bool {
    t.contains("generate") && t.contains("image")
}

/// Classify `transcript`. Never fails; anything unmatched is a search.
pub fn classify(transcript: &str) -> Intent {
    let t = transcript.to_lowercase();
    RULES
        .iter()
        .find(|(matches, _)| matches(&t))
        .map(|(_, intent)| *intent)
        .unwrap_or(Intent::Search)
}

pub fn route(transcript: &str) -> Command {
    Command {
        intent: classify(transcript),
        refresh: transcript.to_lowercase().contains("refresh"),
    }
}

fn has_word(text: &str, word: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric()).any(|w| w == word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_map_to_intents() {
        assert_eq!(classify("Show me the latest AI news"), Intent::News);
        assert_eq!(classify("any new research PAPERS?"), Intent::Papers);
        assert_eq!(classify("what are the trends"), Intent::Trends);
        assert_eq!(classify("post this to twitter"), Intent::PostToSocial);
        assert_eq!(classify("post it on X"), Intent::PostToSocial);
        assert_eq!(classify("generate an image"), Intent::GenerateImage);
        assert_eq!(classify("who won the match yesterday"), Intent::Search);
    }

    #[test]
    fn first_rule_wins() {
        assert_eq!(classify("trending news"), Intent::News);
        assert_eq!(classify("post the news to twitter"), Intent::News);
        assert_eq!(classify("papers and trends"), Intent::Papers);
        assert_eq!(classify("generate an image and post to twitter"), Intent::PostToSocial);
    }

    #[test]
    fn x_must_be_its_own_word() {
        assert_eq!(classify("post the next example"), Intent::Search);
        assert_eq!(classify("post to x."), Intent::PostToSocial);
    }

    #[test]
    fn post_alone_is_a_search() {
        assert_eq!(classify("post office hours"), Intent::Search);
    }

    #[test]
    fn empty_transcript_is_a_search() {
        assert_eq!(classify(""), Intent::Search);
    }

    #[test]
    fn refresh_flag_is_independent_of_intent() {
        assert_eq!(route("refresh the news"), Command { intent: Intent::News, refresh: true });
        assert_eq!(route("papers"), Command { intent: Intent::Papers, refresh: false });
    }
}
