//! One conversational session: routes transcripts and keeps the buckets.
//!
//! The session remembers the last content fetched for each bucket, which
//! bucket is active, the previous transcript and the last generated image.
//! It is owned by a single channel task and never shared.

use std::collections::HashMap;
use std::fmt;

use tracing::{info, warn};

use crate::briefing::Briefings;
use crate::image::{GeneratedImage, ImageProvider};
use crate::intent::{self, Intent};
use crate::social::{PostReceipt, SocialProvider};

pub use crate::briefing::Bucket;

/// Characters of the previous transcript quoted in the image prompt.
const IMAGE_SUBJECT_CHARS: usize = 20;

/// Last fetched Markdown per bucket. Overwritten on fetch, never merged.
#[derive(Debug, Clone, Default)]
pub struct Buckets {
    content: HashMap<Bucket, String>,
}

impl Buckets {
    pub fn get(&self, bucket: Bucket) -> Option<&str> {
        self.content.get(&bucket).map(String::as_str).filter(|c| !c.is_empty())
    }

    pub fn is_empty(&self, bucket: Bucket) -> bool {
        self.get(bucket).is_none()
    }

    pub fn set(&mut self, bucket: Bucket, content: String) {
        self.content.insert(bucket, content);
    }
}

/// What a transcript produced, ready to show the user.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Content { bucket: Bucket, text: String, fetched: bool },
    Posted(PostReceipt),
    NothingToPost,
    ImageReady { prompt: String, image: GeneratedImage },
    NothingToIllustrate,
    Failed { intent: Intent, message: String },
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Content { bucket, text, .. } => write!(f, "[{}]\n{text}", bucket.as_str()),
            Outcome::Posted(r) => write!(f, "Posted: {}", r.permalink),
            Outcome::NothingToPost => f.write_str("Nothing to post yet. Ask for news, papers, trends or a search first."),
            Outcome::ImageReady { image, .. } => match (&image.url, &image.base64) {
                (Some(url), _) => write!(f, "Image ready: {url}"),
                (None, Some(b)) => write!(f, "Image ready ({} base64 chars).", b.len()),
                (None, None) => f.write_str("Image ready."),
            },
            Outcome::NothingToIllustrate => f.write_str("Nothing to illustrate yet. Fetch some content first."),
            Outcome::Failed { intent, message } => write!(f, "Failed to {}: {message}", intent.as_str()),
        }
    }
}

pub struct Assistant {
    briefings: Briefings,
    social: SocialProvider,
    images: ImageProvider,
    max_post_chars: usize,
    buckets: Buckets,
    active: Option<Bucket>,
    last_transcript: String,
    last_image: Option<String>,
}

impl Assistant {
    pub fn new(briefings: Briefings, social: SocialProvider, images: ImageProvider, max_post_chars: usize) -> Self {
        Self {
            briefings,
            social,
            images,
            max_post_chars,
            buckets: Buckets::default(),
            active: None,
            last_transcript: String::new(),
            last_image: None,
        }
    }

    pub fn active(&self) -> Option<Bucket> {
        self.active
    }

    pub fn buckets(&self) -> &Buckets {
        &self.buckets
    }

    /// The last generated image as a `data:` URI.
    pub fn last_image(&self) -> Option<&str> {
        self.last_image.as_deref()
    }

    pub async fn handle_transcript(&mut self, text: &str) -> Outcome {
        let command = intent::route(text);
        let previous = std::mem::replace(&mut self.last_transcript, text.to_string());
        info!(intent = command.intent.as_str(), refresh = command.refresh, "transcript routed");

        if !matches!(command.intent, Intent::PostToSocial | Intent::GenerateImage) {
            self.last_image = None;
        }

        match command.intent {
            Intent::News => self.show(Bucket::News, command.refresh, "").await,
            Intent::Papers => self.show(Bucket::Papers, command.refresh, "").await,
            Intent::Trends => self.show(Bucket::Trends, command.refresh, "").await,
            Intent::Search => self.show(Bucket::Search, true, text).await,
            Intent::PostToSocial => self.post_active().await,
            Intent::GenerateImage => self.illustrate_active(&previous).await,
        }
    }

    async fn show(&mut self, bucket: Bucket, refresh: bool, query: &str) -> Outcome {
        self.active = Some(bucket);
        if !refresh {
            if let Some(text) = self.buckets.get(bucket) {
                return Outcome::Content { bucket, text: text.to_string(), fetched: false };
            }
        }
        match self.briefings.fetch(bucket, query).await {
            Ok(text) => {
                self.buckets.set(bucket, text.clone());
                Outcome::Content { bucket, text, fetched: true }
            }
            Err(e) => {
                warn!(bucket = bucket.as_str(), error = %e, "fetch failed");
                Outcome::Failed { intent: intent_for(bucket), message: e.to_string() }
            }
        }
    }

    fn active_content(&self) -> Option<(Bucket, &str)> {
        let bucket = self.active?;
        self.buckets.get(bucket).map(|c| (bucket, c))
    }

    async fn post_active(&mut self) -> Outcome {
        let Some((_, content)) = self.active_content() else {
            return Outcome::NothingToPost;
        };
        let text: String = content.chars().take(self.max_post_chars).collect();
        match self.social.post(&text, self.last_image.as_deref()).await {
            Ok(receipt) => {
                self.last_image = None;
                Outcome::Posted(receipt)
            }
            Err(e) => {
                warn!(error = %e, "post failed");
                Outcome::Failed { intent: Intent::PostToSocial, message: e.to_string() }
            }
        }
    }

    async fn illustrate_active(&mut self, previous_transcript: &str) -> Outcome {
        let Some((bucket, _)) = self.active_content() else {
            return Outcome::NothingToIllustrate;
        };
        let prompt = image_prompt(bucket, previous_transcript);
        match self.images.generate(&prompt).await {
            Ok(image) => {
                self.last_image = image.data_uri();
                Outcome::ImageReady { prompt, image }
            }
            Err(e) => {
                warn!(error = %e, "image generation failed");
                Outcome::Failed { intent: Intent::GenerateImage, message: e.to_string() }
            }
        }
    }
}

fn intent_for(bucket: Bucket) -> Intent {
    match bucket {
        Bucket::News => Intent::News,
        Bucket::Papers => Intent::Papers,
        Bucket::Trends => Intent::Trends,
        Bucket::Search => Intent::Search,
    }
}

pub fn image_prompt(bucket: Bucket, transcript: &str) -> String {
    let subject: String = transcript.chars().take(IMAGE_SUBJECT_CHARS).collect();
    format!(
        "A futuristic, high-quality digital art illustration representing {} about {subject}. \
Cyberpunk style, detailed, 4k.",
        bucket.image_topic()
    )
}
