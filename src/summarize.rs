// src/summarize.rs
//! Post text generation.
//!
//! `Summarizer` resolves the prompt for a run (headline digest, or a random
//! topic when the fetch was skipped) and hands it to a `TextGenerator`.
//! The production generator talks to Google Gemini's generateContent API.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ConfigStore;
use crate::error::AgentError;
use crate::news::NewsBatch;

/// Published verbatim when there is neither news nor a topic to write about.
pub const NO_NEWS_FALLBACK: &str = "No financial news available at this time.";

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, AgentError>;
    /// Short generator label for logs.
    fn name(&self) -> &'static str;
}

/// Headline fields worth showing the model. Everything else in a news item
/// (sentiment scores, tickers, authors) only burns prompt budget.
#[derive(Debug, Serialize)]
struct Headline<'a> {
    title: &'a str,
    summary: &'a str,
    url: &'a str,
    image: Option<&'a str>,
    source: &'a str,
}

/// Build the batch-mode prompt: instruction text plus a pretty-printed JSON
/// digest of the headlines. A configured fixed prompt replaces the built-in
/// instruction; the digest is appended either way.
pub fn build_batch_prompt(batch: &NewsBatch, fixed_prompt: Option<&str>) -> String {
    let headlines: Vec<Headline<'_>> = batch
        .feed
        .iter()
        .map(|item| Headline {
            title: &item.title,
            summary: &item.summary,
            url: &item.url,
            image: item.banner_image.as_deref(),
            source: &item.source,
        })
        .collect();
    let digest = serde_json::to_string_pretty(&headlines).unwrap_or_else(|_| "[]".to_string());

    match fixed_prompt {
        Some(fixed) => format!("{fixed}\n{digest}"),
        None => format!(
            "Create an engaging tweet about the latest financial news. \
             Here are the recent headlines:\n{digest}\n\
             The tweet should be insightful, include relevant hashtags, \
             and be under 280 characters."
        ),
    }
}

/// Build the topic-mode prompt used when no news was fetched.
pub fn build_topic_prompt(topic: &str, fixed_prompt: Option<&str>) -> String {
    match fixed_prompt {
        Some(fixed) => format!("{fixed}\nTopic: {topic}"),
        None => format!(
            "Write one engaging tweet about {topic}. \
             Give exactly one tweet, not several candidates to pick from. \
             It should be insightful, include relevant hashtags, \
             and be under 280 characters."
        ),
    }
}

/// Pick a topic uniformly at random from the configured pool.
pub fn pick_topic(topics: &[String]) -> Option<&str> {
    use rand::Rng;
    if topics.is_empty() {
        return None;
    }
    let idx = rand::rng().random_range(0..topics.len());
    Some(topics[idx].as_str())
}

pub struct Summarizer {
    generator: Arc<dyn TextGenerator>,
}

impl Summarizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Resolve the prompt for this run and generate the post text.
    ///
    /// `batch: None` means the fetch was skipped and a topic run is wanted.
    /// With neither news nor topics the canned fallback comes back without
    /// touching the generator.
    pub async fn summarize(
        &self,
        batch: Option<&NewsBatch>,
        fixed_prompt: Option<&str>,
        topics: &[String],
    ) -> Result<String, AgentError> {
        let prompt = match batch {
            Some(batch) if batch.is_empty() => {
                warn!("no news items to summarize, using fallback text");
                return Ok(NO_NEWS_FALLBACK.to_string());
            }
            Some(batch) => {
                debug!(items = batch.len(), "building headline digest prompt");
                build_batch_prompt(batch, fixed_prompt)
            }
            None => match pick_topic(topics) {
                Some(topic) => {
                    info!(topic, "news fetch skipped, writing about a topic");
                    build_topic_prompt(topic, fixed_prompt)
                }
                None => {
                    warn!("no news and no topics configured, using fallback text");
                    return Ok(NO_NEWS_FALLBACK.to_string());
                }
            },
        };

        debug!(
            generator = self.generator.name(),
            prompt_chars = prompt.chars().count(),
            "requesting post text"
        );
        self.generator.generate(&prompt).await
    }
}

#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    role: &'a str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiCandidateContent,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiCandidatePart>,
}

#[derive(Deserialize)]
struct GeminiCandidatePart {
    text: String,
}

pub struct GeminiClient {
    http: reqwest::Client,
    store: Arc<ConfigStore>,
}

impl GeminiClient {
    pub fn new(store: Arc<ConfigStore>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("finnews-agent/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(60))
            .build()
            .expect("reqwest client");
        Self { http, store }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, AgentError> {
        let cfg = self.store.load()?;
        let model = cfg.gemini.model.as_str();
        let url = format!(
            "{GEMINI_ENDPOINT}/{model}:generateContent?key={}",
            cfg.gemini.api_key
        );
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart { text: prompt }],
            }],
        };

        debug!(model, "calling gemini generateContent");
        let resp = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("gemini request")
            .map_err(AgentError::Summarization)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AgentError::Summarization(anyhow!(
                "gemini responded {status}: {}",
                snippet(&body)
            )));
        }

        let parsed: GeminiResponse = resp
            .json()
            .await
            .context("decoding gemini response")
            .map_err(AgentError::Summarization)?;
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| AgentError::Summarization(anyhow!("gemini returned no candidates")))?;

        debug!(chars = text.chars().count(), "gemini returned post text");
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

fn snippet(body: &str) -> String {
    body.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::news::NewsItem;
    use std::sync::Mutex;

    fn batch_of(titles: &[&str]) -> NewsBatch {
        NewsBatch {
            feed: titles
                .iter()
                .map(|t| NewsItem {
                    title: t.to_string(),
                    url: format!("https://example.com/{t}"),
                    summary: format!("summary of {t}"),
                    banner_image: Some("https://example.com/img.png".to_string()),
                    source: "Example Wire".to_string(),
                    ..NewsItem::default()
                })
                .collect(),
            sentiment_score_definition: None,
        }
    }

    /// Records every prompt it sees and answers with a fixed string.
    struct RecordingGenerator {
        prompts: Mutex<Vec<String>>,
        reply: &'static str,
    }

    impl RecordingGenerator {
        fn new(reply: &'static str) -> Arc<Self> {
            Arc::new(Self {
                prompts: Mutex::new(Vec::new()),
                reply,
            })
        }
    }

    #[async_trait]
    impl TextGenerator for RecordingGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, AgentError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.to_string())
        }

        fn name(&self) -> &'static str {
            "recording"
        }
    }

    #[test]
    fn batch_prompt_embeds_titles_as_json() {
        let batch = batch_of(&["Markets rally", "Fed holds"]);
        let prompt = build_batch_prompt(&batch, None);

        assert!(prompt.contains("Markets rally"));
        assert!(prompt.contains("Fed holds"));
        assert!(prompt.contains(r#""title""#));
        assert!(prompt.contains(r#""image""#));
        assert!(prompt.contains("280 characters"));
        // Only the projected fields appear.
        assert!(!prompt.contains("sentiment"));
    }

    #[test]
    fn fixed_prompt_replaces_instructions_but_keeps_the_digest() {
        let batch = batch_of(&["Oil dips"]);
        let prompt = build_batch_prompt(&batch, Some("Summarize like a pirate."));

        assert!(prompt.starts_with("Summarize like a pirate."));
        assert!(prompt.contains("Oil dips"));
        assert!(!prompt.contains("Create an engaging tweet"));
    }

    #[test]
    fn topic_prompt_names_the_topic() {
        let prompt = build_topic_prompt("quantitative easing", None);
        assert!(prompt.contains("quantitative easing"));
        assert!(prompt.contains("exactly one tweet"));

        let fixed = build_topic_prompt("gold", Some("Be brief."));
        assert!(fixed.starts_with("Be brief."));
        assert!(fixed.ends_with("Topic: gold"));
    }

    #[test]
    fn pick_topic_stays_inside_the_pool() {
        let pool: Vec<String> = ["ai", "rates", "crypto"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        for _ in 0..50 {
            let picked = pick_topic(&pool).unwrap();
            assert!(pool.iter().any(|t| t == picked));
        }
        assert_eq!(pick_topic(&[]), None);
    }

    #[test]
    fn single_topic_pool_is_deterministic() {
        let pool = vec!["bonds".to_string()];
        assert_eq!(pick_topic(&pool), Some("bonds"));
    }

    #[tokio::test]
    async fn summarize_sends_the_digest_to_the_generator() {
        let generator = RecordingGenerator::new("a tweet");
        let summarizer = Summarizer::new(generator.clone());
        let batch = batch_of(&["Markets rally"]);

        let text = summarizer
            .summarize(Some(&batch), None, &[])
            .await
            .unwrap();

        assert_eq!(text, "a tweet");
        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Markets rally"));
    }

    #[tokio::test]
    async fn no_batch_and_no_topics_returns_fallback_without_a_call() {
        let generator = RecordingGenerator::new("should not appear");
        let summarizer = Summarizer::new(generator.clone());

        let text = summarizer.summarize(None, None, &[]).await.unwrap();

        assert_eq!(text, NO_NEWS_FALLBACK);
        assert!(generator.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_batch_returns_fallback_without_a_call() {
        let generator = RecordingGenerator::new("should not appear");
        let summarizer = Summarizer::new(generator.clone());
        let batch = NewsBatch::empty();

        let text = summarizer.summarize(Some(&batch), None, &[]).await.unwrap();

        assert_eq!(text, NO_NEWS_FALLBACK);
        assert!(generator.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn skipped_fetch_with_topics_runs_in_topic_mode() {
        let generator = RecordingGenerator::new("topic tweet");
        let summarizer = Summarizer::new(generator.clone());
        let topics = vec!["inflation".to_string()];

        let text = summarizer.summarize(None, None, &topics).await.unwrap();

        assert_eq!(text, "topic tweet");
        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts[0].contains("inflation"));
    }
}
