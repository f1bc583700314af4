// src/news/mod.rs
//! News acquisition: the `NewsSource` seam and the Alpha Vantage client.
//!
//! The client distinguishes hard failures (transport errors, non-2xx) from
//! soft ones: a response without a usable `feed` array is logged and treated
//! as an empty batch, because Alpha Vantage answers rate-limit and quota
//! conditions with 200 and an information object instead of the feed.

pub mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::ConfigStore;
use crate::error::AgentError;

pub use types::{NewsBatch, NewsItem, NewsQuery, TickerSentiment, TopicRelevance};

const NEWS_ENDPOINT: &str = "https://www.alphavantage.co/query";

#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn fetch(&self, query: &NewsQuery) -> Result<NewsBatch, AgentError>;
    /// Short source label for logs.
    fn name(&self) -> &'static str;
}

pub struct AlphaVantageClient {
    http: reqwest::Client,
    store: Arc<ConfigStore>,
}

impl AlphaVantageClient {
    pub fn new(store: Arc<ConfigStore>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("finnews-agent/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client");
        Self { http, store }
    }
}

#[async_trait]
impl NewsSource for AlphaVantageClient {
    async fn fetch(&self, query: &NewsQuery) -> Result<NewsBatch, AgentError> {
        let cfg = self.store.load()?;
        let api_key = cfg.alphavantage.api_key.as_str();
        let url = build_query_url(query, api_key);
        debug!(url = %redact_key(&url, api_key), "fetching news");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("alpha vantage request")
            .map_err(AgentError::NewsFetch)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AgentError::NewsFetch(anyhow!(
                "alpha vantage responded {status}: {}",
                snippet(&body)
            )));
        }
        let body = resp
            .text()
            .await
            .context("reading alpha vantage response body")
            .map_err(AgentError::NewsFetch)?;

        let batch = parse_news_body(&body);
        info!(items = batch.len(), "retrieved news items");
        if let Some(legend) = batch.sentiment_score_definition.as_deref() {
            debug!(%legend, "sentiment score definition");
        }
        Ok(batch)
    }

    fn name(&self) -> &'static str {
        "alphavantage"
    }
}

/// Assemble the NEWS_SENTIMENT query URL. Topics are comma-joined; optional
/// parameters are appended only when present; the key goes last.
fn build_query_url(query: &NewsQuery, api_key: &str) -> String {
    let topics = query.topics.join(",");
    let mut url = format!(
        "{NEWS_ENDPOINT}?function=NEWS_SENTIMENT&topics={topics}&limit={}",
        query.limit
    );
    if let Some(time_from) = query.time_from.as_deref() {
        url.push_str("&time_from=");
        url.push_str(time_from);
    }
    if let Some(sort) = query.sort.as_deref() {
        url.push_str("&sort=");
        url.push_str(sort);
    }
    url.push_str("&apikey=");
    url.push_str(api_key);
    url
}

/// Replace the API key before the URL reaches any log line.
fn redact_key(url: &str, api_key: &str) -> String {
    if api_key.is_empty() {
        return url.to_string();
    }
    url.replace(api_key, "REDACTED")
}

/// Decode a NEWS_SENTIMENT response body into a batch.
///
/// Unparsable bodies and bodies without a well-formed `feed` array come back
/// as an empty batch with a warning, never an error.
pub fn parse_news_body(body: &str) -> NewsBatch {
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(err) => {
            warn!(error = %err, "alpha vantage body is not JSON, treating as empty feed");
            return NewsBatch::empty();
        }
    };

    let feed_value = match value.get("feed") {
        Some(v) => v.clone(),
        None => {
            warn!("unexpected alpha vantage response shape (no `feed` field)");
            return NewsBatch::empty();
        }
    };
    let feed: Vec<NewsItem> = match serde_json::from_value(feed_value) {
        Ok(items) => items,
        Err(err) => {
            warn!(error = %err, "malformed `feed` array, treating as empty feed");
            return NewsBatch::empty();
        }
    };

    let sentiment_score_definition = value
        .get("sentiment_score_definition")
        .and_then(|v| v.as_str())
        .map(str::to_string);

    NewsBatch {
        feed,
        sentiment_score_definition,
    }
}

fn snippet(body: &str) -> String {
    body.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_topics_with_commas_and_puts_the_key_last() {
        let query = NewsQuery {
            topics: vec!["blockchain".to_string(), "economy_macro".to_string()],
            limit: 10,
            time_from: Some("20240501T1100".to_string()),
            sort: Some("LATEST".to_string()),
        };
        let url = build_query_url(&query, "SECRET123");
        assert_eq!(
            url,
            "https://www.alphavantage.co/query?function=NEWS_SENTIMENT\
             &topics=blockchain,economy_macro&limit=10\
             &time_from=20240501T1100&sort=LATEST&apikey=SECRET123"
        );
    }

    #[test]
    fn optional_parameters_are_omitted_when_absent() {
        let query = NewsQuery {
            topics: vec!["ipo".to_string()],
            limit: 50,
            time_from: None,
            sort: None,
        };
        let url = build_query_url(&query, "k");
        assert!(!url.contains("time_from"));
        assert!(!url.contains("sort"));
        assert!(url.ends_with("&apikey=k"));
    }

    #[test]
    fn redaction_removes_every_occurrence_of_the_key() {
        let url = "https://host/query?apikey=SECRET123&echo=SECRET123";
        let redacted = redact_key(url, "SECRET123");
        assert!(!redacted.contains("SECRET123"));
        assert_eq!(redacted.matches("REDACTED").count(), 2);
    }

    #[test]
    fn redaction_with_empty_key_leaves_the_url_alone() {
        let url = "https://host/query?apikey=";
        assert_eq!(redact_key(url, ""), url);
    }

    #[test]
    fn parses_a_regular_feed() {
        let body = r#"{
            "items": "2",
            "sentiment_score_definition": "x <= -0.35: Bearish; x >= 0.35: Bullish",
            "feed": [
                {
                    "title": "Markets rally",
                    "url": "https://example.com/a",
                    "time_published": "20240501T093000",
                    "summary": "Stocks rose.",
                    "banner_image": "https://example.com/a.png",
                    "source": "Example Wire",
                    "overall_sentiment_score": 0.21,
                    "overall_sentiment_label": "Somewhat-Bullish",
                    "topics": [{ "topic": "Financial Markets", "relevance_score": "0.9" }]
                },
                { "title": "Fed holds", "url": "https://example.com/b" }
            ]
        }"#;
        let batch = parse_news_body(body);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.feed[0].title, "Markets rally");
        assert_eq!(batch.feed[0].banner_image.as_deref(), Some("https://example.com/a.png"));
        assert_eq!(batch.feed[0].topics[0].relevance_score, "0.9");
        // Second item exercises the all-defaults path.
        assert_eq!(batch.feed[1].summary, "");
        assert_eq!(batch.feed[1].overall_sentiment_score, 0.0);
        assert!(batch
            .sentiment_score_definition
            .as_deref()
            .unwrap()
            .contains("Bullish"));
    }

    #[test]
    fn rate_limit_information_body_is_an_empty_batch() {
        // Alpha Vantage answers quota exhaustion with 200 and this shape.
        let body = r#"{ "Information": "Thank you for using Alpha Vantage! Our standard API rate limit is 25 requests per day." }"#;
        let batch = parse_news_body(body);
        assert!(batch.is_empty());
    }

    #[test]
    fn non_json_body_is_an_empty_batch() {
        assert!(parse_news_body("<html>502</html>").is_empty());
    }

    #[test]
    fn malformed_feed_array_is_an_empty_batch() {
        let body = r#"{ "feed": "not an array" }"#;
        assert!(parse_news_body(body).is_empty());
    }

    #[test]
    fn explicit_empty_feed_is_an_empty_batch() {
        let body = r#"{ "feed": [] }"#;
        let batch = parse_news_body(body);
        assert!(batch.is_empty());
        assert_eq!(batch.len(), 0);
    }
}
