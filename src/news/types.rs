// src/news/types.rs
//! Wire types for the Alpha Vantage NEWS_SENTIMENT feed.
//!
//! Every field defaults: upstream omits pieces freely and one ragged item
//! must not sink the whole batch.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TopicRelevance {
    #[serde(default)]
    pub topic: String,
    /// Upstream sends scores as decimal strings, not numbers.
    #[serde(default)]
    pub relevance_score: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TickerSentiment {
    #[serde(default)]
    pub ticker: String,
    #[serde(default)]
    pub relevance_score: String,
    #[serde(default)]
    pub ticker_sentiment_score: String,
    #[serde(default)]
    pub ticker_sentiment_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NewsItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    /// Publication time as reported upstream (`YYYYMMDDThhmmss`).
    #[serde(default)]
    pub time_published: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub banner_image: Option<String>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub topics: Vec<TopicRelevance>,
    #[serde(default)]
    pub overall_sentiment_score: f64,
    #[serde(default)]
    pub overall_sentiment_label: String,
    #[serde(default)]
    pub ticker_sentiment: Vec<TickerSentiment>,
}

/// One fetch worth of news plus the legend Alpha Vantage ships alongside.
#[derive(Debug, Clone, Default)]
pub struct NewsBatch {
    pub feed: Vec<NewsItem>,
    pub sentiment_score_definition: Option<String>,
}

impl NewsBatch {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.feed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feed.is_empty()
    }
}

/// Parameters for one NEWS_SENTIMENT request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewsQuery {
    pub topics: Vec<String>,
    pub limit: u32,
    /// Lower time bound in the compact `YYYYMMDDThhmm` form.
    pub time_from: Option<String>,
    pub sort: Option<String>,
}
