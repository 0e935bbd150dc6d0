use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const US_PERSPECTIVE: &str = "us";
pub const VENEZUELAN_PERSPECTIVE: &str = "venezuelan";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    GoogleNews,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedDescriptor {
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub query: String,
    pub language: String,
    pub region: String,
    pub perspective: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchedArticle {
    pub title: String,
    pub url: String,
    pub published_date: DateTime<Utc>,
    pub description: String,
    pub source: String,
    // from the originating feed
    pub language: String,
    pub region: String,
    pub perspective: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicConfig {
    pub id: String,
    pub name: String,
    pub active: bool,
    pub rss_feeds: Vec<FeedDescriptor>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSettings {
    pub max_articles_per_topic: usize,
    pub article_max_age_days: u32,
    /// Informational only; the balancer never enforces it.
    pub min_articles_per_feed: usize,
    pub deduplication_similarity_threshold: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewsConfig {
    pub topics: Vec<TopicConfig>,
    pub settings: PipelineSettings,
}

/// Serialized form of a selected article inside a [`SummaryRecord`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleSource {
    pub title: String,
    pub url: String,
    pub source: String,
    /// `YYYY-MM-DD`
    pub published_date: String,
    pub language: String,
    pub region: String,
}

/// The three text sections returned by the summarization collaborator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarySections {
    pub overall_highlights: Vec<String>,
    pub us_perspective: Vec<String>,
    pub venezuelan_perspective: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRecord {
    pub title: String,
    pub date: String,
    pub topic: String,
    pub topic_name: String,
    pub sources: Vec<ArticleSource>,
    pub article_count: usize,
    pub venezuelan_sources: usize,
    pub us_sources: usize,
    pub overall_highlights: Vec<String>,
    pub us_perspective: Vec<String>,
    pub venezuelan_perspective: Vec<String>,
}

// Object style note:
// Everything in here is plain data. A pipeline run owns its articles for the
// duration of the run and hands exactly one SummaryRecord to its caller.
// Behaviour lives in the news-digest crate.
