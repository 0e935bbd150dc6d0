use serde::{Deserialize, Serialize};
// Use the interfaces crate for the shared data model
pub use interfaces::defs::{
    ArticleSource, FeedDescriptor, FetchedArticle, NewsConfig, PipelineSettings, SourceType,
    SummaryRecord, SummarySections, TopicConfig, US_PERSPECTIVE, VENEZUELAN_PERSPECTIVE,
};

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub max_redirects: usize,
    pub feed_base_url: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "News-Digest/1.0".to_string(),
            timeout_seconds: 30,
            max_retries: 2,
            retry_delay_seconds: 1,
            max_redirects: 5,
            feed_base_url: "https://news.google.com/rss/search".to_string(),
        }
    }
}

/// Raw item extracted from a feed document, before any article normalization.
#[derive(Debug, Clone)]
pub struct ParsedEntry {
    pub title: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub published_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Per-feed failure. Caught by the orchestrator, never fatal.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::Transport(_) => true,
            FetchError::Parse(_) | FetchError::InvalidUrl(_) => false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SummarizationError {
    #[error("Summarizer API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to reach summarizer: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed summary response: {0}")]
    Malformed(String),
}

/// Error body returned by the summarization endpoint on non-2xx responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: Option<String>,
    pub details: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Summarization failed: {0}")]
    Summarization(#[from] SummarizationError),

    #[error("Run cancelled before {stage}")]
    Cancelled { stage: String },

    #[error("{0}")]
    Unknown(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
