//! Google News search feeds.
//!
//! Titles arrive as `<headline> - <publisher>`. The publisher is split off
//! the last ` - ` segment, so a headline that itself contains ` - ` and has
//! no publisher suffix loses its tail to the source name.

use crate::fetcher::Fetcher;
use crate::parser::FeedParser;
use crate::traits::FeedSource;
use crate::types::{FeedDescriptor, FetchConfig, FetchError, FetchedArticle, ParsedEntry};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};
use url::Url;

pub const UNKNOWN_SOURCE: &str = "Unknown Source";
const UNTITLED: &str = "No title";

pub struct GoogleNewsSource {
    fetcher: Fetcher,
}

impl GoogleNewsSource {
    pub fn new(fetch_config: FetchConfig) -> Result<Self, FetchError> {
        Ok(Self {
            fetcher: Fetcher::new(fetch_config)?,
        })
    }

    pub fn search_url(&self, feed: &FeedDescriptor) -> Result<Url, FetchError> {
        build_search_url(&self.fetcher.config().feed_base_url, feed)
    }
}

#[async_trait]
impl FeedSource for GoogleNewsSource {
    fn source_name(&self) -> String {
        "Google News".to_string()
    }

    async fn fetch(
        &self,
        feed: &FeedDescriptor,
        max_age_days: u32,
    ) -> Result<Vec<FetchedArticle>, FetchError> {
        let url = self.search_url(feed)?;
        info!("Pulling feed for '{}': {}", feed.perspective, url);

        let content = self.fetcher.fetch_text(url.as_str()).await?;
        let entries = FeedParser::parse_feed(&content)?;
        let articles = normalize_entries(entries, feed, max_age_days, Utc::now());

        info!("Kept {} recent articles for '{}'", articles.len(), feed.perspective);
        Ok(articles)
    }
}

/// `<base>?q=<query>&hl=<language>&gl=<region>&ceid=<region>:<language>`
pub fn build_search_url(base_url: &str, feed: &FeedDescriptor) -> Result<Url, FetchError> {
    let ceid = format!("{}:{}", feed.region, feed.language);
    let url = Url::parse_with_params(
        base_url,
        &[
            ("q", feed.query.as_str()),
            ("hl", feed.language.as_str()),
            ("gl", feed.region.as_str()),
            ("ceid", ceid.as_str()),
        ],
    )?;
    Ok(url)
}

/// Split a trailing ` - <source>` segment off a raw feed title.
pub fn split_source(raw_title: &str) -> (String, String) {
    match raw_title.rsplit_once(" - ") {
        Some((title, source)) => (title.to_string(), source.trim().to_string()),
        None => (raw_title.to_string(), UNKNOWN_SOURCE.to_string()),
    }
}

/// Turn parsed entries into articles of `feed`, dropping anything published
/// before `now - max_age_days`. A window reaching past the earliest
/// representable date keeps every dated entry.
pub fn normalize_entries(
    entries: Vec<ParsedEntry>,
    feed: &FeedDescriptor,
    max_age_days: u32,
    now: DateTime<Utc>,
) -> Vec<FetchedArticle> {
    let cutoff = age_limit(now, max_age_days);

    entries
        .into_iter()
        .filter_map(|entry| {
            let Some(published_date) = entry.published_at else {
                debug!("Skipping entry without a publish date: {:?}", entry.title);
                return None;
            };
            if published_date < cutoff {
                return None;
            }

            let raw_title = entry.title.unwrap_or_else(|| UNTITLED.to_string());
            let (title, source) = split_source(&raw_title);

            Some(FetchedArticle {
                title,
                url: entry.url.unwrap_or_default(),
                published_date,
                description: entry.description.unwrap_or_default(),
                source,
                language: feed.language.clone(),
                region: feed.region.clone(),
                perspective: feed.perspective.clone(),
            })
        })
        .collect()
}

fn age_limit(now: DateTime<Utc>, max_age_days: u32) -> DateTime<Utc> {
    Duration::try_days(i64::from(max_age_days))
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
