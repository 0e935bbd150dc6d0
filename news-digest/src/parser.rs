use crate::types::{FetchError, ParsedEntry};
use chrono::Utc;
use feed_rs::parser;
use tracing::{debug, info};

pub struct FeedParser;

impl FeedParser {
    pub fn parse_feed(content: &str) -> Result<Vec<ParsedEntry>, FetchError> {
        debug!("Parsing feed content ({} bytes)", content.len());

        if !Self::is_valid_feed_content(content) {
            return Err(FetchError::Parse(
                "Response does not look like an RSS or Atom document".to_string(),
            ));
        }

        let feed = parser::parse(content.as_bytes())
            .map_err(|e| FetchError::Parse(format!("Failed to parse feed: {}", e)))?;

        let entries: Vec<ParsedEntry> = feed.entries.into_iter().map(Self::parse_entry).collect();

        info!("Parsed feed with {} entries", entries.len());
        Ok(entries)
    }

    fn parse_entry(entry: feed_rs::model::Entry) -> ParsedEntry {
        ParsedEntry {
            title: entry.title.map(|t| t.content),
            url: entry.links.first().map(|link| link.href.clone()),
            description: entry.summary.map(|s| s.content),
            published_at: entry
                .published
                .or(entry.updated)
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }

    pub fn is_valid_feed_content(content: &str) -> bool {
        let content_lower = content.to_lowercase();

        content_lower.contains("<rss")
            || content_lower.contains("<feed")
            || content_lower.contains("<channel")
            || content_lower.contains("xmlns:atom")
    }
}
