use crate::types::{
    FeedDescriptor, NewsConfig, PipelineError, PipelineSettings, Result, SourceType, TopicConfig,
};
use std::path::Path;
use tracing::{info, warn};

/// The Venezuela topic with one Spanish-language and one English-language feed.
pub fn default_config() -> NewsConfig {
    NewsConfig {
        topics: vec![TopicConfig {
            id: "venezuela".to_string(),
            name: "Venezuela".to_string(),
            active: true,
            rss_feeds: vec![
                FeedDescriptor {
                    source_type: SourceType::GoogleNews,
                    query: "Venezuela (militar OR sanciones OR oposición OR Maduro OR EEUU OR elección OR política OR protesta)".to_string(),
                    language: "es".to_string(),
                    region: "VE".to_string(),
                    perspective: "venezuelan".to_string(),
                },
                FeedDescriptor {
                    source_type: SourceType::GoogleNews,
                    query: "Venezuela (US military OR sanctions OR opposition OR Maduro OR diplomatic OR policy OR election)".to_string(),
                    language: "en".to_string(),
                    region: "US".to_string(),
                    perspective: "us".to_string(),
                },
            ],
        }],
        settings: PipelineSettings {
            max_articles_per_topic: 20,
            article_max_age_days: 5,
            min_articles_per_feed: 5,
            deduplication_similarity_threshold: 0.75,
        },
    }
}

pub fn load_config(path: &Path) -> Result<NewsConfig> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        PipelineError::Config(format!("Cannot read {}: {}", path.display(), e))
    })?;
    let config: NewsConfig = serde_json::from_str(&raw).map_err(|e| {
        PipelineError::Config(format!("Invalid configuration in {}: {}", path.display(), e))
    })?;

    info!("Loaded {} topics from {}", config.topics.len(), path.display());
    Ok(config)
}

pub fn validate_settings(settings: &PipelineSettings) -> Result<()> {
    if settings.max_articles_per_topic == 0 {
        return Err(PipelineError::Config(
            "maxArticlesPerTopic must be positive".to_string(),
        ));
    }
    if settings.article_max_age_days == 0 {
        return Err(PipelineError::Config(
            "articleMaxAgeDays must be positive".to_string(),
        ));
    }
    let threshold = settings.deduplication_similarity_threshold;
    if !(0.0..1.0).contains(&threshold) {
        return Err(PipelineError::Config(format!(
            "deduplicationSimilarityThreshold must be in [0, 1), got {}",
            threshold
        )));
    }
    Ok(())
}

/// The first topic flagged active. Later active topics are ignored.
pub fn active_topic(config: &NewsConfig) -> Result<&TopicConfig> {
    let mut active = config.topics.iter().filter(|topic| topic.active);
    let topic = active
        .next()
        .ok_or_else(|| PipelineError::Config("No active topic found in configuration.".to_string()))?;

    let ignored: Vec<&str> = active.map(|t| t.id.as_str()).collect();
    if !ignored.is_empty() {
        warn!("Multiple active topics; using '{}' and ignoring {:?}", topic.id, ignored);
    }

    if topic.rss_feeds.is_empty() {
        return Err(PipelineError::Config(format!(
            "Active topic '{}' has no feeds",
            topic.id
        )));
    }
    Ok(topic)
}
