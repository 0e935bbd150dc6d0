use crate::types::{
    ArticleSource, FetchedArticle, SummaryRecord, SummarySections, TopicConfig, US_PERSPECTIVE,
    VENEZUELAN_PERSPECTIVE,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Group the selection by perspective tag, keeping selection order inside
/// each group.
pub fn group_by_perspective(articles: &[FetchedArticle]) -> BTreeMap<String, Vec<FetchedArticle>> {
    let mut groups: BTreeMap<String, Vec<FetchedArticle>> = BTreeMap::new();
    for article in articles {
        groups
            .entry(article.perspective.clone())
            .or_default()
            .push(article.clone());
    }
    groups
}

pub fn format_day(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d").to_string()
}

pub fn summary_title(topic: &TopicConfig, now: &DateTime<Utc>) -> String {
    format!("{} News - {}", topic.name, format_day(now))
}

pub fn article_source(article: &FetchedArticle) -> ArticleSource {
    ArticleSource {
        title: article.title.clone(),
        url: article.url.clone(),
        source: article.source.clone(),
        published_date: format_day(&article.published_date),
        language: article.language.clone(),
        region: article.region.clone(),
    }
}

/// Combine the collaborator's sections with metadata computed from the
/// selection. `sources` keeps the balancer's output order.
pub fn build_summary_record(
    topic: &TopicConfig,
    selected: &[FetchedArticle],
    sections: SummarySections,
    now: DateTime<Utc>,
) -> SummaryRecord {
    let count_of = |perspective: &str| {
        selected
            .iter()
            .filter(|article| article.perspective == perspective)
            .count()
    };

    SummaryRecord {
        title: summary_title(topic, &now),
        date: now.to_rfc3339(),
        topic: topic.id.clone(),
        topic_name: topic.name.clone(),
        sources: selected.iter().map(article_source).collect(),
        article_count: selected.len(),
        venezuelan_sources: count_of(VENEZUELAN_PERSPECTIVE),
        us_sources: count_of(US_PERSPECTIVE),
        overall_highlights: sections.overall_highlights,
        us_perspective: sections.us_perspective,
        venezuelan_perspective: sections.venezuelan_perspective,
    }
}
