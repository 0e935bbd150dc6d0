use crate::types::{
    FeedDescriptor, FetchError, FetchedArticle, PipelineError, SummarizationError, SummaryRecord,
    SummarySections,
};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Retrieves the recent articles of one configured feed.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Human-readable name for this source
    fn source_name(&self) -> String;

    /// Fetch the feed and return articles no older than `max_age_days`,
    /// stamped with the feed's language, region and perspective.
    async fn fetch(
        &self,
        feed: &FeedDescriptor,
        max_age_days: u32,
    ) -> Result<Vec<FetchedArticle>, FetchError>;
}

/// External text-generation collaborator producing the three summary sections.
#[async_trait]
pub trait Summarizer: Send + Sync {
    fn summarizer_name(&self) -> String;

    async fn summarize(
        &self,
        articles_by_perspective: &BTreeMap<String, Vec<FetchedArticle>>,
    ) -> Result<SummarySections, SummarizationError>;
}

/// Progress sink for a pipeline run. Calls arrive synchronously and in
/// order from the run's control flow.
pub trait PipelineObserver: Send + Sync {
    fn on_log(&self, message: &str);

    fn on_step_change(&self, stage_index: usize);

    fn on_summary_generated(&self, summary: &SummaryRecord);

    /// Called once when a run ends with a fatal error.
    fn on_run_failed(&self, _error: &PipelineError) {}
}
