use crate::balance::balance;
use crate::config;
use crate::dedup::{dedupe, DedupOutcome};
use crate::digest::{build_summary_record, format_day, group_by_perspective};
use crate::traits::{FeedSource, PipelineObserver, Summarizer};
use crate::types::{
    FeedDescriptor, FetchError, FetchedArticle, NewsConfig, PipelineError, PipelineSettings,
    Result, SummaryRecord, TopicConfig,
};
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Configuration,
    Gather,
    Process,
    Summarize,
    GenerateContent,
    Publish,
    Deploy,
}

impl PipelineStage {
    pub const ALL: [PipelineStage; 7] = [
        PipelineStage::Configuration,
        PipelineStage::Gather,
        PipelineStage::Process,
        PipelineStage::Summarize,
        PipelineStage::GenerateContent,
        PipelineStage::Publish,
        PipelineStage::Deploy,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            PipelineStage::Configuration => "Fetch Configuration",
            PipelineStage::Gather => "Gather News Articles",
            PipelineStage::Process => "Intelligent Article Processing",
            PipelineStage::Summarize => "AI Summarization",
            PipelineStage::GenerateContent => "Generate Content",
            PipelineStage::Publish => "Publish",
            PipelineStage::Deploy => "Deploy & Cache Invalidation",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            PipelineStage::Configuration => "Loading topics and settings.",
            PipelineStage::Gather => "Fetching articles from the configured feeds.",
            PipelineStage::Process => "Deduplicating and balancing articles by perspective.",
            PipelineStage::Summarize => "Generating the summary sections.",
            PipelineStage::GenerateContent => "Rendering the summary into a publishable document.",
            PipelineStage::Publish => "Committing the new summary.",
            PipelineStage::Deploy => "Triggering a site rebuild and clearing caches.",
        }
    }
}

/// Runs one topic through fetch, dedupe, balance and summarize, reporting
/// every stage to a [`PipelineObserver`].
pub struct NewsPipeline {
    config: NewsConfig,
    feed_source: Arc<dyn FeedSource>,
    summarizer: Arc<dyn Summarizer>,
    concurrent_fetch: bool,
}

impl NewsPipeline {
    pub fn new(
        config: NewsConfig,
        feed_source: Arc<dyn FeedSource>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            config,
            feed_source,
            summarizer,
            concurrent_fetch: false,
        }
    }

    pub fn config(&self) -> &NewsConfig {
        &self.config
    }

    /// Run the pipeline once. Fatal errors are reported to
    /// `observer.on_run_failed` once and returned.
    pub async fn run(
        &self,
        observer: &dyn PipelineObserver,
        cancel: &CancellationToken,
    ) -> Result<SummaryRecord> {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline_run", %run_id);

        let result = self.execute(observer, cancel).instrument(span).await;
        match &result {
            Ok(summary) => info!(%run_id, "Pipeline run produced '{}'", summary.title),
            Err(e) => {
                error!(%run_id, "Pipeline run failed: {}", e);
                observer.on_run_failed(e);
            }
        }
        result
    }

    /// Run the pipeline on its own task so that a panic inside a stage comes
    /// back as [`PipelineError::Unknown`] instead of unwinding into the caller.
    pub async fn spawn_run(
        self: Arc<Self>,
        observer: Arc<dyn PipelineObserver>,
        cancel: CancellationToken,
    ) -> Result<SummaryRecord> {
        let task_observer = observer.clone();
        let handle = tokio::spawn(async move { self.run(task_observer.as_ref(), &cancel).await });

        match handle.await {
            Ok(result) => result,
            Err(join_error) => {
                error!("Pipeline task aborted: {}", join_error);
                let e = PipelineError::Unknown("An unknown error occurred.".to_string());
                observer.on_run_failed(&e);
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        observer: &dyn PipelineObserver,
        cancel: &CancellationToken,
    ) -> Result<SummaryRecord> {
        // Nothing reaches the observer until the configuration is usable.
        let settings = &self.config.settings;
        config::validate_settings(settings)?;
        let topic = config::active_topic(&self.config)?;
        let started_at = Utc::now();

        enter_stage(PipelineStage::Configuration, observer, cancel)?;
        observer.on_log(&format!("  -> Loaded 1 active topic: {}.", topic.name));

        // Gather: a failing feed is logged and skipped
        enter_stage(PipelineStage::Gather, observer, cancel)?;
        let gathered = if self.concurrent_fetch {
            self.gather_concurrently(topic, settings, observer, cancel).await?
        } else {
            self.gather_sequentially(topic, settings, observer, cancel).await?
        };

        // Process: dedupe first, then balance what survived
        enter_stage(PipelineStage::Process, observer, cancel)?;
        let gathered_count = gathered.len();
        let DedupOutcome { kept, removed } =
            dedupe(gathered, settings.deduplication_similarity_threshold);
        observer.on_log(&format!(
            "  -> Removed {} duplicate or highly similar articles.",
            removed
        ));
        let selected = balance(&kept, settings.max_articles_per_topic);
        observer.on_log(&format!(
            "  -> Balanced selection to {} articles.",
            selected.len()
        ));
        info!(
            gathered = gathered_count,
            unique = kept.len(),
            selected = selected.len(),
            "Processed articles"
        );

        // Summarize: any error here ends the run
        enter_stage(PipelineStage::Summarize, observer, cancel)?;
        let articles_by_perspective = group_by_perspective(&selected);
        if selected.is_empty() {
            warn!("Requesting a summary with no articles selected");
        }
        info!(
            "Sending {} articles to {}",
            selected.len(),
            self.summarizer.summarizer_name()
        );
        observer.on_log("  -> Sending articles for summarization...");
        let sections = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(PipelineError::Cancelled {
                    stage: "the summary was received".to_string(),
                });
            }
            sections = self.summarizer.summarize(&articles_by_perspective) => sections?,
        };
        observer.on_log("  -> Successfully received structured summary.");

        let summary = build_summary_record(topic, &selected, sections, started_at);
        observer.on_summary_generated(&summary);

        // The record is delivered; the remaining stages only report and no
        // longer observe cancellation.
        let day = format_day(&started_at);
        announce_stage(PipelineStage::GenerateContent, observer);
        observer.on_log(&format!(
            "  -> Generated markdown file: /content/summaries/{}/{}.md",
            topic.id, day
        ));

        announce_stage(PipelineStage::Publish, observer);
        observer.on_log("  -> Committed and pushed file to repository.");

        announce_stage(PipelineStage::Deploy, observer);
        observer.on_log("  -> Site build triggered.");
        observer.on_log("  -> Purged cache for immediate visibility.");

        Ok(summary)
    }

    async fn gather_sequentially(
        &self,
        topic: &TopicConfig,
        settings: &PipelineSettings,
        observer: &dyn PipelineObserver,
        cancel: &CancellationToken,
    ) -> Result<Vec<FetchedArticle>> {
        let mut all_articles = Vec::new();

        for feed in &topic.rss_feeds {
            if cancel.is_cancelled() {
                return Err(cancelled_before_feed(feed));
            }
            observer.on_log(&format!(
                "  -> Fetching articles for '{}' perspective...",
                feed.perspective
            ));

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled_before_feed(feed)),
                result = self.feed_source.fetch(feed, settings.article_max_age_days) => result,
            };
            record_feed_result(feed, result, settings, observer, &mut all_articles);
        }

        Ok(all_articles)
    }

    /// Fetch every feed at once, then report results in declaration order so
    /// the log reads exactly as a sequential run would.
    async fn gather_concurrently(
        &self,
        topic: &TopicConfig,
        settings: &PipelineSettings,
        observer: &dyn PipelineObserver,
        cancel: &CancellationToken,
    ) -> Result<Vec<FetchedArticle>> {
        let fetches = topic
            .rss_feeds
            .iter()
            .map(|feed| self.feed_source.fetch(feed, settings.article_max_age_days));

        let results = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(PipelineError::Cancelled {
                    stage: "all feeds were fetched".to_string(),
                });
            }
            results = join_all(fetches) => results,
        };

        // Report in declaration order, not completion order
        let mut all_articles = Vec::new();
        for (feed, result) in topic.rss_feeds.iter().zip(results) {
            observer.on_log(&format!(
                "  -> Fetching articles for '{}' perspective...",
                feed.perspective
            ));
            record_feed_result(feed, result, settings, observer, &mut all_articles);
        }
        Ok(all_articles)
    }
}

fn enter_stage(
    stage: PipelineStage,
    observer: &dyn PipelineObserver,
    cancel: &CancellationToken,
) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled {
            stage: stage.name().to_string(),
        });
    }
    announce_stage(stage, observer);
    Ok(())
}

fn announce_stage(stage: PipelineStage, observer: &dyn PipelineObserver) {
    info!(
        stage = stage.index(),
        "Entering stage: {} ({})",
        stage.name(),
        stage.description()
    );
    observer.on_step_change(stage.index());
    observer.on_log(&format!(
        "[Step {}/{}] {}...",
        stage.index() + 1,
        PipelineStage::ALL.len(),
        stage.name()
    ));
}

fn cancelled_before_feed(feed: &FeedDescriptor) -> PipelineError {
    PipelineError::Cancelled {
        stage: format!("fetching the '{}' feed", feed.perspective),
    }
}

/// A failed feed is logged and skipped; the run goes on with what it has.
fn record_feed_result(
    feed: &FeedDescriptor,
    result: std::result::Result<Vec<FetchedArticle>, FetchError>,
    settings: &PipelineSettings,
    observer: &dyn PipelineObserver,
    all_articles: &mut Vec<FetchedArticle>,
) {
    match result {
        Ok(articles) => {
            observer.on_log(&format!(
                "  -> Found {} recent articles for '{}'.",
                articles.len(),
                feed.perspective
            ));
            if articles.len() < settings.min_articles_per_feed {
                warn!(
                    "Feed '{}' yielded {} articles, below the minimum of {}",
                    feed.perspective,
                    articles.len(),
                    settings.min_articles_per_feed
                );
                observer.on_log(&format!(
                    "  -> Only {} articles for '{}' (minimum {}).",
                    articles.len(),
                    feed.perspective,
                    settings.min_articles_per_feed
                ));
            }
            all_articles.extend(articles);
        }
        Err(e) => {
            warn!("Error fetching feed for {}: {}", feed.perspective, e);
            observer.on_log(&format!(
                "  -> Error fetching feed for {}: {}",
                feed.perspective, e
            ));
        }
    }
}

/// Pipeline builder for easier configuration
pub struct PipelineBuilder {
    config: NewsConfig,
    feed_source: Option<Arc<dyn FeedSource>>,
    summarizer: Option<Arc<dyn Summarizer>>,
    concurrent_fetch: bool,
}

impl PipelineBuilder {
    pub fn new(config: NewsConfig) -> Self {
        Self {
            config,
            feed_source: None,
            summarizer: None,
            concurrent_fetch: false,
        }
    }

    pub fn feed_source(mut self, feed_source: Arc<dyn FeedSource>) -> Self {
        info!("Using feed source: {}", feed_source.source_name());
        self.feed_source = Some(feed_source);
        self
    }

    pub fn summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        info!("Using summarizer: {}", summarizer.summarizer_name());
        self.summarizer = Some(summarizer);
        self
    }

    pub fn concurrent_fetch(mut self, concurrent: bool) -> Self {
        self.concurrent_fetch = concurrent;
        self
    }

    pub fn build(self) -> Result<NewsPipeline> {
        let feed_source = self
            .feed_source
            .ok_or_else(|| PipelineError::Config("No feed source configured".to_string()))?;
        let summarizer = self
            .summarizer
            .ok_or_else(|| PipelineError::Config("No summarizer configured".to_string()))?;

        let mut pipeline = NewsPipeline::new(self.config, feed_source, summarizer);
        pipeline.concurrent_fetch = self.concurrent_fetch;
        Ok(pipeline)
    }
}
