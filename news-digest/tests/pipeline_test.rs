use async_trait::async_trait;
use chrono::{Duration, Utc};
use news_digest::config::default_config;
use news_digest::digest::format_day;
use news_digest::{
    ChannelObserver, FeedDescriptor, FeedSource, FetchError, FetchedArticle, MockSummarizer,
    NewsConfig, NewsPipeline, PipelineBuilder, PipelineError, PipelineEvent, PipelineObserver,
    PipelineStage, SummaryRecord, SummarySections,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Once};
use tokio_util::sync::CancellationToken;
use tracing::info;

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .try_init()
            .ok();
    });
}

const US_HEADLINES: [&str; 5] = [
    "Senate debates Venezuelan sanctions bill",
    "Pentagon reviews Caribbean naval posture",
    "Treasury issues Chevron license update",
    "State Department condemns political arrests",
    "Migrants surge at southern border crossing",
];

const VENEZUELAN_HEADLINES: [&str; 5] = [
    "Gobierno anuncia nuevo plan económico",
    "Oposición convoca marcha nacional",
    "Maduro denuncia injerencia extranjera",
    "Precios del petróleo impulsan exportaciones",
    "Tribunal electoral fija fecha comicios",
];

fn articles_for(perspective: &str, headlines: &[&str]) -> Vec<FetchedArticle> {
    headlines
        .iter()
        .enumerate()
        .map(|(i, title)| FetchedArticle {
            title: title.to_string(),
            url: format!("https://news.example.com/{}/{}", perspective, i),
            published_date: Utc::now() - Duration::hours(i as i64 + 1),
            description: String::new(),
            source: "Test Wire".to_string(),
            language: "en".to_string(),
            region: "US".to_string(),
            perspective: perspective.to_string(),
        })
        .collect()
}

enum FeedScript {
    Articles(Vec<FetchedArticle>),
    Unavailable,
    Panic,
}

/// Feed source answering from a per-perspective script.
struct ScriptedSource {
    scripts: HashMap<String, FeedScript>,
    delays_ms: HashMap<String, u64>,
    cancel_on_fetch: Option<CancellationToken>,
}

impl ScriptedSource {
    fn new() -> Self {
        Self {
            scripts: HashMap::new(),
            delays_ms: HashMap::new(),
            cancel_on_fetch: None,
        }
    }

    fn with(mut self, perspective: &str, script: FeedScript) -> Self {
        self.scripts.insert(perspective.to_string(), script);
        self
    }

    fn delayed(mut self, perspective: &str, delay_ms: u64) -> Self {
        self.delays_ms.insert(perspective.to_string(), delay_ms);
        self
    }

    fn healthy() -> Self {
        Self::new()
            .with("us", FeedScript::Articles(articles_for("us", &US_HEADLINES)))
            .with(
                "venezuelan",
                FeedScript::Articles(articles_for("venezuelan", &VENEZUELAN_HEADLINES)),
            )
    }
}

#[async_trait]
impl FeedSource for ScriptedSource {
    fn source_name(&self) -> String {
        "Scripted".to_string()
    }

    async fn fetch(
        &self,
        feed: &FeedDescriptor,
        _max_age_days: u32,
    ) -> Result<Vec<FetchedArticle>, FetchError> {
        if let Some(delay) = self.delays_ms.get(&feed.perspective) {
            tokio::time::sleep(std::time::Duration::from_millis(*delay)).await;
        }
        if let Some(token) = &self.cancel_on_fetch {
            token.cancel();
        }

        match self.scripts.get(&feed.perspective) {
            Some(FeedScript::Articles(articles)) => Ok(articles.clone()),
            Some(FeedScript::Unavailable) => Err(FetchError::Status {
                status: 503,
                message: "HTTP 503 - Service Unavailable. Details: upstream down".to_string(),
            }),
            Some(FeedScript::Panic) => panic!("feed source exploded"),
            None => Ok(Vec::new()),
        }
    }
}

#[derive(Default)]
struct RecordingObserver {
    logs: Mutex<Vec<String>>,
    steps: Mutex<Vec<usize>>,
    summaries: Mutex<Vec<SummaryRecord>>,
    failures: Mutex<Vec<String>>,
    cancel_on_summary: Option<CancellationToken>,
}

impl RecordingObserver {
    fn logs(&self) -> Vec<String> {
        self.logs.lock().unwrap().clone()
    }

    fn steps(&self) -> Vec<usize> {
        self.steps.lock().unwrap().clone()
    }

    fn summaries(&self) -> Vec<SummaryRecord> {
        self.summaries.lock().unwrap().clone()
    }

    fn failures(&self) -> Vec<String> {
        self.failures.lock().unwrap().clone()
    }
}

impl PipelineObserver for RecordingObserver {
    fn on_log(&self, message: &str) {
        self.logs.lock().unwrap().push(message.to_string());
    }

    fn on_step_change(&self, stage_index: usize) {
        self.steps.lock().unwrap().push(stage_index);
    }

    fn on_summary_generated(&self, summary: &SummaryRecord) {
        self.summaries.lock().unwrap().push(summary.clone());
        if let Some(token) = &self.cancel_on_summary {
            token.cancel();
        }
    }

    fn on_run_failed(&self, error: &PipelineError) {
        self.failures.lock().unwrap().push(error.to_string());
    }
}

fn canned_sections() -> SummarySections {
    SummarySections {
        overall_highlights: vec!["Tensions rise over sanctions".to_string()],
        us_perspective: vec!["Washington weighs new measures".to_string()],
        venezuelan_perspective: vec!["Caracas rejects foreign pressure".to_string()],
    }
}

fn pipeline_with(
    config: NewsConfig,
    source: ScriptedSource,
    summarizer: Arc<MockSummarizer>,
) -> NewsPipeline {
    PipelineBuilder::new(config)
        .feed_source(Arc::new(source))
        .summarizer(summarizer)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_full_run_produces_balanced_summary() {
    init_tracing();

    let summarizer = Arc::new(MockSummarizer::new("canned".to_string(), canned_sections()));
    let pipeline = pipeline_with(default_config(), ScriptedSource::healthy(), summarizer.clone());
    let observer = RecordingObserver::default();

    let summary = pipeline
        .run(&observer, &CancellationToken::new())
        .await
        .unwrap();
    info!("Generated summary: {}", summary.title);

    assert_eq!(summary.article_count, 10);
    assert_eq!(summary.us_sources, 5);
    assert_eq!(summary.venezuelan_sources, 5);
    assert_eq!(summary.sources.len(), 10);
    assert_eq!(summary.topic, "venezuela");
    assert_eq!(summary.topic_name, "Venezuela");
    assert_eq!(summary.title, format!("Venezuela News - {}", format_day(&Utc::now())));
    assert_eq!(summary.overall_highlights, canned_sections().overall_highlights);
    assert_eq!(summary.us_perspective, canned_sections().us_perspective);
    assert_eq!(summary.venezuelan_perspective, canned_sections().venezuelan_perspective);

    assert_eq!(observer.steps(), vec![0, 1, 2, 3, 4, 5, 6]);
    assert_eq!(observer.summaries(), vec![summary.clone()]);
    assert!(observer.failures().is_empty());

    let logs = observer.logs();
    assert_eq!(logs[0], "[Step 1/7] Fetch Configuration...");
    assert_eq!(logs[1], "  -> Loaded 1 active topic: Venezuela.");
    assert_eq!(logs.iter().filter(|l| l.starts_with("[Step ")).count(), 7);
    assert!(logs.contains(&"  -> Found 5 recent articles for 'us'.".to_string()));
    assert!(logs.contains(&"  -> Removed 0 duplicate or highly similar articles.".to_string()));
    assert!(logs.contains(&"  -> Balanced selection to 10 articles.".to_string()));
    assert!(logs.contains(&"  -> Successfully received structured summary.".to_string()));
    assert_eq!(logs.last().map(String::as_str), Some("  -> Purged cache for immediate visibility."));

    let requests = summarizer.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["us"].len(), 5);
    assert_eq!(requests[0]["venezuelan"].len(), 5);
}

#[tokio::test]
async fn test_failed_feed_is_skipped() {
    init_tracing();

    let source = ScriptedSource::healthy().with("venezuelan", FeedScript::Unavailable);
    let summarizer = Arc::new(MockSummarizer::new("canned".to_string(), canned_sections()));
    let pipeline = pipeline_with(default_config(), source, summarizer);
    let observer = RecordingObserver::default();

    let summary = pipeline
        .run(&observer, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.article_count, 5);
    assert_eq!(summary.us_sources, 5);
    assert_eq!(summary.venezuelan_sources, 0);

    let error_lines: Vec<String> = observer
        .logs()
        .into_iter()
        .filter(|l| l.starts_with("  -> Error fetching feed for "))
        .collect();
    assert_eq!(
        error_lines,
        vec!["  -> Error fetching feed for venezuelan: HTTP 503 - Service Unavailable. Details: upstream down".to_string()]
    );
    assert!(observer.failures().is_empty());
}

#[tokio::test]
async fn test_duplicates_across_feeds_are_removed() {
    init_tracing();

    let mut venezuelan = articles_for("venezuelan", &VENEZUELAN_HEADLINES);
    venezuelan[0].title = US_HEADLINES[0].to_string();
    let source = ScriptedSource::healthy()
        .with("venezuelan", FeedScript::Articles(venezuelan));
    let summarizer = Arc::new(MockSummarizer::new("canned".to_string(), canned_sections()));
    let pipeline = pipeline_with(default_config(), source, summarizer);
    let observer = RecordingObserver::default();

    let summary = pipeline
        .run(&observer, &CancellationToken::new())
        .await
        .unwrap();

    // The venezuelan feed is fetched first, so its copy of the headline wins.
    assert_eq!(summary.article_count, 9);
    assert_eq!(summary.venezuelan_sources, 5);
    assert_eq!(summary.us_sources, 4);
    assert!(observer
        .logs()
        .contains(&"  -> Removed 1 duplicate or highly similar articles.".to_string()));
}

#[tokio::test]
async fn test_missing_active_topic_fails_before_any_stage() {
    init_tracing();

    let mut config = default_config();
    config.topics[0].active = false;
    let summarizer = Arc::new(MockSummarizer::new("canned".to_string(), canned_sections()));
    let pipeline = pipeline_with(config, ScriptedSource::healthy(), summarizer.clone());
    let observer = RecordingObserver::default();

    let result = pipeline.run(&observer, &CancellationToken::new()).await;

    assert!(matches!(result, Err(PipelineError::Config(_))));
    assert!(observer.steps().is_empty());
    assert!(observer.logs().is_empty());
    assert!(observer.summaries().is_empty());
    assert_eq!(observer.failures().len(), 1);
    assert!(summarizer.requests().is_empty());
}

#[tokio::test]
async fn test_invalid_settings_fail_before_any_stage() {
    init_tracing();

    let mut config = default_config();
    config.settings.max_articles_per_topic = 0;
    let summarizer = Arc::new(MockSummarizer::new("canned".to_string(), canned_sections()));
    let pipeline = pipeline_with(config, ScriptedSource::healthy(), summarizer);
    let observer = RecordingObserver::default();

    let result = pipeline.run(&observer, &CancellationToken::new()).await;

    assert!(matches!(result, Err(PipelineError::Config(_))));
    assert!(observer.steps().is_empty());
}

#[tokio::test]
async fn test_summarizer_failure_is_fatal() {
    init_tracing();

    let summarizer = Arc::new(MockSummarizer::failing(
        "broken".to_string(),
        "model overloaded".to_string(),
    ));
    let pipeline = pipeline_with(default_config(), ScriptedSource::healthy(), summarizer);
    let observer = RecordingObserver::default();

    let result = pipeline.run(&observer, &CancellationToken::new()).await;

    assert!(matches!(result, Err(PipelineError::Summarization(_))));
    assert_eq!(observer.steps(), vec![0, 1, 2, 3]);
    assert!(observer.summaries().is_empty());

    let failures = observer.failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("model overloaded"));
}

#[tokio::test]
async fn test_empty_selection_still_summarizes() {
    init_tracing();

    let source = ScriptedSource::new();
    let summarizer = Arc::new(MockSummarizer::new("canned".to_string(), canned_sections()));
    let pipeline = pipeline_with(default_config(), source, summarizer.clone());
    let observer = RecordingObserver::default();

    let summary = pipeline
        .run(&observer, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.article_count, 0);
    assert!(summary.sources.is_empty());
    assert_eq!(summarizer.requests().len(), 1);
    assert!(observer
        .logs()
        .contains(&"  -> Only 0 articles for 'us' (minimum 5).".to_string()));
}

#[tokio::test]
async fn test_cancelled_before_start() {
    init_tracing();

    let summarizer = Arc::new(MockSummarizer::new("canned".to_string(), canned_sections()));
    let pipeline = pipeline_with(default_config(), ScriptedSource::healthy(), summarizer);
    let observer = RecordingObserver::default();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = pipeline.run(&observer, &cancel).await;

    match result {
        Err(PipelineError::Cancelled { stage }) => {
            assert_eq!(stage, PipelineStage::Configuration.name())
        }
        other => panic!("expected cancellation, got {:?}", other.map(|s| s.title)),
    }
    assert!(observer.steps().is_empty());
    assert_eq!(observer.failures().len(), 1);
}

#[tokio::test]
async fn test_cancelled_between_feeds() {
    init_tracing();

    let cancel = CancellationToken::new();
    let mut source = ScriptedSource::healthy();
    source.cancel_on_fetch = Some(cancel.clone());
    let summarizer = Arc::new(MockSummarizer::new("canned".to_string(), canned_sections()));
    let pipeline = pipeline_with(default_config(), source, summarizer.clone());
    let observer = RecordingObserver::default();

    let result = pipeline.run(&observer, &cancel).await;

    assert!(matches!(result, Err(PipelineError::Cancelled { .. })));
    assert_eq!(observer.steps(), vec![0, 1]);
    assert!(!observer
        .logs()
        .contains(&"  -> Fetching articles for 'us' perspective...".to_string()));
    assert!(summarizer.requests().is_empty());
}

#[tokio::test]
async fn test_cancel_after_summary_delivery_still_succeeds() {
    init_tracing();

    let cancel = CancellationToken::new();
    let summarizer = Arc::new(MockSummarizer::new("canned".to_string(), canned_sections()));
    let pipeline = pipeline_with(default_config(), ScriptedSource::healthy(), summarizer);
    let observer = RecordingObserver {
        cancel_on_summary: Some(cancel.clone()),
        ..RecordingObserver::default()
    };

    let summary = pipeline.run(&observer, &cancel).await.unwrap();

    assert!(cancel.is_cancelled());
    assert_eq!(observer.summaries(), vec![summary]);
    assert_eq!(observer.steps(), vec![0, 1, 2, 3, 4, 5, 6]);
    assert!(observer.failures().is_empty());
}

#[tokio::test]
async fn test_concurrent_gather_logs_in_declaration_order() {
    init_tracing();

    // The first declared feed answers last.
    let source = ScriptedSource::healthy().delayed("venezuelan", 50);
    let summarizer = Arc::new(MockSummarizer::new("canned".to_string(), canned_sections()));
    let pipeline = PipelineBuilder::new(default_config())
        .feed_source(Arc::new(source))
        .summarizer(summarizer)
        .concurrent_fetch(true)
        .build()
        .unwrap();
    let observer = RecordingObserver::default();

    let summary = pipeline
        .run(&observer, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.article_count, 10);

    let gather_logs: Vec<String> = observer
        .logs()
        .into_iter()
        .filter(|l| l.starts_with("  -> Fetching") || l.starts_with("  -> Found"))
        .collect();
    assert_eq!(
        gather_logs,
        vec![
            "  -> Fetching articles for 'venezuelan' perspective...".to_string(),
            "  -> Found 5 recent articles for 'venezuelan'.".to_string(),
            "  -> Fetching articles for 'us' perspective...".to_string(),
            "  -> Found 5 recent articles for 'us'.".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_channel_observer_streams_events() {
    init_tracing();

    let summarizer = Arc::new(MockSummarizer::title_digest());
    let pipeline = pipeline_with(default_config(), ScriptedSource::healthy(), summarizer);
    let (observer, mut events) = ChannelObserver::new();

    let summary = pipeline
        .run(&observer, &CancellationToken::new())
        .await
        .unwrap();

    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }

    assert_eq!(received[0], PipelineEvent::StageChanged(0));
    assert_eq!(
        received[1],
        PipelineEvent::LogEmitted("[Step 1/7] Fetch Configuration...".to_string())
    );
    let stage_changes = received
        .iter()
        .filter(|e| matches!(e, PipelineEvent::StageChanged(_)))
        .count();
    assert_eq!(stage_changes, 7);
    assert!(received.contains(&PipelineEvent::SummaryReady(Box::new(summary.clone()))));
    assert!(!received.iter().any(|e| matches!(e, PipelineEvent::RunFailed(_))));

    // The title digest echoes each perspective's selected headlines.
    assert_eq!(summary.us_perspective.len(), 5);
    assert_eq!(summary.venezuelan_perspective.len(), 5);
    assert_eq!(summary.overall_highlights.len(), 3);
}

#[tokio::test]
async fn test_spawned_run_reports_panics_as_unknown() {
    init_tracing();

    let source = ScriptedSource::healthy().with("venezuelan", FeedScript::Panic);
    let summarizer = Arc::new(MockSummarizer::new("canned".to_string(), canned_sections()));
    let pipeline = Arc::new(pipeline_with(default_config(), source, summarizer));
    let observer = Arc::new(RecordingObserver::default());

    let result = pipeline
        .spawn_run(observer.clone(), CancellationToken::new())
        .await;

    match result {
        Err(PipelineError::Unknown(message)) => assert_eq!(message, "An unknown error occurred."),
        other => panic!("expected unknown error, got {:?}", other.map(|s| s.title)),
    }
    assert_eq!(observer.failures(), vec!["An unknown error occurred.".to_string()]);
}

#[tokio::test]
async fn test_builder_requires_collaborators() {
    init_tracing();

    let result = PipelineBuilder::new(default_config())
        .feed_source(Arc::new(ScriptedSource::healthy()))
        .build();

    assert!(matches!(result, Err(PipelineError::Config(_))));
}

#[test]
fn test_stage_names_in_order() {
    let names: Vec<&str> = PipelineStage::ALL.iter().map(|s| s.name()).collect();
    assert_eq!(
        names,
        vec![
            "Fetch Configuration",
            "Gather News Articles",
            "Intelligent Article Processing",
            "AI Summarization",
            "Generate Content",
            "Publish",
            "Deploy & Cache Invalidation",
        ]
    );
    for (index, stage) in PipelineStage::ALL.iter().enumerate() {
        assert_eq!(stage.index(), index);
        assert!(!stage.description().is_empty());
    }
}
