use anyhow::{bail, Context};
use clap::Parser;
use news_digest::config::{default_config, load_config};
use news_digest::{
    FetchConfig, GoogleNewsSource, HttpSummarizer, MockSummarizer, PipelineBuilder, Summarizer,
    TracingObserver,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Fetch, deduplicate and balance news for the active topic, then summarize it.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// JSON configuration file; the built-in Venezuela topic is used when absent
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Endpoint of the summarization service
    #[arg(long, env = "SUMMARIZER_URL")]
    summarizer_url: Option<String>,

    /// Write the summary record here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Per-request timeout for feed and summarizer calls
    #[arg(long, default_value_t = 30)]
    timeout_seconds: u64,

    /// Retries for transient feed errors
    #[arg(long, default_value_t = 2)]
    max_retries: u32,

    /// Fetch all feeds of the topic at once
    #[arg(long)]
    concurrent: bool,

    /// Cancel the run if it has not finished after this many seconds
    #[arg(long)]
    deadline_seconds: Option<u64>,

    /// Summarize from the article titles without calling a service
    #[arg(long)]
    offline: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Cli::parse();
    info!("Starting news digest");

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => {
            info!("No configuration file given, using the built-in topic");
            default_config()
        }
    };

    let fetch_config = FetchConfig {
        timeout_seconds: args.timeout_seconds,
        max_retries: args.max_retries,
        ..FetchConfig::default()
    };
    let feed_source = GoogleNewsSource::new(fetch_config).context("Failed to build HTTP client")?;

    let summarizer: Arc<dyn Summarizer> = match (&args.summarizer_url, args.offline) {
        (_, true) => Arc::new(MockSummarizer::title_digest()),
        (Some(url), false) => Arc::new(
            HttpSummarizer::new(url.clone(), args.timeout_seconds)
                .context("Failed to build summarizer client")?,
        ),
        (None, false) => bail!("No summarizer configured: pass --summarizer-url or --offline"),
    };

    let pipeline = Arc::new(
        PipelineBuilder::new(config)
            .feed_source(Arc::new(feed_source))
            .summarizer(summarizer)
            .concurrent_fetch(args.concurrent)
            .build()?,
    );

    let cancel = CancellationToken::new();
    if let Some(seconds) = args.deadline_seconds {
        let deadline = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(seconds)).await;
            warn!("Deadline of {}s reached, cancelling run", seconds);
            deadline.cancel();
        });
    }
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling run");
            interrupt.cancel();
        }
    });

    let summary = match pipeline
        .spawn_run(Arc::new(TracingObserver), cancel)
        .await
    {
        Ok(summary) => summary,
        Err(e) => {
            error!("Run failed: {}", e);
            return Err(e.into());
        }
    };

    let rendered = serde_json::to_string_pretty(&summary)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote summary to {}", path.display());
        }
        None => println!("{}", rendered),
    }

    info!("News digest finished");
    Ok(())
}
