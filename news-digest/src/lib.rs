pub mod types;
pub mod similarity;
pub mod dedup;
pub mod balance;
pub mod fetcher;
pub mod parser;
pub mod sources;
pub mod traits;
pub mod llm_adapter;
pub mod digest;
pub mod config;
pub mod events;
pub mod pipeline;

pub use types::*;
pub use balance::balance;
pub use dedup::{dedupe, DedupOutcome};
pub use fetcher::Fetcher;
pub use parser::FeedParser;
pub use sources::GoogleNewsSource;
pub use traits::{FeedSource, PipelineObserver, Summarizer};
pub use llm_adapter::{HttpSummarizer, MockSummarizer};
pub use events::{ChannelObserver, PipelineEvent, TracingObserver};
pub use pipeline::{NewsPipeline, PipelineBuilder, PipelineStage};
