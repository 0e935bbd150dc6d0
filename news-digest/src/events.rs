//! Progress reporting for pipeline runs.
//!
//! [`ChannelObserver`] turns observer calls into a stream of
//! [`PipelineEvent`]s for callers that prefer consuming a channel;
//! [`TracingObserver`] forwards everything to `tracing`.

use crate::traits::PipelineObserver;
use crate::types::{PipelineError, SummaryRecord};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    StageChanged(usize),
    LogEmitted(String),
    SummaryReady(Box<SummaryRecord>),
    RunFailed(String),
}

pub struct ChannelObserver {
    sender: mpsc::UnboundedSender<PipelineEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn send(&self, event: PipelineEvent) {
        if let Err(e) = self.sender.send(event) {
            warn!("Dropping pipeline event, receiver is gone: {:?}", e.0);
        }
    }
}

impl PipelineObserver for ChannelObserver {
    fn on_log(&self, message: &str) {
        self.send(PipelineEvent::LogEmitted(message.to_string()));
    }

    fn on_step_change(&self, stage_index: usize) {
        self.send(PipelineEvent::StageChanged(stage_index));
    }

    fn on_summary_generated(&self, summary: &SummaryRecord) {
        self.send(PipelineEvent::SummaryReady(Box::new(summary.clone())));
    }

    fn on_run_failed(&self, error: &PipelineError) {
        self.send(PipelineEvent::RunFailed(error.to_string()));
    }
}

#[derive(Debug, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_log(&self, message: &str) {
        info!(target: "pipeline", "{}", message);
    }

    fn on_step_change(&self, stage_index: usize) {
        info!(target: "pipeline", stage = stage_index, "Stage changed");
    }

    fn on_summary_generated(&self, summary: &SummaryRecord) {
        info!(
            target: "pipeline",
            "Summary '{}' generated from {} articles ({} us, {} venezuelan)",
            summary.title,
            summary.article_count,
            summary.us_sources,
            summary.venezuelan_sources
        );
    }

    fn on_run_failed(&self, error: &PipelineError) {
        error!(target: "pipeline", "Pipeline failed: {}", error);
    }
}
