use crate::config::IngestConfig;
use crate::models::RunOutcome;
use crate::services::pipeline::IngestPipeline;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{Duration, MissedTickBehavior, interval};

/// Periodic trigger: runs the pipeline on a fixed interval until shutdown.
///
/// Each run is awaited before the next tick is taken, so runs from one worker
/// never overlap. Ticks missed during a long run are delayed, not burst.
pub struct IngestWorker {
    pipeline: Arc<IngestPipeline>,
    config: IngestConfig,
    shutdown: watch::Receiver<bool>,
}

impl IngestWorker {
    pub fn new(
        pipeline: Arc<IngestPipeline>,
        config: IngestConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            pipeline,
            config,
            shutdown,
        }
    }

    /// Runs until the shutdown signal flips, calling `report` after every run.
    pub async fn run<F>(mut self, mut report: F) -> usize
    where
        F: FnMut(&RunOutcome) + Send,
    {
        let period = Duration::from_secs(self.config.interval_secs.max(1));
        tracing::info!("🚀 Ingest worker started (every {:?})", period);

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut runs = 0;

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.changed() => {
                    tracing::info!("🛑 Ingest worker shutting down after {} runs", runs);
                    break;
                }
                _ = ticker.tick() => {
                    let outcome = self.pipeline.run_once(&self.config).await;
                    runs += 1;
                    report(&outcome);
                }
            }
        }

        runs
    }
}
