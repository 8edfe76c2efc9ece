use std::thread::{self, JoinHandle};

use li820_sampler::Measurement;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{error, info, warn};

use crate::error::{PublishError, Result};
use crate::metrics::AnalyzerMetrics;
use crate::publisher::Publisher;

const WORKER_THREAD_NAME: &str = "li820-publish";

/// Totals reported when the worker stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub received: u64,
    pub published: u64,
    pub dropped: u64,
}

/// Drains the sampler handoff: metrics, JSON log line, subscriber fan-out.
pub struct PublishWorker {
    records: broadcast::Receiver<Measurement>,
    publisher: Publisher,
    metrics: &'static AnalyzerMetrics,
}

impl PublishWorker {
    pub fn new(
        records: broadcast::Receiver<Measurement>,
        publisher: Publisher,
        metrics: &'static AnalyzerMetrics,
    ) -> Self {
        Self {
            records,
            publisher,
            metrics,
        }
    }

    /// Process records until the sampler side of the channel is gone.
    pub fn run(mut self) -> WorkerStats {
        let mut stats = WorkerStats::default();
        loop {
            match self.records.blocking_recv() {
                Ok(record) => {
                    stats.received += 1;
                    if self.handle(&record) {
                        stats.published += 1;
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "publisher fell behind; records dropped");
                    stats.dropped += missed;
                    self.metrics.record_dropped(missed);
                }
                Err(RecvError::Closed) => {
                    info!(
                        received = stats.received,
                        published = stats.published,
                        dropped = stats.dropped,
                        "record channel closed; publisher stopping"
                    );
                    return stats;
                }
            }
        }
    }

    /// Run on a dedicated named thread.
    pub fn spawn(self) -> Result<JoinHandle<WorkerStats>> {
        thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || self.run())
            .map_err(|source| PublishError::Spawn {
                name: WORKER_THREAD_NAME,
                source,
            })
    }

    fn handle(&self, record: &Measurement) -> bool {
        self.metrics.record(record);

        let json = match serde_json::to_string(record) {
            Ok(json) => json,
            Err(err) => {
                error!(error = %err, "failed to encode record; skipping");
                return false;
            }
        };
        info!(record = %json, "publishing");

        let delivered = self.publisher.publish(&json);
        self.metrics.record_published();
        self.metrics.set_subscribers(delivered);
        true
    }
}
