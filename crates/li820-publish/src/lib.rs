//! Downstream side of the sampler.
//!
//! The [`PublishWorker`] drains the sampler's handoff channel on its own
//! thread. For each record it updates the process-wide [`metrics()`], logs the
//! JSON encoding and fans it out to every subscriber of the [`Publisher`].
//! [`http`] serves the metrics in Prometheus text format.

pub mod error;
pub mod http;
pub mod metrics;
pub mod publisher;
pub mod worker;

pub use error::{PublishError, Result};
pub use metrics::{metrics, register, AnalyzerMetrics, MetricsSnapshot, PROMETHEUS_CONTENT_TYPE};
pub use publisher::{Publisher, DEFAULT_WRITE_TIMEOUT};
pub use worker::{PublishWorker, WorkerStats};
