//! Process-wide analyzer metrics.
//!
//! Registered once at startup with [`register`], updated only by the publish
//! worker, and rendered in Prometheus text exposition format 0.0.4.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use li820_sampler::Measurement;
use tracing::warn;

/// Content type of [`AnalyzerMetrics::render`] output.
pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Point-in-time copy of all metric values.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub co2_ppm: f64,
    pub h2o_ppt: f64,
    pub samples: u64,
    pub decode_failures: u64,
    pub records_dropped: u64,
    pub records_published: u64,
    pub subscribers: u64,
}

/// Analyzer gauges and counters.
///
/// Gauges hold `f64` bit patterns so every value is a plain atomic.
pub struct AnalyzerMetrics {
    site: String,
    co2_ppm: AtomicU64,
    h2o_ppt: AtomicU64,
    samples: AtomicU64,
    decode_failures: AtomicU64,
    records_dropped: AtomicU64,
    records_published: AtomicU64,
    subscribers: AtomicU64,
}

impl AnalyzerMetrics {
    pub fn new(site: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            co2_ppm: AtomicU64::new(0f64.to_bits()),
            h2o_ppt: AtomicU64::new(0f64.to_bits()),
            samples: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
            records_dropped: AtomicU64::new(0),
            records_published: AtomicU64::new(0),
            subscribers: AtomicU64::new(0),
        }
    }

    pub fn site(&self) -> &str {
        &self.site
    }

    /// Account for one sampled record.
    ///
    /// Sentinel records count as decode failures and leave the gauges at the
    /// last valid reading.
    pub fn record(&self, record: &Measurement) {
        self.samples.fetch_add(1, Ordering::Relaxed);
        if record.is_sentinel() {
            self.decode_failures.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.co2_ppm.store(record.co2.to_bits(), Ordering::Relaxed);
        self.h2o_ppt.store(record.h2o.to_bits(), Ordering::Relaxed);
    }

    /// Records the publish worker never saw because it fell behind.
    pub fn record_dropped(&self, count: u64) {
        self.records_dropped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_published(&self) {
        self.records_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_subscribers(&self, count: usize) {
        self.subscribers.store(count as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            co2_ppm: f64::from_bits(self.co2_ppm.load(Ordering::Relaxed)),
            h2o_ppt: f64::from_bits(self.h2o_ppt.load(Ordering::Relaxed)),
            samples: self.samples.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
            records_published: self.records_published.load(Ordering::Relaxed),
            subscribers: self.subscribers.load(Ordering::Relaxed),
        }
    }

    /// Render all metrics in Prometheus text format.
    pub fn render(&self) -> String {
        let snap = self.snapshot();
        let labels = format!("{{site=\"{}\"}}", escape_label(&self.site));
        let mut out = String::with_capacity(1024);

        let families: [(&str, &str, &str, String); 7] = [
            (
                "trailer_co2_ppm",
                "gauge",
                "Current CO2 value measured on the licor.",
                snap.co2_ppm.to_string(),
            ),
            (
                "trailer_h2o_ppt",
                "gauge",
                "Current H2O value measured on the licor.",
                snap.h2o_ppt.to_string(),
            ),
            (
                "li820_samples_total",
                "counter",
                "Sampling cycles completed.",
                snap.samples.to_string(),
            ),
            (
                "li820_decode_failures_total",
                "counter",
                "Frames that could not be decoded.",
                snap.decode_failures.to_string(),
            ),
            (
                "li820_records_dropped_total",
                "counter",
                "Records lost because the publisher fell behind.",
                snap.records_dropped.to_string(),
            ),
            (
                "li820_records_published_total",
                "counter",
                "Records handed to subscribers.",
                snap.records_published.to_string(),
            ),
            (
                "li820_subscribers",
                "gauge",
                "Currently connected subscribers.",
                snap.subscribers.to_string(),
            ),
        ];

        for (name, kind, help, value) in families {
            // Writing to a String cannot fail.
            let _ = writeln!(out, "# HELP {name} {help}");
            let _ = writeln!(out, "# TYPE {name} {kind}");
            let _ = writeln!(out, "{name}{labels} {value}");
        }
        out
    }
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

static METRICS: OnceLock<AnalyzerMetrics> = OnceLock::new();

/// Register the process-wide metrics for `site`.
///
/// Only the first registration takes effect; later calls return the existing
/// instance.
pub fn register(site: &str) -> &'static AnalyzerMetrics {
    let metrics = METRICS.get_or_init(|| AnalyzerMetrics::new(site));
    if metrics.site() != site {
        warn!(
            registered = metrics.site(),
            requested = site,
            "metrics already registered for another site"
        );
    }
    metrics
}

/// The process-wide metrics. Uses an empty site label if nothing registered.
pub fn metrics() -> &'static AnalyzerMetrics {
    METRICS.get_or_init(|| AnalyzerMetrics::new(""))
}
