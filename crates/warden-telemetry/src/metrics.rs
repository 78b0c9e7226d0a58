//! Request metrics for Warden.
//!
//! [`Metrics`] is an explicitly constructed instance handed to the metrics
//! and panics middleware at startup. Its counters are atomics, so
//! concurrent requests never lose an update. Every change is mirrored to
//! the `metrics` facade so a Prometheus recorder, when installed, sees the
//! same numbers.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Description |
//! |--------|------|-------------|
//! | `warden_requests_total` | Counter | Requests handled |
//! | `warden_errors_total` | Counter | Requests that returned an error |
//! | `warden_panics_total` | Counter | Handler panics recovered |
//! | `warden_tasks` | Gauge | Live runtime tasks, sampled every 100th request |

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

/// How often, in requests, the task count is sampled.
pub const TASK_SAMPLE_INTERVAL: u64 = 100;

/// Global Prometheus handle for rendering.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Process-wide request counters.
#[derive(Debug, Default)]
pub struct Metrics {
    tasks: AtomicU64,
    requests: AtomicU64,
    errors: AtomicU64,
    panics: AtomicU64,
}

/// A point-in-time copy of [`Metrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Live runtime tasks at the last sample.
    pub tasks: u64,
    /// Requests handled.
    pub requests: u64,
    /// Requests that returned an error.
    pub errors: u64,
    /// Panics recovered.
    pub panics: u64,
}

impl Metrics {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a request and returns the new total.
    pub fn add_requests(&self) -> u64 {
        counter!("warden_requests_total").increment(1);
        self.requests.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Samples the runtime's live task count when `request_count` is a
    /// multiple of [`TASK_SAMPLE_INTERVAL`]. Returns the sampled value.
    pub fn sample_tasks(&self, request_count: u64) -> Option<u64> {
        if request_count % TASK_SAMPLE_INTERVAL != 0 {
            return None;
        }
        let alive = tokio::runtime::Handle::try_current()
            .map(|handle| handle.metrics().num_alive_tasks() as u64)
            .unwrap_or(0);
        self.tasks.store(alive, Ordering::Relaxed);
        gauge!("warden_tasks").set(alive as f64);
        Some(alive)
    }

    /// Counts a failed request.
    pub fn add_errors(&self) -> u64 {
        counter!("warden_errors_total").increment(1);
        self.errors.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Counts a recovered panic.
    pub fn add_panics(&self) -> u64 {
        counter!("warden_panics_total").increment(1);
        self.panics.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Current values.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tasks: self.tasks.load(Ordering::Relaxed),
            requests: self.requests.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            panics: self.panics.load(Ordering::Relaxed),
        }
    }
}

/// Installs the Prometheus recorder.
///
/// Safe to call more than once; only the first call installs.
///
/// # Errors
///
/// Returns `TelemetryError::MetricsInit` if another recorder is already
/// installed.
pub fn init_metrics() -> TelemetryResult<()> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let _ = METRICS_HANDLE.set(handle);
    register_metric_descriptions();
    Ok(())
}

/// Renders metrics in Prometheus text format.
///
/// Returns `None` if the recorder is not installed.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn register_metric_descriptions() {
    describe_counter!("warden_requests_total", "Total number of requests handled");
    describe_counter!(
        "warden_errors_total",
        "Total number of requests that returned an error"
    );
    describe_counter!("warden_panics_total", "Total number of handler panics recovered");
    describe_gauge!("warden_tasks", "Live runtime tasks, sampled every 100th request");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_counters_start_at_zero() {
        let metrics = Metrics::new();
        assert_eq!(
            metrics.snapshot(),
            MetricsSnapshot {
                tasks: 0,
                requests: 0,
                errors: 0,
                panics: 0
            }
        );
    }

    #[test]
    fn test_add_returns_new_total() {
        let metrics = Metrics::new();
        assert_eq!(metrics.add_requests(), 1);
        assert_eq!(metrics.add_requests(), 2);
        assert_eq!(metrics.add_errors(), 1);
        assert_eq!(metrics.add_panics(), 1);
    }

    #[test]
    fn test_sampling_interval() {
        let metrics = Metrics::new();
        assert_eq!(metrics.sample_tasks(99), None);
        // Outside a runtime the sample is zero but still recorded.
        assert_eq!(metrics.sample_tasks(100), Some(0));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_are_all_counted() {
        let metrics = Arc::new(Metrics::new());

        let handles: Vec<_> = (0..200)
            .map(|_| {
                let metrics = Arc::clone(&metrics);
                tokio::spawn(async move {
                    let n = metrics.add_requests();
                    metrics.sample_tasks(n);
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests, 200);
        assert!(snapshot.tasks >= 1);
    }

    #[test]
    fn test_snapshot_serializes() {
        let metrics = Metrics::new();
        metrics.add_requests();
        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["requests"], 1);
        assert_eq!(json["panics"], 0);
    }
}
