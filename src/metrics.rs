//! In-process latency histograms.
//! Each named metric keeps its most recent samples (microseconds) in a fixed
//! ring; summaries report p50/p95/p99 and the total sample count.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;

const DEFAULT_WINDOW: usize = 1024;

/// Measures from creation until `finish`.
pub struct TimingSpan {
    name: &'static str,
    start: Instant,
    registry: Arc<MetricsRegistry>,
}

impl TimingSpan {
    pub fn finish(self) -> f64 {
        let elapsed_us = self.start.elapsed().as_micros() as f64;
        self.registry.record(self.name, elapsed_us);
        elapsed_us
    }
}

/// Fixed window of the latest samples.
struct Window {
    samples: Vec<f64>,
    capacity: usize,
    next: usize,
    recorded: u64,
}

impl Window {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
            next: 0,
            recorded: 0,
        }
    }

    fn push(&mut self, value: f64) {
        if self.samples.len() < self.capacity {
            self.samples.push(value);
        } else {
            self.samples[self.next] = value;
        }
        self.next = (self.next + 1) % self.capacity;
        self.recorded += 1;
    }

    fn percentiles(&self, ps: [f64; 3]) -> [f64; 3] {
        if self.samples.is_empty() {
            return [0.0; 3];
        }
        let mut sorted = self.samples.clone();
        sorted.sort_by(f64::total_cmp);
        let last = sorted.len() - 1;
        ps.map(|p| {
            let idx = ((p / 100.0) * last as f64).round() as usize;
            sorted[idx.min(last)]
        })
    }
}

pub struct MetricsRegistry {
    windows: Mutex<HashMap<&'static str, Window>>,
    window_size: usize,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW)
    }

    pub fn with_window(window_size: usize) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            window_size: window_size.max(1),
        }
    }

    pub fn record(&self, name: &'static str, value_us: f64) {
        self.windows
            .lock()
            .entry(name)
            .or_insert_with(|| Window::with_capacity(self.window_size))
            .push(value_us);
        tracing::trace!(metric = name, value_us, "metric recorded");
    }

    pub fn span(self: &Arc<Self>, name: &'static str) -> TimingSpan {
        TimingSpan {
            name,
            start: Instant::now(),
            registry: Arc::clone(self),
        }
    }

    pub fn summary(&self) -> HashMap<String, MetricSummary> {
        self.windows
            .lock()
            .iter()
            .map(|(&name, window)| {
                let [p50_us, p95_us, p99_us] = window.percentiles([50.0, 95.0, 99.0]);
                (
                    name.to_string(),
                    MetricSummary {
                        p50_us,
                        p95_us,
                        p99_us,
                        count: window.recorded,
                    },
                )
            })
            .collect()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricSummary {
    pub p50_us: f64,
    pub p95_us: f64,
    pub p99_us: f64,
    pub count: u64,
}

pub mod metric_names {
    /// One full resolution, including cache and dictionary hits.
    pub const RESOLVE: &str = "t_resolve";
    /// One retrying upstream call, including backoff sleeps.
    pub const UPSTREAM_CALL: &str = "t_upstream_call";
    pub const HTTP_TRANSLATE: &str = "t_http_translate";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentiles_over_recorded_samples() {
        let registry = MetricsRegistry::new();
        for v in 1..=100 {
            registry.record(metric_names::RESOLVE, v as f64);
        }
        let summaries = registry.summary();
        let summary = &summaries[metric_names::RESOLVE];
        assert_eq!(summary.count, 100);
        assert_eq!(summary.p50_us, 51.0);
        assert_eq!(summary.p99_us, 99.0);
    }

    #[test]
    fn window_keeps_latest_samples_but_counts_all() {
        let registry = MetricsRegistry::with_window(4);
        for v in [1000.0, 1000.0, 1.0, 2.0, 3.0, 4.0] {
            registry.record(metric_names::UPSTREAM_CALL, v);
        }
        let summaries = registry.summary();
        let summary = &summaries[metric_names::UPSTREAM_CALL];
        assert_eq!(summary.count, 6);
        assert_eq!(summary.p99_us, 4.0);
    }

    #[test]
    fn span_records_once() {
        let registry = Arc::new(MetricsRegistry::new());
        let elapsed = registry.span(metric_names::HTTP_TRANSLATE).finish();
        assert!(elapsed >= 0.0);
        assert_eq!(registry.summary()[metric_names::HTTP_TRANSLATE].count, 1);
    }

    #[test]
    fn empty_registry_has_no_summary() {
        assert!(MetricsRegistry::new().summary().is_empty());
    }
}
