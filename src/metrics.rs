//! Prediction counters and latency statistics for the assessment service.

use crate::types::outcome::Condition;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for served assessments
pub struct PredictionMetrics {
    predictions: AtomicU64,
    good: AtomicU64,
    poor: AtomicU64,
    input_errors: AtomicU64,
    failures: AtomicU64,
    /// Inference times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    start_time: Instant,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub predictions: u64,
    pub good: u64,
    pub poor: u64,
    pub input_errors: u64,
    pub failures: u64,
}

impl PredictionMetrics {
    pub fn new() -> Self {
        Self {
            predictions: AtomicU64::new(0),
            good: AtomicU64::new(0),
            poor: AtomicU64::new(0),
            input_errors: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            start_time: Instant::now(),
        }
    }

    /// Record a successful prediction
    pub fn record_prediction(&self, processing_time: Duration, condition: Condition) {
        self.predictions.fetch_add(1, Ordering::Relaxed);
        match condition {
            Condition::Good => self.good.fetch_add(1, Ordering::Relaxed),
            Condition::Poor => self.poor.fetch_add(1, Ordering::Relaxed),
        };

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only last 10000
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }
    }

    /// Record a submission rejected before inference
    pub fn record_input_error(&self) {
        self.input_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed inference call
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            predictions: self.predictions.load(Ordering::Relaxed),
            good: self.good.load(Ordering::Relaxed),
            poor: self.poor.load(Ordering::Relaxed),
            input_errors: self.input_errors.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let Ok(times) = self.processing_times.read() else {
            return ProcessingStats::default();
        };
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[((count as f64 * 0.95) as usize).min(count - 1)],
            p99_us: sorted[((count as f64 * 0.99) as usize).min(count - 1)],
            max_us: sorted[count - 1],
        }
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let s = self.snapshot();
        let poor_rate = if s.predictions > 0 {
            (s.poor as f64 / s.predictions as f64) * 100.0
        } else {
            0.0
        };
        let processing = self.get_processing_stats();

        info!(
            uptime_secs = self.uptime().as_secs(),
            predictions = s.predictions,
            good = s.good,
            poor = s.poor,
            poor_rate = format!("{:.1}%", poor_rate),
            input_errors = s.input_errors,
            failures = s.failures,
            "Assessment summary"
        );
        if processing.count > 0 {
            info!(
                mean_us = processing.mean_us,
                p50_us = processing.p50_us,
                p95_us = processing.p95_us,
                p99_us = processing.p99_us,
                max_us = processing.max_us,
                "Inference latency"
            );
        }
    }
}

impl Default for PredictionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Periodic metrics reporter
pub struct MetricsReporter {
    metrics: Arc<PredictionMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<PredictionMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // First tick fires immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
