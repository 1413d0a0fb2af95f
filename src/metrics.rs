//! Scoring metrics and statistics for the prediction service.

use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

const MAX_TIMINGS: usize = 10_000;

/// Metrics collector shared by all request handlers
pub struct ServiceMetrics {
    /// Records scored, single and batch
    pub records_scored: AtomicU64,
    /// Records labelled fraud
    pub fraud_verdicts: AtomicU64,
    /// CSV batches processed
    pub batch_uploads: AtomicU64,
    /// Requests rejected as invalid input
    pub rejected_inputs: AtomicU64,
    /// Requests that failed inside the classifier
    pub prediction_failures: AtomicU64,
    /// Scoring times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Fraud probability distribution buckets
    score_buckets: RwLock<[u64; 10]>,
    start_time: Instant,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self {
            records_scored: AtomicU64::new(0),
            fraud_verdicts: AtomicU64::new(0),
            batch_uploads: AtomicU64::new(0),
            rejected_inputs: AtomicU64::new(0),
            prediction_failures: AtomicU64::new(0),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            score_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record one scored record
    pub fn record_prediction(&self, processing_time: Duration, fraud_probability: f64, is_fraud: bool) {
        self.records_scored.fetch_add(1, Ordering::Relaxed);
        if is_fraud {
            self.fraud_verdicts.fetch_add(1, Ordering::Relaxed);
        }

        self.push_time(processing_time);
        self.score_buckets.write()[bucket(fraud_probability)] += 1;
    }

    /// Record a scored CSV batch
    pub fn record_batch(&self, processing_time: Duration, fraud_probabilities: &[f64], fraud_count: usize) {
        self.batch_uploads.fetch_add(1, Ordering::Relaxed);
        self.records_scored
            .fetch_add(fraud_probabilities.len() as u64, Ordering::Relaxed);
        self.fraud_verdicts
            .fetch_add(fraud_count as u64, Ordering::Relaxed);

        self.push_time(processing_time);
        let mut buckets = self.score_buckets.write();
        for &p in fraud_probabilities {
            buckets[bucket(p)] += 1;
        }
    }

    pub fn record_rejection(&self) {
        self.rejected_inputs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.prediction_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn push_time(&self, processing_time: Duration) {
        let mut times = self.processing_times.write();
        times.push(processing_time.as_micros() as u64);
        if times.len() > MAX_TIMINGS {
            times.drain(0..MAX_TIMINGS / 2);
        }
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let mut sorted = self.processing_times.read().clone();
        if sorted.is_empty() {
            return ProcessingStats::default();
        }
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();
        let at = |q: f64| sorted[((count as f64 * q) as usize).min(count - 1)];

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: at(0.5),
            p95_us: at(0.95),
            p99_us: at(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Records scored per second since startup
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.records_scored.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn get_score_distribution(&self) -> [u64; 10] {
        *self.score_buckets.read()
    }

    /// Point-in-time view for the metrics endpoint
    pub fn snapshot(&self) -> MetricsSnapshot {
        let records_scored = self.records_scored.load(Ordering::Relaxed);
        let fraud_verdicts = self.fraud_verdicts.load(Ordering::Relaxed);

        MetricsSnapshot {
            records_scored,
            fraud_verdicts,
            fraud_rate: rate(fraud_verdicts, records_scored),
            batch_uploads: self.batch_uploads.load(Ordering::Relaxed),
            rejected_inputs: self.rejected_inputs.load(Ordering::Relaxed),
            prediction_failures: self.prediction_failures.load(Ordering::Relaxed),
            throughput_per_sec: self.get_throughput(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            processing: self.get_processing_stats(),
            score_distribution: self.get_score_distribution(),
        }
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let snap = self.snapshot();
        let processing = &snap.processing;

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║              SWIPE SHIELD - SCORING METRICS SUMMARY          ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Records Scored:   {:>8}  │  Throughput: {:>8.1} rec/s     ║",
            snap.records_scored, snap.throughput_per_sec
        );
        info!(
            "║ Fraud Verdicts:   {:>8}  │  Fraud Rate: {:>8.1}%         ║",
            snap.fraud_verdicts,
            snap.fraud_rate * 100.0
        );
        info!(
            "║ Batch Uploads:    {:>8}  │  Rejected: {:>6}  Failed: {:>5} ║",
            snap.batch_uploads, snap.rejected_inputs, snap.prediction_failures
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Scoring Time (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5}  ║",
            processing.mean_us, processing.p50_us, processing.p95_us, processing.p99_us
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Fraud Probability Distribution:                              ║");
        let total: u64 = snap.score_distribution.iter().sum();
        for (i, &count) in snap.score_distribution.iter().enumerate() {
            let pct = rate(count, total) * 100.0;
            let bar: String = "█".repeat(((pct / 2.0) as usize).min(20));
            info!(
                "║   {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                bar
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn bucket(p: f64) -> usize {
    if p.is_nan() {
        return 0;
    }
    (p * 10.0).clamp(0.0, 9.0) as usize
}

fn rate(part: u64, whole: u64) -> f64 {
    if whole > 0 {
        part as f64 / whole as f64
    } else {
        0.0
    }
}

/// Processing time statistics
#[derive(Debug, Default, Clone, Serialize)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub records_scored: u64,
    pub fraud_verdicts: u64,
    pub fraud_rate: f64,
    pub batch_uploads: u64,
    pub rejected_inputs: u64,
    pub prediction_failures: u64,
    pub throughput_per_sec: f64,
    pub uptime_secs: u64,
    pub processing: ProcessingStats,
    pub score_distribution: [u64; 10],
}

/// Prints a metrics summary on a fixed interval
pub struct MetricsReporter {
    metrics: Arc<ServiceMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ServiceMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let period = Duration::from_secs(self.interval_secs.max(1));
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
