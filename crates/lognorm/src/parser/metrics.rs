use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::Serialize;

use super::ErrorKind;

/// Forces the wrapped counters onto their own 64-byte cache line so that
/// threads updating different groups do not invalidate each other.
#[repr(align(64))]
#[derive(Debug, Default)]
pub struct CacheAligned<T>(pub T);

/// Aggregate dispatch counters
#[derive(Debug, Default)]
pub struct TotalMetrics {
    pub batches: AtomicU64,
    pub results: AtomicU64,
    pub time_nanos: AtomicU64,
}

/// Rejected batches by error kind
#[derive(Debug, Default)]
pub struct ErrorMetrics {
    pub unknown_log_type: AtomicU64,
    pub too_large: AtomicU64,
    pub decode: AtomicU64,
    pub validation: AtomicU64,
    pub build: AtomicU64,
}

impl ErrorMetrics {
    fn counter(&self, kind: ErrorKind) -> &AtomicU64 {
        match kind {
            ErrorKind::UnknownLogType => &self.unknown_log_type,
            ErrorKind::TooLarge => &self.too_large,
            ErrorKind::Decode => &self.decode,
            ErrorKind::Validation => &self.validation,
            ErrorKind::Build => &self.build,
        }
    }

    fn total(&self) -> u64 {
        self.unknown_log_type.load(Ordering::Relaxed)
            + self.too_large.load(Ordering::Relaxed)
            + self.decode.load(Ordering::Relaxed)
            + self.validation.load(Ordering::Relaxed)
            + self.build.load(Ordering::Relaxed)
    }
}

/// Per log type counters
#[derive(Debug, Default)]
pub struct LogTypeCounters {
    pub batches: AtomicU64,
    pub results: AtomicU64,
    pub rejected: AtomicU64,
}

/// Normalization metrics.
///
/// Global totals and error counters live in separate cache-aligned groups.
/// Per log type counters sit in a `DashMap` keyed by the log type name and
/// are only created for registered log types.
///
/// All operations use `Ordering::Relaxed`; `snapshot()` is not transactional
/// across fields.
#[derive(Debug, Default)]
pub struct NormalizerMetrics {
    pub totals: CacheAligned<TotalMetrics>,
    pub errors: CacheAligned<ErrorMetrics>,
    log_types: DashMap<String, LogTypeCounters>,
}

impl NormalizerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a batch that produced `results` records
    #[inline]
    pub fn record_success(&self, log_type: &str, results: usize, time_nanos: u64) {
        self.totals.0.batches.fetch_add(1, Ordering::Relaxed);
        self.totals.0.results.fetch_add(results as u64, Ordering::Relaxed);
        self.totals.0.time_nanos.fetch_add(time_nanos, Ordering::Relaxed);

        let counters = self.log_types.entry(log_type.to_string()).or_default();
        counters.batches.fetch_add(1, Ordering::Relaxed);
        counters.results.fetch_add(results as u64, Ordering::Relaxed);
    }

    /// Record a rejected batch. Pass `None` for log types that have no parser
    /// so unknown names do not grow the per-type table.
    #[inline]
    pub fn record_failure(&self, log_type: Option<&str>, kind: ErrorKind) {
        self.errors.0.counter(kind).fetch_add(1, Ordering::Relaxed);

        if let Some(log_type) = log_type {
            let counters = self.log_types.entry(log_type.to_string()).or_default();
            counters.batches.fetch_add(1, Ordering::Relaxed);
            counters.rejected.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let batches_ok = self.totals.0.batches.load(Ordering::Relaxed);
        let time_ns = self.totals.0.time_nanos.load(Ordering::Relaxed);
        let rejected = self.errors.0.total();
        let attempts = batches_ok + rejected;

        let log_types = self
            .log_types
            .iter()
            .map(|entry| {
                let c = entry.value();
                (
                    entry.key().clone(),
                    LogTypeSnapshot {
                        batches: c.batches.load(Ordering::Relaxed),
                        results: c.results.load(Ordering::Relaxed),
                        rejected: c.rejected.load(Ordering::Relaxed),
                    },
                )
            })
            .collect();

        MetricsSnapshot {
            batches_normalized: batches_ok,
            results_emitted: self.totals.0.results.load(Ordering::Relaxed),
            avg_batch_time_us: if batches_ok > 0 {
                (time_ns as f64 / batches_ok as f64) / 1000.0
            } else {
                0.0
            },

            batches_rejected: rejected,
            unknown_log_type: self.errors.0.unknown_log_type.load(Ordering::Relaxed),
            too_large: self.errors.0.too_large.load(Ordering::Relaxed),
            decode_errors: self.errors.0.decode.load(Ordering::Relaxed),
            validation_errors: self.errors.0.validation.load(Ordering::Relaxed),
            build_errors: self.errors.0.build.load(Ordering::Relaxed),
            success_rate: if attempts > 0 {
                batches_ok as f64 / attempts as f64
            } else {
                1.0
            },

            log_types,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogTypeSnapshot {
    pub batches: u64,
    pub results: u64,
    pub rejected: u64,
}

/// A read-only snapshot of normalization metrics, suitable for logging.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    // Throughput
    pub batches_normalized: u64,
    pub results_emitted: u64,
    pub avg_batch_time_us: f64,

    // Errors
    pub batches_rejected: u64,
    pub unknown_log_type: u64,
    pub too_large: u64,
    pub decode_errors: u64,
    pub validation_errors: u64,
    pub build_errors: u64,
    pub success_rate: f64,

    // Breakdown
    pub log_types: BTreeMap<String, LogTypeSnapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_metrics_are_empty() {
        let snap = NormalizerMetrics::new().snapshot();
        assert_eq!(snap.batches_normalized, 0);
        assert_eq!(snap.batches_rejected, 0);
        assert_eq!(snap.avg_batch_time_us, 0.0);
        assert_eq!(snap.success_rate, 1.0);
        assert!(snap.log_types.is_empty());
    }

    #[test]
    fn test_record_success_counts_and_times() {
        let metrics = NormalizerMetrics::new();
        metrics.record_success("AWS.CloudTrail", 3, 1000);
        metrics.record_success("AWS.CloudTrail", 0, 2000);

        let snap = metrics.snapshot();
        assert_eq!(snap.batches_normalized, 2);
        assert_eq!(snap.results_emitted, 3);
        assert!((snap.avg_batch_time_us - 1.5).abs() < f64::EPSILON);

        let per_type = &snap.log_types["AWS.CloudTrail"];
        assert_eq!(per_type.batches, 2);
        assert_eq!(per_type.results, 3);
        assert_eq!(per_type.rejected, 0);
    }

    #[test]
    fn test_failures_and_success_rate() {
        let metrics = NormalizerMetrics::new();
        metrics.record_success("AWS.CloudTrail", 1, 100);
        metrics.record_success("AWS.CloudTrail", 1, 100);
        metrics.record_failure(Some("AWS.CloudTrail"), ErrorKind::Validation);
        metrics.record_failure(None, ErrorKind::UnknownLogType);

        let snap = metrics.snapshot();
        assert_eq!(snap.batches_rejected, 2);
        assert_eq!(snap.validation_errors, 1);
        assert_eq!(snap.unknown_log_type, 1);
        assert_eq!(snap.success_rate, 0.5);

        assert_eq!(snap.log_types.len(), 1);
        assert_eq!(snap.log_types["AWS.CloudTrail"].rejected, 1);
        assert_eq!(snap.log_types["AWS.CloudTrail"].batches, 3);
    }

    #[test]
    fn test_concurrent_updates() {
        let metrics = std::sync::Arc::new(NormalizerMetrics::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let metrics = std::sync::Arc::clone(&metrics);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        metrics.record_success("AWS.CloudTrail", 2, 10);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snap = metrics.snapshot();
        assert_eq!(snap.batches_normalized, 400);
        assert_eq!(snap.results_emitted, 800);
    }
}
