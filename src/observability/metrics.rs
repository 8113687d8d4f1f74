//! Atomic metric primitives and the registry's metric set.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Thread-safe atomic counter.
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Thread-safe atomic gauge.
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicI64,
}

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::Relaxed);
    }

    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Fixed-bucket histogram.
#[derive(Debug)]
pub struct Histogram {
    buckets: Vec<AtomicU64>,
    bucket_bounds: Vec<f64>,
    /// Sum scaled by 1000 to keep sub-unit precision.
    sum: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    pub fn new(bucket_bounds: Vec<f64>) -> Self {
        let buckets = (0..=bucket_bounds.len())
            .map(|_| AtomicU64::new(0))
            .collect();
        Self {
            buckets,
            bucket_bounds,
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Buckets suited to filesystem scans, in milliseconds.
    pub fn scan_latency() -> Self {
        Self::new(vec![1.0, 5.0, 10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0])
    }

    pub fn observe(&self, value: f64) {
        let idx = self
            .bucket_bounds
            .iter()
            .position(|&bound| value <= bound)
            .unwrap_or(self.bucket_bounds.len());

        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
        self.sum
            .fetch_add((value.max(0.0) * 1000.0) as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> f64 {
        self.sum.load(Ordering::Relaxed) as f64 / 1000.0
    }

    pub fn bucket_counts(&self) -> Vec<u64> {
        self.buckets
            .iter()
            .map(|b| b.load(Ordering::Relaxed))
            .collect()
    }
}

/// Counters maintained by [`crate::BundleRegistry`].
#[derive(Debug)]
pub struct RegistryMetrics {
    pub scans: Counter,
    pub loads: Counter,
    pub unloads: Counter,
    pub reloads: Counter,
    pub rejections: Counter,
    pub failures: Counter,
    pub drops: Counter,
    pub active_bundles: Gauge,
    pub scan_duration_ms: Histogram,
}

impl RegistryMetrics {
    pub fn new() -> Self {
        Self {
            scans: Counter::new(),
            loads: Counter::new(),
            unloads: Counter::new(),
            reloads: Counter::new(),
            rejections: Counter::new(),
            failures: Counter::new(),
            drops: Counter::new(),
            active_bundles: Gauge::new(),
            scan_duration_ms: Histogram::scan_latency(),
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        let scans = self.scan_duration_ms.count();
        MetricsSummary {
            scans: self.scans.get(),
            loads: self.loads.get(),
            unloads: self.unloads.get(),
            reloads: self.reloads.get(),
            rejections: self.rejections.get(),
            failures: self.failures.get(),
            drops: self.drops.get(),
            active_bundles: self.active_bundles.get(),
            avg_scan_ms: if scans > 0 {
                self.scan_duration_ms.sum() / scans as f64
            } else {
                0.0
            },
        }
    }
}

impl Default for RegistryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub scans: u64,
    pub loads: u64,
    pub unloads: u64,
    pub reloads: u64,
    pub rejections: u64,
    pub failures: u64,
    pub drops: u64,
    pub active_bundles: i64,
    pub avg_scan_ms: f64,
}
