//! Metrics and tracing spans for the registry and template cache.
//!
//! Metrics are local atomic counters; logging goes through `tracing`, with
//! the subscriber left to the embedding application.

mod metrics;
mod spans;

pub use metrics::{Counter, Gauge, Histogram, MetricsSummary, RegistryMetrics};
pub use spans::{bundle_span, scan_span};
