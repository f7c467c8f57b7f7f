//! Cache metrics for observability

use prometheus::{CounterVec, Opts, Registry};
use std::sync::OnceLock;

static METRICS: OnceLock<CacheMetricsInner> = OnceLock::new();

struct CacheMetricsInner {
    operations: CounterVec,
    reads: CounterVec,
    errors: CounterVec,
}

impl CacheMetricsInner {
    fn new() -> Self {
        Self {
            operations: CounterVec::new(
                Opts::new(
                    "feed_cache_operations_total",
                    "Total feed cache mutations by backend and operation",
                ),
                &["backend", "op"],
            )
            .expect("valid metric definition"),
            reads: CounterVec::new(
                Opts::new(
                    "feed_cache_reads_total",
                    "Total feed bucket reads by backend and outcome",
                ),
                &["backend", "outcome"],
            )
            .expect("valid metric definition"),
            errors: CounterVec::new(
                Opts::new(
                    "feed_cache_errors_total",
                    "Total absorbed feed cache failures",
                ),
                &["backend", "op"],
            )
            .expect("valid metric definition"),
        }
    }

    fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.operations.clone()))?;
        registry.register(Box::new(self.reads.clone()))?;
        registry.register(Box::new(self.errors.clone()))?;
        Ok(())
    }
}

fn get_metrics() -> &'static CacheMetricsInner {
    METRICS.get_or_init(CacheMetricsInner::new)
}

/// Cache metrics wrapper labelled with the owning backend
#[derive(Clone, Copy, Debug)]
pub struct CacheMetrics {
    backend: &'static str,
}

impl CacheMetrics {
    pub fn new(backend: &'static str) -> Self {
        Self { backend }
    }

    /// Register metrics with a Prometheus registry
    pub fn register(registry: &Registry) -> Result<(), prometheus::Error> {
        get_metrics().register(registry)
    }

    pub fn record_op(&self, op: &str) {
        get_metrics()
            .operations
            .with_label_values(&[self.backend, op])
            .inc();
    }

    pub fn record_read(&self, hit: bool) {
        let outcome = if hit { "hit" } else { "miss" };
        get_metrics()
            .reads
            .with_label_values(&[self.backend, outcome])
            .inc();
    }

    pub fn record_error(&self, op: &str) {
        get_metrics()
            .errors
            .with_label_values(&[self.backend, op])
            .inc();
    }
}
