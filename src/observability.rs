//! Observability hooks for storage operations.
//!
//! Implement [`StoreMetrics`] to forward gateway activity to a monitoring
//! system. The default method bodies log through the `log` crate, so
//! [`LogMetrics`] (the gateway default) only needs the marker impl.
//!
//! ```ignore
//! use quote_store::observability::StoreMetrics;
//! use std::time::Duration;
//!
//! struct PrometheusMetrics;
//!
//! impl StoreMetrics for PrometheusMetrics {
//!     fn record_save(&self, _key: &str, bytes: usize, duration: Duration) {
//!         // histogram!("quote_save_bytes").record(bytes as f64);
//!         // histogram!("quote_save_latency").record(duration);
//!     }
//! }
//!
//! // let gateway = QuoteGateway::new(backend).with_metrics(Arc::new(PrometheusMetrics));
//! ```
//!
//! Hooks:
//! - `record_save()` - collection written, with payload size
//! - `record_load()` - collection read, with surviving record count
//! - `record_rejected()` - record dropped or refused by validation
//! - `record_error()` - write path failure

use std::time::Duration;

/// Trait for storage metrics collection.
pub trait StoreMetrics: Send + Sync {
    /// Record a successful collection write.
    fn record_save(&self, key: &str, bytes: usize, duration: Duration) {
        debug!("Store SAVE: {} ({} bytes) took {:?}", key, bytes, duration);
    }

    /// Record a collection read.
    fn record_load(&self, key: &str, count: usize, duration: Duration) {
        debug!("Store LOAD: {} ({} quotes) took {:?}", key, count, duration);
    }

    /// Record a record refused by validation.
    fn record_rejected(&self, key: &str, index: usize, reason: &str) {
        warn!("Store REJECTED: {}[{}]: {}", key, index, reason);
    }

    /// Record a write-path error.
    fn record_error(&self, key: &str, error: &str) {
        warn!("Store ERROR for {}: {}", key, error);
    }
}

/// Log-backed metrics (default).
#[derive(Clone, Default)]
pub struct LogMetrics;

impl StoreMetrics for LogMetrics {}

/// Silent metrics.
#[derive(Clone, Default)]
pub struct NoOpMetrics;

impl StoreMetrics for NoOpMetrics {
    fn record_save(&self, _key: &str, _bytes: usize, _duration: Duration) {}
    fn record_load(&self, _key: &str, _count: usize, _duration: Duration) {}
    fn record_rejected(&self, _key: &str, _index: usize, _reason: &str) {}
    fn record_error(&self, _key: &str, _error: &str) {}
}
