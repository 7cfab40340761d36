//! Storage gateway - the sole authority for reading and writing quotes.
//!
//! The gateway keeps no state between calls: everything lives in the backend.
//! It enforces two contracts on purpose:
//!
//! - **Reads fail open.** [`QuoteGateway::load`] returns a plain collection.
//!   Unavailable storage, a missing key, corrupt text and individually invalid
//!   records all degrade to "fewer quotes", never to an error.
//! - **Writes fail closed.** [`QuoteGateway::save`] validates every record and
//!   checks the quota before touching the backend, so a failed save leaves
//!   the previous collection intact.
//!
//! After each successful write the gateway broadcasts a [`GatewayEvent`] to
//! the stores sharing it; other contexts learn about the write through the
//! backend's own change events.

use crate::backend::{utf16_len, StorageBackend};
use crate::codec::{self, ExportEnvelope};
use crate::config::GatewayConfig;
use crate::error::{Error, Result};
use crate::key::ONBOARDING_KEY;
use crate::model::Quote;
use crate::observability::{LogMetrics, StoreMetrics};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 16;

/// Notification emitted after a successful write in this context.
#[derive(Clone, Debug, PartialEq)]
pub enum GatewayEvent {
    /// A new collection was written.
    Saved(Vec<Quote>),
    /// All quotes and the version tag were removed.
    Cleared,
}

/// Keyspace occupancy against the quota.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StorageUsage {
    /// Bytes used by every key of the store, 2 bytes per UTF-16 unit.
    pub used: usize,
    /// Bytes left before the quota.
    pub available: usize,
    /// `used / quota`, rounded to a whole percentage.
    pub percentage_full: u32,
}

impl StorageUsage {
    fn measure(used: usize, quota: usize) -> Self {
        StorageUsage {
            used,
            available: quota.saturating_sub(used),
            percentage_full: (used as f64 / quota as f64 * 100.0).round() as u32,
        }
    }
}

/// Outcome of [`QuoteGateway::import_all`].
///
/// `succeeded` means "no fatal parse or write error", not "every record
/// imported": rejected records are listed in `errors` by 1-based position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportReport {
    pub succeeded: bool,
    pub imported_count: usize,
    pub errors: Vec<String>,
}

impl ImportReport {
    /// Failed import keeping the record errors found before `error`.
    fn failed(mut errors: Vec<String>, error: &Error) -> Self {
        errors.push(format!("Import failed: {}", error));
        ImportReport {
            succeeded: false,
            imported_count: 0,
            errors,
        }
    }
}

/// Gateway over a shared [`StorageBackend`].
///
/// Cheap to clone; clones share configuration, metrics and the event channel.
///
/// # Example
///
/// ```no_run
/// use quote_store::backend::InMemoryBackend;
/// use quote_store::QuoteGateway;
///
/// # async fn run() -> quote_store::Result<()> {
/// let gateway = QuoteGateway::new(InMemoryBackend::new());
///
/// let quotes = gateway.load().await;
/// gateway.save(&quotes).await?;
///
/// let usage = gateway.usage().await;
/// println!("{}% full", usage.percentage_full);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct QuoteGateway<B: StorageBackend> {
    backend: B,
    config: Arc<GatewayConfig>,
    metrics: Arc<dyn StoreMetrics>,
    events: broadcast::Sender<GatewayEvent>,
}

impl<B: StorageBackend> QuoteGateway<B> {
    /// Create a gateway with the default configuration.
    pub fn new(backend: B) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        QuoteGateway {
            backend,
            config: Arc::new(GatewayConfig::default()),
            metrics: Arc::new(LogMetrics),
            events,
        }
    }

    /// Create a gateway with a custom configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if the configuration is invalid.
    pub fn with_config(backend: B, config: GatewayConfig) -> Result<Self> {
        config.validate()?;
        let mut gateway = Self::new(backend);
        gateway.config = Arc::new(config);
        Ok(gateway)
    }

    /// Set custom metrics handler.
    pub fn with_metrics(mut self, metrics: Arc<dyn StoreMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Subscribe to this gateway's save/clear notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.events.subscribe()
    }

    /// Whether the backing store accepts writes. Never fails.
    pub async fn is_available(&self) -> bool {
        self.backend.is_available().await
    }

    /// Bytes used by the whole keyspace against the quota.
    ///
    /// Reports zeros when the store is unavailable.
    pub async fn usage(&self) -> StorageUsage {
        if !self.is_available().await {
            return StorageUsage::default();
        }
        let units = self.backend.used_units().await.unwrap_or_else(|e| {
            warn!("Could not measure storage usage: {}", e);
            0
        });
        StorageUsage::measure(units * 2, self.config.quota_bytes)
    }

    /// Validate and write the whole collection, then notify.
    ///
    /// # Errors
    ///
    /// - `Error::StorageUnavailable`: the store cannot be written
    /// - `Error::ValidationError`: a record is structurally invalid or reuses
    ///   an id; `index` names the first offender
    /// - `Error::QuotaExceeded`: the projected keyspace exceeds the quota
    /// - `Error::BackendError`: the backend rejected the write
    ///
    /// Nothing is written in any of the first three cases.
    pub async fn save(&self, quotes: &[Quote]) -> Result<()> {
        let key = &self.config.storage_key;
        match self.write_collection(quotes).await {
            Ok(bytes) => {
                let _ = self.events.send(GatewayEvent::Saved(quotes.to_vec()));
                debug!("Saved {} quotes to {} ({} bytes)", quotes.len(), key, bytes);
                Ok(())
            }
            Err(e) => {
                self.metrics.record_error(key, &e.to_string());
                Err(e)
            }
        }
    }

    async fn write_collection(&self, quotes: &[Quote]) -> Result<usize> {
        if !self.is_available().await {
            return Err(Error::StorageUnavailable);
        }
        let start = Instant::now();
        let key = &self.config.storage_key;

        let mut seen = HashSet::with_capacity(quotes.len());
        for (index, quote) in quotes.iter().enumerate() {
            let raw = codec::to_raw(quote)?;
            if let Err(reason) = codec::check(&raw) {
                self.metrics.record_rejected(key, index, &format!("{:?}", reason));
                return Err(Error::ValidationError {
                    index,
                    reason: reason.to_string(),
                });
            }
            if !seen.insert(quote.id.as_str()) {
                return Err(Error::ValidationError {
                    index,
                    reason: format!("duplicate id {}", quote.id),
                });
            }
        }

        let text = codec::encode(quotes)?;
        let version = &self.config.schema_version;

        // The whole collection is rewritten, so the replaced values do not count.
        let used = self.backend.used_units().await?;
        let (current, tag) = futures::try_join!(
            self.stored_units(key),
            self.stored_units(&self.config.version_key)
        )?;
        let replaced = current + tag;
        let projected = (used.saturating_sub(replaced) + utf16_len(&text) + utf16_len(version)) * 2;
        if projected > self.config.quota_bytes {
            return Err(Error::QuotaExceeded {
                required: projected,
                quota: self.config.quota_bytes,
            });
        }

        let bytes = utf16_len(&text) * 2;
        self.backend.set_item(key, text).await?;
        self.backend
            .set_item(&self.config.version_key, version.clone())
            .await?;
        self.metrics.record_save(key, bytes, start.elapsed());
        Ok(bytes)
    }

    async fn stored_units(&self, key: &str) -> Result<usize> {
        Ok(self
            .backend
            .get_item(key)
            .await?
            .map_or(0, |value| utf16_len(&value)))
    }

    /// Read the collection. Never fails.
    ///
    /// Unavailable storage, a missing key, malformed text or a non-array
    /// payload yield an empty collection; individually invalid records are
    /// dropped and the rest returned.
    pub async fn load(&self) -> Vec<Quote> {
        let key = &self.config.storage_key;
        if !self.is_available().await {
            warn!("Storage unavailable, loading no quotes");
            return Vec::new();
        }
        let start = Instant::now();

        let text = match self.backend.get_item(key).await {
            Ok(Some(text)) => text,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Failed to read {}: {}", key, e);
                return Vec::new();
            }
        };

        if let Ok(Some(version)) = self.backend.get_item(&self.config.version_key).await {
            if version != self.config.schema_version {
                warn!(
                    "Quote storage version mismatch: expected {}, found {}",
                    self.config.schema_version, version
                );
            }
        }

        let raw = match codec::decode(&text) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Discarding unreadable quote collection in {}: {}", key, e);
                return Vec::new();
            }
        };

        let quotes: Vec<Quote> = raw
            .iter()
            .enumerate()
            .filter_map(|(index, candidate)| match codec::decode_record(candidate) {
                Ok(quote) => Some(quote),
                Err(reason) => {
                    self.metrics.record_rejected(key, index, &format!("{:?}", reason));
                    None
                }
            })
            .collect();

        self.metrics.record_load(key, quotes.len(), start.elapsed());
        quotes
    }

    /// Versioned, timestamped snapshot of the stored collection.
    ///
    /// # Errors
    ///
    /// Returns `Error::SerializationError` if the snapshot cannot be encoded.
    pub async fn export_all(&self) -> Result<String> {
        let quotes = self.load().await;
        ExportEnvelope::new(&self.config.schema_version, &quotes).to_text()
    }

    /// Import a snapshot produced by [`export_all`](Self::export_all).
    ///
    /// Each record is validated on its own; invalid ones are skipped and
    /// reported. Valid ones are merged into the stored collection, replacing
    /// stored quotes with the same id. Within the snapshot the last record
    /// of an id wins, and `imported_count` counts distinct ids.
    pub async fn import_all(&self, text: &str) -> ImportReport {
        let raw = match codec::decode_export(text) {
            Ok(raw) => raw,
            Err(e) => return ImportReport::failed(Vec::new(), &e),
        };

        let mut errors = Vec::new();
        let mut imported: Vec<Quote> = Vec::with_capacity(raw.len());
        for (index, candidate) in raw.iter().enumerate() {
            match codec::decode_record(candidate) {
                Ok(quote) => match imported.iter_mut().find(|seen| seen.id == quote.id) {
                    Some(seen) => *seen = quote,
                    None => imported.push(quote),
                },
                Err(reason) => {
                    self.metrics.record_rejected("import", index, &format!("{:?}", reason));
                    errors.push(format!("Quote {}: {}", index + 1, reason));
                }
            }
        }

        let imported_count = imported.len();
        if imported_count > 0 {
            let mut merged = self.load().await;
            for quote in imported {
                match merged.iter_mut().find(|existing| existing.id == quote.id) {
                    Some(slot) => *slot = quote,
                    None => merged.push(quote),
                }
            }
            if let Err(e) = self.save(&merged).await {
                return ImportReport::failed(errors, &e);
            }
        }

        info!(
            "Imported {} quotes ({} rejected)",
            imported_count,
            errors.len()
        );
        ImportReport {
            succeeded: true,
            imported_count,
            errors,
        }
    }

    /// Remove the collection and its version tag, then notify.
    ///
    /// # Errors
    ///
    /// Returns `Error::StorageUnavailable` or a backend error.
    pub async fn clear(&self) -> Result<()> {
        if !self.is_available().await {
            return Err(Error::StorageUnavailable);
        }
        self.backend.remove_item(&self.config.storage_key).await?;
        self.backend.remove_item(&self.config.version_key).await?;
        let _ = self.events.send(GatewayEvent::Cleared);
        warn!("Quote storage cleared");
        Ok(())
    }

    /// Write `quotes` only if nothing is stored yet (absent key or empty array).
    ///
    /// Returns whether the collection was seeded.
    ///
    /// # Errors
    ///
    /// Same as [`save`](Self::save).
    pub async fn seed(&self, quotes: &[Quote]) -> Result<bool> {
        if !self.is_available().await {
            return Err(Error::StorageUnavailable);
        }
        let existing = self.backend.get_item(&self.config.storage_key).await?;
        if existing.as_deref().is_some_and(|text| text.trim() != "[]") {
            return Ok(false);
        }
        self.save(quotes).await?;
        Ok(true)
    }

    /// Clear storage, then seed it with `quotes`.
    ///
    /// # Errors
    ///
    /// Same as [`clear`](Self::clear) and [`save`](Self::save).
    pub async fn reset_to(&self, quotes: &[Quote]) -> Result<bool> {
        self.clear().await?;
        self.seed(quotes).await
    }

    /// Whether the quote editor walkthrough was already shown. Never fails.
    pub async fn has_seen_onboarding(&self) -> bool {
        matches!(self.backend.get_item(ONBOARDING_KEY).await, Ok(Some(_)))
    }

    /// Remember that the walkthrough was shown.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the store is unavailable.
    pub async fn mark_onboarding_seen(&self) -> Result<()> {
        self.backend
            .set_item(ONBOARDING_KEY, "true".to_string())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::codec::iso8601;
    use crate::model::{Customer, QuoteStatus};

    fn quote(id: &str) -> Quote {
        let now = iso8601::now();
        Quote {
            id: id.to_string(),
            quote_number: format!("QT-{}", id),
            customer: Customer {
                name: "James Park".to_string(),
                email: "james.park@smartflow-solutions.io".to_string(),
                company_name: "SmartFlow Solutions".to_string(),
                ..Customer::default()
            },
            line_items: vec![],
            status: QuoteStatus::Draft,
            total_amount: 0.0,
            currency: "GBP".to_string(),
            created_at: now,
            updated_at: now,
            notes: None,
            valid_until: None,
        }
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let gateway = QuoteGateway::new(InMemoryBackend::new());
        let quotes = vec![quote("a"), quote("b")];

        gateway.save(&quotes).await.expect("Failed to save");

        assert_eq!(gateway.load().await, quotes);
        assert_eq!(
            gateway
                .backend()
                .get_item("sales-quotes-version")
                .await
                .expect("Failed to read version"),
            Some("1.0".to_string())
        );
    }

    #[tokio::test]
    async fn test_invalid_record_blocks_whole_save() {
        let gateway = QuoteGateway::new(InMemoryBackend::new());
        let original = vec![quote("a")];
        gateway.save(&original).await.expect("Failed to save");

        let mut broken = quote("c");
        broken.total_amount = f64::NAN;
        let result = gateway.save(&[quote("b"), broken]).await;

        assert!(matches!(result, Err(Error::ValidationError { index: 1, .. })));
        assert_eq!(gateway.load().await, original);
    }

    #[tokio::test]
    async fn test_duplicate_ids_rejected() {
        let gateway = QuoteGateway::new(InMemoryBackend::new());
        let result = gateway.save(&[quote("a"), quote("a")]).await;
        assert!(matches!(result, Err(Error::ValidationError { index: 1, .. })));
    }

    #[tokio::test]
    async fn test_save_unavailable() {
        let gateway = QuoteGateway::new(InMemoryBackend::disabled());
        assert_eq!(gateway.save(&[]).await, Err(Error::StorageUnavailable));
        assert_eq!(gateway.clear().await, Err(Error::StorageUnavailable));
        assert!(gateway.load().await.is_empty());
        assert_eq!(gateway.usage().await, StorageUsage::default());
    }

    #[tokio::test]
    async fn test_load_fails_open_on_corruption() {
        let backend = InMemoryBackend::new();
        let gateway = QuoteGateway::new(backend.clone());

        backend
            .set_item("sales-quotes", "{{{ not json".to_string())
            .await
            .expect("Failed to set");
        assert!(gateway.load().await.is_empty());

        backend
            .set_item("sales-quotes", "{\"quotes\": []}".to_string())
            .await
            .expect("Failed to set");
        assert!(gateway.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_drops_invalid_records() {
        let backend = InMemoryBackend::new();
        let gateway = QuoteGateway::new(backend.clone());
        let good = quote("good");
        let text = format!(
            "[{}, {{\"id\": \"bad\"}}]",
            serde_json::to_string(&good).expect("Failed to encode")
        );
        backend
            .set_item("sales-quotes", text)
            .await
            .expect("Failed to set");

        assert_eq!(gateway.load().await, vec![good]);
    }

    #[tokio::test]
    async fn test_usage_counts_two_bytes_per_unit() {
        let backend = InMemoryBackend::new();
        let gateway = QuoteGateway::with_config(
            backend.clone(),
            GatewayConfig::default().with_quota_bytes(1000),
        )
        .expect("valid config");

        backend
            .set_item("strategy_canvases", "x".repeat(100))
            .await
            .expect("Failed to set");

        let usage = gateway.usage().await;
        assert_eq!(usage.used, 200);
        assert_eq!(usage.available, 800);
        assert_eq!(usage.percentage_full, 20);
    }

    #[tokio::test]
    async fn test_quota_exceeded_leaves_state_untouched() {
        let backend = InMemoryBackend::new();
        let small = QuoteGateway::with_config(
            backend.clone(),
            GatewayConfig::default().with_quota_bytes(2_000),
        )
        .expect("valid config");

        small.save(&[quote("a")]).await.expect("first save fits");
        let many: Vec<Quote> = (0..20).map(|i| quote(&format!("q{}", i))).collect();

        let result = small.save(&many).await;
        assert!(matches!(result, Err(Error::QuotaExceeded { quota: 2_000, .. })));
        assert_eq!(small.load().await.len(), 1);
    }

    #[tokio::test]
    async fn test_resave_does_not_double_count() {
        let backend = InMemoryBackend::new();
        let sizing = QuoteGateway::new(backend.clone());
        sizing.save(&[quote("a")]).await.expect("Failed to save");
        let footprint = sizing.usage().await.used;

        // Exactly enough room for one copy of the collection.
        let tight = QuoteGateway::with_config(
            backend,
            GatewayConfig::default().with_quota_bytes(footprint),
        )
        .expect("valid config");
        let current = tight.load().await;
        tight.save(&current).await.expect("rewrite should fit");
    }

    #[tokio::test]
    async fn test_save_and_clear_notify() {
        let gateway = QuoteGateway::new(InMemoryBackend::new());
        let mut events = gateway.subscribe();

        gateway.save(&[quote("a")]).await.expect("Failed to save");
        gateway.clear().await.expect("Failed to clear");

        assert!(matches!(events.recv().await, Ok(GatewayEvent::Saved(q)) if q.len() == 1));
        assert_eq!(events.recv().await, Ok(GatewayEvent::Cleared));
        assert!(gateway.load().await.is_empty());
        assert!(gateway.backend().is_empty());
    }

    #[tokio::test]
    async fn test_import_partial_tolerance() {
        let source = QuoteGateway::new(InMemoryBackend::new());
        source
            .save(&[quote("a"), quote("b")])
            .await
            .expect("Failed to save");
        let mut snapshot: serde_json::Value =
            serde_json::from_str(&source.export_all().await.expect("Failed to export"))
                .expect("export is JSON");
        snapshot["quotes"]
            .as_array_mut()
            .expect("quotes array")
            .insert(1, serde_json::json!({"id": "broken"}));

        let target = QuoteGateway::new(InMemoryBackend::new());
        let report = target.import_all(&snapshot.to_string()).await;

        assert!(report.succeeded);
        assert_eq!(report.imported_count, 2);
        assert_eq!(report.errors, vec!["Quote 2: Invalid quote structure".to_string()]);
        assert_eq!(target.load().await.len(), 2);
    }

    #[tokio::test]
    async fn test_import_merges_by_id() {
        let gateway = QuoteGateway::new(InMemoryBackend::new());
        gateway
            .save(&[quote("a"), quote("b")])
            .await
            .expect("Failed to save");

        let mut replacement = quote("b");
        replacement.status = QuoteStatus::Won;
        let snapshot = ExportEnvelope::new("1.0", &[replacement.clone(), quote("c")])
            .to_text()
            .expect("Failed to encode");

        let report = gateway.import_all(&snapshot).await;
        assert_eq!(report.imported_count, 2);

        let stored = gateway.load().await;
        let ids: Vec<&str> = stored.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(stored[1].status, QuoteStatus::Won);
    }

    #[tokio::test]
    async fn test_import_counts_distinct_ids() {
        let gateway = QuoteGateway::new(InMemoryBackend::new());
        let mut later = quote("a");
        later.status = QuoteStatus::Won;
        let snapshot = ExportEnvelope::new("1.0", &[quote("a"), later])
            .to_text()
            .expect("Failed to encode");

        let report = gateway.import_all(&snapshot).await;

        assert!(report.succeeded);
        assert_eq!(report.imported_count, 1);
        let stored = gateway.load().await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, QuoteStatus::Won);
    }

    #[tokio::test]
    async fn test_import_save_failure_keeps_record_errors() {
        let source = QuoteGateway::new(InMemoryBackend::new());
        let many: Vec<Quote> = (0..20).map(|i| quote(&format!("q{}", i))).collect();
        source.save(&many).await.expect("Failed to save");
        let mut snapshot: serde_json::Value =
            serde_json::from_str(&source.export_all().await.expect("Failed to export"))
                .expect("export is JSON");
        snapshot["quotes"]
            .as_array_mut()
            .expect("quotes array")
            .insert(1, serde_json::json!({"id": "broken"}));

        let small = QuoteGateway::with_config(
            InMemoryBackend::new(),
            GatewayConfig::default().with_quota_bytes(2_000),
        )
        .expect("valid config");
        let report = small.import_all(&snapshot.to_string()).await;

        assert!(!report.succeeded);
        assert_eq!(report.imported_count, 0);
        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.errors[0], "Quote 2: Invalid quote structure");
        assert!(report.errors[1].starts_with("Import failed: Storage quota exceeded"));
        assert!(small.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_sparse_legacy_record_survives_next_save() {
        let backend = InMemoryBackend::new();
        let gateway = QuoteGateway::new(backend.clone());
        let legacy = serde_json::json!([{
            "id": "legacy",
            "quoteNumber": "QT-000001",
            "customer": {"name": "Old"},
            "lineItems": [{"product": {"name": "Audit"}, "quantity": 1.5}, "junk"],
            "status": "archived",
            "totalAmount": 0,
            "currency": "GBP",
            "createdAt": "2024-01-01T00:00:00.000Z",
            "updatedAt": "2024-01-01T00:00:00.000Z"
        }]);
        assert!(codec::validate(&legacy[0]));
        backend
            .set_item("sales-quotes", legacy.to_string())
            .await
            .expect("Failed to set");

        let mut loaded = gateway.load().await;
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].customer.name, "Old");
        assert_eq!(loaded[0].line_items.len(), 2);
        assert_eq!(loaded[0].line_items[0].quantity, 2);
        assert_eq!(loaded[0].status, QuoteStatus::Draft);

        loaded.push(quote("fresh"));
        gateway.save(&loaded).await.expect("Failed to save");
        let ids: Vec<String> = gateway.load().await.into_iter().map(|q| q.id).collect();
        assert_eq!(ids, vec!["legacy".to_string(), "fresh".to_string()]);
    }

    #[tokio::test]
    async fn test_import_parse_failure() {
        let gateway = QuoteGateway::new(InMemoryBackend::new());
        let report = gateway.import_all("definitely not json").await;

        assert!(!report.succeeded);
        assert_eq!(report.imported_count, 0);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("Import failed:"));
    }

    #[tokio::test]
    async fn test_seed_only_when_empty() {
        let gateway = QuoteGateway::new(InMemoryBackend::new());

        assert!(gateway.seed(&[quote("s1")]).await.expect("Failed to seed"));
        assert!(!gateway.seed(&[quote("s2")]).await.expect("Failed to seed"));
        assert_eq!(gateway.load().await[0].id, "s1");

        gateway.save(&[]).await.expect("Failed to save");
        assert!(gateway.seed(&[quote("s3")]).await.expect("Failed to seed"));

        assert!(gateway.reset_to(&[quote("s4")]).await.expect("Failed to reset"));
        assert_eq!(gateway.load().await[0].id, "s4");
    }

    #[tokio::test]
    async fn test_onboarding_flag() {
        let gateway = QuoteGateway::new(InMemoryBackend::new());
        assert!(!gateway.has_seen_onboarding().await);
        gateway
            .mark_onboarding_seen()
            .await
            .expect("Failed to set flag");
        assert!(gateway.has_seen_onboarding().await);
    }
}
