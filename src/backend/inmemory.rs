//! In-memory storage backend (default, thread-safe, async).
//!
//! Uses DashMap for lock-free concurrent access with per-key sharding.
//! Every handle attached to the same store sees the same keyspace; each
//! mutation is broadcast to all attached contexts.

use super::{utf16_len, ContextId, StorageBackend, StorageEvent};
use crate::error::{Error, Result};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 64;

struct SharedStore {
    items: DashMap<String, String>,
    events: broadcast::Sender<StorageEvent>,
    next_context: AtomicU64,
    available: AtomicBool,
}

/// Thread-safe in-memory keyed store shared by several contexts.
///
/// Cloning a handle keeps the same [`ContextId`] (same tab). Use
/// [`InMemoryBackend::open_context`] to attach a new context (another tab)
/// to the same keyspace.
///
/// # Example
///
/// ```no_run
/// use quote_store::backend::{InMemoryBackend, StorageBackend};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let tab_a = InMemoryBackend::new();
///     let tab_b = tab_a.open_context();
///
///     let mut events = tab_b.subscribe();
///     tab_a.set_item("key1", "value".to_string()).await?;
///
///     assert_eq!(tab_b.get_item("key1").await?, Some("value".to_string()));
///     let event = events.recv().await?;
///     assert_eq!(event.origin, tab_a.context_id());
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct InMemoryBackend {
    shared: Arc<SharedStore>,
    context: ContextId,
}

impl InMemoryBackend {
    /// Create a new empty store and attach the first context to it.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let shared = Arc::new(SharedStore {
            items: DashMap::new(),
            events,
            next_context: AtomicU64::new(1),
            available: AtomicBool::new(true),
        });
        InMemoryBackend {
            shared,
            context: ContextId(0),
        }
    }

    /// Create a store that rejects every operation, as storage disabled by
    /// environment policy does.
    pub fn disabled() -> Self {
        let backend = Self::new();
        backend.set_available(false);
        backend
    }

    /// Attach a new context to the same keyspace.
    pub fn open_context(&self) -> Self {
        let id = self.shared.next_context.fetch_add(1, Ordering::Relaxed);
        InMemoryBackend {
            shared: Arc::clone(&self.shared),
            context: ContextId(id),
        }
    }

    /// Enable or disable the store for every attached context.
    pub fn set_available(&self, available: bool) {
        self.shared.available.store(available, Ordering::SeqCst);
        debug!("InMemory availability -> {}", available);
    }

    /// Get the current number of keys.
    pub fn len(&self) -> usize {
        self.shared.items.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.shared.items.is_empty()
    }

    /// Get size statistics.
    pub fn stats(&self) -> BackendStats {
        let total_units = self
            .shared
            .items
            .iter()
            .map(|entry| utf16_len(entry.value()))
            .sum();
        BackendStats {
            total_entries: self.shared.items.len(),
            total_units,
        }
    }

    fn ensure_available(&self) -> Result<()> {
        if self.shared.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::StorageUnavailable)
        }
    }

    fn notify(&self, key: &str) {
        // No receivers is fine: nobody is watching.
        let _ = self.shared.events.send(StorageEvent {
            key: Some(key.to_string()),
            origin: self.context,
        });
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageBackend for InMemoryBackend {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.ensure_available()?;
        let value = self.shared.items.get(key).map(|v| v.value().clone());
        debug!(
            "InMemory GET {} -> {}",
            key,
            if value.is_some() { "HIT" } else { "MISS" }
        );
        Ok(value)
    }

    async fn set_item(&self, key: &str, value: String) -> Result<()> {
        self.ensure_available()?;
        self.shared.items.insert(key.to_string(), value);
        debug!("InMemory SET {} ({})", key, self.context);
        self.notify(key);
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.ensure_available()?;
        if self.shared.items.remove(key).is_some() {
            debug!("InMemory REMOVE {} ({})", key, self.context);
            self.notify(key);
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        self.ensure_available()?;
        Ok(self
            .shared
            .items
            .iter()
            .map(|entry| entry.key().clone())
            .collect())
    }

    fn context_id(&self) -> ContextId {
        self.context
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.shared.events.subscribe()
    }

    async fn used_units(&self) -> Result<usize> {
        self.ensure_available()?;
        Ok(self.stats().total_units)
    }
}

/// Store size statistics.
#[derive(Clone, Debug)]
pub struct BackendStats {
    pub total_entries: usize,
    pub total_units: usize,
}
