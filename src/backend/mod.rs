//! Storage backend implementations.

use crate::error::Result;
use std::fmt;
use std::future::Future;
use tokio::sync::broadcast;

pub mod inmemory;

pub use inmemory::InMemoryBackend;

/// Key used by [`StorageBackend::is_available`] to probe writability.
pub const PROBE_KEY: &str = "__storage_test__";

/// Identifies one execution context (a browser tab, a window, a process)
/// attached to a shared store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContextId(pub u64);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

/// Change notification emitted by a shared store after every mutation.
///
/// Mirrors the browser `storage` event: it is delivered to every subscriber,
/// and consumers ignore the events whose `origin` is their own context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageEvent {
    /// Key that changed. `None` when the whole store was wiped.
    pub key: Option<String>,
    /// Context that performed the write.
    pub origin: ContextId,
}

impl StorageEvent {
    /// Whether this event concerns `key` and was produced by another context.
    pub fn is_external_change_of(&self, key: &str, own: ContextId) -> bool {
        self.origin != own && self.key.as_deref().map_or(true, |k| k == key)
    }
}

/// Trait for the shared keyed textual store.
///
/// Abstracts `localStorage`-like storage: string keys, string values, one
/// keyspace shared by every context of the same origin. Implementations:
/// InMemory (default), file-backed, embedded KV, etc.
///
/// **IMPORTANT:** All methods use `&self`. Implementations should use interior
/// mutability so that clones of a handle share state.
///
/// **ASYNC:** Methods return `Send` futures so store operations can be driven
/// from spawned tasks (autosave timers, watch loops).
pub trait StorageBackend: Send + Sync + Clone {
    /// Retrieve a value by key.
    ///
    /// # Errors
    /// Returns `Err` if the store is unavailable.
    fn get_item(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Store a value, replacing any previous one.
    ///
    /// # Errors
    /// Returns `Err` if the store is unavailable or rejects the write.
    fn set_item(&self, key: &str, value: String) -> impl Future<Output = Result<()>> + Send;

    /// Remove a value. Removing an absent key is not an error.
    ///
    /// # Errors
    /// Returns `Err` if the store is unavailable.
    fn remove_item(&self, key: &str) -> impl Future<Output = Result<()>> + Send;

    /// List every key currently held by the store.
    ///
    /// # Errors
    /// Returns `Err` if the store is unavailable.
    fn keys(&self) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Context this handle writes as.
    fn context_id(&self) -> ContextId;

    /// Subscribe to change notifications from every context.
    fn subscribe(&self) -> broadcast::Receiver<StorageEvent>;

    /// Probe whether the store accepts writes. Never fails.
    ///
    /// Default implementation writes and removes [`PROBE_KEY`].
    fn is_available(&self) -> impl Future<Output = bool> + Send {
        async move {
            if self.set_item(PROBE_KEY, "test".to_string()).await.is_err() {
                return false;
            }
            self.remove_item(PROBE_KEY).await.is_ok()
        }
    }

    /// Total size of all stored values in UTF-16 code units.
    ///
    /// Default implementation reads every key. Override for efficiency.
    ///
    /// # Errors
    /// Returns `Err` if the store is unavailable.
    fn used_units(&self) -> impl Future<Output = Result<usize>> + Send {
        async move {
            let mut total = 0;
            for key in self.keys().await? {
                if let Some(value) = self.get_item(&key).await? {
                    total += utf16_len(&value);
                }
            }
            Ok(total)
        }
    }
}

/// Length of `s` in UTF-16 code units, the unit browsers account storage in.
pub fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}
