//! Reactive quote store - the live in-memory collection used by callers.
//!
//! A [`QuoteStore`] caches the collection read through a [`QuoteGateway`] and
//! keeps it consistent with every other consumer of the same backend:
//!
//! - stores sharing one gateway see each other's writes through
//!   [`GatewayEvent`]s;
//! - stores in other contexts (other tabs) see them through the backend's
//!   [`StorageEvent`](crate::backend::StorageEvent)s and reload the whole
//!   collection. Last writer wins at collection granularity.
//!
//! Every mutation persists first and updates the cache only on success, so a
//! failed write never leaves the cache ahead of storage.
//!
//! # Load phases
//!
//! ```text
//! Idle ──reload──▶ Loading ──▶ Loaded
//!                          └─▶ Errored  (storage unavailable)
//! ```

use crate::backend::StorageBackend;
use crate::codec::iso8601;
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::gateway::{GatewayEvent, ImportReport, QuoteGateway, StorageUsage};
use crate::model::{Quote, QuotePatch, QuoteStatus};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Where the cache is in its load cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadPhase {
    #[default]
    Idle,
    Loading,
    Loaded,
    Errored,
}

#[derive(Default)]
struct StoreState {
    quotes: Vec<Quote>,
    phase: LoadPhase,
    error: Option<String>,
    last_saved: Option<DateTime<Utc>>,
}

/// Live, shareable view of the stored quotes.
///
/// Clones share the same cache.
///
/// # Example
///
/// ```ignore
/// use quote_store::{QuoteGateway, QuoteStore, QuotePatch};
/// use quote_store::backend::InMemoryBackend;
///
/// let store = QuoteStore::open(QuoteGateway::new(InMemoryBackend::new())).await;
/// let _watch = store.watch();
///
/// let quote = store
///     .upsert(QuotePatch::new().with_customer(customer).with_line_items(items))
///     .await?;
/// store.set_status(&quote.id, QuoteStatus::Sent).await?;
/// ```
#[derive(Clone)]
pub struct QuoteStore<B: StorageBackend> {
    gateway: QuoteGateway<B>,
    config: Arc<StoreConfig>,
    state: Arc<RwLock<StoreState>>,
}

impl<B: StorageBackend> QuoteStore<B> {
    /// Create an idle store. Call [`reload`](Self::reload) to populate it.
    pub fn new(gateway: QuoteGateway<B>) -> Self {
        Self::with_config(gateway, StoreConfig::default())
    }

    pub fn with_config(gateway: QuoteGateway<B>, config: StoreConfig) -> Self {
        QuoteStore {
            gateway,
            config: Arc::new(config),
            state: Arc::new(RwLock::new(StoreState::default())),
        }
    }

    /// Create a store and load it.
    pub async fn open(gateway: QuoteGateway<B>) -> Self {
        let store = Self::new(gateway);
        store.reload().await;
        store
    }

    pub fn gateway(&self) -> &QuoteGateway<B> {
        &self.gateway
    }

    /// Snapshot of the cached collection.
    pub async fn quotes(&self) -> Vec<Quote> {
        self.state.read().await.quotes.clone()
    }

    pub async fn get(&self, id: &str) -> Option<Quote> {
        self.state
            .read()
            .await
            .quotes
            .iter()
            .find(|quote| quote.id == id)
            .cloned()
    }

    pub async fn phase(&self) -> LoadPhase {
        self.state.read().await.phase
    }

    /// Message of the last failed operation, cleared by the next attempt.
    pub async fn error(&self) -> Option<String> {
        self.state.read().await.error.clone()
    }

    pub async fn last_saved(&self) -> Option<DateTime<Utc>> {
        self.state.read().await.last_saved
    }

    /// Storage occupancy, for quota warnings.
    pub async fn usage(&self) -> StorageUsage {
        self.gateway.usage().await
    }

    /// Replace the cache with the stored collection.
    pub async fn reload(&self) {
        let mut state = self.state.write().await;
        self.reload_locked(&mut state).await;
    }

    async fn reload_locked(&self, state: &mut StoreState) {
        state.phase = LoadPhase::Loading;
        state.error = None;

        if !self.gateway.is_available().await {
            state.quotes.clear();
            state.error = Some(Error::StorageUnavailable.to_string());
            state.phase = LoadPhase::Errored;
            return;
        }

        state.quotes = self.gateway.load().await;
        state.phase = LoadPhase::Loaded;
        debug!("Store reloaded {} quotes", state.quotes.len());
    }

    /// Create or update from a partial quote.
    ///
    /// A patch whose `id` matches a cached quote is merged onto it and
    /// `updated_at` is refreshed. Any other patch creates a quote: the id
    /// (when given) is kept, missing fields get defaults, status defaults to
    /// draft and the validity deadline is set from [`StoreConfig::validity`].
    ///
    /// # Errors
    ///
    /// - `Error::ValidationError`: a new quote has no customer
    /// - any error of [`QuoteGateway::save`]
    pub async fn upsert(&self, patch: QuotePatch) -> Result<Quote> {
        let mut state = self.state.write().await;
        self.upsert_locked(&mut state, patch).await
    }

    /// Create a new quote. A patch id that is already taken is replaced by a
    /// fresh one, so this never overwrites an existing quote.
    ///
    /// # Errors
    ///
    /// Same as [`upsert`](Self::upsert).
    pub async fn create(&self, mut patch: QuotePatch) -> Result<Quote> {
        let mut state = self.state.write().await;
        if let Some(id) = patch.id.as_deref() {
            if state.quotes.iter().any(|quote| quote.id == id) {
                patch.id = None;
            }
        }
        self.upsert_locked(&mut state, patch).await
    }

    /// Merge `patch` onto quote `id`.
    ///
    /// An `id` that is not cached creates a new quote with that id, exactly
    /// like [`upsert`](Self::upsert).
    ///
    /// # Errors
    ///
    /// Same as [`upsert`](Self::upsert).
    pub async fn update(&self, id: &str, mut patch: QuotePatch) -> Result<Quote> {
        patch.id = Some(id.to_string());
        self.upsert(patch).await
    }

    async fn upsert_locked(&self, state: &mut StoreState, patch: QuotePatch) -> Result<Quote> {
        state.error = None;
        let now = iso8601::now();
        let mut next = state.quotes.clone();

        let existing = patch
            .id
            .as_deref()
            .and_then(|id| next.iter().position(|quote| quote.id == id));

        let saved = match existing {
            Some(index) => {
                let quote = &mut next[index];
                patch.apply_to(quote);
                quote.updated_at = now.max(quote.created_at);
                quote.clone()
            }
            None => match self.build(&patch, &next, now) {
                Ok(quote) => {
                    next.push(quote.clone());
                    quote
                }
                Err(e) => {
                    state.error = Some(e.to_string());
                    return Err(e);
                }
            },
        };

        self.commit(state, next, now).await?;
        Ok(saved)
    }

    fn build(&self, patch: &QuotePatch, existing: &[Quote], now: DateTime<Utc>) -> Result<Quote> {
        let customer = patch.customer.clone().ok_or_else(|| Error::ValidationError {
            index: existing.len(),
            reason: "a new quote needs a customer".to_string(),
        })?;

        Ok(Quote {
            id: patch.id.clone().unwrap_or_else(new_quote_id),
            quote_number: patch
                .quote_number
                .clone()
                .unwrap_or_else(|| next_quote_number(existing, now)),
            customer,
            line_items: patch.line_items.clone().unwrap_or_default(),
            status: patch.status.unwrap_or_default(),
            total_amount: patch.total_amount.unwrap_or(0.0),
            currency: patch
                .currency
                .clone()
                .unwrap_or_else(|| self.config.default_currency.clone()),
            created_at: now,
            updated_at: now,
            notes: patch.notes.clone(),
            valid_until: patch.valid_until.or(Some(now + self.config.validity)),
        })
    }

    /// Delete quote `id`. Deleting an unknown id rewrites the same collection.
    ///
    /// # Errors
    ///
    /// Any error of [`QuoteGateway::save`].
    pub async fn remove(&self, id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.error = None;
        let next: Vec<Quote> = state
            .quotes
            .iter()
            .filter(|quote| quote.id != id)
            .cloned()
            .collect();
        self.commit(&mut state, next, iso8601::now()).await
    }

    /// Change only the status (and `updated_at`) of quote `id`.
    /// Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Any error of [`QuoteGateway::save`].
    pub async fn set_status(&self, id: &str, status: QuoteStatus) -> Result<()> {
        let mut state = self.state.write().await;
        state.error = None;
        let Some(index) = state.quotes.iter().position(|quote| quote.id == id) else {
            return Ok(());
        };

        let now = iso8601::now();
        let mut next = state.quotes.clone();
        let quote = &mut next[index];
        quote.status = status;
        quote.updated_at = now.max(quote.created_at);
        self.commit(&mut state, next, now).await
    }

    /// Copy quote `id` under a new id and number, as a fresh draft.
    ///
    /// Returns `Ok(None)` when `id` is unknown; nothing is written then.
    ///
    /// # Errors
    ///
    /// Any error of [`QuoteGateway::save`].
    pub async fn duplicate(&self, id: &str) -> Result<Option<Quote>> {
        let mut state = self.state.write().await;
        state.error = None;
        let Some(original) = state.quotes.iter().find(|quote| quote.id == id).cloned() else {
            return Ok(None);
        };

        let now = iso8601::now();
        let copy = Quote {
            id: new_quote_id(),
            quote_number: next_quote_number(&state.quotes, now),
            status: QuoteStatus::Draft,
            created_at: now,
            updated_at: now,
            valid_until: Some(now + self.config.validity),
            ..original
        };

        let mut next = state.quotes.clone();
        next.push(copy.clone());
        self.commit(&mut state, next, now).await?;
        Ok(Some(copy))
    }

    /// Remove every stored quote.
    ///
    /// # Errors
    ///
    /// Any error of [`QuoteGateway::clear`].
    pub async fn clear(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.error = None;
        match self.gateway.clear().await {
            Ok(()) => {
                state.quotes.clear();
                state.last_saved = None;
                Ok(())
            }
            Err(e) => {
                state.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Backup text of the stored collection.
    ///
    /// # Errors
    ///
    /// Any error of [`QuoteGateway::export_all`].
    pub async fn export_all(&self) -> Result<String> {
        let result = self.gateway.export_all().await;
        if let Err(e) = &result {
            self.state.write().await.error = Some(e.to_string());
        }
        result
    }

    /// Import a backup, then reload the cache.
    ///
    /// A failed import leaves the cache as is and records the report's
    /// errors as the store error.
    pub async fn import_all(&self, text: &str) -> ImportReport {
        let report = self.gateway.import_all(text).await;
        if report.succeeded {
            self.reload().await;
        } else {
            self.state.write().await.error = Some(report.errors.join(", "));
        }
        report
    }

    async fn commit(
        &self,
        state: &mut StoreState,
        next: Vec<Quote>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        match self.gateway.save(&next).await {
            Ok(()) => {
                state.quotes = next;
                state.last_saved = Some(now);
                Ok(())
            }
            Err(e) => {
                warn!("Quote store write failed: {}", e);
                state.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Follow a save or clear made through the shared gateway.
    ///
    /// The event payload may already be older than storage, so the cache is
    /// always read back from the backend.
    async fn follow_gateway(&self, event: GatewayEvent) {
        let mut state = self.state.write().await;
        self.reload_locked(&mut state).await;
        state.last_saved = match event {
            GatewayEvent::Saved(_) => Some(iso8601::now()),
            GatewayEvent::Cleared => None,
        };
    }
}

impl<B: StorageBackend + 'static> QuoteStore<B> {
    /// Keep the cache in sync with writes made elsewhere.
    ///
    /// Spawns a task that reloads the whole collection after every save or
    /// clear through this gateway and whenever another context changes the
    /// collection key. The task stops when the handle is stopped or dropped.
    pub fn watch(&self) -> WatchHandle {
        let store = self.clone();
        let own = self.gateway.backend().context_id();
        let key = self.gateway.config().storage_key.clone();
        let mut storage_events = self.gateway.backend().subscribe();
        let mut gateway_events = self.gateway.subscribe();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = storage_events.recv() => match event {
                        Ok(event) if event.is_external_change_of(&key, own) => {
                            debug!("{} changed by {}, reloading", key, event.origin);
                            store.reload().await;
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("Missed {} storage events, reloading", skipped);
                            store.reload().await;
                        }
                        Err(RecvError::Closed) => break,
                    },
                    event = gateway_events.recv() => match event {
                        Ok(event) => store.follow_gateway(event).await,
                        Err(RecvError::Lagged(_)) => store.reload().await,
                        Err(RecvError::Closed) => break,
                    },
                }
            }
        });

        WatchHandle { task }
    }
}

/// Subscription created by [`QuoteStore::watch`]. Dropping it stops syncing.
pub struct WatchHandle {
    task: JoinHandle<()>,
}

impl WatchHandle {
    /// Stop syncing and wait for the task to wind down.
    pub async fn stop(mut self) {
        self.task.abort();
        let _ = (&mut self.task).await;
    }

    pub fn is_stopped(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn new_quote_id() -> String {
    format!("quote-{}", Uuid::now_v7().simple())
}

/// `QT-` plus six digits taken from the clock, bumped past numbers in use.
fn next_quote_number(existing: &[Quote], now: DateTime<Utc>) -> String {
    let start = now.timestamp_millis().rem_euclid(1_000_000);
    (0..1_000_000)
        .map(|offset| format!("QT-{:06}", (start + offset) % 1_000_000))
        .find(|candidate| existing.iter().all(|quote| &quote.quote_number != candidate))
        .unwrap_or_else(|| format!("QT-{}", Uuid::now_v7().simple()))
}
