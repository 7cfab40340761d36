//! Debounced autosave for a quote being edited.
//!
//! [`AutoSave`] watches successive versions of a draft ([`QuotePatch`]) and
//! persists it through a [`DraftSink`] once edits have stopped for
//! [`AutoSaveConfig::delay`]. Each change cancels the pending timer and
//! starts a new one, so a burst of edits produces a single save.
//!
//! ```ignore
//! let mut autosave = AutoSave::new(store.clone(), AutoSaveConfig::quote_editor())
//!     .on_save(|quote| info!("Auto-saved {}", quote.quote_number))
//!     .on_error(|e| warn!("Auto-save failed: {}", e));
//!
//! autosave.observe(&draft); // initial load, never saves
//! draft.notes = Some("Net 30".into());
//! autosave.observe(&draft); // saves 3s later unless edited again
//! ```
//!
//! Only the content a user edits takes part in change detection: customer,
//! line items, total and notes.

use crate::backend::StorageBackend;
use crate::config::AutoSaveConfig;
use crate::error::{Error, Result};
use crate::model::{Customer, LineItem, Quote, QuotePatch};
use crate::store::QuoteStore;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Destination of autosaved drafts.
pub trait DraftSink: Send + Sync + 'static {
    /// Create or update the quote described by `draft`.
    fn persist(&self, draft: QuotePatch) -> impl Future<Output = Result<Quote>> + Send;
}

impl<B: StorageBackend + 'static> DraftSink for QuoteStore<B> {
    async fn persist(&self, draft: QuotePatch) -> Result<Quote> {
        self.upsert(draft).await
    }
}

type SaveCallback = Arc<dyn Fn(&Quote) + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(&Error) + Send + Sync>;

#[derive(Clone, Default)]
struct Hooks {
    on_save: Option<SaveCallback>,
    on_error: Option<ErrorCallback>,
}

struct Shared<S> {
    sink: S,
    enabled: AtomicBool,
    // Id of the quote the draft was last saved as; later drafts without an id
    // update it instead of creating another quote.
    saved_id: Mutex<Option<String>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Observed<'a> {
    customer: &'a Option<Customer>,
    line_items: &'a Option<Vec<LineItem>>,
    total_amount: Option<f64>,
    notes: &'a Option<String>,
}

fn snapshot_of(draft: &QuotePatch) -> String {
    serde_json::to_string(&Observed {
        customer: &draft.customer,
        line_items: &draft.line_items,
        total_amount: draft.total_amount,
        notes: &draft.notes,
    })
    .unwrap_or_default()
}

/// Trailing-edge debounced saver.
///
/// Must be used inside a tokio runtime. Dropping the controller cancels a
/// pending save; a save that has already started runs to completion.
pub struct AutoSave<S: DraftSink> {
    shared: Arc<Shared<S>>,
    hooks: Hooks,
    delay: Duration,
    snapshot: Option<String>,
    draft: QuotePatch,
    pending: Option<JoinHandle<()>>,
}

impl<S: DraftSink> AutoSave<S> {
    pub fn new(sink: S, config: AutoSaveConfig) -> Self {
        AutoSave {
            shared: Arc::new(Shared {
                sink,
                enabled: AtomicBool::new(config.enabled),
                saved_id: Mutex::new(None),
            }),
            hooks: Hooks::default(),
            delay: config.delay,
            snapshot: None,
            draft: QuotePatch::default(),
            pending: None,
        }
    }

    /// Called with the stored quote after every successful save.
    pub fn on_save(mut self, callback: impl Fn(&Quote) + Send + Sync + 'static) -> Self {
        self.hooks.on_save = Some(Arc::new(callback));
        self
    }

    /// Called instead of returning an error when a save fails.
    pub fn on_error(mut self, callback: impl Fn(&Error) + Send + Sync + 'static) -> Self {
        self.hooks.on_error = Some(Arc::new(callback));
        self
    }

    /// Toggle saving. Checked when a timer fires, so disabling also
    /// suppresses a save that is already scheduled.
    pub fn set_enabled(&self, enabled: bool) {
        self.shared.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.enabled.load(Ordering::SeqCst)
    }

    /// Whether a save is scheduled and has not fired yet.
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|timer| !timer.is_finished())
    }

    /// Feed the current state of the draft.
    ///
    /// The first call records the initial state and never schedules a save.
    /// Later calls schedule one only when the observed content changed.
    pub fn observe(&mut self, draft: &QuotePatch) {
        let snapshot = snapshot_of(draft);
        self.draft = draft.clone();

        match &self.snapshot {
            None => {
                self.snapshot = Some(snapshot);
                return;
            }
            Some(previous) if *previous == snapshot => return,
            Some(_) => {}
        }

        self.snapshot = Some(snapshot);
        self.schedule();
    }

    fn schedule(&mut self) {
        self.cancel();

        let shared = Arc::clone(&self.shared);
        let hooks = self.hooks.clone();
        let draft = self.draft.clone();
        let delay = self.delay;

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !shared.enabled.load(Ordering::SeqCst) {
                debug!("Autosave disabled, skipping scheduled save");
                return;
            }
            // Detached so that rescheduling never interrupts a write in progress.
            tokio::spawn(async move {
                run(&shared, &hooks, draft).await;
            });
        }));
    }

    /// Cancel the pending save, if any.
    pub fn cancel(&mut self) {
        if let Some(timer) = self.pending.take() {
            timer.abort();
        }
    }

    /// Cancel the pending timer and save the latest draft right away.
    ///
    /// Ignores the enabled flag. Returns the stored quote, or `None` when the
    /// draft has no customer or line items or the save failed (reported
    /// through `on_error`).
    pub async fn save_now(&mut self) -> Option<Quote> {
        self.cancel();
        run(&self.shared, &self.hooks, self.draft.clone()).await
    }
}

impl<S: DraftSink> Drop for AutoSave<S> {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run<S: DraftSink>(shared: &Shared<S>, hooks: &Hooks, mut draft: QuotePatch) -> Option<Quote> {
    if !draft.is_saveable() {
        debug!("Autosave skipped: draft needs a customer and line items");
        return None;
    }

    let mut saved_id = shared.saved_id.lock().await;
    if draft.id.is_none() {
        draft.id.clone_from(&saved_id);
    }

    match shared.sink.persist(draft).await {
        Ok(quote) => {
            *saved_id = Some(quote.id.clone());
            if let Some(callback) = &hooks.on_save {
                callback(&quote);
            }
            Some(quote)
        }
        Err(e) => {
            warn!("Autosave failed: {}", e);
            if let Some(callback) = &hooks.on_error {
                callback(&e);
            }
            None
        }
    }
}
