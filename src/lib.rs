//! # quote-store
//!
//! Persistence layer for sales quotes kept in a browser-style local store:
//! one string-keyed, string-valued keyspace shared by every open tab.
//!
//! ## Features
//!
//! - **Validated writes:** every record is checked before anything is written
//! - **Quota aware:** writes that would overflow the store are refused up front
//! - **Fail-open reads:** corrupt or missing data loads as an empty collection
//! - **Backup:** versioned export envelope and merging import
//! - **Cross-tab sync:** live stores reload when another context writes
//! - **Debounced autosave:** drafts are saved once editing pauses
//! - **Backend agnostic:** anything implementing [`StorageBackend`]
//!
//! ## Quick Start
//!
//! ```ignore
//! use quote_store::{
//!     AutoSave, QuoteGateway, QuotePatch, QuoteStore,
//!     backend::InMemoryBackend,
//!     config::AutoSaveConfig,
//! };
//!
//! // 1. Open the store over a backend
//! let gateway = QuoteGateway::new(InMemoryBackend::new());
//! let store = QuoteStore::open(gateway).await;
//!
//! // 2. Follow writes from other tabs
//! let _watch = store.watch();
//!
//! // 3. Create and edit quotes
//! let quote = store
//!     .create(QuotePatch::new().with_customer(customer).with_line_items(items))
//!     .await?;
//! store.update(&quote.id, QuotePatch::new().with_notes("Net 30")).await?;
//!
//! // 4. Or let the editor autosave its draft
//! let mut autosave = AutoSave::new(store.clone(), AutoSaveConfig::quote_editor());
//! autosave.observe(&draft);
//! ```
//!
//! ## Layers
//!
//! - [`codec`]: text format and record validation
//! - [`QuoteGateway`]: validated, quota-checked access to the backend
//! - [`QuoteStore`]: live cached collection kept consistent across contexts
//! - [`AutoSave`]: debounced draft persistence

#[macro_use]
extern crate log;

pub mod autosave;
pub mod backend;
pub mod codec;
pub mod config;
pub mod error;
pub mod gateway;
pub mod key;
pub mod model;
pub mod observability;
pub mod store;

// Re-exports for convenience
pub use autosave::{AutoSave, DraftSink};
pub use backend::StorageBackend;
pub use error::{Error, Result};
pub use gateway::{GatewayEvent, ImportReport, QuoteGateway, StorageUsage};
pub use model::{Customer, Discount, LineItem, Product, Quote, QuotePatch, QuoteStatus};
pub use store::{LoadPhase, QuoteStore, WatchHandle};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
