//! Configuration for the gateway, the store and the autosave controller.
//!
//! All three are plain values with builder-style setters; defaults match the
//! quote editor's behavior.
//!
//! ```
//! use quote_store::config::{AutoSaveConfig, GatewayConfig};
//! use std::time::Duration;
//!
//! let gateway = GatewayConfig::default().with_quota_bytes(64 * 1024);
//! assert!(gateway.validate().is_ok());
//!
//! let autosave = AutoSaveConfig::quote_editor();
//! assert_eq!(autosave.delay, Duration::from_secs(3));
//! ```

use crate::error::{Error, Result};
use crate::key::{QUOTES_KEY, QUOTES_VERSION_KEY};
use std::time::Duration;

/// Fixed storage capacity of a browser origin.
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// Schema version written next to the collection.
pub const SCHEMA_VERSION: &str = "1.0";

/// Storage gateway settings.
#[derive(Clone, Debug, PartialEq)]
pub struct GatewayConfig {
    /// Key holding the collection.
    pub storage_key: String,
    /// Key holding the schema version tag.
    pub version_key: String,
    /// Version tag written on every save and into exports.
    pub schema_version: String,
    /// Capacity of the whole keyspace, in bytes (2 bytes per UTF-16 unit).
    pub quota_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            storage_key: QUOTES_KEY.to_string(),
            version_key: QUOTES_VERSION_KEY.to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            quota_bytes: DEFAULT_QUOTA_BYTES,
        }
    }
}

impl GatewayConfig {
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn with_version_key(mut self, key: impl Into<String>) -> Self {
        self.version_key = key.into();
        self
    }

    pub fn with_schema_version(mut self, version: impl Into<String>) -> Self {
        self.schema_version = version.into();
        self
    }

    pub fn with_quota_bytes(mut self, bytes: usize) -> Self {
        self.quota_bytes = bytes;
        self
    }

    /// Check the settings are usable.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` for empty or colliding keys, an empty
    /// version tag, or a zero quota.
    pub fn validate(&self) -> Result<()> {
        if self.storage_key.is_empty() || self.version_key.is_empty() {
            return Err(Error::ConfigError("storage keys must not be empty".to_string()));
        }
        if self.storage_key == self.version_key {
            return Err(Error::ConfigError(format!(
                "storage key and version key must differ (both are {:?})",
                self.storage_key
            )));
        }
        if self.schema_version.is_empty() {
            return Err(Error::ConfigError("schema version must not be empty".to_string()));
        }
        if self.quota_bytes == 0 {
            return Err(Error::ConfigError("quota must be greater than zero".to_string()));
        }
        Ok(())
    }
}

/// Defaults applied when a quote is created.
#[derive(Clone, Debug, PartialEq)]
pub struct StoreConfig {
    /// Currency of quotes created without one.
    pub default_currency: String,
    /// Distance between creation and the validity deadline.
    pub validity: chrono::Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            default_currency: "GBP".to_string(),
            validity: chrono::Duration::days(30),
        }
    }
}

impl StoreConfig {
    pub fn with_default_currency(mut self, currency: impl Into<String>) -> Self {
        self.default_currency = currency.into();
        self
    }

    pub fn with_validity(mut self, validity: chrono::Duration) -> Self {
        self.validity = validity;
        self
    }
}

/// Autosave controller settings.
#[derive(Clone, Debug, PartialEq)]
pub struct AutoSaveConfig {
    /// Quiet period after the last change before a save fires.
    pub delay: Duration,
    /// Gate checked when the timer fires.
    pub enabled: bool,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        AutoSaveConfig {
            delay: Duration::from_secs(2),
            enabled: true,
        }
    }
}

impl AutoSaveConfig {
    /// Setting used by the quote editor.
    pub fn quote_editor() -> Self {
        Self::default().with_delay(Duration::from_secs(3))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}
