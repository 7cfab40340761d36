//! Error types for the quote store.

use std::fmt;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the quote store.
///
/// Write-path operations return `Result<T>`. The read path (`QuoteGateway::load`)
/// never surfaces these: it degrades to an empty collection instead.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The backing store cannot be used at all.
    ///
    /// Common causes:
    /// - Storage disabled by environment policy (private browsing, sandbox)
    /// - Backend probe write rejected
    ///
    /// **Recovery:** None at this layer. Reads keep returning an empty
    /// collection; writes keep failing until the store becomes available.
    StorageUnavailable,

    /// A record failed structural validation before a write.
    ///
    /// `index` is the 0-based position of the offending record in the
    /// collection handed to `save`. Nothing was written.
    ValidationError {
        /// Position of the offending record.
        index: usize,
        /// Human-readable reason.
        reason: String,
    },

    /// The projected payload does not fit into the fixed quota.
    ///
    /// Existing stored state is untouched.
    QuotaExceeded {
        /// Bytes the store would occupy after the write.
        required: usize,
        /// Configured quota in bytes.
        quota: usize,
    },

    /// Top-level text is not well-formed (import payloads, stored text).
    ParseError(String),

    /// Serialization failed when converting records to text.
    SerializationError(String),

    /// Backend storage error.
    BackendError(String),

    /// Invalid configuration.
    ConfigError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::StorageUnavailable => write!(f, "Local storage is not available"),
            Error::ValidationError { index, reason } => {
                write!(f, "Invalid quote at index {}: {}", index, reason)
            }
            Error::QuotaExceeded { required, quota } => write!(
                f,
                "Storage quota exceeded: {} bytes required, quota is {} bytes",
                required, quota
            ),
            Error::ParseError(msg) => write!(f, "Parse error: {}", msg),
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::ConfigError(msg) => write!(f, "Config error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            Error::BackendError(e.to_string())
        } else if e.is_syntax() || e.is_eof() {
            Error::ParseError(e.to_string())
        } else {
            Error::SerializationError(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::ValidationError {
            index: 3,
            reason: "missing id".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid quote at index 3: missing id");
    }

    #[test]
    fn test_quota_display() {
        let err = Error::QuotaExceeded {
            required: 10,
            quota: 5,
        };
        assert_eq!(
            err.to_string(),
            "Storage quota exceeded: 10 bytes required, quota is 5 bytes"
        );
    }

    #[test]
    fn test_syntax_error_maps_to_parse_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json")
            .expect_err("malformed input must fail");
        assert!(matches!(Error::from(json_err), Error::ParseError(_)));
    }
}
