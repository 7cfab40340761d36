//! Textual codec for quote collections.
//!
//! Collections are stored as a JSON array. Every timestamp is written as an
//! ISO-8601 string with millisecond precision and a `Z` suffix, the same
//! shape browsers produce with `Date.prototype.toISOString`.
//!
//! Decoding happens in two steps so that one bad record never poisons a
//! whole collection:
//!
//! ```text
//! text ──decode──▶ Vec<Value> ──validate / decode_record──▶ Quote
//!        ParseError            per-record RecordError
//! ```
//!
//! # Example
//!
//! ```rust
//! use quote_store::codec::{decode, encode, validate};
//!
//! # fn main() -> quote_store::Result<()> {
//! let text = encode(&[])?;
//! assert_eq!(text, "[]");
//!
//! let raw = decode(r#"[{"id": 1}]"#)?;
//! assert!(!validate(&raw[0]));
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use crate::model::Quote;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Fields every stored quote must carry as strings.
const STRING_FIELDS: [&str; 4] = ["id", "quoteNumber", "status", "currency"];

/// Timestamp fields every stored quote must carry.
const TIMESTAMP_FIELDS: [&str; 2] = ["createdAt", "updatedAt"];

/// ISO-8601 timestamp encoding used by every persisted date.
pub mod iso8601 {
    use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    /// Current instant truncated to storage precision, so that a value
    /// survives an encode/decode cycle unchanged.
    pub fn now() -> DateTime<Utc> {
        Utc::now().trunc_subsecs(3)
    }

    pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_timestamp(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid ISO-8601 timestamp: {}", raw)))
    }

    /// Same encoding for optional timestamps; `null` and absence both mean `None`.
    pub mod option {
        use super::{format_timestamp, parse_timestamp};
        use chrono::{DateTime, Utc};
        use serde::{de, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            dt: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match dt {
                Some(dt) => serializer.serialize_str(&format_timestamp(dt)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                None => Ok(None),
                Some(raw) => parse_timestamp(&raw).map(Some).ok_or_else(|| {
                    de::Error::custom(format!("invalid ISO-8601 timestamp: {}", raw))
                }),
            }
        }
    }
}

/// Why a single decoded record was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordError {
    /// A timestamp field is present but not a valid ISO-8601 string.
    InvalidDate(&'static str),
    /// A required field is missing or has the wrong kind, or the record
    /// does not fit the typed model.
    InvalidStructure(String),
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::InvalidDate(_) => write!(f, "Invalid date format"),
            RecordError::InvalidStructure(_) => write!(f, "Invalid quote structure"),
        }
    }
}

/// Serialize a collection. Timestamps become ISO-8601 strings.
///
/// # Errors
///
/// Returns `Error::SerializationError` if serde fails, which does not happen
/// for values built from the model types.
pub fn encode(records: &[Quote]) -> Result<String> {
    serde_json::to_string(records).map_err(|e| {
        error!("Quote serialization failed: {}", e);
        Error::SerializationError(e.to_string())
    })
}

/// Serialize one record to its raw JSON form, as it will be stored.
///
/// # Errors
///
/// Returns `Error::SerializationError` if serde fails.
pub fn to_raw(record: &Quote) -> Result<Value> {
    serde_json::to_value(record).map_err(|e| Error::SerializationError(e.to_string()))
}

/// Parse stored or imported text into raw records.
///
/// # Errors
///
/// Returns `Error::ParseError` when the text is not JSON or not an array.
pub fn decode(text: &str) -> Result<Vec<Value>> {
    match serde_json::from_str::<Value>(text).map_err(|e| Error::ParseError(e.to_string()))? {
        Value::Array(records) => Ok(records),
        other => Err(Error::ParseError(format!(
            "expected an array of quotes, found {}",
            kind_of(&other)
        ))),
    }
}

/// Structural check: required fields present with the right primitive kinds.
///
/// Does not check arithmetic consistency or status membership.
pub fn validate(candidate: &Value) -> bool {
    check(candidate).is_ok()
}

/// Validate a raw record and convert it into a typed [`Quote`].
///
/// # Errors
///
/// Returns the first [`RecordError`] found.
pub fn decode_record(candidate: &Value) -> std::result::Result<Quote, RecordError> {
    check(candidate)?;
    serde_json::from_value(candidate.clone())
        .map_err(|e| RecordError::InvalidStructure(e.to_string()))
}

/// Structural check reporting the first problem found.
///
/// # Errors
///
/// Returns the [`RecordError`] describing the violation.
pub fn check(candidate: &Value) -> std::result::Result<(), RecordError> {
    let Some(fields) = candidate.as_object() else {
        return Err(RecordError::InvalidStructure(format!(
            "expected an object, found {}",
            kind_of(candidate)
        )));
    };

    for name in TIMESTAMP_FIELDS {
        match fields.get(name) {
            Some(Value::String(raw)) => {
                if iso8601::parse_timestamp(raw).is_none() {
                    return Err(RecordError::InvalidDate(name));
                }
            }
            _ => return Err(RecordError::InvalidStructure(format!("{} must be a timestamp", name))),
        }
    }
    if let Some(Value::String(raw)) = fields.get("validUntil") {
        if iso8601::parse_timestamp(raw).is_none() {
            return Err(RecordError::InvalidDate("validUntil"));
        }
    }

    for name in STRING_FIELDS {
        if !fields.get(name).is_some_and(Value::is_string) {
            return Err(RecordError::InvalidStructure(format!("{} must be a string", name)));
        }
    }
    if !fields.get("customer").is_some_and(Value::is_object) {
        return Err(RecordError::InvalidStructure("customer must be an object".to_string()));
    }
    if !fields.get("lineItems").is_some_and(Value::is_array) {
        return Err(RecordError::InvalidStructure("lineItems must be an array".to_string()));
    }
    if !fields.get("totalAmount").is_some_and(Value::is_number) {
        return Err(RecordError::InvalidStructure("totalAmount must be a number".to_string()));
    }
    Ok(())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Versioned backup snapshot.
///
/// # Format
///
/// ```text
/// { "version": "1.0", "exportDate": "2026-01-01T00:00:00.000Z", "quotes": [ ... ] }
/// ```
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportEnvelope<'a> {
    pub version: &'a str,
    #[serde(with = "iso8601")]
    pub export_date: DateTime<Utc>,
    pub quotes: &'a [Quote],
}

impl<'a> ExportEnvelope<'a> {
    pub fn new(version: &'a str, quotes: &'a [Quote]) -> Self {
        Self {
            version,
            export_date: iso8601::now(),
            quotes,
        }
    }

    /// Pretty-printed text for download.
    ///
    /// # Errors
    ///
    /// Returns `Error::SerializationError` if serde fails.
    pub fn to_text(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::SerializationError(e.to_string()))
    }
}

/// Extract the raw record list from backup text.
///
/// # Errors
///
/// Returns `Error::ParseError` when the text is not JSON or has no `quotes` array.
pub fn decode_export(text: &str) -> Result<Vec<Value>> {
    let mut data: Value = serde_json::from_str(text).map_err(|e| Error::ParseError(e.to_string()))?;
    match data.get_mut("quotes").map(Value::take) {
        Some(Value::Array(records)) => Ok(records),
        _ => Err(Error::ParseError("Invalid import format".to_string())),
    }
}

/// File name for a backup taken at `at`.
pub fn backup_file_name(at: DateTime<Utc>) -> String {
    format!("quotes-backup-{}.json", at.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Customer, QuoteStatus};
    use chrono::TimeZone;
    use serde_json::json;

    fn sample_quote() -> Quote {
        let created = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        Quote {
            id: "quote-1".to_string(),
            quote_number: "QT-000001".to_string(),
            customer: Customer {
                id: "2".to_string(),
                name: "Marcus Rodriguez".to_string(),
                email: "marcus.r@innovateai.tech".to_string(),
                company_name: "InnovateAI Technologies".to_string(),
                advanced_pricing: Some(false),
                discount_rate: None,
            },
            line_items: vec![],
            status: QuoteStatus::Sent,
            total_amount: 0.0,
            currency: "GBP".to_string(),
            created_at: created,
            updated_at: created + chrono::Duration::milliseconds(1500),
            notes: Some("call back Monday".to_string()),
            valid_until: Some(created + chrono::Duration::days(30)),
        }
    }

    #[test]
    fn test_roundtrip() {
        let quote = sample_quote();
        let text = encode(std::slice::from_ref(&quote)).unwrap();
        let raw = decode(&text).unwrap();

        assert_eq!(raw.len(), 1);
        assert_eq!(decode_record(&raw[0]).unwrap(), quote);
    }

    #[test]
    fn test_timestamps_are_iso8601_millis() {
        let raw = to_raw(&sample_quote()).unwrap();
        assert_eq!(raw["createdAt"], json!("2026-03-01T09:30:00.000Z"));
        assert_eq!(raw["updatedAt"], json!("2026-03-01T09:30:01.500Z"));
        assert_eq!(raw["validUntil"], json!("2026-03-31T09:30:00.000Z"));
    }

    #[test]
    fn test_decode_rejects_non_array() {
        assert!(matches!(decode("{\"a\":1}"), Err(Error::ParseError(_))));
        assert!(matches!(decode("not json"), Err(Error::ParseError(_))));
    }

    #[test]
    fn test_validate_accepts_sample() {
        assert!(validate(&to_raw(&sample_quote()).unwrap()));
    }

    #[test]
    fn test_validate_rejects_each_missing_field() {
        let raw = to_raw(&sample_quote()).unwrap();
        for field in [
            "id",
            "quoteNumber",
            "customer",
            "lineItems",
            "status",
            "totalAmount",
            "currency",
            "createdAt",
            "updatedAt",
        ] {
            let mut broken = raw.clone();
            broken.as_object_mut().unwrap().remove(field);
            assert!(!validate(&broken), "missing {} should be rejected", field);
        }
    }

    #[test]
    fn test_validate_rejects_wrong_kinds() {
        let raw = to_raw(&sample_quote()).unwrap();
        let cases = [
            ("id", json!(7)),
            ("customer", json!("Marcus")),
            ("lineItems", json!({})),
            ("totalAmount", json!("100")),
            ("totalAmount", Value::Null),
            ("createdAt", json!(1_700_000_000)),
        ];
        for (field, value) in cases {
            let mut broken = raw.clone();
            broken[field] = value;
            assert!(!validate(&broken), "{} with wrong kind should be rejected", field);
        }
    }

    #[test]
    fn test_validate_is_structural_only() {
        let mut raw = to_raw(&sample_quote()).unwrap();
        raw["totalAmount"] = json!(999.0);
        raw["status"] = json!("archived");
        assert!(validate(&raw));
        let decoded = decode_record(&raw).expect("valid records always decode");
        assert_eq!(decoded.status, QuoteStatus::Draft);
        assert_eq!(decoded.total_amount, 999.0);
    }

    #[test]
    fn test_decode_record_reports_bad_dates() {
        let mut raw = to_raw(&sample_quote()).unwrap();
        raw["updatedAt"] = json!("yesterday");
        assert_eq!(decode_record(&raw), Err(RecordError::InvalidDate("updatedAt")));
    }

    #[test]
    fn test_export_envelope_shape() {
        let quotes = vec![sample_quote()];
        let text = ExportEnvelope::new("1.0", &quotes).to_text().unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(parsed["version"], json!("1.0"));
        assert!(parsed["exportDate"].as_str().is_some_and(|s| s.ends_with('Z')));
        assert_eq!(decode_export(&text).unwrap().len(), 1);
    }

    #[test]
    fn test_decode_export_requires_quotes_array() {
        assert!(matches!(decode_export("{\"quotes\": 3}"), Err(Error::ParseError(_))));
        assert!(matches!(decode_export("[]"), Err(Error::ParseError(_))));
    }

    #[test]
    fn test_backup_file_name() {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 23, 59, 0).unwrap();
        assert_eq!(backup_file_name(at), "quotes-backup-2026-10-19.json");
    }
}
