//! Quote records and their embedded snapshots.
//!
//! Field names serialize in camelCase so stored collections and backup files
//! stay readable by the browser tools sharing the same keyspace.

use crate::codec::iso8601;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a quote. New quotes always start as `Draft`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStatus {
    #[default]
    Draft,
    Sent,
    Approved,
    Won,
    Lost,
}

impl QuoteStatus {
    pub const ALL: [QuoteStatus; 5] = [
        QuoteStatus::Draft,
        QuoteStatus::Sent,
        QuoteStatus::Approved,
        QuoteStatus::Won,
        QuoteStatus::Lost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Draft => "draft",
            QuoteStatus::Sent => "sent",
            QuoteStatus::Approved => "approved",
            QuoteStatus::Won => "won",
            QuoteStatus::Lost => "lost",
        }
    }
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuoteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QuoteStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.to_lowercase())
            .ok_or_else(|| {
                format!(
                    "Invalid quote status: {}. Use draft, sent, approved, won, or lost",
                    s
                )
            })
    }
}

/// Customer snapshot embedded in a quote.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub email: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub company_name: String,
    #[serde(
        default,
        deserialize_with = "lenient::or_default",
        skip_serializing_if = "Option::is_none"
    )]
    pub advanced_pricing: Option<bool>,
    /// Percentage applied to every percentage-discounted line item when
    /// `advanced_pricing` is set.
    #[serde(
        default,
        deserialize_with = "lenient::or_default",
        skip_serializing_if = "Option::is_none"
    )]
    pub discount_rate: Option<f64>,
}

impl Customer {
    fn advanced_rate(&self) -> Option<f64> {
        match self.advanced_pricing {
            Some(true) => Some(self.discount_rate.unwrap_or(0.0)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductKind {
    Service,
    Consulting,
    Platform,
    #[default]
    #[serde(other)]
    Other,
}

/// Product snapshot embedded in a line item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(rename = "type", default, deserialize_with = "lenient::or_default")]
    pub kind: ProductKind,
    #[serde(default, deserialize_with = "lenient::number")]
    pub base_price: f64,
    #[serde(default, deserialize_with = "lenient::string")]
    pub currency: String,
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind {
    #[default]
    Percentage,
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Discount {
    #[serde(rename = "type", default, deserialize_with = "lenient::or_default")]
    pub kind: DiscountKind,
    #[serde(default, deserialize_with = "lenient::number")]
    pub value: f64,
}

impl Discount {
    pub fn percentage(value: f64) -> Self {
        Discount {
            kind: DiscountKind::Percentage,
            value,
        }
    }

    pub fn fixed(value: f64) -> Self {
        Discount {
            kind: DiscountKind::Fixed,
            value,
        }
    }

    /// Discount actually applied for `customer`: advanced-pricing customers
    /// get at least their negotiated rate on percentage discounts.
    pub fn effective_for(&self, customer: Option<&Customer>) -> Discount {
        match (self.kind, customer.and_then(Customer::advanced_rate)) {
            (DiscountKind::Percentage, Some(rate)) => Discount::percentage(self.value.max(rate)),
            _ => *self,
        }
    }

    /// Apply to a gross line amount.
    pub fn apply(&self, gross: f64) -> f64 {
        match self.kind {
            DiscountKind::Percentage => gross * (1.0 - self.value / 100.0),
            DiscountKind::Fixed => (gross - self.value).max(0.0),
        }
    }
}

/// One priced product on a quote.
///
/// `quantity` is not checked for being positive; a zero-quantity item is
/// stored and read back as is.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub product: Product,
    #[serde(default, deserialize_with = "lenient::quantity")]
    pub quantity: u32,
    #[serde(default, deserialize_with = "lenient::number")]
    pub unit_price: f64,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub discount: Discount,
    #[serde(default, deserialize_with = "lenient::number")]
    pub subtotal: f64,
}

impl LineItem {
    /// Price a new line item. `unit_price` overrides the product's base
    /// price; the stored discount is the one effectively applied.
    pub fn priced(
        id: impl Into<String>,
        product: Product,
        quantity: u32,
        unit_price: Option<f64>,
        discount: Discount,
        customer: Option<&Customer>,
    ) -> Self {
        let unit_price = unit_price.unwrap_or(product.base_price);
        let mut item = LineItem {
            id: id.into(),
            product,
            quantity,
            unit_price,
            discount: discount.effective_for(customer),
            subtotal: 0.0,
        };
        item.subtotal = item.compute_subtotal();
        item
    }

    /// Quantity times unit price, less the stored discount.
    pub fn compute_subtotal(&self) -> f64 {
        self.discount
            .apply(self.unit_price * f64::from(self.quantity))
    }
}

/// The persisted unit.
///
/// Decoding is lenient below the fields the structural check covers: nested
/// snapshots fill missing or mistyped fields with defaults, unreadable line
/// items become default items and an unknown status reads as draft. Any
/// record that passes [`codec::validate`](crate::codec::validate) therefore
/// decodes, and is written back on the next save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: String,
    pub quote_number: String,
    pub customer: Customer,
    #[serde(deserialize_with = "lenient::items")]
    pub line_items: Vec<LineItem>,
    #[serde(deserialize_with = "lenient::status")]
    pub status: QuoteStatus,
    pub total_amount: f64,
    pub currency: String,
    #[serde(with = "iso8601")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "iso8601")]
    pub updated_at: DateTime<Utc>,
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub notes: Option<String>,
    #[serde(
        default,
        with = "iso8601::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub valid_until: Option<DateTime<Utc>>,
}

impl Quote {
    /// Sum of line-item subtotals. Callers keep `total_amount` equal to this;
    /// persistence does not check it.
    pub fn computed_total(&self) -> f64 {
        self.line_items.iter().map(|item| item.subtotal).sum()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.valid_until.is_some_and(|deadline| now > deadline)
    }
}

/// Field decoders for stored snapshots. Each accepts any JSON value.
mod lenient {
    use super::{LineItem, QuoteStatus};
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// The stored value, or the type's default when it has another shape.
    pub fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned + Default,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(serde_json::from_value(value).unwrap_or_default())
    }

    fn scalar_text(value: Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(scalar_text(Value::deserialize(deserializer)?).unwrap_or_default())
    }

    pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        Ok(scalar_text(Value::deserialize(deserializer)?))
    }

    pub fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        let number = match Value::deserialize(deserializer)? {
            Value::Number(n) => n.as_f64().unwrap_or_default(),
            Value::String(s) => s.trim().parse().unwrap_or_default(),
            _ => 0.0,
        };
        Ok(if number.is_finite() { number } else { 0.0 })
    }

    /// Any number, rounded and clamped into `u32`.
    pub fn quantity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let raw = number(deserializer)?.round();
        Ok(raw.clamp(0.0, f64::from(u32::MAX)) as u32)
    }

    pub fn items<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<LineItem>, D::Error> {
        Ok(Vec::<Value>::deserialize(deserializer)?
            .into_iter()
            .map(|raw| serde_json::from_value(raw).unwrap_or_default())
            .collect())
    }

    pub fn status<'de, D: Deserializer<'de>>(deserializer: D) -> Result<QuoteStatus, D::Error> {
        let raw = string(deserializer)?;
        Ok(raw.parse().unwrap_or_else(|_| {
            warn!("Unknown quote status {:?}, reading as draft", raw);
            QuoteStatus::Draft
        }))
    }
}

/// Partial quote: the unit of create, update and autosave.
///
/// Absent fields leave the target untouched on merge and fall back to
/// defaults on creation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<Customer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_items: Option<Vec<LineItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<QuoteStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(
        default,
        with = "iso8601::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub valid_until: Option<DateTime<Utc>>,
}

impl QuotePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_customer(mut self, customer: Customer) -> Self {
        self.customer = Some(customer);
        self
    }

    /// Set the line items and the matching total.
    pub fn with_line_items(mut self, line_items: Vec<LineItem>) -> Self {
        self.total_amount = Some(line_items.iter().map(|item| item.subtotal).sum());
        self.line_items = Some(line_items);
        self
    }

    pub fn with_status(mut self, status: QuoteStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Whether an autosave of this draft would have anything to persist.
    pub fn is_saveable(&self) -> bool {
        self.customer.is_some() && self.line_items.as_ref().is_some_and(|items| !items.is_empty())
    }

    /// Merge present fields onto `quote`. Identity and timestamps are not
    /// touched; the caller refreshes `updated_at`.
    pub fn apply_to(&self, quote: &mut Quote) {
        if let Some(number) = &self.quote_number {
            quote.quote_number.clone_from(number);
        }
        if let Some(customer) = &self.customer {
            quote.customer = customer.clone();
        }
        if let Some(items) = &self.line_items {
            quote.line_items.clone_from(items);
        }
        if let Some(status) = self.status {
            quote.status = status;
        }
        if let Some(total) = self.total_amount {
            quote.total_amount = total;
        }
        if let Some(currency) = &self.currency {
            quote.currency.clone_from(currency);
        }
        if let Some(notes) = &self.notes {
            quote.notes = Some(notes.clone());
        }
        if let Some(valid_until) = self.valid_until {
            quote.valid_until = Some(valid_until);
        }
    }
}
