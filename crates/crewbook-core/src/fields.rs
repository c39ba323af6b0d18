//! # Field Resolution
//!
//! Source documents were written by several generations of forms, so the
//! same concept lives under different keys ("address", "siteAddress",
//! "location.address", ...). This module turns those lookups into ordered
//! candidate lists and lenient scalar parsers.
//!
//! ```text
//! ┌────────────────────────────┐      ┌────────────────────────────────┐
//! │ raw serde_json::Value      │ ───► │ resolve_field(doc, CANDIDATES) │ ─► Option<String>
//! │ (document-store snapshot)  │      │ parse_timestamp(value)         │ ─► Option<DateTime>
//! │                            │      │ parse_cents(value)             │ ─► i64 (0 if bad)
//! └────────────────────────────┘      └────────────────────────────────┘
//! ```
//!
//! Nothing here returns an error: a value that cannot be read is treated
//! as absent.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::debug;

// =============================================================================
// Candidate Lists
// =============================================================================

/// Keys that may hold a job's site address, most specific first.
pub const ADDRESS_KEYS: &[&str] = &[
    "address",
    "siteAddress",
    "jobAddress",
    "addressLine",
    "address.line1",
    "address.street",
    "location.address",
    "property.address",
    "customer.address",
];

/// Keys that may hold a payout or material category.
pub const CATEGORY_KEYS: &[&str] = &["category", "categoryName", "expenseCategory", "type", "kind"];

/// Keys that may hold an employee's display name.
pub const EMPLOYEE_NAME_KEYS: &[&str] = &[
    "employeeName",
    "name",
    "displayName",
    "fullName",
    "employee.name",
];

// =============================================================================
// Lookup
// =============================================================================

/// Follows a dotted path (`"location.address"`) through nested objects.
pub fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |node, key| node.get(key))
}

/// Returns the first candidate whose value is a non-empty string after
/// trimming. Numbers are accepted and stringified.
///
/// ## Example
/// ```rust
/// use crewbook_core::fields::{resolve_field, ADDRESS_KEYS};
/// use serde_json::json;
///
/// let doc = json!({ "address": "  ", "location": { "address": "12 Elm St" } });
/// assert_eq!(resolve_field(&doc, ADDRESS_KEYS).as_deref(), Some("12 Elm St"));
/// ```
pub fn resolve_field(doc: &Value, candidates: &[&str]) -> Option<String> {
    candidates.iter().find_map(|key| match lookup(doc, key)? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

// =============================================================================
// Scalars
// =============================================================================

/// Reads a timestamp in any of the shapes the document store has produced.
///
/// Accepted: RFC 3339 strings, `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS[.fff]`
/// (taken as UTC), epoch milliseconds, and `{seconds, nanoseconds}`
/// objects (also with leading underscores). Anything else is `None`.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp_str(s.trim()),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .and_then(DateTime::from_timestamp_millis),
        Value::Object(map) => {
            let seconds = map
                .get("seconds")
                .or_else(|| map.get("_seconds"))
                .and_then(Value::as_i64)?;
            let nanos = map
                .get("nanoseconds")
                .or_else(|| map.get("_nanoseconds"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            DateTime::from_timestamp(seconds, u32::try_from(nanos).ok()?)
        }
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Reads a cents amount. Integral non-negative numbers and numeric strings
/// pass through; anything else becomes 0.
pub fn parse_cents(value: &Value) -> i64 {
    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| f as i64)
            })
        }
        Value::Null => return 0,
        _ => None,
    };

    match parsed {
        Some(cents) if cents >= 0 => cents,
        _ => {
            debug!(value = %value, "Unreadable cents value, using 0");
            0
        }
    }
}

/// [`parse_cents`] at a dotted path; absent means 0.
pub fn cents_at(doc: &Value, path: &str) -> i64 {
    lookup(doc, path).map(parse_cents).unwrap_or(0)
}

/// [`parse_timestamp`] at a dotted path.
pub fn timestamp_at(doc: &Value, path: &str) -> Option<DateTime<Utc>> {
    lookup(doc, path).and_then(parse_timestamp)
}

/// A trimmed, non-empty string at a dotted path.
pub fn string_at(doc: &Value, path: &str) -> Option<String> {
    resolve_field(doc, &[path])
}

// =============================================================================
// Unit Tests
// =============================================================================
