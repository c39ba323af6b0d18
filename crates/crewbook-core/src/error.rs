//! # Error Types
//!
//! Domain-specific error types for crewbook-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  crewbook-core errors (this file)                                      │
//! │  ├── CoreError        - General domain errors                          │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── DecodeError      - Document could not become a record at all      │
//! │                                                                         │
//! │  crewbook-db errors (separate crate)                                   │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → CliError → stderr       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## What Is NOT an Error
//! Reporting aggregates degrade silently instead of failing:
//! - A malformed timestamp becomes "no date"
//! - A missing cents field becomes 0
//! - The average of zero jobs is 0
//!
//! Export failures and illegal invoice transitions ARE errors.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An invoice status change that the lifecycle does not allow.
    ///
    /// ## When This Occurs
    /// - Marking a voided invoice as paid
    /// - Sending an invoice that is already paid
    #[error("Invoice {invoice_id} cannot move from {from} to {to}")]
    InvalidInvoiceTransition {
        invoice_id: String,
        from: String,
        to: String,
    },

    /// Invoice money block disagrees with its lines.
    #[error("Invoice {invoice_id} totals are inconsistent: {reason}")]
    InconsistentInvoice { invoice_id: String, reason: String },

    /// A string that is not an `INV-YYYY-NNNNNN` number.
    #[error("Invalid invoice number: {0}")]
    InvalidInvoiceNumber(String),

    /// The invoice sequence for a year ran past 999999.
    #[error("Invoice sequence exhausted for {org_id} in {year}")]
    SequenceExhausted { org_id: String, year: i32 },

    /// The allocator could not serve a number (poisoned lock, storage failure).
    #[error("Invoice number allocation failed: {0}")]
    AllocationFailed(String),

    /// A document source could not produce a snapshot.
    #[error("Snapshot unavailable: {0}")]
    SnapshotUnavailable(String),

    /// CSV export could not be produced.
    #[error("Export failed: {0}")]
    ExportFailed(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl From<csv::Error> for CoreError {
    fn from(err: csv::Error) -> Self {
        CoreError::ExportFailed(err.to_string())
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g., NaN dollars, unknown preset).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Referenced entry does not exist on the parent record.
    #[error("{field} '{value}' not found")]
    UnknownEntry { field: String, value: String },
}

// =============================================================================
// Decode Error
// =============================================================================

/// A raw document that cannot be turned into a record.
///
/// Only identity problems are fatal; every other malformed field degrades
/// to a default during decoding.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The document is not a JSON object.
    #[error("{kind} document is not an object")]
    NotAnObject { kind: &'static str },

    /// The document lacks an identity field.
    #[error("{kind} document is missing {field}")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
