//! # Validation Module
//!
//! Input validation utilities for Crewbook.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Form UI (external)                                           │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Core mutations (Rust)                                        │
//! │  └── THIS MODULE: amounts, labels, org ids, years                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (amount >= 0) constraints                                   │
//! │  └── UNIQUE (org_id, number) on invoices                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Aggregation never validates: it reads whatever the snapshot holds and
//! degrades to safe defaults. Only writes (job mutations, invoice drafting,
//! number allocation) pass through here.

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest label accepted on earnings, materials and invoice lines.
pub const MAX_LABEL_LEN: usize = 200;

/// Earliest and latest invoice years the numbering scheme accepts.
pub const MIN_YEAR: i32 = 2000;
pub const MAX_YEAR: i32 = 9999;

/// Upper bound for ranking sizes.
pub const MAX_TOP_N: usize = 50;

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a cents amount stored on a document.
///
/// ## Example
/// ```rust
/// use crewbook_core::validation::validate_cents;
///
/// assert!(validate_cents("amountCents", 0).is_ok());
/// assert!(validate_cents("amountCents", -1).is_err());
/// ```
pub fn validate_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a dollar input before it is converted to cents.
pub fn validate_dollars(field: &str, dollars: f64) -> ValidationResult<()> {
    if !dollars.is_finite() {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be a finite number".to_string(),
        });
    }
    if dollars < 0.0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates an invoice year.
pub fn validate_year(year: i32) -> ValidationResult<()> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(ValidationError::OutOfRange {
            field: "year".to_string(),
            min: MIN_YEAR as i64,
            max: MAX_YEAR as i64,
        });
    }
    Ok(())
}

/// Validates a top-N ranking size.
pub fn validate_top_n(n: usize) -> ValidationResult<()> {
    if n == 0 || n > MAX_TOP_N {
        return Err(ValidationError::OutOfRange {
            field: "topN".to_string(),
            min: 1,
            max: MAX_TOP_N as i64,
        });
    }
    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a display label (earning entry, material, invoice line).
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 200 characters
pub fn validate_label(field: &str, label: &str) -> ValidationResult<()> {
    let label = label.trim();

    if label.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if label.chars().count() > MAX_LABEL_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_LABEL_LEN,
        });
    }

    Ok(())
}

/// Validates an organization id.
///
/// ## Rules
/// - Must not be empty
/// - Letters, digits, `-` and `_` only (ids are document-store keys)
pub fn validate_org_id(org_id: &str) -> ValidationResult<()> {
    let org_id = org_id.trim();

    if org_id.is_empty() {
        return Err(ValidationError::Required {
            field: "orgId".to_string(),
        });
    }

    if org_id.len() > 128 {
        return Err(ValidationError::TooLong {
            field: "orgId".to_string(),
            max: 128,
        });
    }

    if !org_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "orgId".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_cents() {
        assert!(validate_cents("amountCents", 0).is_ok());
        assert!(validate_cents("amountCents", 125_000).is_ok());
        assert!(matches!(
            validate_cents("amountCents", -5),
            Err(ValidationError::Negative { .. })
        ));
    }

    #[test]
    fn test_validate_dollars() {
        assert!(validate_dollars("rate", 12.5).is_ok());
        assert!(validate_dollars("rate", -0.01).is_err());
        assert!(validate_dollars("rate", f64::NAN).is_err());
    }

    #[test]
    fn test_validate_label() {
        assert!(validate_label("label", "Drywall").is_ok());
        assert!(validate_label("label", "   ").is_err());
        assert!(validate_label("label", &"x".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_org_id() {
        assert!(validate_org_id("acme-builders_01").is_ok());
        assert!(validate_org_id("").is_err());
        assert!(validate_org_id("acme builders").is_err());
    }

    #[test]
    fn test_validate_year_and_top_n() {
        assert!(validate_year(2025).is_ok());
        assert!(validate_year(1999).is_err());
        assert!(validate_top_n(5).is_ok());
        assert!(validate_top_n(0).is_err());
        assert!(validate_top_n(51).is_err());
    }
}
