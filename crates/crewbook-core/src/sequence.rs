//! # Invoice Numbering
//!
//! `INV-{yyyy}-{nnnnnn}` numbers, one sequence per organization and year.
//!
//! ## Allocation Paths
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  next_number_from_existing()   read max → +1                           │
//! │    Two callers reading the same max get the same number. Kept for      │
//! │    seeding counters from legacy data; never use it to issue numbers.   │
//! │                                                                         │
//! │  SequenceAllocator::allocate() serialized increment                    │
//! │    ├── InMemorySequence          Mutex<HashMap<(org, year), last>>     │
//! │    └── crewbook-db CounterRepository  atomic UPSERT … RETURNING        │
//! │                                                                         │
//! │  fallback_number()             epoch millis mod 1,000,000               │
//! │    Degraded mode when the allocator fails. Not sequential, not         │
//! │    guaranteed unique.                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult};
use crate::validation::{validate_org_id, validate_year};

/// Largest sequence that fits the six-digit suffix.
pub const MAX_SEQUENCE: u32 = 999_999;

const PREFIX: &str = "INV";

// =============================================================================
// Invoice Number
// =============================================================================

/// A parsed invoice number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InvoiceNumber {
    pub year: i32,
    pub sequence: u32,
}

impl InvoiceNumber {
    pub fn new(year: i32, sequence: u32) -> Self {
        InvoiceNumber { year, sequence }
    }

    /// `INV-{yyyy}-`, the prefix every number of `year` starts with.
    pub fn year_prefix(year: i32) -> String {
        format!("{PREFIX}-{year:04}-")
    }

    /// The following number, or `None` past [`MAX_SEQUENCE`].
    pub fn next(self) -> Option<InvoiceNumber> {
        (self.sequence < MAX_SEQUENCE).then(|| InvoiceNumber::new(self.year, self.sequence + 1))
    }
}

impl fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PREFIX}-{:04}-{:06}", self.year, self.sequence)
    }
}

impl FromStr for InvoiceNumber {
    type Err = CoreError;

    /// Parses the strict `INV-YYYY-NNNNNN` form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidInvoiceNumber(s.to_string());

        let mut parts = s.trim().split('-');
        let (Some(prefix), Some(year), Some(seq), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        let all_digits = |part: &str, len: usize| part.len() == len && part.bytes().all(|b| b.is_ascii_digit());
        if prefix != PREFIX || !all_digits(year, 4) || !all_digits(seq, 6) {
            return Err(invalid());
        }

        Ok(InvoiceNumber {
            year: year.parse().map_err(|_| invalid())?,
            sequence: seq.parse().map_err(|_| invalid())?,
        })
    }
}

// =============================================================================
// Legacy Read-Max
// =============================================================================

/// Highest sequence among `existing` numbers issued in `year`.
///
/// Suffixes are read leniently (any run of digits) so hand-edited numbers
/// still count. Numbers of other years or other shapes are ignored.
pub fn max_sequence<'a>(existing: impl IntoIterator<Item = &'a str>, year: i32) -> u32 {
    let prefix = InvoiceNumber::year_prefix(year);
    existing
        .into_iter()
        .filter_map(|n| n.trim().strip_prefix(prefix.as_str()))
        .filter_map(|suffix| suffix.parse::<u32>().ok())
        .max()
        .unwrap_or(0)
}

/// Read-max-then-increment.
///
/// Not safe under concurrency: two callers that observe the same set of
/// existing numbers return the same result. Returns `None` when the year's
/// sequence is exhausted.
pub fn next_number_from_existing<'a>(
    existing: impl IntoIterator<Item = &'a str>,
    year: i32,
) -> Option<InvoiceNumber> {
    InvoiceNumber::new(year, max_sequence(existing, year)).next()
}

/// Degraded-mode number derived from the clock: epoch millis mod 1,000,000,
/// with 0 mapped to 1 so the result stays a valid sequence.
pub fn fallback_number(year: i32, now: DateTime<Utc>) -> InvoiceNumber {
    let suffix = now.timestamp_millis().rem_euclid(1_000_000) as u32;
    InvoiceNumber::new(year, suffix.max(1))
}

// =============================================================================
// Allocators
// =============================================================================

/// Issues invoice numbers with mutual exclusion per organization and year.
pub trait SequenceAllocator: Send + Sync {
    fn allocate(&self, org_id: &str, year: i32) -> CoreResult<InvoiceNumber>;
}

/// Allocates through `allocator`, falling back to [`fallback_number`] on
/// failure.
pub fn allocate_or_fallback(
    allocator: &dyn SequenceAllocator,
    org_id: &str,
    year: i32,
    now: DateTime<Utc>,
) -> InvoiceNumber {
    match allocator.allocate(org_id, year) {
        Ok(number) => number,
        Err(e) => {
            let number = fallback_number(year, now);
            warn!(org_id, year, error = %e, fallback = %number, "Invoice number allocation failed, using fallback");
            number
        }
    }
}

/// Process-local allocator. Serializes on a single mutex.
#[derive(Debug, Default)]
pub struct InMemorySequence {
    counters: Mutex<HashMap<(String, i32), u32>>,
}

impl InMemorySequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the org/year counter after the highest existing number.
    pub fn seed<'a>(
        &self,
        org_id: &str,
        year: i32,
        existing: impl IntoIterator<Item = &'a str>,
    ) -> CoreResult<()> {
        let last = max_sequence(existing, year);
        let mut counters = self
            .counters
            .lock()
            .map_err(|e| CoreError::AllocationFailed(e.to_string()))?;
        let entry = counters.entry((org_id.to_string(), year)).or_insert(0);
        *entry = (*entry).max(last);
        Ok(())
    }
}

impl SequenceAllocator for InMemorySequence {
    fn allocate(&self, org_id: &str, year: i32) -> CoreResult<InvoiceNumber> {
        validate_org_id(org_id)?;
        validate_year(year)?;

        let mut counters = self
            .counters
            .lock()
            .map_err(|e| CoreError::AllocationFailed(e.to_string()))?;
        let last = counters.entry((org_id.to_string(), year)).or_insert(0);

        let number = InvoiceNumber::new(year, *last)
            .next()
            .ok_or_else(|| CoreError::SequenceExhausted {
                org_id: org_id.to_string(),
                year,
            })?;
        *last = number.sequence;

        debug!(org_id, number = %number, "Allocated invoice number");
        Ok(number)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_format_and_parse() {
        let number = InvoiceNumber::new(2025, 42);
        assert_eq!(number.to_string(), "INV-2025-000042");
        assert_eq!("INV-2025-000042".parse::<InvoiceNumber>().unwrap(), number);

        for bad in ["INV-25-000042", "INV-2025-42", "BILL-2025-000042", "INV-2025-00004x", "INV-2025-000042-1"] {
            assert!(bad.parse::<InvoiceNumber>().is_err(), "{bad}");
        }
    }

    #[test]
    fn test_next_number_from_existing() {
        let existing = ["INV-2025-000007", "INV-2025-000012", "INV-2024-000999", "draft", "INV-2025-15"];
        let next = next_number_from_existing(existing, 2025).unwrap();
        assert_eq!(next.to_string(), "INV-2025-000016");

        let next = next_number_from_existing(std::iter::empty(), 2026).unwrap();
        assert_eq!(next.to_string(), "INV-2026-000001");

        assert!(next_number_from_existing(["INV-2025-999999"], 2025).is_none());
    }

    #[test]
    fn test_read_max_race_yields_duplicates() {
        let existing = vec!["INV-2025-000003".to_string()];
        // both clients read before either writes
        let first = next_number_from_existing(existing.iter().map(String::as_str), 2025);
        let second = next_number_from_existing(existing.iter().map(String::as_str), 2025);
        assert_eq!(first, second);
    }

    #[test]
    fn test_fallback_number() {
        let now = Utc.timestamp_millis_opt(1_736_899_234_567).unwrap();
        assert_eq!(fallback_number(2025, now).to_string(), "INV-2025-234567");
    }

    #[test]
    fn test_fallback_number_never_zero() {
        let now = Utc.timestamp_millis_opt(1_737_000_000_000).unwrap();
        let number = fallback_number(2025, now);
        assert_eq!(number.sequence, 1);
        assert_eq!(number.to_string(), "INV-2025-000001");
    }

    #[test]
    fn test_in_memory_allocation_is_per_org_and_year() {
        let seq = InMemorySequence::new();
        seq.seed("org-1", 2025, ["INV-2025-000041"]).unwrap();

        assert_eq!(seq.allocate("org-1", 2025).unwrap().sequence, 42);
        assert_eq!(seq.allocate("org-1", 2025).unwrap().sequence, 43);
        assert_eq!(seq.allocate("org-2", 2025).unwrap().sequence, 1);
        assert_eq!(seq.allocate("org-1", 2026).unwrap().sequence, 1);
        assert!(seq.allocate("", 2025).is_err());
    }

    #[test]
    fn test_concurrent_allocations_are_unique() {
        let seq = Arc::new(InMemorySequence::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let seq = Arc::clone(&seq);
                thread::spawn(move || {
                    (0..50)
                        .map(|_| seq.allocate("org-1", 2025).unwrap().to_string())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let numbers: Vec<String> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        let unique: HashSet<&String> = numbers.iter().collect();
        assert_eq!(numbers.len(), 400);
        assert_eq!(unique.len(), 400);
        assert!(unique.contains(&"INV-2025-000400".to_string()));
    }

    #[test]
    fn test_exhausted_sequence_falls_back() {
        let seq = InMemorySequence::new();
        seq.seed("org-1", 2025, ["INV-2025-999999"]).unwrap();
        assert!(matches!(
            seq.allocate("org-1", 2025),
            Err(CoreError::SequenceExhausted { .. })
        ));

        let now = Utc.timestamp_millis_opt(1_000_123).unwrap();
        let number = allocate_or_fallback(&seq, "org-1", 2025, now);
        assert_eq!(number.sequence, 123);
    }
}
