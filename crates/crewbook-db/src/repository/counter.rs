//! # Invoice Counter Repository
//!
//! Transactional invoice numbering, one counter row per org and year.
//!
//! ## Allocation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  allocate("org-1", 2025)                                               │
//! │       │                                                                 │
//! │       ▼  BEGIN                                                          │
//! │  INSERT INTO invoice_counters (org_id, year, last_value)               │
//! │  VALUES (?, ?, <max existing INV-2025-* suffix> + 1)   ← first use     │
//! │  ON CONFLICT (org_id, year)                                            │
//! │  DO UPDATE SET last_value = MAX(last_value + 1, <that>) ← every later  │
//! │  RETURNING last_value                                                   │
//! │       │                                                                 │
//! │       ▼  COMMIT                                                         │
//! │  INV-2025-{last_value:06}                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The read and the increment are one statement under SQLite's write lock,
//! so two allocations can never observe the same value. Comparing against
//! the invoices table on every call keeps the counter ahead of numbers
//! issued outside it (imports, the old read-max scheme).

use chrono::{DateTime, Utc};
use crewbook_core::sequence::{fallback_number, InvoiceNumber, MAX_SEQUENCE};
use crewbook_core::validation::{validate_org_id, validate_year};
use crewbook_core::CoreError;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};

/// Repository for invoice number counters.
#[derive(Debug, Clone)]
pub struct CounterRepository {
    pool: SqlitePool,
}

impl CounterRepository {
    /// Creates a new CounterRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CounterRepository { pool }
    }

    /// Issues the next number for `org_id` in `year`.
    pub async fn allocate(&self, org_id: &str, year: i32) -> DbResult<InvoiceNumber> {
        validate_org_id(org_id).map_err(CoreError::from)?;
        validate_year(year).map_err(CoreError::from)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let number = allocate_in(&mut *tx, org_id, year).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(number)
    }

    /// Like [`CounterRepository::allocate`], but degrades to the clock-based
    /// fallback number instead of failing.
    pub async fn allocate_or_fallback(
        &self,
        org_id: &str,
        year: i32,
        now: DateTime<Utc>,
    ) -> InvoiceNumber {
        match self.allocate(org_id, year).await {
            Ok(number) => number,
            Err(e) => {
                let number = fallback_number(year, now);
                warn!(org_id, year, error = %e, fallback = %number, "Counter allocation failed, using fallback number");
                number
            }
        }
    }

    /// The last issued sequence, if the counter exists.
    pub async fn current(&self, org_id: &str, year: i32) -> DbResult<Option<u32>> {
        let value: Option<i64> = sqlx::query_scalar(
            "SELECT last_value FROM invoice_counters WHERE org_id = ?1 AND year = ?2",
        )
        .bind(org_id)
        .bind(year)
        .fetch_optional(&self.pool)
        .await?;

        Ok(value.map(|v| v as u32))
    }
}

/// Advances the counter on an open connection or transaction.
///
/// Callers that also insert the invoice run both on the same transaction
/// so a failed insert gives the number back.
pub(crate) async fn allocate_in(
    conn: &mut SqliteConnection,
    org_id: &str,
    year: i32,
) -> DbResult<InvoiceNumber> {
    let prefix = InvoiceNumber::year_prefix(year);
    let pattern = format!("{prefix}%");
    let suffix_start = prefix.len() as i64 + 1;

    let value: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO invoice_counters (org_id, year, last_value)
        VALUES (
            ?1,
            ?2,
            COALESCE(
                (SELECT MAX(CAST(substr(number, ?4) AS INTEGER))
                 FROM invoices
                 WHERE org_id = ?1 AND number LIKE ?3),
                0
            ) + 1
        )
        ON CONFLICT (org_id, year) DO UPDATE SET
            last_value = MAX(last_value + 1, excluded.last_value),
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        RETURNING last_value
        "#,
    )
    .bind(org_id)
    .bind(year)
    .bind(&pattern)
    .bind(suffix_start)
    .fetch_one(&mut *conn)
    .await?;

    if value < 1 || value > MAX_SEQUENCE as i64 {
        return Err(CoreError::SequenceExhausted {
            org_id: org_id.to_string(),
            year,
        }
        .into());
    }

    let number = InvoiceNumber::new(year, value as u32);
    debug!(org_id, number = %number, "Allocated invoice number");
    Ok(number)
}

// =============================================================================
// Unit Tests
// =============================================================================
