//! # Invoice Repository
//!
//! Persistence for [`InvoiceDoc`] plus numbered creation.
//!
//! ## Creating an Invoice
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create(draft, now)                                                    │
//! │       │                                                                 │
//! │       ▼  BEGIN                                                          │
//! │  counter::allocate_in(org, now.year())  → INV-2025-000042              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  InvoiceDoc::draft(draft, number, now)  ← validates lines and tax      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT INTO invoices ...               ← UNIQUE (org_id, number)      │
//! │       │                                                                 │
//! │       ▼  COMMIT (or ROLLBACK: the number is not consumed)              │
//! │  InvoiceDoc { status: draft, ... }                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Status changes load the row, apply the transition from
//! `crewbook_core::invoice`, and write the status columns back.

use chrono::{DateTime, Datelike, Utc};
use crewbook_core::invoice::InvoiceDraft;
use crewbook_core::{Customer, InvoiceDoc, InvoiceLine, InvoiceMoney, InvoiceStatus};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::counter::allocate_in;

/// Raw `invoices` row. Lines and customer live in JSON columns.
#[derive(Debug, FromRow)]
struct InvoiceRow {
    id: String,
    org_id: String,
    job_id: String,
    number: String,
    status: InvoiceStatus,
    lines_json: String,
    subtotal_cents: i64,
    tax_cents: i64,
    total_cents: i64,
    customer_json: Option<String>,
    address_snapshot: Option<String>,
    created_at: Option<DateTime<Utc>>,
    sent_at: Option<DateTime<Utc>>,
    paid_at: Option<DateTime<Utc>>,
}

impl TryFrom<InvoiceRow> for InvoiceDoc {
    type Error = DbError;

    fn try_from(row: InvoiceRow) -> DbResult<Self> {
        let lines: Vec<InvoiceLine> = serde_json::from_str(&row.lines_json)?;
        let customer: Option<Customer> = match row.customer_json {
            Some(json) => Some(serde_json::from_str(&json)?),
            None => None,
        };

        Ok(InvoiceDoc {
            id: row.id,
            org_id: row.org_id,
            job_id: row.job_id,
            number: row.number,
            status: row.status,
            lines,
            money: InvoiceMoney {
                subtotal_cents: row.subtotal_cents,
                tax_cents: row.tax_cents,
                total_cents: row.total_cents,
            },
            customer,
            address_snapshot: row.address_snapshot,
            created_at: row.created_at,
            sent_at: row.sent_at,
            paid_at: row.paid_at,
        })
    }
}

const SELECT_INVOICE: &str = r#"
    SELECT id, org_id, job_id, number, status, lines_json,
           subtotal_cents, tax_cents, total_cents,
           customer_json, address_snapshot,
           created_at, sent_at, paid_at
    FROM invoices
"#;

/// Repository for invoice database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.invoices();
///
/// let invoice = repo.create(draft, Utc::now()).await?;
/// repo.mark_sent(&invoice.id, Utc::now()).await?;
/// ```
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Creates a draft invoice with a freshly allocated number.
    ///
    /// Numbering and insert share one transaction. An empty draft id gets
    /// a UUID.
    pub async fn create(&self, mut draft: InvoiceDraft, now: DateTime<Utc>) -> DbResult<InvoiceDoc> {
        if draft.id.is_empty() {
            draft.id = Uuid::new_v4().to_string();
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let number = allocate_in(&mut *tx, &draft.org_id, now.year()).await?;
        let invoice = InvoiceDoc::draft(draft, number, now)?;
        insert_with(&mut *tx, &invoice).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(id = %invoice.id, number = %invoice.number, total = invoice.money.total_cents, "Invoice created");
        Ok(invoice)
    }

    /// Inserts a fully formed invoice, e.g. one imported from a snapshot.
    ///
    /// A number already used by the same org yields
    /// [`DbError::UniqueViolation`].
    pub async fn insert(&self, invoice: &InvoiceDoc) -> DbResult<()> {
        invoice.check_money()?;
        let mut conn = self.pool.acquire().await?;
        insert_with(&mut *conn, invoice).await
    }

    /// Gets an invoice by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<InvoiceDoc>> {
        let sql = format!("{SELECT_INVOICE} WHERE id = ?1");
        let row: Option<InvoiceRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(InvoiceDoc::try_from).transpose()
    }

    /// Lists an org's invoices, newest number first.
    pub async fn list_for_org(&self, org_id: &str) -> DbResult<Vec<InvoiceDoc>> {
        let sql = format!("{SELECT_INVOICE} WHERE org_id = ?1 ORDER BY number DESC");
        let rows: Vec<InvoiceRow> = sqlx::query_as(&sql)
            .bind(org_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(InvoiceDoc::try_from).collect()
    }

    /// Numbers already issued to an org in `year`.
    pub async fn existing_numbers(&self, org_id: &str, year: i32) -> DbResult<Vec<String>> {
        let pattern = format!("{}%", crewbook_core::InvoiceNumber::year_prefix(year));
        let numbers: Vec<String> =
            sqlx::query_scalar("SELECT number FROM invoices WHERE org_id = ?1 AND number LIKE ?2")
                .bind(org_id)
                .bind(pattern)
                .fetch_all(&self.pool)
                .await?;

        Ok(numbers)
    }

    /// Counts an org's invoices.
    pub async fn count(&self, org_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices WHERE org_id = ?1")
            .bind(org_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// `draft → sent`.
    pub async fn mark_sent(&self, id: &str, now: DateTime<Utc>) -> DbResult<InvoiceDoc> {
        self.transition(id, |invoice| invoice.mark_sent(now).map_err(DbError::from))
            .await
    }

    /// `draft|sent → paid`.
    pub async fn mark_paid(&self, id: &str, now: DateTime<Utc>) -> DbResult<InvoiceDoc> {
        self.transition(id, |invoice| invoice.mark_paid(now).map_err(DbError::from))
            .await
    }

    /// Any status `→ void`.
    pub async fn void(&self, id: &str) -> DbResult<InvoiceDoc> {
        self.transition(id, |invoice| {
            invoice.void();
            Ok(())
        })
        .await
    }

    async fn transition<F>(&self, id: &str, apply: F) -> DbResult<InvoiceDoc>
    where
        F: FnOnce(&mut InvoiceDoc) -> DbResult<()>,
    {
        let mut invoice = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", id))?;
        let from = invoice.status;

        apply(&mut invoice)?;

        sqlx::query("UPDATE invoices SET status = ?1, sent_at = ?2, paid_at = ?3 WHERE id = ?4")
            .bind(invoice.status)
            .bind(invoice.sent_at)
            .bind(invoice.paid_at)
            .bind(&invoice.id)
            .execute(&self.pool)
            .await?;

        debug!(id, from = %from, to = %invoice.status, "Invoice status updated");
        Ok(invoice)
    }
}

async fn insert_with(conn: &mut sqlx::SqliteConnection, invoice: &InvoiceDoc) -> DbResult<()> {
    let lines_json = serde_json::to_string(&invoice.lines)?;
    let customer_json = invoice
        .customer
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    debug!(id = %invoice.id, number = %invoice.number, "Inserting invoice");

    sqlx::query(
        r#"
        INSERT INTO invoices (
            id, org_id, job_id, number, status, lines_json,
            subtotal_cents, tax_cents, total_cents,
            customer_json, address_snapshot,
            created_at, sent_at, paid_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6,
            ?7, ?8, ?9,
            ?10, ?11,
            ?12, ?13, ?14
        )
        "#,
    )
    .bind(&invoice.id)
    .bind(&invoice.org_id)
    .bind(&invoice.job_id)
    .bind(&invoice.number)
    .bind(invoice.status)
    .bind(lines_json)
    .bind(invoice.money.subtotal_cents)
    .bind(invoice.money.tax_cents)
    .bind(invoice.money.total_cents)
    .bind(customer_json)
    .bind(&invoice.address_snapshot)
    .bind(invoice.created_at)
    .bind(invoice.sent_at)
    .bind(invoice.paid_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { field, .. } if field.contains("number") => {
            DbError::duplicate("number", invoice.number.clone())
        }
        other => other,
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
