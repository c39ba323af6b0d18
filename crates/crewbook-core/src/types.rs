//! # Domain Types
//!
//! Core document types used throughout Crewbook.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────────────┐   ┌─────────────────┐   ┌─────────────────┐  │
//! │  │        Job           │   │     Payout      │   │   InvoiceDoc    │  │
//! │  │  ──────────────────  │   │  ─────────────  │   │  ─────────────  │  │
//! │  │  earnings            │   │  employee_id    │   │  number         │  │
//! │  │   └ entries[]        │   │  category       │   │  status         │  │
//! │  │  expenses            │   │  amount_cents   │   │  lines[]        │  │
//! │  │   ├ payouts[]        │   │  paid_at?       │   │  money          │  │
//! │  │   └ materials[]      │   └─────────────────┘   │  sent/paid_at?  │  │
//! │  │  computed (cached)   │                         └─────────────────┘  │
//! │  └──────────────────────┘                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Cached Totals
//! A job stores its totals next to the arrays they come from. The
//! `computed` block is always derived (see [`crate::recompute`]) and must
//! satisfy:
//! - `total_expenses_cents == total_payouts_cents + total_materials_cents`
//! - `net_profit_cents == total_earnings_cents - total_expenses_cents`
//!
//! Every document is scoped to exactly one organization via `org_id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Job Status
// =============================================================================

/// Where a job sits in its (externally driven) lifecycle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Draft,
    Active,
    Pending,
    Invoiced,
    Paid,
    Closed,
    Archived,
}

impl JobStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [JobStatus; 7] = [
        JobStatus::Draft,
        JobStatus::Active,
        JobStatus::Pending,
        JobStatus::Invoiced,
        JobStatus::Paid,
        JobStatus::Closed,
        JobStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Draft => "draft",
            JobStatus::Active => "active",
            JobStatus::Pending => "pending",
            JobStatus::Invoiced => "invoiced",
            JobStatus::Paid => "paid",
            JobStatus::Closed => "closed",
            JobStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        JobStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: JobStatus::ALL.iter().map(|s| s.to_string()).collect(),
            })
    }
}

// =============================================================================
// Job
// =============================================================================

/// One income line on a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct EarningEntry {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub amount_cents: i64,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub earned_at: Option<DateTime<Utc>>,
}

/// Income side of a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct JobEarnings {
    /// Cached Σ entries. Missing in a document means 0.
    #[serde(default)]
    pub total_earnings_cents: i64,
    #[serde(default)]
    pub entries: Vec<EarningEntry>,
}

/// Material purchase embedded in a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MaterialExpense {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub amount_cents: i64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub purchased_at: Option<DateTime<Utc>>,
}

impl MaterialExpense {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

/// Expense side of a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct JobExpenses {
    /// Cached Σ payouts.
    #[serde(default)]
    pub total_payouts_cents: i64,
    /// Cached Σ materials.
    #[serde(default)]
    pub total_materials_cents: i64,
    #[serde(default)]
    pub payouts: Vec<Payout>,
    #[serde(default)]
    pub materials: Vec<MaterialExpense>,
}

/// Derived figures. Never edited directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct JobComputed {
    #[serde(default)]
    pub total_expenses_cents: i64,
    #[serde(default)]
    pub net_profit_cents: i64,
}

/// A contracting job with its cached money totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub org_id: String,
    #[serde(default)]
    pub status: JobStatus,
    /// Single-line site address, already resolved from whatever key the
    /// source document used.
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub earnings: JobEarnings,
    #[serde(default)]
    pub expenses: JobExpenses,
    #[serde(default)]
    pub computed: JobComputed,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Creates an empty job with zeroed totals.
    pub fn new(
        id: impl Into<String>,
        org_id: impl Into<String>,
        status: JobStatus,
        created_at: Option<DateTime<Utc>>,
    ) -> Self {
        Job {
            id: id.into(),
            org_id: org_id.into(),
            status,
            address: None,
            earnings: JobEarnings::default(),
            expenses: JobExpenses::default(),
            computed: JobComputed::default(),
            created_at,
            updated_at: None,
        }
    }

    /// The date used to place a job in a range or month bucket:
    /// `updated_at`, falling back to `created_at`.
    pub fn reference_date(&self) -> Option<DateTime<Utc>> {
        self.updated_at.or(self.created_at)
    }

    /// Human label for rankings and reports: the address, else the id.
    pub fn label(&self) -> &str {
        self.address
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or(&self.id)
    }

    #[inline]
    pub fn earnings_total(&self) -> Money {
        Money::from_cents(self.earnings.total_earnings_cents)
    }

    #[inline]
    pub fn payouts_total(&self) -> Money {
        Money::from_cents(self.expenses.total_payouts_cents)
    }

    #[inline]
    pub fn materials_total(&self) -> Money {
        Money::from_cents(self.expenses.total_materials_cents)
    }

    #[inline]
    pub fn expenses_total(&self) -> Money {
        Money::from_cents(self.computed.total_expenses_cents)
    }

    #[inline]
    pub fn net_profit(&self) -> Money {
        Money::from_cents(self.computed.net_profit_cents)
    }
}

// =============================================================================
// Payout
// =============================================================================

/// Money owed or paid to an employee.
///
/// `paid_at` absent means the payout is still pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Payout {
    pub id: String,
    pub org_id: String,
    pub employee_id: String,
    /// Name snapshot, used when no employee directory is supplied.
    #[serde(default)]
    pub employee_name: Option<String>,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub amount_cents: i64,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
}

impl Payout {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    #[inline]
    pub fn is_paid(&self) -> bool {
        self.paid_at.is_some()
    }
}

// =============================================================================
// Employee
// =============================================================================

/// Directory entry used to label employee rankings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

// =============================================================================
// Invoice
// =============================================================================

/// The status of an invoice.
///
/// Transitions: `draft → sent → paid`, `draft → paid`, and any
/// non-void status `→ void`. Nothing leaves `void`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Sent,
    Paid,
    Void,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Void => "void",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Ok(InvoiceStatus::Draft),
            "sent" => Ok(InvoiceStatus::Sent),
            "paid" => Ok(InvoiceStatus::Paid),
            "void" | "voided" => Ok(InvoiceStatus::Void),
            _ => Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: vec![
                    "draft".to_string(),
                    "sent".to_string(),
                    "paid".to_string(),
                    "void".to_string(),
                ],
            }),
        }
    }
}

/// A billed line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLine {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub amount_cents: i64,
}

/// Invoice money block.
///
/// `total_cents == subtotal_cents + tax_cents` and
/// `subtotal_cents == Σ lines.amount_cents`. Tax is a stored flat amount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceMoney {
    #[serde(default)]
    pub subtotal_cents: i64,
    #[serde(default)]
    pub tax_cents: i64,
    #[serde(default)]
    pub total_cents: i64,
}

/// Customer contact snapshot printed on an invoice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// An invoice issued for a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDoc {
    pub id: String,
    pub org_id: String,
    #[serde(default)]
    pub job_id: String,
    /// Human-readable number, `INV-YYYY-NNNNNN`.
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub status: InvoiceStatus,
    #[serde(default)]
    pub lines: Vec<InvoiceLine>,
    #[serde(default)]
    pub money: InvoiceMoney,
    #[serde(default)]
    pub customer: Option<Customer>,
    #[serde(default)]
    pub address_snapshot: Option<String>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
}

impl InvoiceDoc {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.money.total_cents)
    }

    #[inline]
    pub fn is_paid(&self) -> bool {
        self.status == InvoiceStatus::Paid
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_job_status_parsing() {
        assert_eq!("active".parse::<JobStatus>().unwrap(), JobStatus::Active);
        assert_eq!(" Paid ".parse::<JobStatus>().unwrap(), JobStatus::Paid);
        assert!("finished".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_invoice_status_parsing() {
        assert_eq!("voided".parse::<InvoiceStatus>().unwrap(), InvoiceStatus::Void);
        assert_eq!(InvoiceStatus::default(), InvoiceStatus::Draft);
        assert!("overdue".parse::<InvoiceStatus>().is_err());
    }

    #[test]
    fn test_reference_date_prefers_updated_at() {
        let created = Utc.with_ymd_and_hms(2025, 1, 10, 9, 0, 0).unwrap();
        let updated = Utc.with_ymd_and_hms(2025, 3, 2, 9, 0, 0).unwrap();
        let mut job = Job::new("job-1", "org-1", JobStatus::Active, Some(created));
        assert_eq!(job.reference_date(), Some(created));

        job.updated_at = Some(updated);
        assert_eq!(job.reference_date(), Some(updated));
    }

    #[test]
    fn test_job_label_falls_back_to_id() {
        let mut job = Job::new("job-7", "org-1", JobStatus::Draft, None);
        assert_eq!(job.label(), "job-7");
        job.address = Some("12 Elm St".to_string());
        assert_eq!(job.label(), "12 Elm St");
    }

    #[test]
    fn test_missing_cents_deserialize_as_zero() {
        let job: Job = serde_json::from_value(serde_json::json!({
            "id": "job-1",
            "orgId": "org-1",
            "status": "active",
            "earnings": { "entries": [] },
            "expenses": { "totalPayoutsCents": 1200 }
        }))
        .unwrap();

        assert_eq!(job.earnings.total_earnings_cents, 0);
        assert_eq!(job.expenses.total_payouts_cents, 1200);
        assert_eq!(job.expenses.total_materials_cents, 0);
        assert_eq!(job.computed, JobComputed::default());
    }
}
