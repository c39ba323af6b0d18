//! # Job Recompute Engine
//!
//! Keeps a job's `computed` block consistent with its cached totals.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  add_earning / add_material / remove_job_payout / ...                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  cached total adjusted by the entry amount                              │
//! │  (earnings.total_earnings_cents, expenses.total_*_cents)               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  recompute_in_place()  ← THIS MODULE                                    │
//! │    computed.total_expenses_cents = payouts + materials                  │
//! │    computed.net_profit_cents     = earnings - total_expenses            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  caller persists the job (not our concern)                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Mutations adjust the cached totals incrementally rather than re-summing
//! the arrays: imported jobs may carry totals without the entries behind
//! them, and those totals must survive an unrelated edit. Use
//! [`rebuild_totals`] when the arrays are known to be authoritative.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{CoreResult, ValidationError};
use crate::money::sum_cents;
use crate::types::{EarningEntry, Job, MaterialExpense, Payout};
use crate::validation::{validate_cents, validate_label};

// =============================================================================
// Recompute
// =============================================================================

/// Returns the job with its `computed` block derived from the cached totals.
///
/// Pure and idempotent: `recompute(recompute(j)) == recompute(j)`.
///
/// ## Example
/// ```rust
/// use crewbook_core::recompute::recompute;
/// use crewbook_core::types::{Job, JobStatus};
///
/// let mut job = Job::new("job-1", "org-1", JobStatus::Active, None);
/// job.earnings.total_earnings_cents = 500_000;
/// job.expenses.total_payouts_cents = 100_000;
/// job.expenses.total_materials_cents = 50_000;
///
/// let job = recompute(job);
/// assert_eq!(job.computed.total_expenses_cents, 150_000);
/// assert_eq!(job.computed.net_profit_cents, 350_000);
/// ```
pub fn recompute(mut job: Job) -> Job {
    recompute_in_place(&mut job);
    job
}

/// In-place variant of [`recompute`].
pub fn recompute_in_place(job: &mut Job) {
    let expenses = job
        .expenses
        .total_payouts_cents
        .saturating_add(job.expenses.total_materials_cents);
    job.computed.total_expenses_cents = expenses;
    job.computed.net_profit_cents = job.earnings.total_earnings_cents.saturating_sub(expenses);
}

/// Re-derives every cached total from the embedded arrays, then recomputes.
pub fn rebuild_totals(mut job: Job) -> Job {
    job.earnings.total_earnings_cents = sum_cents(job.earnings.entries.iter().map(|e| e.amount_cents));
    job.expenses.total_payouts_cents = sum_cents(job.expenses.payouts.iter().map(|p| p.amount_cents));
    job.expenses.total_materials_cents =
        sum_cents(job.expenses.materials.iter().map(|m| m.amount_cents));
    recompute(job)
}

// =============================================================================
// Earnings
// =============================================================================

/// Appends an earning entry and recomputes.
pub fn add_earning(job: &mut Job, entry: EarningEntry, now: DateTime<Utc>) -> CoreResult<()> {
    validate_cents("amountCents", entry.amount_cents)?;
    validate_label("label", &entry.label)?;

    debug!(job_id = %job.id, entry_id = %entry.id, amount = entry.amount_cents, "Adding earning");

    job.earnings.total_earnings_cents =
        job.earnings.total_earnings_cents.saturating_add(entry.amount_cents);
    job.earnings.entries.push(entry);
    touch(job, now);
    Ok(())
}

/// Removes an earning entry by id and recomputes.
pub fn remove_earning(
    job: &mut Job,
    entry_id: &str,
    now: DateTime<Utc>,
) -> CoreResult<EarningEntry> {
    let index = position(&job.earnings.entries, |e| e.id == entry_id, "entryId", entry_id)?;
    let entry = job.earnings.entries.remove(index);

    job.earnings.total_earnings_cents =
        shrink(job.earnings.total_earnings_cents, entry.amount_cents);
    touch(job, now);
    Ok(entry)
}

// =============================================================================
// Payouts
// =============================================================================

/// Attaches a payout to the job and recomputes.
///
/// The payout's `job_id` is pointed at this job.
pub fn add_job_payout(job: &mut Job, mut payout: Payout, now: DateTime<Utc>) -> CoreResult<()> {
    validate_cents("amountCents", payout.amount_cents)?;
    if payout.employee_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "employeeId".to_string(),
        }
        .into());
    }

    debug!(job_id = %job.id, payout_id = %payout.id, amount = payout.amount_cents, "Adding payout");

    payout.job_id = Some(job.id.clone());
    job.expenses.total_payouts_cents =
        job.expenses.total_payouts_cents.saturating_add(payout.amount_cents);
    job.expenses.payouts.push(payout);
    touch(job, now);
    Ok(())
}

/// Detaches a payout from the job and recomputes.
pub fn remove_job_payout(job: &mut Job, payout_id: &str, now: DateTime<Utc>) -> CoreResult<Payout> {
    let index = position(&job.expenses.payouts, |p| p.id == payout_id, "payoutId", payout_id)?;
    let payout = job.expenses.payouts.remove(index);

    job.expenses.total_payouts_cents = shrink(job.expenses.total_payouts_cents, payout.amount_cents);
    touch(job, now);
    Ok(payout)
}

// =============================================================================
// Materials
// =============================================================================

/// Appends a material expense and recomputes.
pub fn add_material(job: &mut Job, material: MaterialExpense, now: DateTime<Utc>) -> CoreResult<()> {
    validate_cents("amountCents", material.amount_cents)?;
    validate_label("name", &material.name)?;

    debug!(job_id = %job.id, material_id = %material.id, amount = material.amount_cents, "Adding material");

    job.expenses.total_materials_cents =
        job.expenses.total_materials_cents.saturating_add(material.amount_cents);
    job.expenses.materials.push(material);
    touch(job, now);
    Ok(())
}

/// Changes a material's amount and recomputes.
pub fn update_material_amount(
    job: &mut Job,
    material_id: &str,
    amount_cents: i64,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    validate_cents("amountCents", amount_cents)?;
    let index = position(&job.expenses.materials, |m| m.id == material_id, "materialId", material_id)?;

    let previous = job.expenses.materials[index].amount_cents;
    job.expenses.materials[index].amount_cents = amount_cents;
    job.expenses.total_materials_cents = shrink(job.expenses.total_materials_cents, previous)
        .saturating_add(amount_cents);
    touch(job, now);
    Ok(())
}

/// Removes a material expense and recomputes.
pub fn remove_material(
    job: &mut Job,
    material_id: &str,
    now: DateTime<Utc>,
) -> CoreResult<MaterialExpense> {
    let index = position(&job.expenses.materials, |m| m.id == material_id, "materialId", material_id)?;
    let material = job.expenses.materials.remove(index);

    job.expenses.total_materials_cents =
        shrink(job.expenses.total_materials_cents, material.amount_cents);
    touch(job, now);
    Ok(material)
}

// =============================================================================
// Helpers
// =============================================================================

fn touch(job: &mut Job, now: DateTime<Utc>) {
    job.updated_at = Some(now);
    recompute_in_place(job);
}

/// Cached totals never go below zero, even if they were stale.
fn shrink(total: i64, amount: i64) -> i64 {
    total.saturating_sub(amount).max(0)
}

fn position<T>(
    items: &[T],
    matches: impl Fn(&T) -> bool,
    field: &str,
    value: &str,
) -> CoreResult<usize> {
    items.iter().position(matches).ok_or_else(|| {
        ValidationError::UnknownEntry {
            field: field.to_string(),
            value: value.to_string(),
        }
        .into()
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
