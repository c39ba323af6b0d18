//! # Invoice Lifecycle
//!
//! Drafting and status transitions for [`InvoiceDoc`].
//!
//! ## State Machine
//! ```text
//!            mark_sent            mark_paid
//!   ┌───────┐ ───────► ┌──────┐ ───────► ┌──────┐
//!   │ draft │          │ sent │          │ paid │ ◄── mark_paid (no-op)
//!   └───┬───┘          └──┬───┘          └──┬───┘
//!       │   mark_paid     │                 │
//!       └─────────────────┼───────────────► │
//!       │                 │                 │
//!       ▼ void            ▼ void            ▼ void
//!   ┌──────────────────────────────────────────┐
//!   │                   void                   │  terminal
//!   └──────────────────────────────────────────┘
//! ```
//!
//! `paid_at` is written exactly once. A second `mark_paid` leaves the
//! original timestamp alone.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::money::sum_cents;
use crate::sequence::InvoiceNumber;
use crate::types::{Customer, InvoiceDoc, InvoiceLine, InvoiceMoney, InvoiceStatus};
use crate::validation::{validate_cents, validate_label, validate_org_id};

/// Caller input for a new invoice. The number is allocated separately.
#[derive(Debug, Clone, Default)]
pub struct InvoiceDraft {
    pub id: String,
    pub org_id: String,
    pub job_id: String,
    pub lines: Vec<InvoiceLine>,
    /// Flat tax amount, not a rate.
    pub tax_cents: i64,
    pub customer: Option<Customer>,
    pub address_snapshot: Option<String>,
}

impl InvoiceMoney {
    /// Builds the money block from lines and a flat tax amount.
    pub fn from_lines(lines: &[InvoiceLine], tax_cents: i64) -> Self {
        let subtotal_cents = sum_cents(lines.iter().map(|l| l.amount_cents));
        InvoiceMoney {
            subtotal_cents,
            tax_cents,
            total_cents: subtotal_cents.saturating_add(tax_cents),
        }
    }
}

impl InvoiceDoc {
    /// Creates a `draft` invoice with its money block derived from the lines.
    pub fn draft(
        draft: InvoiceDraft,
        number: InvoiceNumber,
        now: DateTime<Utc>,
    ) -> CoreResult<InvoiceDoc> {
        validate_org_id(&draft.org_id)?;
        validate_cents("taxCents", draft.tax_cents)?;
        for line in &draft.lines {
            validate_label("label", &line.label)?;
            validate_cents("amountCents", line.amount_cents)?;
        }

        let money = InvoiceMoney::from_lines(&draft.lines, draft.tax_cents);
        debug!(invoice_id = %draft.id, number = %number, total = money.total_cents, "Drafting invoice");

        Ok(InvoiceDoc {
            id: draft.id,
            org_id: draft.org_id,
            job_id: draft.job_id,
            number: number.to_string(),
            status: InvoiceStatus::Draft,
            lines: draft.lines,
            money,
            customer: draft.customer,
            address_snapshot: draft.address_snapshot,
            created_at: Some(now),
            sent_at: None,
            paid_at: None,
        })
    }

    /// `draft → sent`. Re-sending a sent invoice is a no-op.
    pub fn mark_sent(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        match self.status {
            InvoiceStatus::Draft => {
                self.status = InvoiceStatus::Sent;
                self.sent_at = Some(now);
                Ok(())
            }
            InvoiceStatus::Sent => Ok(()),
            InvoiceStatus::Paid | InvoiceStatus::Void => Err(self.transition_error(InvoiceStatus::Sent)),
        }
    }

    /// `draft|sent → paid`. Marking a paid invoice again leaves it untouched.
    pub fn mark_paid(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        match self.status {
            InvoiceStatus::Draft | InvoiceStatus::Sent => {
                self.status = InvoiceStatus::Paid;
                self.paid_at = Some(now);
                Ok(())
            }
            // a paid invoice missing `paid_at` stays that way
            InvoiceStatus::Paid => Ok(()),
            InvoiceStatus::Void => Err(self.transition_error(InvoiceStatus::Paid)),
        }
    }

    /// Any status `→ void`. Voiding twice is a no-op.
    pub fn void(&mut self) {
        if self.status != InvoiceStatus::Void {
            debug!(invoice_id = %self.id, from = %self.status, "Voiding invoice");
        }
        self.status = InvoiceStatus::Void;
    }

    /// Checks `total == subtotal + tax` and `subtotal == Σ lines`.
    pub fn check_money(&self) -> CoreResult<()> {
        let lines = sum_cents(self.lines.iter().map(|l| l.amount_cents));
        if self.money.subtotal_cents != lines {
            return Err(CoreError::InconsistentInvoice {
                invoice_id: self.id.clone(),
                reason: format!(
                    "subtotal {} does not match lines {}",
                    self.money.subtotal_cents, lines
                ),
            });
        }
        if self.money.total_cents != self.money.subtotal_cents.saturating_add(self.money.tax_cents) {
            return Err(CoreError::InconsistentInvoice {
                invoice_id: self.id.clone(),
                reason: format!(
                    "total {} is not subtotal {} plus tax {}",
                    self.money.total_cents, self.money.subtotal_cents, self.money.tax_cents
                ),
            });
        }
        Ok(())
    }

    fn transition_error(&self, to: InvoiceStatus) -> CoreError {
        CoreError::InvalidInvoiceTransition {
            invoice_id: self.id.clone(),
            from: self.status.to_string(),
            to: to.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, 10, 0, 0).unwrap()
    }

    fn line(id: &str, amount: i64) -> InvoiceLine {
        InvoiceLine {
            id: id.to_string(),
            label: "Labor".to_string(),
            amount_cents: amount,
        }
    }

    fn sample() -> InvoiceDoc {
        let draft = InvoiceDraft {
            id: "inv-1".to_string(),
            org_id: "org-1".to_string(),
            job_id: "job-1".to_string(),
            lines: vec![line("l-1", 100_000), line("l-2", 25_050)],
            tax_cents: 10_000,
            ..Default::default()
        };
        InvoiceDoc::draft(draft, InvoiceNumber::new(2025, 1), at(1)).unwrap()
    }

    #[test]
    fn test_draft_computes_money() {
        let inv = sample();
        assert_eq!(inv.number, "INV-2025-000001");
        assert_eq!(inv.status, InvoiceStatus::Draft);
        assert_eq!(inv.money.subtotal_cents, 125_050);
        assert_eq!(inv.money.total_cents, 135_050);
        assert!(inv.check_money().is_ok());
    }

    #[test]
    fn test_draft_rejects_negative_line() {
        let draft = InvoiceDraft {
            id: "inv-1".to_string(),
            org_id: "org-1".to_string(),
            lines: vec![line("l-1", -5)],
            ..Default::default()
        };
        assert!(InvoiceDoc::draft(draft, InvoiceNumber::new(2025, 1), at(1)).is_err());
    }

    #[test]
    fn test_paid_exactly_once() {
        let mut inv = sample();
        inv.mark_sent(at(2)).unwrap();
        inv.mark_paid(at(3)).unwrap();
        inv.mark_paid(at(9)).unwrap();
        assert_eq!(inv.status, InvoiceStatus::Paid);
        assert_eq!(inv.sent_at, Some(at(2)));
        assert_eq!(inv.paid_at, Some(at(3)));
    }

    #[test]
    fn test_repaying_keeps_missing_paid_at() {
        let mut inv = sample();
        inv.status = InvoiceStatus::Paid;
        inv.mark_paid(at(9)).unwrap();
        assert_eq!(inv.status, InvoiceStatus::Paid);
        assert_eq!(inv.paid_at, None);
    }

    #[test]
    fn test_illegal_transitions() {
        let mut inv = sample();
        inv.mark_paid(at(3)).unwrap();
        assert!(matches!(
            inv.mark_sent(at(4)),
            Err(CoreError::InvalidInvoiceTransition { .. })
        ));

        inv.void();
        assert_eq!(inv.status, InvoiceStatus::Void);
        assert!(inv.mark_paid(at(5)).is_err());
        assert!(inv.mark_sent(at(5)).is_err());
    }

    #[test]
    fn test_check_money_detects_drift() {
        let mut inv = sample();
        inv.money.total_cents += 1;
        assert!(matches!(
            inv.check_money(),
            Err(CoreError::InconsistentInvoice { .. })
        ));

        let mut inv = sample();
        inv.lines.pop();
        assert!(inv.check_money().is_err());
    }
}
