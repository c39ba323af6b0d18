//! # Invoice Report Exporter
//!
//! Filters invoices by report mode and range, summarizes them, and renders
//! the CSV export.
//!
//! ## Report Modes
//! ```text
//! ┌───────────────┬──────────────────────┬──────────────────────────────┐
//! │ Mode          │ Statuses             │ Basis date                   │
//! ├───────────────┼──────────────────────┼──────────────────────────────┤
//! │ sentPaid      │ sent, paid           │ sent_at, else created_at     │
//! │ paidOnly      │ paid                 │ paid_at                      │
//! │ includeDrafts │ draft, sent, paid    │ sent_at, else created_at     │
//! └───────────────┴──────────────────────┴──────────────────────────────┘
//! ```
//!
//! A `paid` invoice with no `paid_at` has no basis date under `paidOnly`
//! and therefore drops out of every bounded report in that mode.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;
use ts_rs::TS;

use crate::document::DocumentBatch;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::range::ResolvedRange;
use crate::types::{InvoiceDoc, InvoiceStatus};

/// CSV header, in column order.
pub const CSV_HEADER: [&str; 8] = [
    "Invoice #",
    "Status",
    "Date",
    "Job",
    "Total",
    "Customer Name",
    "Customer Email",
    "Customer Phone",
];

// =============================================================================
// Report Mode
// =============================================================================

/// Which invoices a report includes and which date places them in a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub enum ReportMode {
    #[default]
    SentPaid,
    PaidOnly,
    IncludeDrafts,
}

impl ReportMode {
    pub const ALL: [ReportMode; 3] = [
        ReportMode::SentPaid,
        ReportMode::PaidOnly,
        ReportMode::IncludeDrafts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportMode::SentPaid => "sentPaid",
            ReportMode::PaidOnly => "paidOnly",
            ReportMode::IncludeDrafts => "includeDrafts",
        }
    }

    /// Statuses this mode reports on.
    pub fn allowed_statuses(&self) -> &'static [InvoiceStatus] {
        match self {
            ReportMode::SentPaid => &[InvoiceStatus::Sent, InvoiceStatus::Paid],
            ReportMode::PaidOnly => &[InvoiceStatus::Paid],
            ReportMode::IncludeDrafts => &[
                InvoiceStatus::Draft,
                InvoiceStatus::Sent,
                InvoiceStatus::Paid,
            ],
        }
    }

    pub fn allows(&self, status: InvoiceStatus) -> bool {
        self.allowed_statuses().contains(&status)
    }

    /// The date that decides range membership for `invoice`.
    pub fn basis_date(&self, invoice: &InvoiceDoc) -> Option<DateTime<Utc>> {
        match self {
            ReportMode::PaidOnly => invoice.paid_at,
            ReportMode::SentPaid | ReportMode::IncludeDrafts => {
                invoice.sent_at.or(invoice.created_at)
            }
        }
    }
}

impl fmt::Display for ReportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ReportMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ReportMode::ALL
            .iter()
            .copied()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "mode".to_string(),
                allowed: ReportMode::ALL.iter().map(|m| m.to_string()).collect(),
            })
    }
}

// =============================================================================
// Filtering & Summary
// =============================================================================

/// Invoices whose status the mode allows and whose basis date is in range.
pub fn filter_invoices<'a>(
    invoices: impl IntoIterator<Item = &'a InvoiceDoc>,
    range: &ResolvedRange,
    mode: ReportMode,
) -> Vec<&'a InvoiceDoc> {
    invoices
        .into_iter()
        .filter(|inv| mode.allows(inv.status) && range.contains(mode.basis_date(inv)))
        .collect()
}

/// Report footer figures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceSummary {
    pub count: u32,
    pub total_cents: i64,
    /// Only invoices with status `paid`.
    pub paid_cents: i64,
    pub outstanding_cents: i64,
}

pub fn summarize<'a>(invoices: impl IntoIterator<Item = &'a InvoiceDoc>) -> InvoiceSummary {
    let mut summary = InvoiceSummary::default();
    for inv in invoices {
        summary.count += 1;
        summary.total_cents = summary.total_cents.saturating_add(inv.money.total_cents);
        if inv.is_paid() {
            summary.paid_cents = summary.paid_cents.saturating_add(inv.money.total_cents);
        }
    }
    summary.outstanding_cents = summary.total_cents.saturating_sub(summary.paid_cents);
    summary
}

// =============================================================================
// Rows & CSV
// =============================================================================

/// One exported line. Field order matches [`CSV_HEADER`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReportRow {
    #[serde(rename = "Invoice #")]
    pub number: String,
    #[serde(rename = "Status")]
    pub status: String,
    /// Basis date as `YYYY-MM-DD`, empty when absent.
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Job")]
    pub job: String,
    /// Dollars with two decimals.
    #[serde(rename = "Total")]
    pub total: String,
    #[serde(rename = "Customer Name")]
    pub customer_name: String,
    #[serde(rename = "Customer Email")]
    pub customer_email: String,
    #[serde(rename = "Customer Phone")]
    pub customer_phone: String,
}

impl ReportRow {
    pub fn from_invoice(invoice: &InvoiceDoc, mode: ReportMode, job_label: &str) -> Self {
        let customer = invoice.customer.clone().unwrap_or_default();
        ReportRow {
            number: invoice.number.clone(),
            status: invoice.status.to_string(),
            date: mode
                .basis_date(invoice)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            job: job_label.to_string(),
            total: Money::from_cents(invoice.money.total_cents).to_decimal_string(),
            customer_name: customer.name.unwrap_or_default(),
            customer_email: customer.email.unwrap_or_default(),
            customer_phone: customer.phone.unwrap_or_default(),
        }
    }
}

/// Renders rows as RFC 4180 CSV with a header line.
///
/// The header is written even when there are no rows.
pub fn to_csv(rows: &[ReportRow]) -> CoreResult<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER)?;
    for row in rows {
        writer.serialize(row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| CoreError::ExportFailed(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| CoreError::ExportFailed(e.to_string()))
}

/// `invoices-report_{start}_to_{end}.csv`.
///
/// An unbounded start renders as `all-time`; an unbounded end as `today`.
pub fn export_filename(range: &ResolvedRange, today: NaiveDate) -> String {
    let start = range
        .start
        .map(|s| s.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "all-time".to_string());
    let end = range
        .end
        .map(|e| e.date_naive())
        .unwrap_or(today)
        .format("%Y-%m-%d");
    format!("invoices-report_{start}_to_{end}.csv")
}

// =============================================================================
// Report
// =============================================================================

/// A filtered invoice report ready to display or export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceReport {
    pub mode: ReportMode,
    pub range: ResolvedRange,
    pub rows: Vec<ReportRow>,
    pub summary: InvoiceSummary,
}

impl InvoiceReport {
    pub fn to_csv(&self) -> CoreResult<String> {
        to_csv(&self.rows)
    }

    pub fn filename(&self) -> String {
        export_filename(&self.range, self.range.as_of.date_naive())
    }
}

/// Filters the batch's invoices and labels each row with its job.
pub fn build_report(batch: &DocumentBatch, range: &ResolvedRange, mode: ReportMode) -> InvoiceReport {
    let filtered = filter_invoices(&batch.invoices, range, mode);

    let rows = filtered
        .iter()
        .map(|inv| {
            let label = batch.job(&inv.job_id).map_or(inv.job_id.as_str(), |j| j.label());
            ReportRow::from_invoice(inv, mode, label)
        })
        .collect();
    let summary = summarize(filtered.iter().copied());

    debug!(mode = %mode, count = summary.count, total = summary.total_cents, "Built invoice report");

    InvoiceReport {
        mode,
        range: *range,
        rows,
        summary,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::{resolve_range, CustomRange, RangePreset};
    use crate::types::{Customer, InvoiceMoney, Job, JobStatus};
    use chrono::TimeZone;

    fn at(m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, m, d, 9, 0, 0).unwrap()
    }

    fn invoice(id: &str, status: InvoiceStatus, total: i64) -> InvoiceDoc {
        InvoiceDoc {
            id: id.to_string(),
            org_id: "org-1".to_string(),
            job_id: "job-1".to_string(),
            number: format!("INV-2025-{:0>6}", id.trim_start_matches("inv-")),
            status,
            lines: vec![],
            money: InvoiceMoney {
                subtotal_cents: total,
                tax_cents: 0,
                total_cents: total,
            },
            customer: None,
            address_snapshot: None,
            created_at: Some(at(3, 1)),
            sent_at: None,
            paid_at: None,
        }
    }

    fn march() -> ResolvedRange {
        let custom = CustomRange::new(
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
        );
        resolve_range(RangePreset::Custom, at(6, 15), Some(custom)).unwrap()
    }

    #[test]
    fn test_mode_tokens() {
        assert_eq!("paidOnly".parse::<ReportMode>().unwrap(), ReportMode::PaidOnly);
        assert_eq!(
            serde_json::to_string(&ReportMode::IncludeDrafts).unwrap(),
            "\"includeDrafts\""
        );
        assert!("everything".parse::<ReportMode>().is_err());
    }

    #[test]
    fn test_paid_only_excludes_paid_without_paid_at() {
        let mut with_date = invoice("inv-1", InvoiceStatus::Paid, 1_000);
        with_date.paid_at = Some(at(3, 10));
        let without_date = invoice("inv-2", InvoiceStatus::Paid, 2_000);

        let invoices = vec![with_date, without_date];
        let filtered = filter_invoices(&invoices, &march(), ReportMode::PaidOnly);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, "inv-1");

        // same invoices under sentPaid fall back to created_at
        assert_eq!(filter_invoices(&invoices, &march(), ReportMode::SentPaid).len(), 2);
    }

    #[test]
    fn test_unbounded_range_ignores_basis_date() {
        let all = resolve_range(RangePreset::All, at(6, 15), None).unwrap();
        let mut undated = invoice("inv-3", InvoiceStatus::Paid, 500);
        undated.created_at = None;
        let invoices = vec![undated];
        assert_eq!(filter_invoices(&invoices, &all, ReportMode::PaidOnly).len(), 1);
    }

    #[test]
    fn test_status_sets() {
        let invoices = vec![
            invoice("inv-1", InvoiceStatus::Draft, 100),
            invoice("inv-2", InvoiceStatus::Sent, 200),
            invoice("inv-3", InvoiceStatus::Void, 400),
        ];
        assert_eq!(filter_invoices(&invoices, &march(), ReportMode::SentPaid).len(), 1);
        assert_eq!(filter_invoices(&invoices, &march(), ReportMode::IncludeDrafts).len(), 2);
    }

    #[test]
    fn test_sent_at_takes_precedence() {
        let mut late = invoice("inv-1", InvoiceStatus::Sent, 100);
        late.sent_at = Some(at(4, 2));
        let invoices = vec![late];
        assert!(filter_invoices(&invoices, &march(), ReportMode::SentPaid).is_empty());
    }

    #[test]
    fn test_summarize() {
        let invoices = vec![
            invoice("inv-1", InvoiceStatus::Paid, 1_000),
            invoice("inv-2", InvoiceStatus::Sent, 250),
        ];
        let summary = summarize(&invoices);
        assert_eq!(summary.count, 2);
        assert_eq!(summary.total_cents, 1_250);
        assert_eq!(summary.paid_cents, 1_000);
        assert_eq!(summary.outstanding_cents, 250);
    }

    #[test]
    fn test_summarize_saturates() {
        let invoices = vec![
            invoice("inv-1", InvoiceStatus::Paid, i64::MAX - 10),
            invoice("inv-2", InvoiceStatus::Sent, 100),
        ];
        let summary = summarize(&invoices);
        assert_eq!(summary.total_cents, i64::MAX);
        assert_eq!(summary.paid_cents, i64::MAX - 10);
        assert_eq!(summary.outstanding_cents, 10);
    }

    #[test]
    fn test_csv_quoting() {
        let mut inv = invoice("inv-7", InvoiceStatus::Sent, 123_456);
        inv.customer = Some(Customer {
            name: Some("Doe, \"Pat\"".to_string()),
            email: None,
            phone: Some("555-0100".to_string()),
        });
        let csv = to_csv(&[ReportRow::from_invoice(&inv, ReportMode::SentPaid, "12 Elm St")]).unwrap();

        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("Invoice #,Status,Date,Job,Total,Customer Name,Customer Email,Customer Phone")
        );
        assert_eq!(
            lines.next(),
            Some("INV-2025-000007,sent,2025-03-01,12 Elm St,1234.56,\"Doe, \"\"Pat\"\"\",,555-0100")
        );
    }

    #[test]
    fn test_empty_csv_has_header() {
        let csv = to_csv(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn test_csv_round_trip_matches_summary() {
        let mut batch = DocumentBatch::default();
        let mut job = Job::new("job-1", "org-1", JobStatus::Invoiced, None);
        job.address = Some("4 Pine Rd, Unit 2".to_string());
        batch.jobs.push(job);

        for (i, total) in [1_005, 99_999, 250, 12_345_678].iter().enumerate() {
            let mut inv = invoice(&format!("inv-{}", i + 1), InvoiceStatus::Sent, *total);
            inv.sent_at = Some(at(3, 5 + i as u32));
            batch.invoices.push(inv);
        }

        let report = build_report(&batch, &march(), ReportMode::SentPaid);
        let csv = report.to_csv().unwrap();

        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let rows: Vec<ReportRow> = reader.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len() as u32, report.summary.count);
        assert_eq!(rows[0].job, "4 Pine Rd, Unit 2");

        let dollars: f64 = rows.iter().map(|r| r.total.parse::<f64>().unwrap()).sum();
        let expected = report.summary.total_cents as f64 / 100.0;
        assert!((dollars - expected).abs() < 0.005);
    }

    #[test]
    fn test_export_filename() {
        let all = resolve_range(RangePreset::All, at(6, 15), None).unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        assert_eq!(
            export_filename(&all, today),
            "invoices-report_all-time_to_2025-06-15.csv"
        );
        assert_eq!(
            export_filename(&march(), today),
            "invoices-report_2025-03-01_to_2025-03-31.csv"
        );
    }
}
