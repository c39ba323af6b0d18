//! # Commands
//!
//! What each subcommand does, separated from argument parsing so it can
//! be driven directly in tests.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  summary / export                                                      │
//! │    snapshot.json ──► JsonFileSource ──┐                                │
//! │    crewbook.db ──► invoices().list ───┴─► DocumentBatch                │
//! │                                            │                           │
//! │                    resolve_range(preset) ──┤                           │
//! │                                            ▼                           │
//! │                        Aggregator::project / build_report             │
//! │                                            │                           │
//! │                      text / JSON on stdout, CSV into export_dir        │
//! │                                                                         │
//! │  next-number / invoice ...                                             │
//! │    crewbook.db ──► CounterRepository / InvoiceRepository               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use crewbook_core::aggregate::RankedItem;
use crewbook_core::invoice::InvoiceDraft;
use crewbook_core::money::{format_cents, to_cents};
use crewbook_core::range::{resolve_range, CustomRange};
use crewbook_core::report::{build_report, InvoiceReport};
use crewbook_core::sequence::next_number_from_existing;
use crewbook_core::{
    Aggregator, AggregatorConfig, Customer, DocumentBatch, DocumentSource, InvoiceDoc,
    InvoiceLine, InvoiceNumber, JobStatus, Projection, ProjectionFilters, RangePreset,
    ReportMode, ResolvedRange,
};
use crewbook_db::Database;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::config::CrewbookConfig;
use crate::error::{CliError, CliResult};
use crate::snapshot::{merge_invoices, JsonFileSource};

// =============================================================================
// Inputs
// =============================================================================

/// Range selection from the command line. Explicit dates imply `custom`.
#[derive(Debug, Clone, Default)]
pub struct RangeSelection {
    pub preset: Option<RangePreset>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl RangeSelection {
    /// Resolves against `now`, falling back to the configured preset.
    pub fn resolve(&self, config: &CrewbookConfig, now: DateTime<Utc>) -> CliResult<ResolvedRange> {
        let dated = self.from.is_some() || self.to.is_some();
        let preset = match self.preset {
            Some(preset) => preset,
            None if dated => RangePreset::Custom,
            None => config.report.preset,
        };

        if dated && preset != RangePreset::Custom {
            return Err(CliError::InvalidArgument(format!(
                "--from/--to only apply to the custom preset, not {preset}"
            )));
        }

        let custom = dated.then(|| CustomRange {
            start: self.from,
            end: self.to,
        });
        Ok(resolve_range(preset, now, custom)?)
    }
}

/// Where documents come from for summaries and exports.
#[derive(Debug, Clone, Default)]
pub struct Sources {
    /// JSON snapshot of jobs, payouts, invoices and employees.
    pub snapshot: Option<PathBuf>,
    /// Also read invoices stored in the database.
    pub include_stored: bool,
}

/// Loads the batch for `org_id` from the snapshot and, if asked, the database.
pub async fn load_batch(
    sources: &Sources,
    db: Option<&Database>,
    org_id: &str,
) -> CliResult<DocumentBatch> {
    let mut batch = match &sources.snapshot {
        Some(path) => JsonFileSource::new(path).snapshot()?,
        None => DocumentBatch::default(),
    };

    if sources.include_stored {
        if let Some(db) = db {
            let stored = db.invoices().list_for_org(org_id).await?;
            merge_invoices(&mut batch, stored);
        }
    }

    Ok(batch)
}

// =============================================================================
// summary
// =============================================================================

/// Builds the dashboard projection.
pub fn summary(
    config: &CrewbookConfig,
    batch: &DocumentBatch,
    range: &ResolvedRange,
    filters: &ProjectionFilters,
) -> CliResult<Projection> {
    let aggregator = Aggregator::new(
        AggregatorConfig::new(config.org.id.clone())
            .top_n(config.report.top_n)
            .report_mode(config.report.mode),
    )?;
    let projection = aggregator.project(batch, range, filters);

    info!(
        org_id = %projection.org_id,
        preset = %range.preset,
        jobs = projection.totals.job_count,
        net = projection.totals.net_profit_cents,
        "Projection computed"
    );
    Ok(projection)
}

/// Plain-text rendering of a projection.
pub fn render_summary(projection: &Projection) -> String {
    SummaryText(projection).to_string()
}

struct SummaryText<'a>(&'a Projection);

impl fmt::Display for SummaryText<'_> {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        let projection = self.0;
        let t = &projection.totals;

        let start = projection
            .range
            .start
            .map_or_else(|| "all time".to_string(), |s| s.format("%Y-%m-%d").to_string());
        let end = projection
            .range
            .end
            .map_or_else(|| "now".to_string(), |e| e.format("%Y-%m-%d").to_string());

        writeln!(out, "Org {} | {} ({} to {})", projection.org_id, projection.range.preset, start, end)?;
        writeln!(out)?;
        writeln!(out, "Jobs              {:>14}", t.job_count)?;
        writeln!(out, "Earnings          {:>14}", format_cents(t.earnings_cents))?;
        writeln!(out, "Payouts           {:>14}", format_cents(t.payouts_cents))?;
        writeln!(out, "Materials         {:>14}", format_cents(t.materials_cents))?;
        writeln!(out, "Net profit        {:>14}", format_cents(t.net_profit_cents))?;
        writeln!(out, "Average / job     {:>14}", format_cents(t.average_profit_cents))?;
        writeln!(out, "Payouts pending   {:>14}", format_cents(t.pending_payouts_cents))?;
        writeln!(out, "Payouts paid      {:>14}", format_cents(t.paid_payouts_cents))?;

        if !projection.trend.keys.is_empty() {
            writeln!(out)?;
            writeln!(out, "Month        Earnings       Expenses     Net profit")?;
            for i in 0..projection.trend.keys.len() {
                writeln!(
                    out,
                    "{:<9} {:>12} {:>14} {:>14}",
                    projection.trend.labels[i],
                    format_cents(projection.trend.earnings_cents[i]),
                    format_cents(projection.trend.expenses_cents[i]),
                    format_cents(projection.trend.net_profit_cents[i]),
                )?;
            }
        }

        write_ranking(out, "Top jobs", &projection.top_jobs)?;
        write_ranking(out, "Top employees", &projection.top_employees)?;

        for (title, breakdown) in [
            ("Payouts by category", &projection.payout_breakdown),
            ("Materials by category", &projection.material_breakdown),
        ] {
            if breakdown.is_empty() {
                continue;
            }
            writeln!(out)?;
            writeln!(out, "{title}")?;
            for (label, value) in breakdown.labels.iter().zip(&breakdown.values) {
                writeln!(out, "  {:<24} {:>14}", label, format_cents(*value))?;
            }
        }

        let s = &projection.invoice_summary;
        writeln!(out)?;
        writeln!(
            out,
            "Invoices ({}): {} totaling {}, {} paid, {} outstanding",
            projection.report_mode,
            s.count,
            format_cents(s.total_cents),
            format_cents(s.paid_cents),
            format_cents(s.outstanding_cents),
        )
    }
}

fn write_ranking(out: &mut fmt::Formatter<'_>, title: &str, items: &[RankedItem]) -> fmt::Result {
    if items.is_empty() {
        return Ok(());
    }
    writeln!(out)?;
    writeln!(out, "{title}")?;
    for (rank, item) in items.iter().enumerate() {
        writeln!(out, "  {}. {:<24} {:>14}", rank + 1, item.label, format_cents(item.value_cents))?;
    }
    Ok(())
}

// =============================================================================
// export
// =============================================================================

/// Renders the invoice report and writes it into `export_dir`.
///
/// Returns the report and the written path.
pub fn export(
    config: &CrewbookConfig,
    batch: &DocumentBatch,
    range: &ResolvedRange,
    mode: ReportMode,
) -> CliResult<(InvoiceReport, PathBuf)> {
    let org_batch = DocumentBatch {
        jobs: batch.jobs.iter().filter(|j| j.org_id == config.org.id).cloned().collect(),
        invoices: batch
            .invoices
            .iter()
            .filter(|i| i.org_id == config.org.id)
            .cloned()
            .collect(),
        ..Default::default()
    };

    let report = build_report(&org_batch, range, mode);
    let csv = report.to_csv()?;

    std::fs::create_dir_all(&config.report.export_dir)?;
    let path = config.report.export_dir.join(report.filename());
    std::fs::write(&path, csv)?;

    info!(path = %path.display(), rows = report.rows.len(), "Invoice report exported");
    Ok((report, path))
}

// =============================================================================
// next-number
// =============================================================================

/// Reserves the next invoice number, or with `dry_run` previews it without
/// consuming anything.
pub async fn next_number(
    db: &Database,
    org_id: &str,
    year: i32,
    dry_run: bool,
    now: DateTime<Utc>,
) -> CliResult<InvoiceNumber> {
    if dry_run {
        let counter = db.counters().current(org_id, year).await?.unwrap_or(0);
        let existing = db.invoices().existing_numbers(org_id, year).await?;
        let from_invoices = next_number_from_existing(existing.iter().map(String::as_str), year);
        let from_counter = InvoiceNumber::new(year, counter).next();

        debug!(org_id, year, counter, existing = existing.len(), "Previewing next number");
        return from_counter
            .into_iter()
            .chain(from_invoices)
            .max_by_key(|n| n.sequence)
            .ok_or_else(|| {
                crewbook_core::CoreError::SequenceExhausted {
                    org_id: org_id.to_string(),
                    year,
                }
                .into()
            });
    }

    Ok(db.counters().allocate_or_fallback(org_id, year, now).await)
}

// =============================================================================
// invoice
// =============================================================================

/// Parses `LABEL=AMOUNT` where amount is in dollars, e.g. `Framing=1250.00`.
pub fn parse_line(raw: &str, index: usize) -> CliResult<InvoiceLine> {
    let (label, amount) = raw.rsplit_once('=').ok_or_else(|| {
        CliError::InvalidArgument(format!("line '{raw}' must look like LABEL=AMOUNT"))
    })?;
    let dollars: f64 = amount.trim().parse().map_err(|_| {
        CliError::InvalidArgument(format!("line '{raw}' has a non-numeric amount"))
    })?;

    Ok(InvoiceLine {
        id: format!("line-{}", index + 1),
        label: label.trim().to_string(),
        amount_cents: to_cents(dollars)?,
    })
}

/// Command line input for a new invoice.
#[derive(Debug, Clone, Default)]
pub struct NewInvoice {
    pub job_id: String,
    pub lines: Vec<String>,
    /// Flat tax in dollars.
    pub tax: f64,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub address: Option<String>,
}

pub async fn create_invoice(
    db: &Database,
    org_id: &str,
    input: NewInvoice,
    now: DateTime<Utc>,
) -> CliResult<InvoiceDoc> {
    let lines = input
        .lines
        .iter()
        .enumerate()
        .map(|(i, raw)| parse_line(raw, i))
        .collect::<CliResult<Vec<_>>>()?;

    let customer = Customer {
        name: input.customer_name,
        email: input.customer_email,
        phone: input.customer_phone,
    };

    let draft = InvoiceDraft {
        org_id: org_id.to_string(),
        job_id: input.job_id,
        lines,
        tax_cents: to_cents(input.tax)?,
        customer: (customer != Customer::default()).then_some(customer),
        address_snapshot: input.address,
        ..Default::default()
    };

    Ok(db.invoices().create(draft, now).await?)
}

/// A status change requested from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceAction {
    Send,
    Pay,
    Void,
}

pub async fn update_invoice(
    db: &Database,
    org_id: &str,
    id: &str,
    action: InvoiceAction,
    now: DateTime<Utc>,
) -> CliResult<InvoiceDoc> {
    let repo = db.invoices();

    // Refuse to touch another org's invoice
    match repo.get_by_id(id).await? {
        Some(invoice) if invoice.org_id == org_id => {}
        _ => return Err(crewbook_db::DbError::not_found("Invoice", id).into()),
    }

    let invoice = match action {
        InvoiceAction::Send => repo.mark_sent(id, now).await?,
        InvoiceAction::Pay => repo.mark_paid(id, now).await?,
        InvoiceAction::Void => repo.void(id).await?,
    };
    Ok(invoice)
}

/// One line per invoice: number, status, total, customer.
pub fn render_invoices(invoices: &[InvoiceDoc]) -> String {
    InvoiceLines(invoices).to_string()
}

struct InvoiceLines<'a>(&'a [InvoiceDoc]);

impl fmt::Display for InvoiceLines<'_> {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        for inv in self.0 {
            let customer = inv
                .customer
                .as_ref()
                .and_then(|c| c.name.as_deref())
                .unwrap_or("-");
            writeln!(
                out,
                "{:<16} {:<6} {:>14}  {:<20} {}",
                inv.number,
                inv.status,
                format_cents(inv.money.total_cents),
                customer,
                inv.id
            )?;
        }
        Ok(())
    }
}

/// Parses `--status` values for job filtering.
pub fn parse_job_statuses(raw: &[String]) -> CliResult<Option<Vec<JobStatus>>> {
    if raw.is_empty() {
        return Ok(None);
    }
    let statuses = raw
        .iter()
        .map(|s| s.parse::<JobStatus>())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(statuses))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crewbook_core::{InvoiceMoney, InvoiceStatus, Job, Payout};
    use crewbook_db::{DbConfig, DbError};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    fn config() -> CrewbookConfig {
        let mut config = CrewbookConfig::default();
        config.org.id = "acme".to_string();
        config
    }

    fn job(id: &str, org: &str, created: DateTime<Utc>, earned: i64, paid_out: i64, materials: i64) -> Job {
        let mut job = Job::new(id, org, JobStatus::Active, Some(created));
        job.earnings.total_earnings_cents = earned;
        job.expenses.total_payouts_cents = paid_out;
        job.expenses.total_materials_cents = materials;
        crewbook_core::recompute::recompute(job)
    }

    fn invoice(id: &str, status: InvoiceStatus, total: i64, sent: Option<DateTime<Utc>>) -> InvoiceDoc {
        InvoiceDoc {
            id: id.to_string(),
            org_id: "acme".to_string(),
            job_id: "job-1".to_string(),
            number: format!("INV-2025-{:0>6}", id.trim_start_matches("inv-")),
            status,
            lines: Vec::new(),
            money: InvoiceMoney {
                subtotal_cents: total,
                tax_cents: 0,
                total_cents: total,
            },
            customer: None,
            address_snapshot: None,
            created_at: Some(Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap()),
            sent_at: sent,
            paid_at: None,
        }
    }

    async fn memory_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[test]
    fn test_range_selection() {
        let config = config();

        let range = RangeSelection::default().resolve(&config, now()).unwrap();
        assert_eq!(range.preset, RangePreset::SixMonths);

        let range = RangeSelection {
            preset: Some(RangePreset::Ytd),
            ..Default::default()
        }
        .resolve(&config, now())
        .unwrap();
        assert_eq!(range.start, Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()));

        let range = RangeSelection {
            from: NaiveDate::from_ymd_opt(2025, 3, 1),
            to: NaiveDate::from_ymd_opt(2025, 3, 31),
            ..Default::default()
        }
        .resolve(&config, now())
        .unwrap();
        assert_eq!(range.preset, RangePreset::Custom);

        let mixed = RangeSelection {
            preset: Some(RangePreset::All),
            from: NaiveDate::from_ymd_opt(2025, 3, 1),
            ..Default::default()
        };
        assert!(matches!(
            mixed.resolve(&config, now()),
            Err(CliError::InvalidArgument(_))
        ));

        let custom_without_dates = RangeSelection {
            preset: Some(RangePreset::Custom),
            ..Default::default()
        };
        assert!(custom_without_dates.resolve(&config, now()).is_err());
    }

    #[test]
    fn test_summary_scenario() {
        let batch = DocumentBatch {
            jobs: vec![
                job("job-1", "acme", now(), 500_000, 100_000, 50_000),
                job("job-x", "other-org", now(), 900_000, 0, 0),
            ],
            payouts: vec![Payout {
                id: "p-1".to_string(),
                org_id: "acme".to_string(),
                employee_id: "e-1".to_string(),
                employee_name: Some("Sam".to_string()),
                job_id: Some("job-1".to_string()),
                category: Some("Labor".to_string()),
                amount_cents: 100_000,
                created_at: Some(now()),
                paid_at: None,
            }],
            ..Default::default()
        };
        let range = RangeSelection {
            preset: Some(RangePreset::Ytd),
            ..Default::default()
        }
        .resolve(&config(), now())
        .unwrap();

        let projection = summary(&config(), &batch, &range, &ProjectionFilters::default()).unwrap();
        assert_eq!(projection.totals.job_count, 1);
        assert_eq!(projection.totals.net_profit_cents, 350_000);
        assert_eq!(projection.top_employees[0].label, "Sam");

        let text = render_summary(&projection);
        assert!(text.contains("Net profit"));
        assert!(text.contains("$3,500.00"));
        assert!(text.contains("Top employees"));
        assert!(text.contains("labor"));
    }

    #[test]
    fn test_export_writes_named_file() {
        let mut config = config();
        config.report.export_dir =
            std::env::temp_dir().join(format!("crewbook-export-{}", uuid::Uuid::new_v4()));

        let batch = DocumentBatch {
            jobs: vec![job("job-1", "acme", now(), 0, 0, 0)],
            invoices: vec![
                invoice("inv-1", InvoiceStatus::Sent, 10_050, Some(Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap())),
                invoice("inv-2", InvoiceStatus::Draft, 99_900, None),
                invoice("inv-3", InvoiceStatus::Paid, 20_000, None),
            ],
            ..Default::default()
        };
        let range = RangeSelection {
            from: NaiveDate::from_ymd_opt(2025, 1, 1),
            to: NaiveDate::from_ymd_opt(2025, 3, 31),
            ..Default::default()
        }
        .resolve(&config, now())
        .unwrap();

        let (report, path) = export(&config, &batch, &range, ReportMode::SentPaid).unwrap();
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.summary.total_cents, 30_050);
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "invoices-report_2025-01-01_to_2025-03-31.csv"
        );

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("Invoice #,Status,Date,Job,Total,Customer Name,Customer Email,Customer Phone"));
        assert_eq!(written.lines().count(), 3);
        assert!(written.contains("100.50"));

        std::fs::remove_dir_all(&config.report.export_dir).unwrap();
    }

    #[test]
    fn test_render_invoices_columns() {
        assert_eq!(render_invoices(&[]), "");

        let text = render_invoices(&[invoice("inv-7", InvoiceStatus::Sent, 10_050, None)]);
        assert_eq!(
            text,
            format!("INV-2025-000007  sent   {:>14}  {:<20} inv-7\n", "$100.50", "-")
        );
    }

    #[test]
    fn test_parse_line() {
        let line = parse_line("Framing = 1250.5", 0).unwrap();
        assert_eq!(line.id, "line-1");
        assert_eq!(line.label, "Framing");
        assert_eq!(line.amount_cents, 125_050);

        let line = parse_line("Tile=backsplash=80", 2).unwrap();
        assert_eq!(line.label, "Tile=backsplash");
        assert_eq!(line.amount_cents, 8_000);

        assert!(parse_line("Framing", 0).is_err());
        assert!(parse_line("Framing=lots", 0).is_err());
    }

    #[test]
    fn test_parse_job_statuses() {
        assert_eq!(parse_job_statuses(&[]).unwrap(), None);
        assert_eq!(
            parse_job_statuses(&["active".to_string(), "paid".to_string()]).unwrap(),
            Some(vec![JobStatus::Active, JobStatus::Paid])
        );
        assert!(parse_job_statuses(&["finished".to_string()]).is_err());
    }

    #[tokio::test]
    async fn test_invoice_commands() {
        let db = memory_db().await;

        let input = NewInvoice {
            job_id: "job-1".to_string(),
            lines: vec!["Framing=1200".to_string(), "Permit=125.25".to_string()],
            tax: 99.0,
            customer_name: Some("Dana Reyes".to_string()),
            ..Default::default()
        };
        let created = create_invoice(&db, "acme", input, now()).await.unwrap();
        assert_eq!(created.number, "INV-2025-000001");
        assert_eq!(created.money.subtotal_cents, 132_525);
        assert_eq!(created.money.total_cents, 142_425);

        let sent = update_invoice(&db, "acme", &created.id, InvoiceAction::Send, now())
            .await
            .unwrap();
        assert_eq!(sent.status, InvoiceStatus::Sent);

        // another org cannot see it
        assert!(matches!(
            update_invoice(&db, "globex", &created.id, InvoiceAction::Void, now()).await,
            Err(CliError::Db(DbError::NotFound { .. }))
        ));

        let paid = update_invoice(&db, "acme", &created.id, InvoiceAction::Pay, now())
            .await
            .unwrap();
        assert_eq!(paid.paid_at, Some(now()));

        let listed = db.invoices().list_for_org("acme").await.unwrap();
        let text = render_invoices(&listed);
        assert!(text.contains("INV-2025-000001"));
        assert!(text.contains("paid"));
        assert!(text.contains("Dana Reyes"));
    }

    #[tokio::test]
    async fn test_next_number_preview_and_reserve() {
        let db = memory_db().await;

        let preview = next_number(&db, "acme", 2025, true, now()).await.unwrap();
        assert_eq!(preview.to_string(), "INV-2025-000001");
        // previewing consumes nothing
        let preview = next_number(&db, "acme", 2025, true, now()).await.unwrap();
        assert_eq!(preview.to_string(), "INV-2025-000001");

        let reserved = next_number(&db, "acme", 2025, false, now()).await.unwrap();
        assert_eq!(reserved.to_string(), "INV-2025-000001");
        let preview = next_number(&db, "acme", 2025, true, now()).await.unwrap();
        assert_eq!(preview.to_string(), "INV-2025-000002");
    }

    #[tokio::test]
    async fn test_load_batch_merges_stored_invoices() {
        let db = memory_db().await;
        let input = NewInvoice {
            job_id: "job-1".to_string(),
            lines: vec!["Framing=100".to_string()],
            ..Default::default()
        };
        create_invoice(&db, "acme", input, now()).await.unwrap();

        let sources = Sources {
            snapshot: None,
            include_stored: true,
        };
        let batch = load_batch(&sources, Some(&db), "acme").await.unwrap();
        assert_eq!(batch.invoices.len(), 1);

        let batch = load_batch(&Sources::default(), Some(&db), "acme").await.unwrap();
        assert!(batch.invoices.is_empty());
    }
}
