//! # Projection Pipeline
//!
//! Pull-based recompute: every new snapshot or range change produces a
//! fresh [`Projection`]. Nothing is cached between calls.
//!
//! ## Flow
//! ```text
//! ┌──────────────────┐  snapshot()  ┌───────────────┐  project()  ┌────────────┐
//! │  DocumentSource  │ ───────────► │ DocumentBatch │ ──────────► │ Projection │
//! │ (JSON file, db,  │              │ jobs payouts  │   range     │ totals     │
//! │  static batch)   │              │ invoices emps │   filters   │ trend ...  │
//! └──────────────────┘              └───────────────┘             └────────────┘
//!                                           │
//!                            Aggregator { org_id, top_n, report_mode }
//!                              1. drop other orgs' documents
//!                              2. jobs by reference date + status filter
//!                              3. payouts by created_at + employee filter
//!                              4. invoices by report-mode basis date
//!                              5. aggregate
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

use crate::aggregate::{
    compute_totals, material_breakdown, payout_breakdown, top_employees, top_jobs, trend_series,
    Breakdown, RankedItem, Totals, TrendSeries,
};
use crate::document::DocumentBatch;
use crate::error::CoreResult;
use crate::range::{MonthBucket, ResolvedRange};
use crate::report::{filter_invoices, summarize, InvoiceSummary, ReportMode};
use crate::types::{Job, JobStatus, Payout};
use crate::validation::{validate_org_id, validate_top_n};
use crate::DEFAULT_TOP_N;

// =============================================================================
// Source
// =============================================================================

/// Anything that can hand over a consistent snapshot of documents.
pub trait DocumentSource {
    fn snapshot(&self) -> CoreResult<DocumentBatch>;
}

/// A batch in memory is its own (static) source.
impl DocumentSource for DocumentBatch {
    fn snapshot(&self) -> CoreResult<DocumentBatch> {
        Ok(self.clone())
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Explicit aggregation settings. The org is always passed in, never
/// looked up from ambient state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatorConfig {
    pub org_id: String,
    pub top_n: usize,
    pub report_mode: ReportMode,
}

impl AggregatorConfig {
    pub fn new(org_id: impl Into<String>) -> Self {
        AggregatorConfig {
            org_id: org_id.into(),
            top_n: DEFAULT_TOP_N,
            report_mode: ReportMode::default(),
        }
    }

    pub fn top_n(mut self, n: usize) -> Self {
        self.top_n = n;
        self
    }

    pub fn report_mode(mut self, mode: ReportMode) -> Self {
        self.report_mode = mode;
        self
    }
}

/// Optional narrowing on top of org and range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectionFilters {
    /// Keep only jobs in these statuses.
    pub job_statuses: Option<Vec<JobStatus>>,
    /// Keep only payouts to this employee.
    pub employee_id: Option<String>,
}

impl ProjectionFilters {
    fn keeps_job(&self, job: &Job) -> bool {
        self.job_statuses
            .as_ref()
            .map_or(true, |statuses| statuses.contains(&job.status))
    }

    fn keeps_payout(&self, payout: &Payout) -> bool {
        self.employee_id
            .as_deref()
            .map_or(true, |id| payout.employee_id == id)
    }
}

// =============================================================================
// Projection
// =============================================================================

/// Everything the dashboard renders for one org, range and filter set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub org_id: String,
    pub range: ResolvedRange,
    pub buckets: Vec<MonthBucket>,
    pub totals: Totals,
    pub trend: TrendSeries,
    pub payout_breakdown: Breakdown,
    pub material_breakdown: Breakdown,
    pub top_jobs: Vec<RankedItem>,
    pub top_employees: Vec<RankedItem>,
    pub report_mode: ReportMode,
    pub invoice_summary: InvoiceSummary,
}

// =============================================================================
// Aggregator
// =============================================================================

/// Projects document batches for a single organization.
#[derive(Debug, Clone)]
pub struct Aggregator {
    config: AggregatorConfig,
}

impl Aggregator {
    pub fn new(config: AggregatorConfig) -> CoreResult<Self> {
        validate_org_id(&config.org_id)?;
        validate_top_n(config.top_n)?;
        Ok(Aggregator { config })
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Takes a snapshot from `source` and projects it.
    pub fn refresh(
        &self,
        source: &dyn DocumentSource,
        range: &ResolvedRange,
        filters: &ProjectionFilters,
    ) -> CoreResult<Projection> {
        let batch = source.snapshot()?;
        Ok(self.project(&batch, range, filters))
    }

    /// Recomputes the full projection from `batch`.
    pub fn project(
        &self,
        batch: &DocumentBatch,
        range: &ResolvedRange,
        filters: &ProjectionFilters,
    ) -> Projection {
        let org_id = self.config.org_id.as_str();

        let jobs: Vec<&Job> = batch
            .jobs
            .iter()
            .filter(|j| self.same_org("job", &j.id, &j.org_id))
            .filter(|j| filters.keeps_job(j))
            .filter(|j| range.contains(j.reference_date()))
            .collect();

        let payouts: Vec<&Payout> = batch
            .payouts
            .iter()
            .filter(|p| self.same_org("payout", &p.id, &p.org_id))
            .filter(|p| filters.keeps_payout(p))
            .filter(|p| range.contains(p.created_at))
            .collect();

        let invoices = filter_invoices(
            batch
                .invoices
                .iter()
                .filter(|inv| self.same_org("invoice", &inv.id, &inv.org_id)),
            range,
            self.config.report_mode,
        );

        let dated = jobs.iter().filter_map(|j| j.reference_date());
        let earliest = dated.clone().min();
        let latest = dated.max();
        let buckets = range.buckets(earliest, latest);

        let projection = Projection {
            org_id: org_id.to_string(),
            range: *range,
            totals: compute_totals(jobs.iter().copied(), payouts.iter().copied()),
            trend: trend_series(&buckets, jobs.iter().copied()),
            payout_breakdown: payout_breakdown(payouts.iter().copied()),
            material_breakdown: material_breakdown(jobs.iter().copied()),
            top_jobs: top_jobs(jobs.iter().copied(), self.config.top_n),
            top_employees: top_employees(
                payouts.iter().copied(),
                &batch.employees,
                self.config.top_n,
            ),
            report_mode: self.config.report_mode,
            invoice_summary: summarize(invoices.iter().copied()),
            buckets,
        };

        debug!(
            org_id,
            preset = %range.preset,
            jobs = jobs.len(),
            payouts = payouts.len(),
            invoices = invoices.len(),
            buckets = projection.buckets.len(),
            "Projected batch"
        );

        projection
    }

    fn same_org(&self, kind: &str, id: &str, org_id: &str) -> bool {
        if org_id == self.config.org_id {
            return true;
        }
        debug!(kind, id, org_id, expected = %self.config.org_id, "Dropping document from another org");
        false
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
