//! # crewbook-core: Financial Engine for Crewbook
//!
//! This crate is the **heart** of the Crewbook operations dashboard. It
//! derives job profitability, buckets it across time windows, ranks jobs
//! and employees, numbers invoices and renders invoice reports, all as
//! pure functions over in-memory documents.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Crewbook Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            Dashboard / crewbook-cli (rendering, export)         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ DocumentSource::snapshot()             │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ crewbook-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌───────────┐ ┌──────────────┐     │   │
//! │  │   │ document │ │recompute │ │   range   │ │  aggregate   │     │   │
//! │  │   │  fields  │ │  money   │ │  buckets  │ │  pipeline    │     │   │
//! │  │   └──────────┘ └──────────┘ └───────────┘ └──────────────┘     │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌───────────┐                      │   │
//! │  │   │ invoice  │ │ sequence │ │  report   │                      │   │
//! │  │   └──────────┘ └──────────┘ └───────────┘                      │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                crewbook-db (Database Layer)                     │   │
//! │  │        invoices, transactional invoice number counter           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Document types (Job, Payout, InvoiceDoc, ...)
//! - [`money`] - Money type with integer cents
//! - [`fields`] / [`document`] - Lenient decoding of raw documents
//! - [`recompute`] - Keeps a job's derived totals consistent
//! - [`range`] - Presets, resolved ranges, month buckets
//! - [`aggregate`] / [`pipeline`] - Totals, trends, breakdowns, rankings
//! - [`invoice`] / [`sequence`] - Invoice lifecycle and numbering
//! - [`report`] - Invoice report filtering and CSV export
//! - [`validation`] - Input checks for writes
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use crewbook_core::pipeline::{Aggregator, AggregatorConfig, ProjectionFilters};
//! use crewbook_core::range::{resolve_range, RangePreset};
//! use crewbook_core::{DocumentBatch, Job, JobStatus};
//!
//! let now = Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap();
//! let mut job = Job::new("job-1", "org-1", JobStatus::Active, Some(now));
//! job.earnings.total_earnings_cents = 500_000;
//! job.expenses.total_payouts_cents = 100_000;
//! job.expenses.total_materials_cents = 50_000;
//!
//! let batch = DocumentBatch {
//!     jobs: vec![crewbook_core::recompute::recompute(job)],
//!     ..Default::default()
//! };
//!
//! let range = resolve_range(RangePreset::Ytd, now, None).unwrap();
//! let aggregator = Aggregator::new(AggregatorConfig::new("org-1")).unwrap();
//! let projection = aggregator.project(&batch, &range, &ProjectionFilters::default());
//!
//! assert_eq!(projection.totals.net_profit_cents, 350_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod aggregate;
pub mod document;
pub mod error;
pub mod fields;
pub mod invoice;
pub mod money;
pub mod pipeline;
pub mod range;
pub mod recompute;
pub mod report;
pub mod sequence;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use crewbook_core::Money` instead of
// `use crewbook_core::money::Money`

pub use document::DocumentBatch;
pub use error::{CoreError, CoreResult, DecodeError, ValidationError};
pub use money::Money;
pub use pipeline::{Aggregator, AggregatorConfig, DocumentSource, Projection, ProjectionFilters};
pub use range::{RangePreset, ResolvedRange};
pub use report::ReportMode;
pub use sequence::{InvoiceNumber, SequenceAllocator};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Number of entries in a top-N ranking unless configured otherwise.
pub const DEFAULT_TOP_N: usize = 5;
