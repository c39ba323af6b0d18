//! # Crewbook CLI Library
//!
//! Argument parsing, startup and dispatch for the `crewbook` binary.
//!
//! ## Module Organization
//! ```text
//! crewbook_cli/
//! ├── lib.rs        ◄─── You are here (clap types, tracing, dispatch)
//! ├── config.rs     ◄─── crewbook.toml + CREWBOOK_* overrides
//! ├── snapshot.rs   ◄─── JSON snapshot file as a DocumentSource
//! ├── commands.rs   ◄─── summary / export / next-number / invoice
//! └── error.rs      ◄─── CliError
//! ```
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Initialize Logging   tracing-subscriber, RUST_LOG or the default    │
//! │  2. Load Configuration   defaults → crewbook.toml → CREWBOOK_* → flags  │
//! │  3. Validate             org id, top_n, database settings               │
//! │  4. Open Database        only for commands that need it                 │
//! │  5. Run Command          print text or JSON to stdout                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod snapshot;

use chrono::{Datelike, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use crewbook_core::{ProjectionFilters, RangePreset, ReportMode};
use crewbook_db::{Database, DbConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use commands::{InvoiceAction, NewInvoice, RangeSelection, Sources};
use config::CrewbookConfig;
use error::CliResult;

// =============================================================================
// Arguments
// =============================================================================

#[derive(Debug, Parser)]
#[command(name = "crewbook")]
#[command(about = "Job profitability reports and invoicing for contracting crews")]
#[command(version)]
pub struct Cli {
    /// Config file (default: platform config dir / crewbook.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Organization id, overrides config and CREWBOOK_ORG_ID
    #[arg(long, global = true)]
    pub org: Option<String>,

    /// SQLite database file, overrides config and CREWBOOK_DB_PATH
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Totals, monthly trend, breakdowns and rankings for a range
    Summary {
        #[command(flatten)]
        range: RangeArgs,

        #[command(flatten)]
        sources: SourceArgs,

        /// Keep only jobs in these statuses (comma separated)
        #[arg(long, value_delimiter = ',')]
        status: Vec<String>,

        /// Keep only payouts to this employee
        #[arg(long)]
        employee: Option<String>,

        /// Entries per ranking
        #[arg(long)]
        top_n: Option<usize>,

        /// Print the projection as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the invoice report as CSV into the export directory
    Export {
        #[command(flatten)]
        range: RangeArgs,

        #[command(flatten)]
        sources: SourceArgs,

        /// sentPaid | paidOnly | includeDrafts
        #[arg(long)]
        mode: Option<ReportMode>,

        /// Directory to write into, overrides config
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Reserve the next invoice number
    NextNumber {
        /// Numbering year (default: current year)
        #[arg(long)]
        year: Option<i32>,

        /// Show the number without reserving it
        #[arg(long)]
        dry_run: bool,
    },

    /// Create, list and update invoices
    Invoice {
        #[command(subcommand)]
        action: InvoiceCommand,
    },
}

#[derive(Debug, Args)]
pub struct RangeArgs {
    /// last7 | thisMonth | ytd | 6months | 12months | all | custom
    #[arg(long)]
    pub preset: Option<RangePreset>,

    /// First day of a custom range (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last day of a custom range (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Args)]
pub struct SourceArgs {
    /// JSON snapshot of jobs, payouts, invoices and employees
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Ignore invoices stored in the database
    #[arg(long)]
    pub no_db: bool,
}

#[derive(Debug, Subcommand)]
pub enum InvoiceCommand {
    /// Create a draft invoice with the next number
    Create {
        /// Job the invoice bills
        #[arg(long)]
        job: String,

        /// LABEL=AMOUNT in dollars, repeatable
        #[arg(long = "line", required = true)]
        lines: Vec<String>,

        /// Flat tax amount in dollars
        #[arg(long, default_value_t = 0.0)]
        tax: f64,

        #[arg(long)]
        customer_name: Option<String>,

        #[arg(long)]
        customer_email: Option<String>,

        #[arg(long)]
        customer_phone: Option<String>,

        /// Job site address printed on the invoice
        #[arg(long)]
        address: Option<String>,
    },

    /// List the org's invoices, newest first
    List,

    /// Mark an invoice as sent
    Send { id: String },

    /// Mark an invoice as paid
    Pay { id: String },

    /// Void an invoice
    Void { id: String },
}

// =============================================================================
// Startup
// =============================================================================

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=crewbook_core=trace` - Trace the engine only
/// - Default: INFO, DEBUG for crewbook crates, WARN for sqlx
///
/// Logs go to stderr so command output on stdout stays clean.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,crewbook=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads config, applies global flags and validates.
pub fn load_config(cli: &Cli) -> CliResult<CrewbookConfig> {
    let mut config = CrewbookConfig::load(cli.config.clone())?;

    if let Some(org) = &cli.org {
        config.org.id = org.clone();
    }
    if let Some(db) = &cli.db {
        config.database.path = Some(db.clone());
    }

    config.validate()?;
    Ok(config)
}

async fn open_database(config: &CrewbookConfig) -> CliResult<Database> {
    let path = config.database_path()?;
    info!(path = %path.display(), "Opening invoice database");
    let db = Database::new(DbConfig::new(path).max_connections(config.database.max_connections)).await?;
    Ok(db)
}

// =============================================================================
// Dispatch
// =============================================================================

/// Runs a parsed command line to completion.
pub async fn run(cli: Cli) -> CliResult<()> {
    let mut config = load_config(&cli)?;
    let now = Utc::now();

    match cli.command {
        Command::Summary {
            range,
            sources,
            status,
            employee,
            top_n,
            json,
        } => {
            if let Some(n) = top_n {
                config.report.top_n = n;
            }
            let range = selection(&range).resolve(&config, now)?;
            let filters = ProjectionFilters {
                job_statuses: commands::parse_job_statuses(&status)?,
                employee_id: employee,
            };

            let sources = to_sources(sources);
            let db = if sources.include_stored {
                Some(open_database(&config).await?)
            } else {
                None
            };
            let batch = commands::load_batch(&sources, db.as_ref(), &config.org.id).await?;

            let projection = commands::summary(&config, &batch, &range, &filters)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&projection)?);
            } else {
                print!("{}", commands::render_summary(&projection));
            }
        }

        Command::Export {
            range,
            sources,
            mode,
            out,
        } => {
            if let Some(dir) = out {
                config.report.export_dir = dir;
            }
            let mode = mode.unwrap_or(config.report.mode);
            let range = selection(&range).resolve(&config, now)?;

            let sources = to_sources(sources);
            let db = if sources.include_stored {
                Some(open_database(&config).await?)
            } else {
                None
            };
            let batch = commands::load_batch(&sources, db.as_ref(), &config.org.id).await?;

            let (report, path) = commands::export(&config, &batch, &range, mode)?;
            println!(
                "Wrote {} invoices ({} total) to {}",
                report.summary.count,
                crewbook_core::money::format_cents(report.summary.total_cents),
                path.display()
            );
        }

        Command::NextNumber { year, dry_run } => {
            let db = open_database(&config).await?;
            let year = year.unwrap_or_else(|| now.year());
            let number = commands::next_number(&db, &config.org.id, year, dry_run, now).await?;
            println!("{number}");
        }

        Command::Invoice { action } => {
            let db = open_database(&config).await?;
            let org_id = config.org.id.as_str();

            match action {
                InvoiceCommand::Create {
                    job,
                    lines,
                    tax,
                    customer_name,
                    customer_email,
                    customer_phone,
                    address,
                } => {
                    let input = NewInvoice {
                        job_id: job,
                        lines,
                        tax,
                        customer_name,
                        customer_email,
                        customer_phone,
                        address,
                    };
                    let invoice = commands::create_invoice(&db, org_id, input, now).await?;
                    print!("{}", commands::render_invoices(std::slice::from_ref(&invoice)));
                }
                InvoiceCommand::List => {
                    let invoices = db.invoices().list_for_org(org_id).await?;
                    print!("{}", commands::render_invoices(&invoices));
                }
                InvoiceCommand::Send { id } => {
                    update(&db, org_id, &id, InvoiceAction::Send, now).await?;
                }
                InvoiceCommand::Pay { id } => {
                    update(&db, org_id, &id, InvoiceAction::Pay, now).await?;
                }
                InvoiceCommand::Void { id } => {
                    update(&db, org_id, &id, InvoiceAction::Void, now).await?;
                }
            }
        }
    }

    Ok(())
}

async fn update(
    db: &Database,
    org_id: &str,
    id: &str,
    action: InvoiceAction,
    now: chrono::DateTime<Utc>,
) -> CliResult<()> {
    let invoice = commands::update_invoice(db, org_id, id, action, now).await?;
    print!("{}", commands::render_invoices(std::slice::from_ref(&invoice)));
    Ok(())
}

fn selection(args: &RangeArgs) -> RangeSelection {
    RangeSelection {
        preset: args.preset,
        from: args.from,
        to: args.to,
    }
}

fn to_sources(args: SourceArgs) -> Sources {
    Sources {
        snapshot: args.snapshot,
        include_stored: !args.no_db,
    }
}
