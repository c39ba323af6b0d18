//! # crewbook-db: Database Layer for Crewbook
//!
//! Invoice storage and transactional invoice numbering on SQLite, using
//! sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Crewbook Data Flow                               │
//! │                                                                         │
//! │  crewbook-cli (invoice create / mark / next-number)                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   crewbook-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ InvoiceRepo   │    │ 001_initial  │  │   │
//! │  │   │ SqlitePool    │◄───│ CounterRepo   │    │   _schema    │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   ~/.local/share/crewbook/crewbook.db (or [database] path)      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Invoice and counter repositories
//!
//! ## Usage
//!
//! ```rust,ignore
//! use crewbook_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/crewbook.db")).await?;
//!
//! let invoice = db.invoices().create(draft, Utc::now()).await?;
//! let next = db.counters().allocate("org-1", 2025).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::counter::CounterRepository;
pub use repository::invoice::InvoiceRepository;
