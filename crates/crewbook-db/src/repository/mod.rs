//! # Repository Module
//!
//! Database repository implementations for Crewbook.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  CLI command                                                           │
//! │       │                                                                 │
//! │       │  db.invoices().create(draft, now)                              │
//! │       ▼                                                                 │
//! │  InvoiceRepository                                                     │
//! │  ├── create(&self, draft, now)  ──► counter::allocate_in (same tx)     │
//! │  ├── get_by_id(&self, id)                                              │
//! │  ├── list_for_org(&self, org_id)                                       │
//! │  └── mark_sent / mark_paid / void                                      │
//! │                                                                         │
//! │  CounterRepository                                                     │
//! │  ├── allocate(&self, org_id, year)                                     │
//! │  └── current(&self, org_id, year)                                      │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`InvoiceRepository`](invoice::InvoiceRepository) - Invoice storage and status changes
//! - [`CounterRepository`](counter::CounterRepository) - Transactional invoice numbering

pub mod counter;
pub mod invoice;
