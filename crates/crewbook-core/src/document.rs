//! # Document Decoding
//!
//! Turns raw document-store JSON into typed records, leniently.
//!
//! ## Decoding Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Problem in the raw document          │  Result                         │
//! │  ─────────────────────────────────────┼───────────────────────────────  │
//! │  not an object                        │  DecodeError::NotAnObject       │
//! │  missing id / orgId                   │  DecodeError::MissingField      │
//! │  malformed or missing timestamp       │  None                           │
//! │  missing or malformed cents           │  0                              │
//! │  unknown status                       │  default status (draft)         │
//! │  address/category under another key   │  resolved via fields::*_KEYS    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Decoded jobs are always recomputed, so a stale `computed` block in the
//! store never reaches the aggregation engine.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::DecodeError;
use crate::fields::{
    cents_at, lookup, resolve_field, string_at, timestamp_at, ADDRESS_KEYS, CATEGORY_KEYS,
    EMPLOYEE_NAME_KEYS,
};
use crate::recompute::recompute;
use crate::types::{
    Customer, EarningEntry, Employee, InvoiceDoc, InvoiceLine, InvoiceMoney, InvoiceStatus, Job,
    JobEarnings, JobExpenses, JobStatus, MaterialExpense, Payout,
};

const ORG_ID_KEYS: &[&str] = &["orgId", "org_id", "organizationId"];

// =============================================================================
// Document Batch
// =============================================================================

/// One snapshot of an organization's documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentBatch {
    #[serde(default)]
    pub jobs: Vec<Job>,
    #[serde(default)]
    pub payouts: Vec<Payout>,
    #[serde(default)]
    pub invoices: Vec<InvoiceDoc>,
    #[serde(default)]
    pub employees: Vec<Employee>,
}

impl DocumentBatch {
    /// Decodes `{jobs, payouts, invoices, employees}` from a raw snapshot.
    ///
    /// Each collection may be an array of documents or an object keyed by
    /// document id. Undecodable documents are skipped with a warning.
    pub fn from_json(snapshot: &Value) -> DocumentBatch {
        let batch = DocumentBatch {
            jobs: decode_collection(snapshot, "jobs", decode_job),
            payouts: decode_collection(snapshot, "payouts", decode_payout),
            invoices: decode_collection(snapshot, "invoices", decode_invoice),
            employees: decode_collection(snapshot, "employees", decode_employee),
        };

        debug!(
            jobs = batch.jobs.len(),
            payouts = batch.payouts.len(),
            invoices = batch.invoices.len(),
            employees = batch.employees.len(),
            "Decoded document batch"
        );

        batch
    }

    /// Looks up a job by id.
    pub fn job(&self, job_id: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == job_id)
    }
}

fn decode_collection<T>(
    snapshot: &Value,
    key: &str,
    decode: fn(&Value) -> Result<T, DecodeError>,
) -> Vec<T> {
    let docs: Vec<&Value> = match snapshot.get(key) {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Object(map)) => map.values().collect(),
        Some(Value::Null) | None => return Vec::new(),
        Some(_) => {
            warn!(collection = key, "Collection is neither an array nor an object, skipping");
            return Vec::new();
        }
    };

    docs.into_iter()
        .enumerate()
        .filter_map(|(index, doc)| match decode(doc) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(collection = key, index, error = %e, "Skipping undecodable document");
                None
            }
        })
        .collect()
}

// =============================================================================
// Decoders
// =============================================================================

fn require_object(doc: &Value, kind: &'static str) -> Result<(), DecodeError> {
    if doc.is_object() {
        Ok(())
    } else {
        Err(DecodeError::NotAnObject { kind })
    }
}

fn require_id(doc: &Value, kind: &'static str) -> Result<String, DecodeError> {
    string_at(doc, "id").ok_or(DecodeError::MissingField { kind, field: "id" })
}

fn require_org(doc: &Value, kind: &'static str) -> Result<String, DecodeError> {
    resolve_field(doc, ORG_ID_KEYS).ok_or(DecodeError::MissingField {
        kind,
        field: "orgId",
    })
}

fn array_at<'a>(doc: &'a Value, path: &str) -> &'a [Value] {
    lookup(doc, path)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Decodes a job document and recomputes its derived block.
pub fn decode_job(doc: &Value) -> Result<Job, DecodeError> {
    require_object(doc, "job")?;
    let id = require_id(doc, "job")?;
    let org_id = require_org(doc, "job")?;

    let status = match string_at(doc, "status") {
        Some(raw) => raw.parse::<JobStatus>().unwrap_or_else(|_| {
            debug!(job_id = %id, status = %raw, "Unknown job status, using draft");
            JobStatus::default()
        }),
        None => JobStatus::default(),
    };

    let entries = array_at(doc, "earnings.entries")
        .iter()
        .enumerate()
        .map(|(i, entry)| EarningEntry {
            id: string_at(entry, "id").unwrap_or_else(|| format!("{id}-earning-{i}")),
            label: string_at(entry, "label").unwrap_or_default(),
            amount_cents: cents_at(entry, "amountCents"),
            earned_at: timestamp_at(entry, "earnedAt"),
        })
        .collect();

    let payouts = array_at(doc, "expenses.payouts")
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            let mut payout = payout_fields(raw, &org_id);
            if payout.id.is_empty() {
                payout.id = format!("{id}-payout-{i}");
            }
            payout.job_id.get_or_insert_with(|| id.clone());
            payout
        })
        .collect();

    let materials = array_at(doc, "expenses.materials")
        .iter()
        .enumerate()
        .map(|(i, m)| MaterialExpense {
            id: string_at(m, "id").unwrap_or_else(|| format!("{id}-material-{i}")),
            name: resolve_field(m, &["name", "label", "description"]).unwrap_or_default(),
            vendor: resolve_field(m, &["vendor", "supplier", "store"]),
            amount_cents: cents_at(m, "amountCents"),
            category: resolve_field(m, CATEGORY_KEYS),
            purchased_at: timestamp_at(m, "purchasedAt"),
        })
        .collect();

    let job = Job {
        address: resolve_field(doc, ADDRESS_KEYS),
        status,
        earnings: JobEarnings {
            total_earnings_cents: cents_at(doc, "earnings.totalEarningsCents"),
            entries,
        },
        expenses: JobExpenses {
            total_payouts_cents: cents_at(doc, "expenses.totalPayoutsCents"),
            total_materials_cents: cents_at(doc, "expenses.totalMaterialsCents"),
            payouts,
            materials,
        },
        computed: Default::default(),
        created_at: timestamp_at(doc, "createdAt"),
        updated_at: timestamp_at(doc, "updatedAt"),
        id,
        org_id,
    };

    Ok(recompute(job))
}

/// Decodes a standalone payout document.
pub fn decode_payout(doc: &Value) -> Result<Payout, DecodeError> {
    require_object(doc, "payout")?;
    let id = require_id(doc, "payout")?;
    let org_id = require_org(doc, "payout")?;

    let mut payout = payout_fields(doc, &org_id);
    payout.id = id;
    Ok(payout)
}

/// Shared payout field reading. Embedded payouts inherit the job's org.
fn payout_fields(doc: &Value, org_id: &str) -> Payout {
    Payout {
        id: string_at(doc, "id").unwrap_or_default(),
        org_id: resolve_field(doc, ORG_ID_KEYS).unwrap_or_else(|| org_id.to_string()),
        employee_id: resolve_field(doc, &["employeeId", "employee.id", "userId"])
            .unwrap_or_default(),
        employee_name: resolve_field(doc, &["employeeName", "employee.name"]),
        job_id: string_at(doc, "jobId"),
        category: resolve_field(doc, CATEGORY_KEYS),
        amount_cents: cents_at(doc, "amountCents"),
        created_at: timestamp_at(doc, "createdAt"),
        paid_at: timestamp_at(doc, "paidAt"),
    }
}

/// Decodes an invoice document.
pub fn decode_invoice(doc: &Value) -> Result<InvoiceDoc, DecodeError> {
    require_object(doc, "invoice")?;
    let id = require_id(doc, "invoice")?;
    let org_id = require_org(doc, "invoice")?;

    let status = match string_at(doc, "status") {
        Some(raw) => raw.parse::<InvoiceStatus>().unwrap_or_else(|_| {
            debug!(invoice_id = %id, status = %raw, "Unknown invoice status, using draft");
            InvoiceStatus::default()
        }),
        None => InvoiceStatus::default(),
    };

    let lines = array_at(doc, "lines")
        .iter()
        .enumerate()
        .map(|(i, line)| InvoiceLine {
            id: string_at(line, "id").unwrap_or_else(|| format!("{id}-line-{i}")),
            label: resolve_field(line, &["label", "description", "name"]).unwrap_or_default(),
            amount_cents: cents_at(line, "amountCents"),
        })
        .collect();

    let customer = Customer {
        name: resolve_field(doc, &["customer.name", "customerName"]),
        email: resolve_field(doc, &["customer.email", "customerEmail"]),
        phone: resolve_field(doc, &["customer.phone", "customerPhone"]),
    };
    let customer = (customer != Customer::default()).then_some(customer);

    Ok(InvoiceDoc {
        org_id,
        job_id: string_at(doc, "jobId").unwrap_or_default(),
        number: string_at(doc, "number").unwrap_or_default(),
        status,
        lines,
        money: InvoiceMoney {
            subtotal_cents: cents_at(doc, "money.subtotalCents"),
            tax_cents: cents_at(doc, "money.taxCents"),
            total_cents: cents_at(doc, "money.totalCents"),
        },
        customer,
        address_snapshot: string_at(doc, "addressSnapshot")
            .or_else(|| resolve_field(doc, ADDRESS_KEYS)),
        created_at: timestamp_at(doc, "createdAt"),
        sent_at: timestamp_at(doc, "sentAt"),
        paid_at: timestamp_at(doc, "paidAt"),
        id,
    })
}

/// Decodes an employee directory entry.
pub fn decode_employee(doc: &Value) -> Result<Employee, DecodeError> {
    require_object(doc, "employee")?;
    let id = require_id(doc, "employee")?;
    let name = resolve_field(doc, EMPLOYEE_NAME_KEYS).unwrap_or_default();
    Ok(Employee { id, name })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn test_decode_job_recomputes_and_defaults() {
        let doc = json!({
            "id": "job-1",
            "orgId": "org-1",
            "status": "active",
            "siteAddress": "12 Elm St",
            "earnings": { "totalEarningsCents": 500000 },
            "expenses": {
                "totalPayoutsCents": 100000,
                "totalMaterialsCents": "50000",
                "materials": [{ "name": "Lumber", "amountCents": 50000, "type": "lumber" }]
            },
            "computed": { "netProfitCents": 1, "totalExpensesCents": 2 },
            "createdAt": "2025-03-01",
            "updatedAt": "not a date"
        });

        let job = decode_job(&doc).unwrap();
        assert_eq!(job.address.as_deref(), Some("12 Elm St"));
        assert_eq!(job.status, JobStatus::Active);
        assert_eq!(job.computed.total_expenses_cents, 150_000);
        assert_eq!(job.computed.net_profit_cents, 350_000);
        assert_eq!(job.expenses.materials[0].category.as_deref(), Some("lumber"));
        assert_eq!(job.expenses.materials[0].id, "job-1-material-0");
        assert_eq!(job.updated_at, None);
        assert_eq!(
            job.reference_date(),
            Some(Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_decode_job_missing_identity() {
        assert_eq!(
            decode_job(&json!({ "orgId": "org-1" })),
            Err(DecodeError::MissingField { kind: "job", field: "id" })
        );
        assert_eq!(
            decode_job(&json!({ "id": "job-1" })),
            Err(DecodeError::MissingField { kind: "job", field: "orgId" })
        );
        assert_eq!(
            decode_job(&json!("job-1")),
            Err(DecodeError::NotAnObject { kind: "job" })
        );
    }

    #[test]
    fn test_embedded_payouts_inherit_job() {
        let doc = json!({
            "id": "job-1",
            "orgId": "org-1",
            "expenses": { "payouts": [{ "employeeId": "emp-1", "amountCents": 1000 }] }
        });
        let job = decode_job(&doc).unwrap();
        let payout = &job.expenses.payouts[0];
        assert_eq!(payout.org_id, "org-1");
        assert_eq!(payout.job_id.as_deref(), Some("job-1"));
        assert_eq!(payout.id, "job-1-payout-0");
    }

    #[test]
    fn test_decode_invoice() {
        let doc = json!({
            "id": "inv-1",
            "orgId": "org-1",
            "jobId": "job-1",
            "number": "INV-2025-000004",
            "status": "voided",
            "lines": [{ "id": "l1", "label": "Labor", "amountCents": 1000 }],
            "money": { "subtotalCents": 1000, "taxCents": 80, "totalCents": 1080 },
            "customerName": "Pat Doe",
            "sentAt": { "_seconds": 1736899200, "_nanoseconds": 0 }
        });

        let inv = decode_invoice(&doc).unwrap();
        assert_eq!(inv.status, InvoiceStatus::Void);
        assert_eq!(inv.customer.unwrap().name.as_deref(), Some("Pat Doe"));
        assert_eq!(inv.sent_at, Some(Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap()));
        assert!(inv.paid_at.is_none());
    }

    #[test]
    fn test_batch_skips_bad_documents() {
        let snapshot = json!({
            "jobs": [
                { "id": "job-1", "orgId": "org-1" },
                { "orgId": "org-1" },
                42
            ],
            "payouts": {
                "p1": { "id": "p1", "orgId": "org-1", "employeeId": "emp-1", "amountCents": 300 }
            },
            "employees": [{ "id": "emp-1", "displayName": "Sam" }]
        });

        let batch = DocumentBatch::from_json(&snapshot);
        assert_eq!(batch.jobs.len(), 1);
        assert_eq!(batch.payouts.len(), 1);
        assert!(batch.invoices.is_empty());
        assert_eq!(batch.employees[0].name, "Sam");
        assert!(batch.job("job-1").is_some());
    }
}
