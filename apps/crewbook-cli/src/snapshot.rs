//! # Snapshot Files
//!
//! A JSON export of the document store as a [`DocumentSource`].
//!
//! ```json
//! {
//!   "jobs":      [ { "id": "job-1", "orgId": "acme", ... } ],
//!   "payouts":   { "p-1": { "id": "p-1", "employeeId": "e-1", ... } },
//!   "invoices":  [ ... ],
//!   "employees": [ ... ]
//! }
//! ```
//!
//! Collections may be arrays or id-keyed maps. Documents that do not
//! decode are skipped, the rest of the file still loads.

use crewbook_core::{CoreError, CoreResult, DocumentBatch, DocumentSource, InvoiceDoc};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Reads a snapshot file every time a snapshot is requested.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileSource { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentSource for JsonFileSource {
    fn snapshot(&self) -> CoreResult<DocumentBatch> {
        let contents = std::fs::read_to_string(&self.path).map_err(|e| {
            CoreError::SnapshotUnavailable(format!("{}: {}", self.path.display(), e))
        })?;
        let value: serde_json::Value = serde_json::from_str(&contents).map_err(|e| {
            CoreError::SnapshotUnavailable(format!("{}: {}", self.path.display(), e))
        })?;

        let batch = DocumentBatch::from_json(&value);
        info!(
            path = %self.path.display(),
            jobs = batch.jobs.len(),
            payouts = batch.payouts.len(),
            invoices = batch.invoices.len(),
            "Snapshot loaded"
        );
        Ok(batch)
    }
}

/// Adds stored invoices to a batch. A snapshot invoice with the same id
/// wins over the stored copy.
pub fn merge_invoices(batch: &mut DocumentBatch, stored: Vec<InvoiceDoc>) {
    let known: HashSet<String> = batch.invoices.iter().map(|i| i.id.clone()).collect();
    let before = batch.invoices.len();
    batch
        .invoices
        .extend(stored.into_iter().filter(|i| !known.contains(&i.id)));
    debug!(added = batch.invoices.len() - before, "Merged stored invoices");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crewbook_core::InvoiceStatus;
    use serde_json::json;

    fn temp_file(contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("crewbook-snapshot-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_loads_file() {
        let snapshot = json!({
            "jobs": [{
                "id": "job-1",
                "orgId": "acme",
                "status": "active",
                "earnings": { "totalEarningsCents": 500000 }
            }],
            "payouts": {
                "p-1": { "id": "p-1", "orgId": "acme", "employeeId": "e-1", "amountCents": 1000 }
            },
            "invoices": [],
            "employees": [{ "id": "e-1", "name": "Sam" }]
        });
        let path = temp_file(&snapshot.to_string());

        let batch = JsonFileSource::new(&path).snapshot().unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(batch.jobs.len(), 1);
        assert_eq!(batch.jobs[0].earnings.total_earnings_cents, 500_000);
        assert_eq!(batch.payouts.len(), 1);
        assert_eq!(batch.payouts[0].id, "p-1");
        assert_eq!(batch.employees.len(), 1);
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let source = JsonFileSource::new("/nonexistent/crewbook/snapshot.json");
        assert!(matches!(
            source.snapshot(),
            Err(CoreError::SnapshotUnavailable(_))
        ));
    }

    #[test]
    fn test_malformed_file_is_unavailable() {
        let path = temp_file("{ not json");
        let result = JsonFileSource::new(&path).snapshot();
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(CoreError::SnapshotUnavailable(_))));
    }

    #[test]
    fn test_merge_prefers_snapshot_copy() {
        let invoice = |id: &str, status: InvoiceStatus| InvoiceDoc {
            id: id.to_string(),
            org_id: "acme".to_string(),
            job_id: String::new(),
            number: String::new(),
            status,
            lines: Vec::new(),
            money: Default::default(),
            customer: None,
            address_snapshot: None,
            created_at: None,
            sent_at: None,
            paid_at: None,
        };

        let mut batch = DocumentBatch {
            invoices: vec![invoice("inv-1", InvoiceStatus::Paid)],
            ..Default::default()
        };
        merge_invoices(
            &mut batch,
            vec![
                invoice("inv-1", InvoiceStatus::Draft),
                invoice("inv-2", InvoiceStatus::Sent),
            ],
        );

        assert_eq!(batch.invoices.len(), 2);
        assert_eq!(batch.invoices[0].status, InvoiceStatus::Paid);
        assert_eq!(batch.invoices[1].id, "inv-2");
    }
}
