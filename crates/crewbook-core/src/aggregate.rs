//! # Aggregation Engine
//!
//! Pure folds from filtered documents to dashboard figures.
//!
//! ## Outputs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  filtered jobs ──┬──► compute_totals()     Totals                      │
//! │                  ├──► trend_series()       TrendSeries (per bucket)     │
//! │                  ├──► material_breakdown() Breakdown                    │
//! │                  └──► top_jobs()           Vec<RankedItem>              │
//! │                                                                         │
//! │  filtered payouts ─┬► compute_totals()     pending / paid               │
//! │                    ├► payout_breakdown()   Breakdown                    │
//! │                    └► top_employees()      Vec<RankedItem>              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All amounts are cents. Nothing here filters by date; callers hand in
//! documents that already passed the range and org filters.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use ts_rs::TS;

use crate::money::Money;
use crate::range::{MonthBucket, MonthKey};
use crate::types::{Employee, Job, Payout};

/// Category label for documents without one.
pub const UNCATEGORIZED: &str = "other";

/// Chart colors, cycled when there are more categories than entries.
pub const PALETTE: [&str; 8] = [
    "#2563eb", "#16a34a", "#f59e0b", "#dc2626", "#7c3aed", "#0891b2", "#db2777", "#65a30d",
];

// =============================================================================
// Totals
// =============================================================================

/// Headline figures for the selected range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub earnings_cents: i64,
    pub materials_cents: i64,
    pub payouts_cents: i64,
    pub expenses_cents: i64,
    pub net_profit_cents: i64,
    pub job_count: u32,
    /// Net profit per job, rounded half away from zero. 0 with no jobs.
    pub average_profit_cents: i64,
    pub pending_payouts_cents: i64,
    pub paid_payouts_cents: i64,
}

/// Sums jobs and payouts into [`Totals`].
///
/// Job totals come from the cached fields; pending/paid come from the
/// payout documents.
pub fn compute_totals<'a>(
    jobs: impl IntoIterator<Item = &'a Job>,
    payouts: impl IntoIterator<Item = &'a Payout>,
) -> Totals {
    let mut totals = Totals::default();

    for job in jobs {
        totals.earnings_cents = totals
            .earnings_cents
            .saturating_add(job.earnings.total_earnings_cents);
        totals.materials_cents = totals
            .materials_cents
            .saturating_add(job.expenses.total_materials_cents);
        totals.payouts_cents = totals
            .payouts_cents
            .saturating_add(job.expenses.total_payouts_cents);
        totals.net_profit_cents = totals
            .net_profit_cents
            .saturating_add(job.computed.net_profit_cents);
        totals.job_count += 1;
    }

    for payout in payouts {
        let bucket = if payout.is_paid() {
            &mut totals.paid_payouts_cents
        } else {
            &mut totals.pending_payouts_cents
        };
        *bucket = bucket.saturating_add(payout.amount_cents);
    }

    totals.expenses_cents = totals.payouts_cents.saturating_add(totals.materials_cents);
    totals.average_profit_cents = Money::from_cents(totals.net_profit_cents)
        .div_round(totals.job_count as u64)
        .cents();
    totals
}

// =============================================================================
// Trend Series
// =============================================================================

/// Parallel per-month arrays, index-aligned with `labels`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TrendSeries {
    pub keys: Vec<String>,
    pub labels: Vec<String>,
    pub earnings_cents: Vec<i64>,
    pub expenses_cents: Vec<i64>,
    pub net_profit_cents: Vec<i64>,
}

/// Sums each job into the bucket holding its reference date.
///
/// Every bucket is present even when empty. Jobs without a reference date
/// (or dated outside the buckets) contribute to no bucket.
pub fn trend_series<'a>(buckets: &[MonthBucket], jobs: impl IntoIterator<Item = &'a Job>) -> TrendSeries {
    let len = buckets.len();
    let mut series = TrendSeries {
        keys: buckets.iter().map(|b| b.key.clone()).collect(),
        labels: buckets.iter().map(|b| b.label.clone()).collect(),
        earnings_cents: vec![0; len],
        expenses_cents: vec![0; len],
        net_profit_cents: vec![0; len],
    };

    let index: HashMap<_, _> = buckets.iter().enumerate().map(|(i, b)| (b.month, i)).collect();

    for job in jobs {
        let Some(at) = job.reference_date() else {
            continue;
        };
        let Some(&i) = index.get(&MonthKey::of(at)) else {
            continue;
        };
        series.earnings_cents[i] =
            series.earnings_cents[i].saturating_add(job.earnings.total_earnings_cents);
        series.expenses_cents[i] =
            series.expenses_cents[i].saturating_add(job.computed.total_expenses_cents);
        series.net_profit_cents[i] =
            series.net_profit_cents[i].saturating_add(job.computed.net_profit_cents);
    }

    series
}

// =============================================================================
// Category Breakdown
// =============================================================================

/// Parallel label/value/color arrays for a pie or bar chart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Breakdown {
    pub labels: Vec<String>,
    pub values: Vec<i64>,
    pub colors: Vec<String>,
}

impl Breakdown {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Groups `(category, cents)` pairs.
///
/// Categories are trimmed and lowercased; missing ones fall under
/// [`UNCATEGORIZED`]. Groups totalling ≤ 0 are dropped. Ordered by value
/// descending, ties in first-seen order.
pub fn breakdown<'a>(items: impl IntoIterator<Item = (Option<&'a str>, i64)>) -> Breakdown {
    let mut groups: Vec<(String, i64)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (category, cents) in items {
        let key = category
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| UNCATEGORIZED.to_string());

        match positions.get(&key) {
            Some(&i) => groups[i].1 = groups[i].1.saturating_add(cents),
            None => {
                positions.insert(key.clone(), groups.len());
                groups.push((key, cents));
            }
        }
    }

    groups.retain(|(_, total)| *total > 0);
    // stable: equal totals keep first-seen order
    groups.sort_by(|a, b| b.1.cmp(&a.1));

    let mut out = Breakdown::default();
    for (i, (label, value)) in groups.into_iter().enumerate() {
        out.labels.push(label);
        out.values.push(value);
        out.colors.push(PALETTE[i % PALETTE.len()].to_string());
    }
    out
}

/// Payout amounts by category.
pub fn payout_breakdown<'a>(payouts: impl IntoIterator<Item = &'a Payout>) -> Breakdown {
    breakdown(
        payouts
            .into_iter()
            .map(|p| (p.category.as_deref(), p.amount_cents)),
    )
}

/// Material amounts by category, across the jobs' embedded materials.
pub fn material_breakdown<'a>(jobs: impl IntoIterator<Item = &'a Job>) -> Breakdown {
    breakdown(
        jobs.into_iter()
            .flat_map(|j| j.expenses.materials.iter())
            .map(|m| (m.category.as_deref(), m.amount_cents)),
    )
}

// =============================================================================
// Top-N Ranking
// =============================================================================

/// One entry of a ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RankedItem {
    pub id: String,
    pub label: String,
    pub value_cents: i64,
}

/// Keeps the `n` highest values, sorted non-increasing, ties first-seen.
pub fn rank_top_n(mut items: Vec<RankedItem>, n: usize) -> Vec<RankedItem> {
    items.sort_by(|a, b| b.value_cents.cmp(&a.value_cents));
    items.truncate(n);
    items
}

/// Jobs ranked by net profit.
pub fn top_jobs<'a>(jobs: impl IntoIterator<Item = &'a Job>, n: usize) -> Vec<RankedItem> {
    let items = jobs
        .into_iter()
        .map(|job| RankedItem {
            id: job.id.clone(),
            label: job.label().to_string(),
            value_cents: job.computed.net_profit_cents,
        })
        .collect();
    rank_top_n(items, n)
}

/// Employees ranked by summed payout amount.
///
/// Labels come from the directory, then the payout's name snapshot, then
/// the employee id.
pub fn top_employees<'a>(
    payouts: impl IntoIterator<Item = &'a Payout>,
    employees: &[Employee],
    n: usize,
) -> Vec<RankedItem> {
    let directory: HashMap<&str, &str> = employees
        .iter()
        .filter(|e| !e.name.trim().is_empty())
        .map(|e| (e.id.as_str(), e.name.as_str()))
        .collect();

    let mut items: Vec<RankedItem> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for payout in payouts {
        let id = payout.employee_id.as_str();
        match positions.get(id) {
            Some(&i) => {
                items[i].value_cents = items[i].value_cents.saturating_add(payout.amount_cents)
            }
            None => {
                let label = directory
                    .get(id)
                    .copied()
                    .or(payout.employee_name.as_deref())
                    .unwrap_or(id);
                positions.insert(id, items.len());
                items.push(RankedItem {
                    id: id.to_string(),
                    label: label.to_string(),
                    value_cents: payout.amount_cents,
                });
            }
        }
    }

    rank_top_n(items, n)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::month_buckets;
    use crate::recompute::recompute;
    use crate::types::{JobStatus, MaterialExpense};
    use chrono::{DateTime, TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn job(id: &str, earnings: i64, payouts: i64, materials: i64, at: Option<DateTime<Utc>>) -> Job {
        let mut job = Job::new(id, "org-1", JobStatus::Active, at);
        job.earnings.total_earnings_cents = earnings;
        job.expenses.total_payouts_cents = payouts;
        job.expenses.total_materials_cents = materials;
        recompute(job)
    }

    fn payout(employee: &str, category: Option<&str>, amount: i64, paid: bool) -> Payout {
        Payout {
            id: format!("p-{employee}-{amount}"),
            org_id: "org-1".to_string(),
            employee_id: employee.to_string(),
            employee_name: None,
            job_id: None,
            category: category.map(str::to_string),
            amount_cents: amount,
            created_at: Some(date(2025, 3, 1)),
            paid_at: paid.then(|| date(2025, 3, 5)),
        }
    }

    #[test]
    fn test_totals() {
        let jobs = vec![
            job("a", 500_000, 100_000, 50_000, Some(date(2025, 1, 5))),
            job("b", 10_001, 0, 0, None),
        ];
        let payouts = vec![payout("e1", None, 700, true), payout("e2", None, 300, false)];

        let totals = compute_totals(&jobs, &payouts);
        assert_eq!(totals.earnings_cents, 510_001);
        assert_eq!(totals.expenses_cents, 150_000);
        assert_eq!(totals.net_profit_cents, 360_001);
        assert_eq!(totals.job_count, 2);
        // 180000.5 rounds away from zero
        assert_eq!(totals.average_profit_cents, 180_001);
        assert_eq!(totals.paid_payouts_cents, 700);
        assert_eq!(totals.pending_payouts_cents, 300);
    }

    #[test]
    fn test_totals_with_no_jobs() {
        let totals = compute_totals(&Vec::<Job>::new(), &Vec::<Payout>::new());
        assert_eq!(totals, Totals::default());
        assert_eq!(totals.average_profit_cents, 0);
    }

    #[test]
    fn test_trend_reconciles_with_dated_totals() {
        let jobs = vec![
            job("a", 1_000, 100, 0, Some(date(2024, 12, 31))),
            job("b", 2_000, 0, 300, Some(date(2025, 1, 1))),
            job("c", 4_000, 0, 0, Some(date(2025, 1, 20))),
            job("d", 8_000, 0, 0, None),
        ];
        let buckets = month_buckets(MonthKey::new(2024, 11), MonthKey::new(2025, 2));
        let trend = trend_series(&buckets, &jobs);

        assert_eq!(trend.labels.len(), 4);
        assert_eq!(trend.earnings_cents, vec![0, 1_000, 6_000, 0]);
        assert_eq!(trend.expenses_cents, vec![0, 100, 300, 0]);

        let dated: i64 = jobs
            .iter()
            .filter(|j| j.reference_date().is_some())
            .map(|j| j.earnings.total_earnings_cents)
            .sum();
        assert_eq!(trend.earnings_cents.iter().sum::<i64>(), dated);
        assert_eq!(compute_totals(&jobs, &Vec::<Payout>::new()).earnings_cents, dated + 8_000);
    }

    #[test]
    fn test_breakdown_groups_and_orders() {
        let payouts = vec![
            payout("e1", Some("Labor"), 500, true),
            payout("e1", None, 200, true),
            payout("e2", Some("travel"), 200, false),
            payout("e2", Some(" labor "), 100, false),
            payout("e3", Some("refund"), 0, false),
        ];

        let chart = payout_breakdown(&payouts);
        assert_eq!(chart.labels, vec!["labor", "other", "travel"]);
        assert_eq!(chart.values, vec![600, 200, 200]);
        assert_eq!(chart.colors[0], PALETTE[0]);
        assert_eq!(chart.len(), 3);
    }

    #[test]
    fn test_material_breakdown_cycles_palette() {
        let mut j = job("a", 0, 0, 0, None);
        for i in 0..10 {
            j.expenses.materials.push(MaterialExpense {
                id: format!("m{i}"),
                name: "Item".to_string(),
                vendor: None,
                amount_cents: 100 - i,
                category: Some(format!("cat{i}")),
                purchased_at: None,
            });
        }
        let chart = material_breakdown(std::iter::once(&j));
        assert_eq!(chart.len(), 10);
        assert_eq!(chart.colors[8], PALETTE[0]);
    }

    #[test]
    fn test_top_jobs_bound_subset_order() {
        let jobs: Vec<Job> = [30, 10, 50, 10, 40, 20, 50]
            .iter()
            .enumerate()
            .map(|(i, &profit)| job(&format!("job-{i}"), profit, 0, 0, None))
            .collect();

        let top = top_jobs(&jobs, 5);
        assert_eq!(top.len(), 5);
        assert!(top.windows(2).all(|w| w[0].value_cents >= w[1].value_cents));
        assert!(top.iter().all(|t| jobs.iter().any(|j| j.id == t.id)));
        // ties keep input order
        assert_eq!(top[0].id, "job-2");
        assert_eq!(top[1].id, "job-6");

        assert_eq!(top_jobs(&jobs[..2], 5).len(), 2);
    }

    #[test]
    fn test_top_employees_labels_and_sums() {
        let mut named = payout("e2", None, 250, true);
        named.employee_name = Some("Riley".to_string());
        let payouts = vec![
            payout("e1", None, 100, true),
            named,
            payout("e1", None, 300, false),
            payout("e3", None, 400, false),
        ];
        let employees = vec![Employee {
            id: "e1".to_string(),
            name: "Jordan".to_string(),
        }];

        let top = top_employees(&payouts, &employees, 2);
        assert_eq!(top.len(), 2);
        assert_eq!((top[0].label.as_str(), top[0].value_cents), ("Jordan", 400));
        assert_eq!((top[1].label.as_str(), top[1].value_cents), ("e3", 400));

        let all = top_employees(&payouts, &employees, 5);
        assert_eq!(all[2].label, "Riley");
    }
}
