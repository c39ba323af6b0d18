//! # Time Range Resolver
//!
//! Maps a dashboard preset and "now" to concrete instants, and splits a
//! range into calendar-month buckets.
//!
//! ## Presets
//! ```text
//! ┌────────────┬──────────────────────────────────────┬──────────────────────────┐
//! │ Preset     │ Start                                │ End                      │
//! ├────────────┼──────────────────────────────────────┼──────────────────────────┤
//! │ last7      │ now - 6 days, 00:00:00               │ now, 23:59:59.999        │
//! │ thisMonth  │ 1st of now's month                   │ now, 23:59:59.999        │
//! │ ytd        │ Jan 1 of now's year                  │ now, 23:59:59.999        │
//! │ 6months    │ 1st of the month 5 months back       │ now, 23:59:59.999        │
//! │ 12months   │ 1st of the month 11 months back      │ now, 23:59:59.999        │
//! │ all        │ (unbounded)                          │ (unbounded)              │
//! │ custom     │ caller's first day, 00:00:00         │ caller's last day, .999  │
//! └────────────┴──────────────────────────────────────┴──────────────────────────┘
//! ```
//!
//! All instants are UTC. An unbounded range accepts documents without a
//! date; a bounded one rejects them.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};

// =============================================================================
// Preset
// =============================================================================

/// Named time window selectable on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum RangePreset {
    #[serde(rename = "last7")]
    Last7,
    #[serde(rename = "thisMonth")]
    ThisMonth,
    #[serde(rename = "ytd")]
    Ytd,
    #[default]
    #[serde(rename = "6months")]
    SixMonths,
    #[serde(rename = "12months")]
    TwelveMonths,
    #[serde(rename = "all")]
    All,
    #[serde(rename = "custom")]
    Custom,
}

impl RangePreset {
    pub const ALL: [RangePreset; 7] = [
        RangePreset::Last7,
        RangePreset::ThisMonth,
        RangePreset::Ytd,
        RangePreset::SixMonths,
        RangePreset::TwelveMonths,
        RangePreset::All,
        RangePreset::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RangePreset::Last7 => "last7",
            RangePreset::ThisMonth => "thisMonth",
            RangePreset::Ytd => "ytd",
            RangePreset::SixMonths => "6months",
            RangePreset::TwelveMonths => "12months",
            RangePreset::All => "all",
            RangePreset::Custom => "custom",
        }
    }
}

impl fmt::Display for RangePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for RangePreset {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        RangePreset::ALL
            .iter()
            .copied()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "preset".to_string(),
                allowed: RangePreset::ALL.iter().map(|p| p.to_string()).collect(),
            })
    }
}

/// Caller-supplied days for the `custom` preset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CustomRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl CustomRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        CustomRange {
            start: Some(start),
            end: Some(end),
        }
    }
}

// =============================================================================
// Resolved Range
// =============================================================================

/// Concrete instants for a preset. `None` on both ends means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRange {
    pub preset: RangePreset,
    #[ts(as = "Option<String>")]
    pub start: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub end: Option<DateTime<Utc>>,
    /// The "now" the range was resolved against.
    #[ts(as = "String")]
    pub as_of: DateTime<Utc>,
}

impl ResolvedRange {
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Whether a document dated `at` belongs to this range.
    pub fn contains(&self, at: Option<DateTime<Utc>>) -> bool {
        if self.is_unbounded() {
            return true;
        }
        let Some(at) = at else {
            return false;
        };
        self.start.map_or(true, |start| at >= start) && self.end.map_or(true, |end| at <= end)
    }

    /// First and last month to bucket.
    ///
    /// For an unbounded range the span starts at `earliest` (typically the
    /// earliest dated job) or at the current month when nothing is dated,
    /// and ends at the current month. A `latest` date past the current
    /// month stretches the end so future-dated jobs still land in a bucket.
    pub fn bucket_span(
        &self,
        earliest: Option<DateTime<Utc>>,
        latest: Option<DateTime<Utc>>,
    ) -> (MonthKey, MonthKey) {
        let now = MonthKey::of(self.as_of);
        let first = self.start.or(earliest).map_or(now, MonthKey::of);
        let last = match self.end {
            Some(end) => MonthKey::of(end),
            None => latest.map_or(now, |l| MonthKey::of(l).max(now)),
        };
        (first, last)
    }

    /// Month buckets for [`ResolvedRange::bucket_span`].
    pub fn buckets(
        &self,
        earliest: Option<DateTime<Utc>>,
        latest: Option<DateTime<Utc>>,
    ) -> Vec<MonthBucket> {
        let (first, last) = self.bucket_span(earliest, latest);
        month_buckets(first, last)
    }
}

/// Resolves a preset against `now`.
///
/// ## Example
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use crewbook_core::range::{resolve_range, RangePreset};
///
/// let now = Utc.with_ymd_and_hms(2025, 6, 15, 14, 30, 0).unwrap();
/// let range = resolve_range(RangePreset::Ytd, now, None).unwrap();
/// assert_eq!(range.start, Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()));
/// ```
pub fn resolve_range(
    preset: RangePreset,
    now: DateTime<Utc>,
    custom: Option<CustomRange>,
) -> CoreResult<ResolvedRange> {
    let today = now.date_naive();
    let end = Some(end_of_day(today));

    let (start, end) = match preset {
        RangePreset::Last7 => (Some(start_of_day(today - Duration::days(6))), end),
        RangePreset::ThisMonth => (Some(months_back(today, 1)), end),
        RangePreset::Ytd => (Some(months_back(today, today.month())), end),
        RangePreset::SixMonths => (Some(months_back(today, 6)), end),
        RangePreset::TwelveMonths => (Some(months_back(today, 12)), end),
        RangePreset::All => (None, None),
        RangePreset::Custom => {
            let (Some(mut first), Some(mut last)) = (
                custom.and_then(|c| c.start),
                custom.and_then(|c| c.end),
            ) else {
                return Err(ValidationError::Required {
                    field: "customRange".to_string(),
                }
                .into());
            };
            if first > last {
                std::mem::swap(&mut first, &mut last);
            }
            (Some(start_of_day(first)), Some(end_of_day(last)))
        }
    };

    Ok(ResolvedRange {
        preset,
        start,
        end,
        as_of: now,
    })
}

fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

fn end_of_day(day: NaiveDate) -> DateTime<Utc> {
    // 23:59:59.999 is always representable
    let last = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    day.and_time(last).and_utc()
}

/// First day of the month `count - 1` months before `today`'s month.
fn months_back(today: NaiveDate, count: u32) -> DateTime<Utc> {
    let mut key = MonthKey::of_date(today);
    for _ in 1..count {
        key = key.pred();
    }
    start_of_day(key.first_day())
}

// =============================================================================
// Month Buckets
// =============================================================================

/// A calendar month. Orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MonthKey {
    pub year: i32,
    /// 1..=12
    pub month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Self {
        MonthKey { year, month }
    }

    pub fn of(at: DateTime<Utc>) -> Self {
        Self::of_date(at.date_naive())
    }

    pub fn of_date(day: NaiveDate) -> Self {
        MonthKey {
            year: day.year(),
            month: day.month(),
        }
    }

    pub fn succ(self) -> Self {
        if self.month >= 12 {
            MonthKey::new(self.year + 1, 1)
        } else {
            MonthKey::new(self.year, self.month + 1)
        }
    }

    pub fn pred(self) -> Self {
        if self.month <= 1 {
            MonthKey::new(self.year - 1, 12)
        } else {
            MonthKey::new(self.year, self.month - 1)
        }
    }

    /// Months between `self` and `other` (`other - self`).
    pub fn months_until(self, other: MonthKey) -> i64 {
        (other.year as i64 - self.year as i64) * 12 + (other.month as i64 - self.month as i64)
    }

    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Short label, e.g. `Jan 2025`.
    pub fn label(self) -> String {
        self.first_day().format("%b %Y").to_string()
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// One bucket of the trend series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MonthBucket {
    /// `YYYY-MM`
    pub key: String,
    /// `Jan 2025`
    pub label: String,
    #[serde(skip)]
    pub month: MonthKey,
}

impl Default for MonthKey {
    fn default() -> Self {
        MonthKey::new(1970, 1)
    }
}

/// Every month from `start` to `end` inclusive, no gaps.
///
/// Inverted input is swapped.
pub fn month_buckets(start: MonthKey, end: MonthKey) -> Vec<MonthBucket> {
    let (first, last) = if start <= end { (start, end) } else { (end, start) };
    let count = first.months_until(last) + 1;

    let mut buckets = Vec::with_capacity(count as usize);
    let mut month = first;
    for _ in 0..count {
        buckets.push(MonthBucket {
            key: month.to_string(),
            label: month.label(),
            month,
        });
        month = month.succ();
    }
    buckets
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 14, 30, 0).unwrap()
    }

    fn end_of_june_15() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 23, 59, 59).unwrap() + Duration::milliseconds(999)
    }

    #[test]
    fn test_preset_tokens() {
        for preset in RangePreset::ALL {
            assert_eq!(preset.as_str().parse::<RangePreset>().unwrap(), preset);
        }
        assert_eq!(
            serde_json::to_string(&RangePreset::SixMonths).unwrap(),
            "\"6months\""
        );
        assert!("fortnight".parse::<RangePreset>().is_err());
    }

    #[test]
    fn test_ytd_mid_june() {
        let range = resolve_range(RangePreset::Ytd, now(), None).unwrap();
        assert_eq!(range.start, Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()));
        assert_eq!(range.end, Some(end_of_june_15()));

        let keys: Vec<String> = range.buckets(None, None).into_iter().map(|b| b.key).collect();
        assert_eq!(
            keys,
            vec!["2025-01", "2025-02", "2025-03", "2025-04", "2025-05", "2025-06"]
        );
    }

    #[test]
    fn test_last7_and_month_presets() {
        let range = resolve_range(RangePreset::Last7, now(), None).unwrap();
        assert_eq!(range.start, Some(Utc.with_ymd_and_hms(2025, 6, 9, 0, 0, 0).unwrap()));

        let range = resolve_range(RangePreset::ThisMonth, now(), None).unwrap();
        assert_eq!(range.start, Some(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()));

        let range = resolve_range(RangePreset::SixMonths, now(), None).unwrap();
        assert_eq!(range.start, Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()));

        let range = resolve_range(RangePreset::TwelveMonths, now(), None).unwrap();
        assert_eq!(range.start, Some(Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap()));
        assert_eq!(range.buckets(None, None).len(), 12);
    }

    #[test]
    fn test_twelve_months_crosses_year_boundary() {
        let feb = Utc.with_ymd_and_hms(2025, 2, 3, 8, 0, 0).unwrap();
        let range = resolve_range(RangePreset::TwelveMonths, feb, None).unwrap();
        assert_eq!(range.start, Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_all_is_unbounded() {
        let range = resolve_range(RangePreset::All, now(), None).unwrap();
        assert!(range.is_unbounded());
        assert!(range.contains(None));
        assert!(range.contains(Some(Utc.with_ymd_and_hms(1999, 1, 1, 0, 0, 0).unwrap())));

        let earliest = Utc.with_ymd_and_hms(2024, 11, 20, 0, 0, 0).unwrap();
        let (first, last) = range.bucket_span(Some(earliest), Some(earliest));
        assert_eq!(first, MonthKey::new(2024, 11));
        assert_eq!(last, MonthKey::new(2025, 6));
        assert_eq!(
            range.bucket_span(None, None),
            (MonthKey::new(2025, 6), MonthKey::new(2025, 6))
        );

        let future = Utc.with_ymd_and_hms(2025, 8, 2, 0, 0, 0).unwrap();
        assert_eq!(range.bucket_span(Some(earliest), Some(future)).1, MonthKey::new(2025, 8));
    }

    #[test]
    fn test_custom_range() {
        let a = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let b = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();

        let range = resolve_range(RangePreset::Custom, now(), Some(CustomRange::new(a, b))).unwrap();
        assert_eq!(range.start, Some(Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap()));
        assert_eq!(
            range.end,
            Some(Utc.with_ymd_and_hms(2025, 3, 10, 23, 59, 59).unwrap() + Duration::milliseconds(999))
        );

        assert!(resolve_range(RangePreset::Custom, now(), None).is_err());
        let half = CustomRange {
            start: Some(a),
            end: None,
        };
        assert!(resolve_range(RangePreset::Custom, now(), Some(half)).is_err());
    }

    #[test]
    fn test_bounded_contains() {
        let range = resolve_range(RangePreset::ThisMonth, now(), None).unwrap();
        assert!(!range.contains(None));
        assert!(range.contains(Some(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap())));
        assert!(range.contains(Some(end_of_june_15())));
        assert!(!range.contains(Some(end_of_june_15() + Duration::milliseconds(1))));
        assert!(!range.contains(Some(Utc.with_ymd_and_hms(2025, 5, 31, 23, 59, 59).unwrap())));
    }

    #[test]
    fn test_month_buckets_count_and_rollover() {
        let cases = [
            (MonthKey::new(2024, 11), MonthKey::new(2025, 2), 4),
            (MonthKey::new(2025, 1), MonthKey::new(2025, 1), 1),
            (MonthKey::new(2022, 12), MonthKey::new(2025, 1), 26),
        ];
        for (start, end, expected) in cases {
            let buckets = month_buckets(start, end);
            assert_eq!(buckets.len() as i64, start.months_until(end) + 1);
            assert_eq!(buckets.len(), expected);

            let keys: HashSet<&str> = buckets.iter().map(|b| b.key.as_str()).collect();
            assert_eq!(keys.len(), buckets.len());
        }

        let buckets = month_buckets(MonthKey::new(2024, 12), MonthKey::new(2025, 1));
        assert_eq!(buckets[0].key, "2024-12");
        assert_eq!(buckets[0].label, "Dec 2024");
        assert_eq!(buckets[1].key, "2025-01");
        assert_eq!(buckets[1].label, "Jan 2025");
    }

    #[test]
    fn test_month_buckets_swaps_inverted() {
        let forward = month_buckets(MonthKey::new(2025, 1), MonthKey::new(2025, 3));
        let inverted = month_buckets(MonthKey::new(2025, 3), MonthKey::new(2025, 1));
        assert_eq!(forward, inverted);
    }
}
