//! Monthly criticality chart.
//!
//! Anomalies are bucketed by creation month only. Without a year filter,
//! January 2024 and January 2025 land in the same bucket.

use crate::model::ScoreSet;
use crate::scoring::{criticality_of, CriticalityLevel, CriticalityPolicy};
use crate::storage::{fetch, Query, RecordStore, StoreError, Table};
use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};

pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Fév", "Mar", "Avr", "Mai", "Juin", "Juil", "Aoû", "Sep", "Oct", "Nov", "Déc",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthBucket {
    /// 1 = January.
    pub month: u32,
    pub label: &'static str,
    pub total: u64,
    pub low: u64,
    pub medium: u64,
    pub high: u64,
    pub critical: u64,
}

impl MonthBucket {
    fn empty(month: u32) -> Self {
        Self {
            month,
            label: MONTH_LABELS[(month - 1) as usize],
            total: 0,
            low: 0,
            medium: 0,
            high: 0,
            critical: 0,
        }
    }

    fn add(&mut self, level: CriticalityLevel) {
        self.total += 1;
        match level {
            CriticalityLevel::Low => self.low += 1,
            CriticalityLevel::Medium => self.medium += 1,
            CriticalityLevel::High => self.high += 1,
            CriticalityLevel::Critical => self.critical += 1,
        }
    }
}

/// Projection fetched for the chart.
#[derive(Debug, Clone, Deserialize)]
pub struct ChartRow {
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub scores: ScoreSet,
}

/// Twelve buckets, January first, zero-filled.
pub fn empty_buckets() -> Vec<MonthBucket> {
    (1..=12).map(MonthBucket::empty).collect()
}

/// Tally `rows` into the twelve month buckets.
pub fn bucketize(rows: &[ChartRow], policy: &CriticalityPolicy) -> Vec<MonthBucket> {
    let mut buckets = empty_buckets();
    for row in rows {
        let idx = row.created_at.month0() as usize;
        buckets[idx].add(criticality_of(&row.scores, policy));
    }
    buckets
}

/// Fetch the chart projection, optionally restricted to one calendar year.
///
/// A year outside the calendar chrono can represent holds no anomalies.
pub async fn fetch_rows(store: &dyn RecordStore, year: Option<i32>) -> Result<Vec<ChartRow>, StoreError> {
    let mut columns = vec!["created_at"];
    columns.extend(ScoreSet::COLUMNS);

    let mut query = Query::table(Table::Anomalies).select(&columns);
    if let Some(year) = year {
        let Some((start, end)) = year_bounds(year) else {
            return Ok(Vec::new());
        };
        query = query.gte("created_at", start).lt("created_at", end);
    }
    fetch(store, query).await
}

/// `[Jan 1 of year, Jan 1 of year + 1)`, if both instants exist.
fn year_bounds(year: i32) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = year_start(year)?;
    let end = year_start(year.checked_add(1)?)?;
    Some((start, end))
}

fn year_start(year: i32) -> Option<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Anomaly;
    use crate::storage::testing::{insert_anomalies, temp_store};

    fn row(ts: &str, sum_each: f64) -> ChartRow {
        ChartRow {
            created_at: DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc),
            scores: ScoreSet::system(sum_each, sum_each, sum_each),
        }
    }

    #[test]
    fn test_always_twelve_buckets() {
        let buckets = bucketize(&[], &CriticalityPolicy::default());
        assert_eq!(buckets.len(), 12);
        assert_eq!(buckets[0].label, "Jan");
        assert_eq!(buckets[11].label, "Déc");
        assert!(buckets.iter().all(|b| b.total == 0));
    }

    #[test]
    fn test_totals_sum_to_input_count() {
        let rows: Vec<ChartRow> = (0..37)
            .map(|i| {
                let month = (i % 12) + 1;
                row(&format!("2025-{month:02}-10T08:00:00Z"), (i % 5) as f64)
            })
            .collect();
        let buckets = bucketize(&rows, &CriticalityPolicy::default());
        assert_eq!(buckets.len(), 12);
        let sum: u64 = buckets.iter().map(|b| b.total).sum();
        assert_eq!(sum, 37);
        for b in &buckets {
            assert_eq!(b.total, b.low + b.medium + b.high + b.critical);
        }
    }

    #[test]
    fn test_levels_per_bucket() {
        let rows = vec![
            row("2025-03-01T00:00:00Z", 5.0),
            row("2025-03-15T00:00:00Z", 1.0),
            row("2025-03-31T23:59:59Z", 3.0),
        ];
        let buckets = bucketize(&rows, &CriticalityPolicy::default());
        let march = &buckets[2];
        assert_eq!(march.total, 3);
        assert_eq!(march.critical, 1);
        assert_eq!(march.high, 1);
        assert_eq!(march.low, 1);
    }

    #[test]
    fn test_different_years_merge_into_one_month() {
        let rows = vec![
            row("2024-01-10T00:00:00Z", 1.0),
            row("2025-01-10T00:00:00Z", 1.0),
        ];
        let buckets = bucketize(&rows, &CriticalityPolicy::default());
        assert_eq!(buckets[0].total, 2);
    }

    #[test]
    fn test_order_independent() {
        let mut rows = vec![
            row("2025-02-01T00:00:00Z", 4.0),
            row("2025-07-01T00:00:00Z", 1.0),
            row("2025-02-11T00:00:00Z", 2.0),
        ];
        let a = bucketize(&rows, &CriticalityPolicy::default());
        rows.reverse();
        let b = bucketize(&rows, &CriticalityPolicy::default());
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_year_filter_separates_years() {
        let (_dir, store) = temp_store();
        let mut old = Anomaly::new("P-1", ScoreSet::default());
        old.created_at = DateTime::parse_from_rfc3339("2024-01-10T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let mut new = Anomaly::new("P-2", ScoreSet::default());
        new.created_at = DateTime::parse_from_rfc3339("2025-01-10T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        insert_anomalies(&store, &[old, new]).await;

        let all = fetch_rows(&store, None).await.unwrap();
        assert_eq!(bucketize(&all, &CriticalityPolicy::default())[0].total, 2);

        let only_2025 = fetch_rows(&store, Some(2025)).await.unwrap();
        assert_eq!(only_2025.len(), 1);
        assert_eq!(bucketize(&only_2025, &CriticalityPolicy::default())[0].total, 1);
    }

    #[test]
    fn test_year_bounds_at_the_edges() {
        assert!(year_bounds(2025).is_some());
        assert!(year_bounds(300_000).is_none());
        assert!(year_bounds(i32::MAX).is_none());
        assert!(year_bounds(i32::MIN).is_none());
    }

    #[tokio::test]
    async fn test_unrepresentable_year_is_empty() {
        let (_dir, store) = temp_store();
        let mut a = Anomaly::new("P-1", ScoreSet::default());
        a.created_at = DateTime::parse_from_rfc3339("2025-03-10T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        insert_anomalies(&store, &[a]).await;

        assert!(fetch_rows(&store, Some(300_000)).await.unwrap().is_empty());
        assert!(fetch_rows(&store, Some(i32::MAX)).await.unwrap().is_empty());
        assert_eq!(fetch_rows(&store, Some(2025)).await.unwrap().len(), 1);
    }
}
