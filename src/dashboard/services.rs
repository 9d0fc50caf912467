use crate::model::round2;
use crate::storage::{fetch, Order, Query, RecordStore, StoreError, Table};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Label used for anomalies without a service.
pub const UNSPECIFIED_SERVICE: &str = "unspecified";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceShare {
    pub service: String,
    pub count: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct ServiceRow {
    service: Option<String>,
}

/// Count anomalies per service, largest first.
///
/// Ties keep the order in which services were first seen.
pub fn distribute<I, S>(labels: I) -> Vec<ServiceShare>
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut shares: Vec<ServiceShare> = Vec::new();
    let mut total = 0u64;

    for label in labels {
        total += 1;
        let trimmed: Option<&str> = label.as_ref().map(|s| AsRef::<str>::as_ref(s).trim());
        let name = match trimmed {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => UNSPECIFIED_SERVICE.to_string(),
        };
        match index.get(&name) {
            Some(&i) => shares[i].count += 1,
            None => {
                index.insert(name.clone(), shares.len());
                shares.push(ServiceShare {
                    service: name,
                    count: 1,
                    percentage: 0.0,
                });
            }
        }
    }

    for share in &mut shares {
        share.percentage = round2(share.count as f64 / total as f64 * 100.0);
    }
    // stable: equal counts stay in first-seen order
    shares.sort_by(|a, b| b.count.cmp(&a.count));
    shares
}

/// Fetch every service label, oldest anomaly first.
pub async fn fetch_labels(store: &dyn RecordStore) -> Result<Vec<Option<String>>, StoreError> {
    let rows: Vec<ServiceRow> = fetch(
        store,
        Query::table(Table::Anomalies)
            .select(&["service"])
            .order_by("created_at", Order::Asc)
            .order_by("id", Order::Asc),
    )
    .await?;
    Ok(rows.into_iter().map(|r| r.service).collect())
}
