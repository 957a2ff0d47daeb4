//! Join-Aggregate Reconciler: rebuild shipment rows from two fragments.
//!
//! # Architecture
//!
//! ```text
//! routes (B)                    statuses (C)
//! ┌──────────────────────┐     ┌───────────────┐
//! │ 1, W1, S1, Widget    │     │ 1, true       │
//! │ 2, W1, S1, Widget    │ ⋈   │ 2, false      │   inner join on shipment_identifier
//! │ 3, W2, S1, Gear      │     │ 9, true       │
//! └──────────────────────┘     └───────────────┘
//!            │
//!            ▼  quantity = 1 per joined row, group by (origin, destination, product_name)
//! ┌────────────────────────────────────────────┐
//! │ W1, S1, Widget, quantity 2, on_time true,  │
//! │ driver "unknown"                           │
//! └────────────────────────────────────────────┘
//! ```
//!
//! Keys found on only one side are dropped. Within a group, `on_time` is the
//! value of the first joined row; it is not a vote. Summary rows come out in
//! ascending key order.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::{TransformError, TransformResult};
use crate::models::{
    decode_all, decode_row, require_columns, AggregationKey, RawRecord, ShipmentRecord,
    ShipmentRoute, ShipmentStatus, JOIN_KEY,
};
use crate::parser::{Row, TabularData};

/// Reconciler output plus what the join dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// One summary row per aggregation key
    pub records: Vec<ShipmentRecord>,
    /// Rows produced by the join, before grouping
    pub joined_rows: usize,
    /// Route rows whose key has no status
    pub unmatched_routes: usize,
    /// Status rows whose key has no route
    pub unmatched_statuses: usize,
}

/// Join, aggregate and back-fill the two fragments.
pub fn reconcile(routes: &TabularData, statuses: &TabularData) -> TransformResult<Vec<ShipmentRecord>> {
    reconcile_with_stats(routes, statuses).map(|r| r.records)
}

/// Same as [`reconcile`], also reporting join statistics.
///
/// Status rows are only decoded once their key matched a route, so a
/// dropped row never fails the run.
pub fn reconcile_with_stats(
    routes: &TabularData,
    statuses: &TabularData,
) -> TransformResult<Reconciliation> {
    require_join_key(routes, ShipmentRoute::DATASET)?;
    let status_key = require_join_key(statuses, ShipmentStatus::DATASET)?;
    require_columns::<ShipmentStatus>(statuses)?;

    let routes: Vec<ShipmentRoute> = decode_all(routes)?;
    let status_rows = index_by_key(statuses, status_key);

    let mut joined = 0usize;
    let mut unmatched_routes = 0usize;
    let mut groups: BTreeMap<AggregationKey, SummaryBuilder> = BTreeMap::new();

    // Inner join in route order, then status order per route.
    // Duplicate keys pair up many-to-many.
    for route in &routes {
        let Some(matches) = status_rows.get(route.shipment_identifier.as_str()) else {
            unmatched_routes += 1;
            continue;
        };

        for row in matches {
            let status: ShipmentStatus = decode_row(statuses, row)?;
            joined += 1;
            groups
                .entry(route.key())
                .or_insert_with(|| SummaryBuilder::new(status.on_time))
                .add_unit();
        }
    }

    let route_keys: HashSet<&str> = routes.iter().map(|r| r.shipment_identifier.as_str()).collect();
    let unmatched_statuses = status_rows
        .iter()
        .filter(|(key, _)| !route_keys.contains(*key))
        .map(|(_, rows)| rows.len())
        .sum();

    Ok(Reconciliation {
        joined_rows: joined,
        unmatched_routes,
        unmatched_statuses,
        records: groups.into_iter().map(|(key, b)| b.build(key)).collect(),
    })
}

/// Index of the join key column, or [`TransformError::MissingJoinKey`].
fn require_join_key(table: &TabularData, dataset: &str) -> TransformResult<usize> {
    table
        .column_index(JOIN_KEY)
        .ok_or_else(|| TransformError::MissingJoinKey {
            dataset: dataset.to_string(),
            key: JOIN_KEY.to_string(),
        })
}

/// Raw rows grouped by join key, input order kept within a key.
fn index_by_key(table: &TabularData, key: usize) -> HashMap<&str, Vec<&Row>> {
    let mut by_key: HashMap<&str, Vec<&Row>> = HashMap::new();
    for row in &table.rows {
        let value = row.cells.get(key).map(String::as_str).unwrap_or_default();
        by_key.entry(value).or_default().push(row);
    }
    by_key
}

/// Accumulates one aggregation group.
struct SummaryBuilder {
    quantity: u32,
    on_time: bool,
}

impl SummaryBuilder {
    fn new(on_time: bool) -> Self {
        Self { quantity: 0, on_time }
    }

    /// Every joined row stands for exactly one unit.
    fn add_unit(&mut self) {
        self.quantity = self.quantity.saturating_add(1);
    }

    fn build(self, key: AggregationKey) -> ShipmentRecord {
        ShipmentRecord::summary(key, self.quantity, self.on_time)
    }
}
