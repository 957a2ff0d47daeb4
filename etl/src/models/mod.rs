//! Domain models for the shipload pipeline.
//!
//! - [`ShipmentRecord`] - Target schema row, shared by both transform paths
//! - [`AggregationKey`] - (origin, destination, product_name) grouping key
//! - [`SelfContainedShipment`] - Raw row of the self-contained dataset (A)
//! - [`ShipmentRoute`] - Raw row of the route fragment (B)
//! - [`ShipmentStatus`] - Raw row of the status fragment (C)
//!
//! Raw rows are decoded from a [`TabularData`] through [`RawRecord`], which
//! checks the header for every required column before touching any cell.

use serde::{Deserialize, Serialize};

use crate::error::{TransformError, TransformResult};
use crate::parser::{Row, TabularData};

/// Column that links a route fragment to its status fragment.
pub const JOIN_KEY: &str = "shipment_identifier";

/// Placeholder driver for rows rebuilt from the fragmented sources.
pub const UNKNOWN_DRIVER: &str = "unknown";

// =============================================================================
// Target Schema
// =============================================================================

/// Destination column order. Every path emits fields in this order.
pub const SHIPMENT_COLUMNS: [&str; 6] = [
    "origin",
    "destination",
    "product_name",
    "quantity",
    "on_time",
    "driver_identifier",
];

/// One normalized shipment row as persisted in the destination table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentRecord {
    pub origin: String,
    pub destination: String,
    pub product_name: String,
    pub quantity: u32,
    pub on_time: bool,
    pub driver_identifier: String,
}

impl ShipmentRecord {
    /// Summary row for one aggregation group. The driver is not derivable
    /// from the fragments and is always [`UNKNOWN_DRIVER`].
    pub fn summary(key: AggregationKey, quantity: u32, on_time: bool) -> Self {
        Self {
            origin: key.origin,
            destination: key.destination,
            product_name: key.product_name,
            quantity,
            on_time,
            driver_identifier: UNKNOWN_DRIVER.to_string(),
        }
    }
}

/// Composite key identifying one reconciled summary row.
///
/// Ordering is lexicographic on origin, destination, then product name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AggregationKey {
    pub origin: String,
    pub destination: String,
    pub product_name: String,
}

// =============================================================================
// Raw Record Sets
// =============================================================================

/// A row type decodable from a loaded table.
pub trait RawRecord: Sized {
    /// Dataset name used in error messages.
    const DATASET: &'static str;

    /// Columns that must be present in the header.
    const REQUIRED: &'static [&'static str];

    /// Decode one row. Required columns are known to exist.
    fn from_row(row: &RowReader<'_>) -> TransformResult<Self>;
}

/// Decode every row of `table` as `R`.
///
/// Fails with [`TransformError::SchemaMismatch`] listing all absent
/// required columns; extra columns are ignored.
pub fn decode_all<R: RawRecord>(table: &TabularData) -> TransformResult<Vec<R>> {
    require_columns::<R>(table)?;

    table
        .rows
        .iter()
        .map(|row| decode_row(table, row))
        .collect()
}

/// Check the header of `table` for every column `R` requires.
pub fn require_columns<R: RawRecord>(table: &TabularData) -> TransformResult<()> {
    let missing = table.missing_columns(R::REQUIRED);
    if !missing.is_empty() {
        return Err(TransformError::SchemaMismatch {
            dataset: R::DATASET.to_string(),
            missing,
        });
    }
    Ok(())
}

/// Decode a single row of `table`, once its header has been checked.
pub fn decode_row<R: RawRecord>(table: &TabularData, row: &Row) -> TransformResult<R> {
    R::from_row(&RowReader {
        dataset: R::DATASET,
        headers: &table.headers,
        row,
    })
}

/// Typed access to the cells of one row.
pub struct RowReader<'a> {
    dataset: &'static str,
    headers: &'a [String],
    row: &'a Row,
}

impl<'a> RowReader<'a> {
    /// Raw cell text.
    pub fn text(&self, column: &str) -> TransformResult<String> {
        self.cell(column).map(str::to_string)
    }

    /// Cell parsed as an unsigned integer.
    pub fn unsigned(&self, column: &str) -> TransformResult<u32> {
        let raw = self.cell(column)?;
        raw.parse::<u32>()
            .map_err(|_| self.invalid(column, raw, "a non-negative integer"))
    }

    /// Cell parsed as a boolean flag.
    pub fn flag(&self, column: &str) -> TransformResult<bool> {
        let raw = self.cell(column)?;
        parse_flag(raw).ok_or_else(|| self.invalid(column, raw, "a boolean"))
    }

    fn cell(&self, column: &str) -> TransformResult<&'a str> {
        self.headers
            .iter()
            .position(|h| h == column)
            .and_then(|i| self.row.cells.get(i))
            .map(String::as_str)
            .ok_or_else(|| TransformError::SchemaMismatch {
                dataset: self.dataset.to_string(),
                missing: vec![column.to_string()],
            })
    }

    fn invalid(&self, column: &str, value: &str, expected: &'static str) -> TransformError {
        TransformError::InvalidValue {
            dataset: self.dataset.to_string(),
            line: self.row.line,
            column: column.to_string(),
            value: value.to_string(),
            expected,
        }
    }
}

/// Parse the boolean spellings found in spreadsheet exports.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

/// Row of the self-contained dataset: one complete shipment fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfContainedShipment {
    pub origin_warehouse: String,
    pub destination_store: String,
    pub product: String,
    pub product_quantity: u32,
    pub on_time: bool,
    pub driver_identifier: String,
}

impl RawRecord for SelfContainedShipment {
    const DATASET: &'static str = "self-contained";
    const REQUIRED: &'static [&'static str] = &[
        "origin_warehouse",
        "destination_store",
        "product",
        "product_quantity",
        "on_time",
        "driver_identifier",
    ];

    fn from_row(row: &RowReader<'_>) -> TransformResult<Self> {
        Ok(Self {
            origin_warehouse: row.text("origin_warehouse")?,
            destination_store: row.text("destination_store")?,
            product: row.text("product")?,
            product_quantity: row.unsigned("product_quantity")?,
            on_time: row.flag("on_time")?,
            driver_identifier: row.text("driver_identifier")?,
        })
    }
}

impl From<SelfContainedShipment> for ShipmentRecord {
    fn from(raw: SelfContainedShipment) -> Self {
        Self {
            origin: raw.origin_warehouse,
            destination: raw.destination_store,
            product_name: raw.product,
            quantity: raw.product_quantity,
            on_time: raw.on_time,
            driver_identifier: raw.driver_identifier,
        }
    }
}

/// Route fragment: where a shipment went and what it carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipmentRoute {
    pub shipment_identifier: String,
    pub origin_warehouse: String,
    pub destination_store: String,
    pub product: String,
}

impl ShipmentRoute {
    /// Renamed grouping key for this route.
    pub fn key(&self) -> AggregationKey {
        AggregationKey {
            origin: self.origin_warehouse.clone(),
            destination: self.destination_store.clone(),
            product_name: self.product.clone(),
        }
    }
}

impl RawRecord for ShipmentRoute {
    const DATASET: &'static str = "routes";
    const REQUIRED: &'static [&'static str] = &[
        JOIN_KEY,
        "origin_warehouse",
        "destination_store",
        "product",
    ];

    fn from_row(row: &RowReader<'_>) -> TransformResult<Self> {
        Ok(Self {
            shipment_identifier: row.text(JOIN_KEY)?,
            origin_warehouse: row.text("origin_warehouse")?,
            destination_store: row.text("destination_store")?,
            product: row.text("product")?,
        })
    }
}

/// Status fragment: whether a shipment arrived on time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipmentStatus {
    pub shipment_identifier: String,
    pub on_time: bool,
}

impl RawRecord for ShipmentStatus {
    const DATASET: &'static str = "statuses";
    const REQUIRED: &'static [&'static str] = &[JOIN_KEY, "on_time"];

    fn from_row(row: &RowReader<'_>) -> TransformResult<Self> {
        Ok(Self {
            shipment_identifier: row.text(JOIN_KEY)?,
            on_time: row.flag("on_time")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_self_contained() {
        let table = TabularData::from_rows(
            &[
                "origin_warehouse",
                "destination_store",
                "product",
                "on_time",
                "product_quantity",
                "driver_identifier",
            ],
            &[&["W2", "S2", "Gadget", "False", "5", "D9"]],
        );

        let rows: Vec<SelfContainedShipment> = decode_all(&table).unwrap();
        assert_eq!(
            rows,
            vec![SelfContainedShipment {
                origin_warehouse: "W2".into(),
                destination_store: "S2".into(),
                product: "Gadget".into(),
                product_quantity: 5,
                on_time: false,
                driver_identifier: "D9".into(),
            }]
        );
    }

    #[test]
    fn test_schema_mismatch_lists_all_missing() {
        let table = TabularData::from_rows(&["origin_warehouse", "product"], &[]);

        let err = decode_all::<SelfContainedShipment>(&table).unwrap_err();
        assert_eq!(
            err,
            TransformError::SchemaMismatch {
                dataset: "self-contained".into(),
                missing: vec![
                    "destination_store".into(),
                    "product_quantity".into(),
                    "on_time".into(),
                    "driver_identifier".into(),
                ],
            }
        );
    }

    #[test]
    fn test_invalid_quantity_reports_line() {
        let table = TabularData::from_rows(
            &["shipment_identifier", "on_time"],
            &[&["1", "true"], &["2", "late"]],
        );

        let err = decode_all::<ShipmentStatus>(&table).unwrap_err();
        match err {
            TransformError::InvalidValue { line, column, value, .. } => {
                assert_eq!(line, 3);
                assert_eq!(column, "on_time");
                assert_eq!(value, "late");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_flag_spellings() {
        assert_eq!(parse_flag("True"), Some(true));
        assert_eq!(parse_flag("FALSE"), Some(false));
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag(" no "), Some(false));
        assert_eq!(parse_flag(""), None);
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_negative_quantity_rejected() {
        let table = TabularData::from_rows(
            &[
                "origin_warehouse",
                "destination_store",
                "product",
                "product_quantity",
                "on_time",
                "driver_identifier",
            ],
            &[&["W1", "S1", "Widget", "-2", "true", "D1"]],
        );

        let err = decode_all::<SelfContainedShipment>(&table).unwrap_err();
        assert!(matches!(err, TransformError::InvalidValue { expected: "a non-negative integer", .. }));
    }

    #[test]
    fn test_summary_backfills_driver() {
        let route = ShipmentRoute {
            shipment_identifier: "7".into(),
            origin_warehouse: "W1".into(),
            destination_store: "S1".into(),
            product: "Widget".into(),
        };

        let record = ShipmentRecord::summary(route.key(), 3, true);
        assert_eq!(record.driver_identifier, UNKNOWN_DRIVER);
        assert_eq!(record.origin, "W1");
        assert_eq!(record.product_name, "Widget");
        assert_eq!(record.quantity, 3);
    }

    #[test]
    fn test_aggregation_key_order() {
        let key = |o: &str, d: &str, p: &str| AggregationKey {
            origin: o.into(),
            destination: d.into(),
            product_name: p.into(),
        };

        assert!(key("W1", "S2", "A") < key("W2", "S1", "A"));
        assert!(key("W1", "S1", "B") < key("W1", "S2", "A"));
    }
}
