//! Direct Mapper: self-contained rows straight into the target schema.
//!
//! ```text
//! origin_warehouse   → origin
//! destination_store  → destination
//! product            → product_name
//! product_quantity   → quantity
//! on_time            → on_time
//! driver_identifier  → driver_identifier
//! ```
//!
//! One output row per input row, same order. Other columns are dropped.

use crate::error::TransformResult;
use crate::models::{decode_all, SelfContainedShipment, ShipmentRecord};
use crate::parser::TabularData;

/// Rename and project the self-contained dataset.
pub fn map_direct(table: &TabularData) -> TransformResult<Vec<ShipmentRecord>> {
    let raw: Vec<SelfContainedShipment> = decode_all(table)?;
    Ok(raw.into_iter().map(ShipmentRecord::from).collect())
}
