//! # Shipload - shipment ETL into SQLite
//!
//! Shipload reads three shipping extracts, reshapes them into one shipment
//! schema and appends the result to a SQLite table.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────────┐     ┌─────────────┐
//! │  CSV files  │────▶│   Parser    │────▶│    Transform     │────▶│   SQLite    │
//! │  (A, B, C)  │     │  (auto-enc) │     │ (map + reconcile)│     │ (shipments) │
//! └─────────────┘     └─────────────┘     └──────────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shipload::{populate, RunOptions};
//!
//! fn main() {
//!     let summary = populate(&RunOptions::default()).unwrap();
//!     println!("Inserted {} records", summary.total);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per layer
//! - [`models`] - Raw record sets and the shipment schema
//! - [`parser`] - CSV decoding with auto-detection
//! - [`source`] - Named tabular sources
//! - [`store`] - SQLite destination
//! - [`transform`] - Mapper, reconciler and pipeline
//! - [`logs`] - Progress logging

// Core modules
pub mod error;
pub mod models;

// Extract
pub mod parser;
pub mod source;

// Transform
pub mod transform;

// Load
pub mod store;

pub mod logs;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    LoadError, PipelineError, PipelineResult, StorageError, TransformError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    AggregationKey, SelfContainedShipment, ShipmentRecord, ShipmentRoute, ShipmentStatus,
    JOIN_KEY, SHIPMENT_COLUMNS, UNKNOWN_DRIVER,
};

// =============================================================================
// Re-exports - Extract / Load
// =============================================================================

pub use parser::{csv_to_table, parse_bytes_auto, CsvError, TabularData};
pub use source::{CsvLoader, InMemoryLoader, Loader};
pub use store::{Appender, ShipmentStore};

// =============================================================================
// Re-exports - Transform
// =============================================================================

pub use transform::{
    map_direct, populate, reconcile, reconcile_with_stats, run, Reconciliation, RunOptions,
    RunSummary, SourceNames,
};
