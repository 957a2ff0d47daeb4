//! Run orchestration: extract, transform, load.
//!
//! ```text
//! shipping_data_0.csv ──▶ Direct Mapper ───────────────┐
//!                                                       ├──▶ append ──▶ shipments
//! shipping_data_1.csv ─┐                                │   (mapper first, reconciler second)
//!                      ├──▶ Join-Aggregate Reconciler ──┘
//! shipping_data_2.csv ─┘
//! ```
//!
//! All three sources are loaded before anything is written. Each append
//! commits on its own: if the reconciler stage fails, the direct rows that
//! were already appended stay, and the error says how many.
//!
//! # Example
//!
//! ```rust,ignore
//! use shipload::{populate, RunOptions};
//!
//! let summary = populate(&RunOptions::default())?;
//! println!("Inserted {} records", summary.total);
//! ```

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::mapper::map_direct;
use super::reconciler::reconcile_with_stats;
use crate::error::{PipelineError, PipelineResult};
use crate::logs::{log_info, log_info_indent, log_success, log_success_indent, log_warning};
use crate::parser::TabularData;
use crate::source::{CsvLoader, Loader};
use crate::store::{Appender, ShipmentStore};

/// Identifiers of the three input sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceNames {
    /// Complete shipment facts
    pub self_contained: String,
    /// Route fragment (origin, destination, product)
    pub routes: String,
    /// Status fragment (on_time)
    pub statuses: String,
}

impl Default for SourceNames {
    fn default() -> Self {
        Self {
            self_contained: "shipping_data_0.csv".to_string(),
            routes: "shipping_data_1.csv".to_string(),
            statuses: "shipping_data_2.csv".to_string(),
        }
    }
}

/// Options for a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOptions {
    /// Directory source identifiers are resolved against
    pub data_dir: PathBuf,

    /// SQLite database file
    pub database: PathBuf,

    /// Destination table
    pub table: String,

    #[serde(default)]
    pub sources: SourceNames,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            database: PathBuf::from("shipment_database.db"),
            table: "shipments".to_string(),
            sources: SourceNames::default(),
        }
    }
}

/// Rows read from each source
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceCounts {
    pub self_contained: usize,
    pub routes: usize,
    pub statuses: usize,
}

/// What a successful run did
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub table: String,
    pub rows_read: SourceCounts,
    /// Rows appended by the Direct Mapper
    pub direct_count: usize,
    /// Rows produced by the join before grouping
    pub joined_rows: usize,
    pub unmatched_routes: usize,
    pub unmatched_statuses: usize,
    /// Rows appended by the Reconciler
    pub aggregated_count: usize,
    pub total: usize,
}

/// The three loaded sources.
#[derive(Debug, Clone)]
pub struct Extracted {
    pub self_contained: TabularData,
    pub routes: TabularData,
    pub statuses: TabularData,
}

/// Load every source. Nothing is written if any of them fails.
pub fn extract<L: Loader + ?Sized>(loader: &L, sources: &SourceNames) -> PipelineResult<Extracted> {
    log_info("📁 Reading source files...");

    let self_contained = loader.load(&sources.self_contained)?;
    log_info_indent(format!("{}: {} records", sources.self_contained, self_contained.len()), 1);
    let routes = loader.load(&sources.routes)?;
    log_info_indent(format!("{}: {} records", sources.routes, routes.len()), 1);
    let statuses = loader.load(&sources.statuses)?;
    log_info_indent(format!("{}: {} records", sources.statuses, statuses.len()), 1);

    Ok(Extracted { self_contained, routes, statuses })
}

/// Transform the extracted sources and append both outputs to `table`.
pub fn transform_and_load<A: Appender + ?Sized>(
    extracted: &Extracted,
    store: &mut A,
    table: &str,
) -> PipelineResult<RunSummary> {
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();

    // Direct path: a failure here leaves the destination untouched
    log_info("🔄 Processing self-contained dataset...");
    let direct = map_direct(&extracted.self_contained)?;
    let direct_count = store.append(table, &direct)?;
    log_success_indent(format!("Inserted {} records from the self-contained dataset", direct_count), 1);

    // Reconciled path: the direct rows are already committed
    let partial = |e: PipelineError| {
        if direct_count > 0 {
            PipelineError::PartiallyPersisted { persisted: direct_count, source: Box::new(e) }
        } else {
            e
        }
    };

    log_info("🔄 Merging route and status fragments...");
    let reconciliation = reconcile_with_stats(&extracted.routes, &extracted.statuses)
        .map_err(|e| partial(e.into()))?;
    log_success_indent(format!("Merged data: {} records", reconciliation.joined_rows), 1);
    if reconciliation.unmatched_routes > 0 {
        log_warning(format!(
            "{} route record(s) had no matching status and were dropped",
            reconciliation.unmatched_routes
        ));
    }
    if reconciliation.unmatched_statuses > 0 {
        log_warning(format!(
            "{} status record(s) had no matching route and were dropped",
            reconciliation.unmatched_statuses
        ));
    }
    log_success_indent(format!("Aggregated data: {} unique shipments", reconciliation.records.len()), 1);

    log_info("💾 Inserting aggregated data...");
    let aggregated_count = store
        .append(table, &reconciliation.records)
        .map_err(|e| partial(e.into()))?;
    log_success_indent(format!("Inserted {} aggregated records", aggregated_count), 1);

    Ok(RunSummary {
        run_id,
        started_at,
        finished_at: Utc::now(),
        table: table.to_string(),
        rows_read: SourceCounts {
            self_contained: extracted.self_contained.len(),
            routes: extracted.routes.len(),
            statuses: extracted.statuses.len(),
        },
        direct_count,
        joined_rows: reconciliation.joined_rows,
        unmatched_routes: reconciliation.unmatched_routes,
        unmatched_statuses: reconciliation.unmatched_statuses,
        aggregated_count,
        total: direct_count + aggregated_count,
    })
}

/// Extract with `loader`, then transform and append into `store`.
pub fn run<L, A>(loader: &L, store: &mut A, options: &RunOptions) -> PipelineResult<RunSummary>
where
    L: Loader + ?Sized,
    A: Appender + ?Sized,
{
    let extracted = extract(loader, &options.sources)?;
    transform_and_load(&extracted, store, &options.table)
}

/// Full run against CSV files and a SQLite database, as configured.
///
/// The database session is opened only after every source loaded, and is
/// released on every exit path.
pub fn populate(options: &RunOptions) -> PipelineResult<RunSummary> {
    let loader = CsvLoader::new(&options.data_dir);
    let extracted = extract(&loader, &options.sources)?;

    log_info(format!("🔗 Connecting to {}...", options.database.display()));
    let mut store = ShipmentStore::open(&options.database)?;

    let summary = transform_and_load(&extracted, &mut store, &options.table)?;

    log_info("🔒 Closing database connection...");
    store.close()?;

    log_success(format!(
        "Database populated with {} total records ({} direct, {} aggregated)",
        summary.total, summary.direct_count, summary.aggregated_count
    ));
    Ok(summary)
}
