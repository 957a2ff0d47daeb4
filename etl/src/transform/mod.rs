//! Transformation module.
//!
//! - Mapper: self-contained rows renamed into the target schema
//! - Reconciler: route and status fragments joined and aggregated
//! - Pipeline: extract, transform and load orchestration

pub mod mapper;
pub mod pipeline;
pub mod reconciler;

pub use mapper::map_direct;
pub use pipeline::*;
pub use reconciler::{reconcile, reconcile_with_stats, Reconciliation};
