//! Dashboard aggregations over the admissions snapshot.
//!
//! Every KPI and chart series is a function of `(&Connection, &AdmissionFilter)`.
//! Filtering is pushed into parameterized SQL built from a fixed predicate set
//! (see `filter_sql`). Rows with bad timestamps, orphan keys or invalid waits
//! are never dropped silently: each aggregation either counts them as excluded
//! or flags them in the drill-down.

mod drilldown;
mod export;
mod filter_sql;
mod los;
mod occupancy;
mod quality;
mod summary;
mod types;
mod volume;
mod wait;

#[cfg(test)]
mod fixtures;

pub use drilldown::*;
pub use export::*;
pub use los::*;
pub use occupancy::*;
pub use quality::*;
pub use summary::*;
pub use types::*;
pub use volume::*;
pub use wait::*;
