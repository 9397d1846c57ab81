//! `ticketboard-core` - shared data types.
//!
//! `RawGrid` is what the loader produces and the pipeline consumes;
//! `ReportSheet` is what the formatter produces and the exporters consume.

pub mod grid;
pub mod sheet;

pub use grid::RawGrid;
pub use sheet::{HeaderGroup, ReportRow, ReportSheet};
