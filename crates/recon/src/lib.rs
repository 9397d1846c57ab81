//! `ticketboard-recon` - period classification, category mapping and unit
//! reconciliation for traffic-enforcement reports.
//!
//! Pure engine crate: receives loaded grids, returns a comparison table and a
//! per-file diagnostic log. No CLI or file IO.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod header;
pub mod layout;
pub mod model;
pub mod normalize;
pub mod period;
pub mod pipeline;
pub mod reconcile;

pub use config::{PeriodMode, ReportConfig};
pub use diagnostics::{Diagnostic, DiagnosticLog, Level};
pub use error::ReconError;
pub use layout::build_report_sheet;
pub use model::{ColumnGroup, ComparisonTable, PeriodSlot, ReportOutcome, SlotSource};
pub use pipeline::{classify, run, SourceFile};
