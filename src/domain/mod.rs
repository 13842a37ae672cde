//! Domain models for calplan
//!
//! Contains the layout data model without any I/O concerns.

mod error;
mod grid;
mod interval;
mod layout;

pub use error::LayoutError;
pub use grid::{days_between, month_boundaries_between, month_end, month_start, ClipPolicy, GridConfig};
pub use interval::{normalize, parse_date, Normalized, RawTask, Rejection, TaskInterval, DATE_FORMATS};
pub use layout::{
    DroppedSegment, LayoutResult, LayoutStatistics, OverlapGroup, OverlapKind, OverlapReport,
    OverlapSeverity, TaskBar,
};
