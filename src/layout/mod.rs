//! # Layout Engine
//!
//! Turns validated task intervals into drawable bars for one calendar grid.
//!
//! ## Pipeline
//!
//! | Stage | Module | Output |
//! |-------|--------|--------|
//! | Lane assignment | [`lanes`] | one lane per interval, minimum lane count |
//! | Boundary splitting | [`split`] | contiguous segments per month/week/page |
//! | Geometry | [`geometry`] | [`TaskBar`](crate::domain::TaskBar) positions and sizes |
//! | Statistics | [`stats`] | overlap, efficiency and overflow reports |
//!
//! [`compute_layout`] runs the whole pipeline; [`cached_layout`] runs it
//! through a [`LayoutCache`](crate::storage::LayoutCache); [`run_batch`]
//! renders several views on a worker pool.
//!
//! Every stage is a pure function. Lanes are chosen once per interval, before
//! splitting, so all segments of a task share a lane, and statistics are
//! computed after placement and never fed back into it.

pub mod batch;
pub mod engine;
pub mod geometry;
pub mod lanes;
pub mod split;
pub mod stats;

pub use batch::{effective_workers, run_batch, BatchOutcome, BatchStatus, BatchView};
pub use engine::{cached_layout, compute_layout, layout_tasks, log_rejections, CachedLayout, LayoutOutcome};
pub use lanes::{assign_lanes, daily_load, max_concurrency, LaneAssignment, Placement};
pub use split::{split, Boundaries, BoundaryKind, Segment};
