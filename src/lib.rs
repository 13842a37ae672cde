//! calplan - calendar task-bar layout engine
//!
//! Places dated tasks on a calendar grid as horizontal bars: each task gets a
//! lane (the minimum number of lanes for the task set), bars are split at
//! month, week and page boundaries, and positions are computed in abstract
//! render units. Layouts are cached by content hash with single-flight
//! computation so several views can be rendered in parallel.

pub mod cli;
pub mod domain;
pub mod layout;
pub mod logging;
pub mod storage;

pub use domain::{normalize, GridConfig, LayoutError, LayoutResult, RawTask, TaskBar, TaskInterval};
pub use layout::{cached_layout, compute_layout, layout_tasks};
pub use logging::{Logger, NullLogger, SharedLogger, TracingLogger};
pub use storage::{LayoutCache, LayoutKey};
