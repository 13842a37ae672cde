//! Layout output types
//!
//! A [`LayoutResult`] is built once per (task set, grid) and never mutated
//! afterwards; the cache hands out shared references to it.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::LayoutError;

/// One drawable bar segment
///
/// A task split at a month, week or page boundary yields several bars with
/// the same `task_id` and `lane`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskBar {
    pub task_id: String,
    pub lane: usize,
    /// First day drawn by this segment
    pub start: NaiveDate,
    /// Last date of this segment; for a task's final segment this is its
    /// trailing edge
    pub end: NaiveDate,
    pub start_x: f64,
    pub width: f64,
    pub y: f64,
    pub height: f64,
    pub is_continuation: bool,
    pub is_start: bool,
    pub is_end: bool,
    pub crosses_month_boundary: bool,
    pub is_milestone: bool,
    /// Lane is beyond the grid's `max_lanes_per_day` on a day that holds
    /// more tasks than that
    pub overflow: bool,
    /// Opaque style id passed through to the render adapter
    pub category: String,
}

impl TaskBar {
    pub fn end_x(&self) -> f64 {
        self.start_x + self.width
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Last day the bar is drawn over
    ///
    /// A final segment longer than a day stops at its end date's left edge;
    /// other segments cover their end date.
    pub fn last_day(&self) -> NaiveDate {
        if self.is_end && self.end > self.start {
            self.end.pred_opt().unwrap_or(self.end)
        } else {
            self.end
        }
    }
}

/// How two overlapping tasks relate in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapKind {
    /// Same start and end
    Identical,
    /// One task lies entirely within the other
    Nested,
    Partial,
}

/// Reported severity of an overlap, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl OverlapSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverlapSeverity::Low => "low",
            OverlapSeverity::Medium => "medium",
            OverlapSeverity::High => "high",
            OverlapSeverity::Critical => "critical",
        }
    }
}

/// A pair of tasks whose occupied days intersect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapReport {
    pub first: String,
    pub second: String,
    pub kind: OverlapKind,
    pub severity: OverlapSeverity,
    pub overlap_days: i64,
    /// Overlap days divided by the shorter task's duration
    pub ratio: f64,
}

/// A connected set of mutually reachable overlapping tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapGroup {
    pub task_ids: Vec<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub max_severity: OverlapSeverity,
}

/// Descriptive metrics about a layout
///
/// Computed after placement and never consulted by it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LayoutStatistics {
    pub lane_count: usize,
    pub total_tasks: usize,
    pub total_bars: usize,
    /// Pairs whose overlap ratio exceeds the grid's threshold
    pub overlap_count: usize,
    pub space_efficiency: f64,
    /// Bars placed beyond `max_lanes_per_day`
    pub overflow_count: usize,
    /// Hidden bars per visible day, for "+N more" markers
    pub overflow_by_day: BTreeMap<NaiveDate, usize>,
    pub overlaps: Vec<OverlapReport>,
    pub groups: Vec<OverlapGroup>,
}

/// A segment that could not be placed on the grid
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedSegment {
    pub task_id: String,
    pub error: LayoutError,
}

/// Complete layout for one task set on one grid
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutResult {
    /// Bars in processing order
    pub task_bars: Vec<TaskBar>,
    pub statistics: LayoutStatistics,
    pub dropped: Vec<DroppedSegment>,
}

impl LayoutResult {
    /// Returns all bars drawn for one task
    pub fn bars_for<'a>(&'a self, task_id: &'a str) -> impl Iterator<Item = &'a TaskBar> + 'a {
        self.task_bars.iter().filter(move |bar| bar.task_id == task_id)
    }

    /// Returns the lane of a task, if any of its bars were placed
    pub fn lane_of(&self, task_id: &str) -> Option<usize> {
        self.bars_for(task_id).next().map(|bar| bar.lane)
    }
}
