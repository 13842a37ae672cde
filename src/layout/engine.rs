//! Layout pipeline
//!
//! intervals → lanes → segments → bars → statistics, optionally through the
//! [`LayoutCache`].

use std::sync::Arc;

use crate::domain::{
    normalize, DroppedSegment, GridConfig, LayoutError, LayoutResult, RawTask, Rejection,
    TaskInterval,
};
use crate::logging::Logger;
use crate::storage::{LayoutCache, LayoutKey};

use super::geometry::{clip_segment, map_segment};
use super::lanes::{assign_lanes, daily_load};
use super::split::{split, Boundaries};
use super::stats;

/// Lays out validated intervals on a grid
///
/// Intervals that occupy no day inside the calendar window are reported in
/// `dropped` and take no lane. A bar in a lane past `max_lanes_per_day` is
/// only flagged `overflow` when some day it covers holds more intervals than
/// the cap. Pure apart from debug logging.
pub fn compute_layout(
    intervals: &[TaskInterval],
    grid: &GridConfig,
    logger: &dyn Logger,
) -> Result<LayoutResult, LayoutError> {
    grid.validate()?;

    let mut dropped = Vec::new();
    let mut visible = Vec::with_capacity(intervals.len());
    for interval in intervals {
        if interval.occupies(grid.calendar_start, grid.calendar_end) {
            visible.push(interval.clone());
        } else {
            dropped.push(DroppedSegment {
                task_id: interval.id.clone(),
                error: LayoutError::OutOfRange {
                    task_id: interval.id.clone(),
                    start: interval.start,
                    end: interval.end,
                },
            });
        }
    }

    let assignment = assign_lanes(&visible, grid.lane_gap_days());
    let boundaries = Boundaries::for_grid(grid);
    let load = daily_load(&visible);

    let mut task_bars = Vec::with_capacity(visible.len());
    for placement in &assignment.placements {
        let interval = &visible[placement.index];
        for segment in split(interval, placement.lane, &boundaries) {
            match clip_segment(segment, grid).and_then(|segment| map_segment(&segment, grid)) {
                Ok(mut bar) => {
                    if bar.overflow {
                        bar.overflow = load
                            .range(bar.start..=bar.last_day())
                            .any(|(_, &count)| count > grid.max_lanes_per_day);
                    }
                    task_bars.push(bar);
                }
                Err(error) => dropped.push(DroppedSegment {
                    task_id: interval.id.clone(),
                    error,
                }),
            }
        }
    }

    let statistics = stats::collect(&visible, &task_bars, assignment.lane_count, grid);
    logger.debug(&format!(
        "laid out {} tasks in {} lanes ({} bars, {} dropped)",
        statistics.total_tasks,
        statistics.lane_count,
        task_bars.len(),
        dropped.len()
    ));

    Ok(LayoutResult {
        task_bars,
        statistics,
        dropped,
    })
}

/// A layout served through the cache
#[derive(Debug, Clone)]
pub struct CachedLayout {
    pub key: LayoutKey,
    pub result: Arc<LayoutResult>,
    /// False when this call ran the computation
    pub cache_hit: bool,
}

/// Returns the layout for `intervals` on `grid`, computing it at most once
pub fn cached_layout(
    intervals: &[TaskInterval],
    grid: &GridConfig,
    cache: &LayoutCache,
    logger: &dyn Logger,
) -> Result<CachedLayout, LayoutError> {
    let key = LayoutKey::compute(intervals, grid);
    let mut computed = false;
    let result = cache.get_or_compute(key, || {
        computed = true;
        compute_layout(intervals, grid, logger)
    })?;

    Ok(CachedLayout {
        key,
        result,
        cache_hit: !computed,
    })
}

/// Layout of a raw record batch, with the records that were not laid out
#[derive(Debug, Clone)]
pub struct LayoutOutcome {
    pub layout: CachedLayout,
    pub rejected: Vec<Rejection>,
    pub undated: Vec<RawTask>,
}

/// Logs why each rejected record was left out
pub fn log_rejections(rejected: &[Rejection], logger: &dyn Logger) {
    for rejection in rejected {
        logger.debug(&format!("skipping task: {}", rejection.error));
    }
}

/// Normalizes raw records and lays out the valid ones
///
/// Invalid records never fail the batch; they come back in `rejected`.
pub fn layout_tasks(
    raw: &[RawTask],
    grid: &GridConfig,
    cache: &LayoutCache,
    logger: &dyn Logger,
) -> Result<LayoutOutcome, LayoutError> {
    let normalized = normalize(raw);
    log_rejections(&normalized.rejected, logger);

    let layout = cached_layout(&normalized.intervals, grid, cache, logger)?;

    Ok(LayoutOutcome {
        layout,
        rejected: normalized.rejected,
        undated: normalized.undated,
    })
}
