//! Segment to pixel geometry
//!
//! `start_x` counts whole days from the window start plus one
//! `month_boundary_gap` for each month boundary passed. A final segment is
//! `max(1, end - start)` days wide; segments continued by another extend
//! through their last day so the pieces join up across a break. Milestones
//! have a fixed narrow width. No bar reaches past the days its interval
//! occupies in its lane, so bars sharing a lane never overlap.

use chrono::NaiveDate;

use super::split::Segment;
use crate::domain::{days_between, month_boundaries_between, ClipPolicy, GridConfig, LayoutError, TaskBar};

/// Milestone width as a fraction of a day
pub const MILESTONE_WIDTH_RATIO: f64 = 0.25;

/// Smallest width any bar is drawn with
pub const MIN_BAR_WIDTH: f64 = 1.0;

/// Milestone width, never wider than the day it occupies
pub fn milestone_width(grid: &GridConfig) -> f64 {
    (grid.day_width * MILESTONE_WIDTH_RATIO)
        .max(MIN_BAR_WIDTH)
        .min(grid.day_width)
}

/// Horizontal position of the left edge of `day`
pub fn x_of(day: NaiveDate, grid: &GridConfig) -> f64 {
    let days = days_between(grid.calendar_start, day) as f64;
    let gaps = month_boundaries_between(grid.calendar_start, day) as f64;
    days * grid.day_width + gaps * grid.month_boundary_gap
}

fn out_of_range(segment: &Segment<'_>) -> LayoutError {
    LayoutError::OutOfRange {
        task_id: segment.interval.id.clone(),
        start: segment.start,
        end: segment.end,
    }
}

/// Applies the grid's clip policy to a segment
///
/// Segments fully inside the window pass through unchanged. Under
/// [`ClipPolicy::Clip`] a partly visible segment is trimmed to the window and
/// loses its start/end cap on the trimmed side; under [`ClipPolicy::Drop`] it
/// is rejected. Invisible segments are always `OutOfRange`.
pub fn clip_segment<'a>(segment: Segment<'a>, grid: &GridConfig) -> Result<Segment<'a>, LayoutError> {
    if segment.end < grid.calendar_start || segment.start > grid.calendar_end {
        return Err(out_of_range(&segment));
    }
    if grid.contains(segment.start) && grid.contains(segment.end) {
        return Ok(segment);
    }
    if grid.clip_policy == ClipPolicy::Drop {
        return Err(out_of_range(&segment));
    }

    let mut clipped = segment;
    if clipped.start < grid.calendar_start {
        clipped.start = grid.calendar_start;
        clipped.is_start = false;
        clipped.is_continuation = true;
    }
    if clipped.end > grid.calendar_end {
        clipped.end = grid.calendar_end;
        clipped.is_end = false;
    }
    Ok(clipped)
}

/// Maps a segment on its lane to a drawable bar
pub fn map_segment(segment: &Segment<'_>, grid: &GridConfig) -> Result<TaskBar, LayoutError> {
    if segment.end < grid.calendar_start || segment.start > grid.calendar_end {
        return Err(out_of_range(segment));
    }

    let interval = segment.interval;
    let width = if interval.is_milestone {
        milestone_width(grid)
    } else if segment.is_end {
        days_between(segment.start, segment.end).max(1) as f64 * grid.day_width
    } else {
        (days_between(segment.start, segment.end) + 1) as f64 * grid.day_width
    };

    Ok(TaskBar {
        task_id: interval.id.clone(),
        lane: segment.lane,
        start: segment.start,
        end: segment.end,
        start_x: x_of(segment.start, grid),
        width,
        y: segment.lane as f64 * grid.lane_pitch(),
        height: grid.row_height,
        is_continuation: segment.is_continuation,
        is_start: segment.is_start,
        is_end: segment.is_end,
        crosses_month_boundary: segment.crosses_month_boundary,
        is_milestone: interval.is_milestone,
        overflow: segment.lane >= grid.max_lanes_per_day,
        category: interval.category.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskInterval;
    use crate::layout::split::{split, Boundaries};

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn grid() -> GridConfig {
        let mut grid = GridConfig::new(date(1, 1), date(3, 31));
        grid.day_width = 10.0;
        grid.row_height = 8.0;
        grid.lane_spacing = 2.0;
        grid.month_boundary_gap = 5.0;
        grid.max_lanes_per_day = 2;
        grid
    }

    fn whole(interval: &TaskInterval, lane: usize) -> Segment<'_> {
        Segment {
            interval,
            lane,
            start: interval.start,
            end: interval.end,
            is_start: true,
            is_end: true,
            is_continuation: false,
            crosses_month_boundary: false,
        }
    }

    #[test]
    fn maps_simple_bar() {
        let task = TaskInterval::new("A", date(1, 3), date(1, 7)).unwrap().with_category("LASER");
        let bar = map_segment(&whole(&task, 1), &grid()).unwrap();

        assert_eq!(bar.start_x, 20.0);
        assert_eq!(bar.width, 40.0);
        assert_eq!(bar.y, 10.0);
        assert_eq!(bar.height, 8.0);
        assert_eq!(bar.category, "LASER");
        assert!(!bar.overflow);
    }

    #[test]
    fn single_day_bar_has_one_day_width() {
        let task = TaskInterval::new("A", date(1, 3), date(1, 3)).unwrap();
        let bar = map_segment(&whole(&task, 0), &grid()).unwrap();
        assert_eq!(bar.width, 10.0);
    }

    #[test]
    fn milestone_has_fixed_width() {
        let task = TaskInterval::milestone("M", date(1, 3));
        let bar = map_segment(&whole(&task, 0), &grid()).unwrap();
        assert_eq!(bar.width, 2.5);
        assert!(bar.is_milestone);

        let mut narrow = grid();
        narrow.day_width = 2.0;
        assert_eq!(map_segment(&whole(&task, 0), &narrow).unwrap().width, MIN_BAR_WIDTH);

        narrow.day_width = 0.5;
        assert_eq!(map_segment(&whole(&task, 0), &narrow).unwrap().width, 0.5);
    }

    #[test]
    fn bar_ending_on_month_start_stops_before_the_gap() {
        let g = grid();
        let ending = TaskInterval::new("A", date(1, 25), date(2, 1)).unwrap();
        let starting = TaskInterval::new("B", date(2, 1), date(2, 5)).unwrap();
        let boundaries = Boundaries::for_grid(&g);

        let a: Vec<TaskBar> = split(&ending, 0, &boundaries)
            .iter()
            .map(|s| map_segment(s, &g).unwrap())
            .collect();
        let b = map_segment(&split(&starting, 0, &boundaries)[0], &g).unwrap();

        assert_eq!(a.len(), 1);
        assert_eq!(a[0].end_x(), x_of(date(2, 1), &g) - g.month_boundary_gap);
        assert!(a[0].end_x() <= b.start_x);
    }

    #[test]
    fn month_gap_shifts_later_months() {
        let g = grid();
        assert_eq!(x_of(date(1, 31), &g), 300.0);
        assert_eq!(x_of(date(2, 1), &g), 315.0);
        assert_eq!(x_of(date(3, 1), &g), 59.0 * 10.0 + 2.0 * 5.0);
    }

    #[test]
    fn split_segments_join_across_the_gap() {
        let g = grid();
        let task = TaskInterval::new("A", date(1, 28), date(2, 3)).unwrap();
        let segments = split(&task, 0, &Boundaries::for_grid(&g));
        let bars: Vec<TaskBar> = segments.iter().map(|s| map_segment(s, &g).unwrap()).collect();

        assert_eq!(bars.len(), 2);
        // First piece runs through Jan 31, second starts after the gap
        assert_eq!(bars[0].end_x(), x_of(date(2, 1), &g) - g.month_boundary_gap);
        assert_eq!(bars[1].start_x, x_of(date(2, 1), &g));
        assert_eq!(bars[0].width + bars[1].width, 60.0);
    }

    #[test]
    fn lanes_past_cap_overflow() {
        let task = TaskInterval::new("A", date(1, 3), date(1, 7)).unwrap();
        let bar = map_segment(&whole(&task, 2), &grid()).unwrap();
        assert!(bar.overflow);
    }

    #[test]
    fn segment_outside_window_is_out_of_range() {
        let task = TaskInterval::new("A", date(4, 3), date(4, 7)).unwrap();
        let err = map_segment(&whole(&task, 0), &grid()).unwrap_err();
        assert!(matches!(err, LayoutError::OutOfRange { .. }));
    }

    #[test]
    fn clip_trims_partially_visible_segment() {
        let mut g = grid();
        g.calendar_start = date(1, 10);
        let task = TaskInterval::new("A", date(1, 5), date(1, 12)).unwrap();

        let clipped = clip_segment(whole(&task, 0), &g).unwrap();

        assert_eq!(clipped.start, date(1, 10));
        assert!(!clipped.is_start);
        assert!(clipped.is_continuation);
        assert!(clipped.is_end);
        let bar = map_segment(&clipped, &g).unwrap();
        assert_eq!(bar.start_x, 0.0);
        assert_eq!(bar.width, 20.0);
    }

    #[test]
    fn clip_at_window_end_keeps_last_day() {
        let mut g = grid();
        g.calendar_end = date(1, 10);
        let task = TaskInterval::new("A", date(1, 8), date(1, 20)).unwrap();

        let clipped = clip_segment(whole(&task, 0), &g).unwrap();

        assert_eq!(clipped.end, date(1, 10));
        assert!(!clipped.is_end);
        assert_eq!(map_segment(&clipped, &g).unwrap().width, 30.0);
    }

    #[test]
    fn drop_policy_rejects_partial_segments() {
        let mut g = grid();
        g.calendar_start = date(1, 10);
        g.clip_policy = ClipPolicy::Drop;
        let task = TaskInterval::new("A", date(1, 5), date(1, 12)).unwrap();

        assert!(clip_segment(whole(&task, 0), &g).is_err());

        let inside = TaskInterval::new("B", date(1, 11), date(1, 12)).unwrap();
        assert!(clip_segment(whole(&inside, 0), &g).is_ok());
    }
}
