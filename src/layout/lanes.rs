//! Lane assignment
//!
//! Greedy interval-graph colouring: intervals are visited by start date and
//! each one takes the lowest-numbered free lane, or opens a new lane when
//! every lane is still busy. For interval graphs this uses exactly as many
//! lanes as the largest number of intervals active on one day, which is the
//! minimum possible. Taking the lowest free lane also means an interval only
//! lands in lane `n` when `n` other intervals are still active on its first
//! day.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap};

use chrono::{Duration, NaiveDate};

use crate::domain::TaskInterval;

/// Lane chosen for one input interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Index into the input slice
    pub index: usize,
    pub lane: usize,
}

/// Result of [`assign_lanes`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaneAssignment {
    /// Placements in processing order
    pub placements: Vec<Placement>,
    pub lane_count: usize,
}

impl LaneAssignment {
    /// Lanes indexed like the input slice
    pub fn lanes_by_index(&self) -> Vec<usize> {
        let mut lanes = vec![0; self.placements.len()];
        for placement in &self.placements {
            lanes[placement.index] = placement.lane;
        }
        lanes
    }
}

/// Deterministic processing order: start ascending, longer first, higher
/// priority first, then id
fn compare(a: &TaskInterval, b: &TaskInterval) -> Ordering {
    a.start
        .cmp(&b.start)
        .then_with(|| b.occupied_days().cmp(&a.occupied_days()))
        .then_with(|| b.priority.cmp(&a.priority))
        .then_with(|| a.id.cmp(&b.id))
}

/// Returns input indices in the order the assigner visits them
pub fn processing_order(intervals: &[TaskInterval]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..intervals.len()).collect();
    order.sort_by(|&a, &b| compare(&intervals[a], &intervals[b]));
    order
}

fn free_at(interval: &TaskInterval, gap_days: i64) -> NaiveDate {
    interval.occupied_end() + Duration::days(gap_days.max(0))
}

/// Assigns every interval a lane so that no two intervals in a lane overlap
///
/// `gap_days` is extra clearance required after an interval before its lane
/// can be reused.
pub fn assign_lanes(intervals: &[TaskInterval], gap_days: i64) -> LaneAssignment {
    // Busy lanes keyed by the day they free up, and lanes free right now
    let mut busy: BinaryHeap<Reverse<(NaiveDate, usize)>> = BinaryHeap::new();
    let mut idle: BinaryHeap<Reverse<usize>> = BinaryHeap::new();
    let mut placements = Vec::with_capacity(intervals.len());
    let mut lane_count = 0;

    for index in processing_order(intervals) {
        let interval = &intervals[index];

        while let Some(&Reverse((day, lane))) = busy.peek() {
            if day > interval.start {
                break;
            }
            busy.pop();
            idle.push(Reverse(lane));
        }

        let lane = match idle.pop() {
            Some(Reverse(lane)) => lane,
            None => {
                lane_count += 1;
                lane_count - 1
            }
        };

        busy.push(Reverse((free_at(interval, gap_days), lane)));
        placements.push(Placement { index, lane });
    }

    LaneAssignment {
        placements,
        lane_count,
    }
}

/// Number of intervals occupying each day, for days with at least one
pub fn daily_load(intervals: &[TaskInterval]) -> BTreeMap<NaiveDate, usize> {
    let mut load = BTreeMap::new();
    for interval in intervals {
        let mut day = interval.start;
        while day < interval.occupied_end() {
            *load.entry(day).or_insert(0) += 1;
            day += Duration::days(1);
        }
    }
    load
}

/// Largest number of intervals occupying the same day, by sweep
pub fn max_concurrency(intervals: &[TaskInterval], gap_days: i64) -> usize {
    // (day, delta): releases sort before claims on the same day
    let mut events: Vec<(NaiveDate, i32)> = Vec::with_capacity(intervals.len() * 2);
    for interval in intervals {
        events.push((interval.start, 1));
        events.push((free_at(interval, gap_days), -1));
    }
    events.sort();

    let mut active = 0i32;
    let mut peak = 0i32;
    for (_, delta) in events {
        active += delta;
        peak = peak.max(active);
    }
    peak as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn day(d: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap() + Duration::days(d)
    }

    fn span(id: &str, start: i64, end: i64) -> TaskInterval {
        TaskInterval::new(id, day(start), day(end)).unwrap()
    }

    fn lane_of(intervals: &[TaskInterval], result: &LaneAssignment, id: &str) -> usize {
        let lanes = result.lanes_by_index();
        let index = intervals.iter().position(|i| i.id == id).unwrap();
        lanes[index]
    }

    #[test]
    fn three_mutually_overlapping_tasks_need_three_lanes() {
        let intervals = vec![span("A", 1, 5), span("B", 2, 6), span("C", 4, 8)];

        let result = assign_lanes(&intervals, 0);

        assert_eq!(result.lane_count, 3);
        assert_eq!(lane_of(&intervals, &result, "A"), 0);
        assert_eq!(lane_of(&intervals, &result, "B"), 1);
        assert_eq!(lane_of(&intervals, &result, "C"), 2);
    }

    #[test]
    fn touching_tasks_share_a_lane() {
        let intervals = vec![span("A", 1, 5), span("B", 5, 9)];

        let result = assign_lanes(&intervals, 0);

        assert_eq!(result.lane_count, 1);
        assert_eq!(lane_of(&intervals, &result, "B"), 0);
    }

    #[test]
    fn gap_days_keep_touching_tasks_apart() {
        let intervals = vec![span("A", 1, 5), span("B", 5, 9), span("C", 7, 9)];

        let result = assign_lanes(&intervals, 1);

        assert_eq!(result.lane_count, 2);
        assert_eq!(lane_of(&intervals, &result, "B"), 1);
        // A frees lane 0 on day 6, so C can take it
        assert_eq!(lane_of(&intervals, &result, "C"), 0);
    }

    #[test]
    fn milestones_take_a_lane_for_their_day() {
        let a = span("A", 1, 5);
        let m1 = TaskInterval::milestone("M1", day(5));
        let m2 = TaskInterval::milestone("M2", day(5));

        let intervals = vec![a, m1, m2];
        let result = assign_lanes(&intervals, 0);

        assert_eq!(result.lane_count, 2);
        assert_ne!(
            lane_of(&intervals, &result, "M1"),
            lane_of(&intervals, &result, "M2")
        );
    }

    #[test]
    fn ties_break_by_duration_priority_then_id() {
        let intervals = vec![
            span("b", 1, 3),
            span("a", 1, 3),
            span("long", 1, 9),
            span("c", 1, 3).with_priority(5),
        ];

        let order: Vec<&str> = processing_order(&intervals)
            .into_iter()
            .map(|i| intervals[i].id.as_str())
            .collect();

        assert_eq!(order, vec!["long", "c", "a", "b"]);
    }

    #[test]
    fn reuses_a_freed_lane() {
        let intervals = vec![span("A", 0, 10), span("B", 0, 3), span("C", 4, 6)];

        let result = assign_lanes(&intervals, 0);

        assert_eq!(result.lane_count, 2);
        assert_eq!(lane_of(&intervals, &result, "C"), lane_of(&intervals, &result, "B"));
    }

    #[test]
    fn reuses_lowest_free_lane() {
        // A and B both free up before C starts; C goes back to lane 0
        let intervals = vec![span("A", 1, 4), span("B", 2, 3), span("C", 5, 6)];

        let result = assign_lanes(&intervals, 0);

        assert_eq!(result.lane_count, 2);
        assert_eq!(lane_of(&intervals, &result, "B"), 1);
        assert_eq!(lane_of(&intervals, &result, "C"), 0);
    }

    #[test]
    fn daily_load_counts_occupied_days() {
        let intervals = vec![span("A", 1, 4), span("B", 2, 3), TaskInterval::milestone("M", day(4))];

        let load = daily_load(&intervals);

        assert_eq!(load.get(&day(1)), Some(&1));
        assert_eq!(load.get(&day(2)), Some(&2));
        assert_eq!(load.get(&day(3)), Some(&1));
        // A's end day is its edge; only the milestone sits on day 4
        assert_eq!(load.get(&day(4)), Some(&1));
        assert_eq!(load.get(&day(5)), None);
    }

    #[test]
    fn empty_input_uses_no_lanes() {
        let result = assign_lanes(&[], 0);
        assert_eq!(result.lane_count, 0);
        assert!(result.placements.is_empty());
        assert_eq!(max_concurrency(&[], 0), 0);
    }

    #[test]
    fn sweep_counts_peak() {
        let intervals = vec![span("A", 1, 5), span("B", 2, 6), span("C", 4, 8), span("D", 8, 9)];
        assert_eq!(max_concurrency(&intervals, 0), 3);
    }

    fn arb_intervals() -> impl Strategy<Value = Vec<TaskInterval>> {
        prop::collection::vec((0i64..40, 0i64..10, any::<bool>(), 0i32..3), 0..=20).prop_map(
            |specs| {
                specs
                    .into_iter()
                    .enumerate()
                    .map(|(n, (start, len, milestone, priority))| {
                        let id = format!("t{}", n);
                        if milestone {
                            TaskInterval::milestone(id, day(start))
                        } else {
                            span(&id, start, start + len).with_priority(priority)
                        }
                    })
                    .collect()
            },
        )
    }

    /// Counts intervals active on each day one by one
    fn brute_force_peak(intervals: &[TaskInterval], gap: i64) -> usize {
        (0..60)
            .map(|d| {
                let today = day(d);
                intervals
                    .iter()
                    .filter(|i| i.start <= today && today < free_at(i, gap))
                    .count()
            })
            .max()
            .unwrap_or(0)
    }

    proptest! {
        #[test]
        fn lane_count_is_minimal(intervals in arb_intervals(), gap in 0i64..3) {
            let result = assign_lanes(&intervals, gap);
            prop_assert_eq!(result.lane_count, brute_force_peak(&intervals, gap));
            prop_assert_eq!(result.lane_count, max_concurrency(&intervals, gap));
        }

        #[test]
        fn intervals_sharing_a_lane_never_overlap(intervals in arb_intervals(), gap in 0i64..3) {
            let result = assign_lanes(&intervals, gap);
            let lanes = result.lanes_by_index();

            for i in 0..intervals.len() {
                for j in (i + 1)..intervals.len() {
                    if lanes[i] != lanes[j] {
                        continue;
                    }
                    let (a, b) = (&intervals[i], &intervals[j]);
                    let apart = free_at(a, gap) <= b.start || free_at(b, gap) <= a.start;
                    prop_assert!(apart, "{} and {} share lane {}", a.id, b.id, lanes[i]);
                }
            }
        }

        #[test]
        fn lane_index_never_exceeds_concurrency_at_start(intervals in arb_intervals(), gap in 0i64..3) {
            let result = assign_lanes(&intervals, gap);

            for placement in &result.placements {
                let interval = &intervals[placement.index];
                let active = intervals
                    .iter()
                    .filter(|other| other.start <= interval.start && interval.start < free_at(other, gap))
                    .count();
                prop_assert!(
                    placement.lane < active,
                    "{} sits in lane {} with {} active",
                    interval.id,
                    placement.lane,
                    active
                );
            }
        }

        #[test]
        fn every_interval_is_placed_once(intervals in arb_intervals()) {
            let result = assign_lanes(&intervals, 0);
            let mut seen: Vec<usize> = result.placements.iter().map(|p| p.index).collect();
            seen.sort_unstable();
            prop_assert_eq!(seen, (0..intervals.len()).collect::<Vec<_>>());
            prop_assert!(result.placements.iter().all(|p| p.lane < result.lane_count));
        }
    }
}
