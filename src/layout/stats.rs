//! Layout statistics
//!
//! Descriptive only. Placement never reads anything computed here, so the
//! lane assignment stays a function of the intervals alone.

use std::collections::{BTreeMap, HashMap};

use chrono::Duration;
use petgraph::unionfind::UnionFind;

use crate::domain::{
    GridConfig, LayoutStatistics, OverlapGroup, OverlapKind, OverlapReport, OverlapSeverity,
    TaskBar, TaskInterval,
};

/// Classifies the overlap between two intervals, if their occupied days meet
pub fn classify(a: &TaskInterval, b: &TaskInterval) -> Option<OverlapReport> {
    if !a.overlaps(b) {
        return None;
    }

    let overlap_days = (a.occupied_end().min(b.occupied_end()) - a.start.max(b.start)).num_days();
    let shorter = a.occupied_days().min(b.occupied_days());
    let ratio = overlap_days as f64 / shorter as f64;

    let contains = |outer: &TaskInterval, inner: &TaskInterval| {
        outer.start <= inner.start && outer.occupied_end() >= inner.occupied_end()
    };
    let kind = if a.start == b.start && a.end == b.end {
        OverlapKind::Identical
    } else if contains(a, b) || contains(b, a) {
        OverlapKind::Nested
    } else {
        OverlapKind::Partial
    };

    let severity = match kind {
        OverlapKind::Identical => OverlapSeverity::Critical,
        OverlapKind::Nested => OverlapSeverity::High,
        OverlapKind::Partial if ratio >= 0.8 => OverlapSeverity::High,
        OverlapKind::Partial if ratio >= 0.5 => OverlapSeverity::Medium,
        OverlapKind::Partial => OverlapSeverity::Low,
    };

    let (first, second) = if a.id <= b.id { (a, b) } else { (b, a) };
    Some(OverlapReport {
        first: first.id.clone(),
        second: second.id.clone(),
        kind,
        severity,
        overlap_days,
        ratio,
    })
}

/// All overlapping pairs, most severe first
fn overlapping_pairs(intervals: &[TaskInterval]) -> Vec<(usize, usize, OverlapReport)> {
    let mut order: Vec<usize> = (0..intervals.len()).collect();
    order.sort_by_key(|&i| intervals[i].start);

    let mut pairs = Vec::new();
    for (n, &i) in order.iter().enumerate() {
        let a = &intervals[i];
        for &j in &order[n + 1..] {
            let b = &intervals[j];
            // Sorted by start: nothing later can reach back into `a`
            if b.start >= a.occupied_end() {
                break;
            }
            if let Some(report) = classify(a, b) {
                pairs.push((i, j, report));
            }
        }
    }

    pairs.sort_by(|x, y| {
        y.2.severity
            .cmp(&x.2.severity)
            .then_with(|| x.2.first.cmp(&y.2.first))
            .then_with(|| x.2.second.cmp(&y.2.second))
    });
    pairs
}

fn overlap_groups(
    intervals: &[TaskInterval],
    pairs: &[(usize, usize, OverlapReport)],
) -> Vec<OverlapGroup> {
    let mut sets = UnionFind::<usize>::new(intervals.len());
    for (i, j, _) in pairs {
        sets.union(*i, *j);
    }

    let mut members: HashMap<usize, Vec<usize>> = HashMap::new();
    for index in 0..intervals.len() {
        members.entry(sets.find(index)).or_default().push(index);
    }

    let mut severity: HashMap<usize, OverlapSeverity> = HashMap::new();
    for (i, _, report) in pairs {
        let root = sets.find(*i);
        let entry = severity.entry(root).or_insert(report.severity);
        *entry = (*entry).max(report.severity);
    }

    let mut groups: Vec<OverlapGroup> = members
        .into_iter()
        .filter(|(_, indices)| indices.len() > 1)
        .filter_map(|(root, indices)| {
            let start = indices.iter().map(|&i| intervals[i].start).min()?;
            let end = indices.iter().map(|&i| intervals[i].end).max()?;
            let mut task_ids: Vec<String> = indices.iter().map(|&i| intervals[i].id.clone()).collect();
            task_ids.sort();
            Some(OverlapGroup {
                task_ids,
                start,
                end,
                max_severity: severity.get(&root).copied().unwrap_or(OverlapSeverity::Low),
            })
        })
        .collect();

    groups.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.task_ids.cmp(&b.task_ids)));
    groups
}

/// Hidden bars per visible day
fn overflow_by_day(bars: &[TaskBar], grid: &GridConfig) -> BTreeMap<chrono::NaiveDate, usize> {
    let mut days = BTreeMap::new();
    for bar in bars.iter().filter(|bar| bar.overflow) {
        let mut day = bar.start.max(grid.calendar_start);
        let last = bar.last_day().min(grid.calendar_end);
        while day <= last {
            *days.entry(day).or_insert(0) += 1;
            day += Duration::days(1);
        }
    }
    days
}

/// Bar area over the area of the lanes in use
pub fn space_efficiency(bars: &[TaskBar], lane_count: usize, grid: &GridConfig) -> f64 {
    if lane_count == 0 {
        return 0.0;
    }
    let used: f64 = bars.iter().map(TaskBar::area).sum();
    let available = lane_count as f64 * grid.span_days() as f64 * grid.day_width * grid.row_height;
    used / available
}

/// Computes diagnostics for a finished layout
pub fn collect(
    intervals: &[TaskInterval],
    bars: &[TaskBar],
    lane_count: usize,
    grid: &GridConfig,
) -> LayoutStatistics {
    let pairs = overlapping_pairs(intervals);
    let groups = overlap_groups(intervals, &pairs);
    let overlap_count = pairs
        .iter()
        .filter(|(_, _, report)| report.ratio > grid.overlap_threshold)
        .count();

    LayoutStatistics {
        lane_count,
        total_tasks: intervals.len(),
        total_bars: bars.len(),
        overlap_count,
        space_efficiency: space_efficiency(bars, lane_count, grid),
        overflow_count: bars.iter().filter(|bar| bar.overflow).count(),
        overflow_by_day: overflow_by_day(bars, grid),
        overlaps: pairs.into_iter().map(|(_, _, report)| report).collect(),
        groups,
    }
}
