//! Layout commands (layout, check)

use std::sync::Arc;

use anyhow::Result;

use super::inputs::Inputs;
use super::output::Output;
use crate::domain::{LayoutResult, LayoutStatistics, TaskBar};
use crate::layout::cached_layout;

fn flags(bar: &TaskBar) -> String {
    let mut flags = Vec::new();
    if bar.is_milestone {
        flags.push("milestone");
    }
    if bar.is_start {
        flags.push("start");
    }
    if bar.is_end {
        flags.push("end");
    }
    if bar.is_continuation {
        flags.push("cont");
    }
    if bar.crosses_month_boundary {
        flags.push("month");
    }
    if bar.overflow {
        flags.push("overflow");
    }
    flags.join(",")
}

fn print_bars(result: &LayoutResult) {
    println!(
        "{:<16} {:>4} {:<10} {:<10} {:>9} {:>8} {:>7} FLAGS",
        "TASK", "LANE", "START", "END", "X", "WIDTH", "Y"
    );
    println!("{}", "-".repeat(84));
    for bar in &result.task_bars {
        println!(
            "{:<16} {:>4} {:<10} {:<10} {:>9.1} {:>8.1} {:>7.1} {}",
            bar.task_id,
            bar.lane,
            bar.start,
            bar.end,
            bar.start_x,
            bar.width,
            bar.y,
            flags(bar)
        );
    }
}

fn print_statistics(stats: &LayoutStatistics) {
    println!();
    println!("Statistics:");
    println!("  Lanes:            {}", stats.lane_count);
    println!("  Tasks:            {}", stats.total_tasks);
    println!("  Bars:             {}", stats.total_bars);
    println!("  Overlapping pairs: {} above threshold", stats.overlap_count);
    println!("  Space efficiency: {:.1}%", stats.space_efficiency * 100.0);
    println!("  Overflow bars:    {}", stats.overflow_count);

    if !stats.overflow_by_day.is_empty() {
        println!();
        println!("Overflow by day:");
        for (day, hidden) in &stats.overflow_by_day {
            println!("  {}  +{} more", day, hidden);
        }
    }

    if !stats.overlaps.is_empty() {
        println!();
        println!("Overlaps:");
        for report in &stats.overlaps {
            println!(
                "  {:<8} {} / {} ({} days, {:.0}%)",
                report.severity.as_str(),
                report.first,
                report.second,
                report.overlap_days,
                report.ratio * 100.0
            );
        }
    }

    if !stats.groups.is_empty() {
        println!();
        println!("Overlap groups:");
        for group in &stats.groups {
            println!(
                "  {}..{}  {} [{}]",
                group.start,
                group.end,
                group.task_ids.join(", "),
                group.max_severity.as_str()
            );
        }
    }
}

/// Lays out one view and prints its bars
pub fn layout(output: &Output, inputs: &Inputs, view: Option<&str>, show_stats: bool) -> Result<()> {
    let view = inputs.view(view)?;
    let grid = inputs.grid_for(&view)?;
    output.verbose_ctx(
        "layout",
        &format!(
            "View '{}' window {}..={}",
            view.name, grid.calendar_start, grid.calendar_end
        ),
    );

    let cache = inputs
        .config
        .planner
        .cache
        .build(Arc::new(*output));
    let layout = cached_layout(&inputs.normalized.intervals, &grid, &cache, output)?;
    let result = &layout.result;

    if output.is_json() {
        output.data(&serde_json::json!({
            "view": view.name,
            "key": layout.key.to_string(),
            "grid": grid,
            "task_bars": result.task_bars,
            "statistics": result.statistics,
            "dropped": result.dropped,
            "rejected": inputs.normalized.rejected,
            "undated": inputs.undated(),
        }));
        return Ok(());
    }

    println!(
        "View '{}' ({} to {}): {} lanes, {} bars",
        view.name,
        grid.calendar_start,
        grid.calendar_end,
        result.statistics.lane_count,
        result.task_bars.len()
    );
    println!();

    if result.task_bars.is_empty() {
        println!("No tasks to lay out.");
    } else {
        print_bars(result);
    }

    if !result.dropped.is_empty() {
        println!();
        println!("Outside the calendar ({}):", result.dropped.len());
        for dropped in &result.dropped {
            println!("  {}", dropped.error);
        }
    }

    if !inputs.normalized.rejected.is_empty() {
        println!();
        println!("Skipped ({}):", inputs.normalized.rejected.len());
        for rejection in &inputs.normalized.rejected {
            println!("  {}", rejection.error);
        }
    }

    if !inputs.undated().is_empty() {
        let ids: Vec<&str> = inputs.undated().iter().map(|t| t.id.as_str()).collect();
        println!();
        println!("Undated ({}): {}", ids.len(), ids.join(", "));
    }

    if show_stats {
        print_statistics(&result.statistics);
    }

    Ok(())
}

/// Validates task records without laying them out
pub fn check(output: &Output, inputs: &Inputs, strict: bool) -> Result<()> {
    let normalized = &inputs.normalized;

    if output.is_json() {
        output.data(&serde_json::json!({
            "tasks": inputs.tasks_path.display().to_string(),
            "valid": normalized.intervals.len(),
            "rejected": normalized.rejected,
            "undated": normalized.undated.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(),
            "range": normalized.date_range(),
        }));
    } else {
        println!("Checked {}", inputs.tasks_path.display());
        println!("  Valid:    {}", normalized.intervals.len());
        println!("  Rejected: {}", normalized.rejected.len());
        println!("  Undated:  {}", normalized.undated.len());
        if let Some((start, end)) = normalized.date_range() {
            println!("  Range:    {} to {}", start, end);
        }
        for rejection in &normalized.rejected {
            println!("  - {}", rejection.error);
        }
    }

    if strict && !normalized.rejected.is_empty() {
        anyhow::bail!("{} task record(s) rejected", normalized.rejected.len());
    }
    Ok(())
}
