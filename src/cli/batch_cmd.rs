//! Batch command: lay out several views at once

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::Result;

use super::inputs::Inputs;
use super::output::Output;
use crate::layout::{effective_workers, run_batch, BatchStatus};

pub fn run(output: &Output, inputs: &Inputs, views: &[String], workers: Option<usize>) -> Result<()> {
    let planner = &inputs.config.planner;
    let views = inputs.batch_views(views)?;
    let workers = effective_workers(workers.unwrap_or(planner.batch.workers));
    output.verbose_ctx(
        "batch",
        &format!("Laying out {} views on {} workers", views.len(), workers),
    );

    let cache = planner.cache.build(Arc::new(*output));
    let cancel = AtomicBool::new(false);
    let outcomes = run_batch(
        &views,
        &inputs.normalized.intervals,
        &cache,
        workers,
        &cancel,
        output,
    )?;
    let failed = outcomes
        .iter()
        .filter(|outcome| matches!(outcome.status, BatchStatus::Failed(_)))
        .count();

    if output.is_json() {
        let items: Vec<_> = outcomes
            .iter()
            .map(|outcome| match &outcome.status {
                BatchStatus::Completed(layout) => serde_json::json!({
                    "view": outcome.view,
                    "status": outcome.status.as_str(),
                    "key": layout.key.to_string(),
                    "cache_hit": layout.cache_hit,
                    "lanes": layout.result.statistics.lane_count,
                    "bars": layout.result.task_bars.len(),
                    "overflow": layout.result.statistics.overflow_count,
                }),
                BatchStatus::Failed(error) => serde_json::json!({
                    "view": outcome.view,
                    "status": outcome.status.as_str(),
                    "error": error,
                }),
                BatchStatus::Cancelled => serde_json::json!({
                    "view": outcome.view,
                    "status": outcome.status.as_str(),
                }),
            })
            .collect();
        output.data(&serde_json::json!({
            "views": items,
            "cache": cache.stats(),
        }));
    } else {
        println!(
            "{:<16} {:<10} {:>5} {:>5} {:>8} KEY",
            "VIEW", "STATUS", "LANES", "BARS", "OVERFLOW"
        );
        println!("{}", "-".repeat(60));
        for outcome in &outcomes {
            match &outcome.status {
                BatchStatus::Completed(layout) => println!(
                    "{:<16} {:<10} {:>5} {:>5} {:>8} {}{}",
                    outcome.view,
                    outcome.status.as_str(),
                    layout.result.statistics.lane_count,
                    layout.result.task_bars.len(),
                    layout.result.statistics.overflow_count,
                    layout.key.short(),
                    if layout.cache_hit { " (shared)" } else { "" }
                ),
                BatchStatus::Failed(error) => {
                    println!("{:<16} {:<10} {}", outcome.view, outcome.status.as_str(), error)
                }
                BatchStatus::Cancelled => {
                    println!("{:<16} {}", outcome.view, outcome.status.as_str())
                }
            }
        }

        let stats = cache.stats();
        println!();
        println!(
            "{} views, {} layouts computed, {} shared",
            outcomes.len(),
            stats.entry_count,
            stats.hit_count + stats.coalesced_count
        );
    }

    if failed > 0 {
        anyhow::bail!("{} of {} views failed", failed, outcomes.len());
    }
    Ok(())
}
