//! Batch rendering of several views
//!
//! Each view is laid out on a bounded `rayon` pool. Workers go through the
//! shared cache, so views with identical grids are computed once. Setting the
//! cancel flag stops views that have not started yet; a layout already being
//! computed runs to completion.

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use crate::domain::{GridConfig, LayoutError, TaskInterval};
use crate::logging::Logger;
use crate::storage::LayoutCache;

use super::engine::{cached_layout, CachedLayout};

/// One view to render
#[derive(Debug, Clone, PartialEq)]
pub struct BatchView {
    pub name: String,
    pub grid: GridConfig,
}

#[derive(Debug, Clone)]
pub enum BatchStatus {
    Completed(CachedLayout),
    Failed(LayoutError),
    /// Cancelled before the view started
    Cancelled,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Completed(_) => "completed",
            BatchStatus::Failed(_) => "failed",
            BatchStatus::Cancelled => "cancelled",
        }
    }
}

/// Result for one view, in input order
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub view: String,
    pub status: BatchStatus,
}

/// Worker count for a configured value; 0 means available parallelism
pub fn effective_workers(workers: usize) -> usize {
    if workers > 0 {
        workers
    } else {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

/// Lays out every view of one task set
pub fn run_batch(
    views: &[BatchView],
    intervals: &[TaskInterval],
    cache: &LayoutCache,
    workers: usize,
    cancel: &AtomicBool,
    logger: &dyn Logger,
) -> Result<Vec<BatchOutcome>, rayon::ThreadPoolBuildError> {
    let workers = effective_workers(workers);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("calplan-batch-{}", i))
        .build()?;

    let outcomes: Vec<BatchOutcome> = pool.install(|| {
        views
            .par_iter()
            .map(|view| {
                let status = if cancel.load(Ordering::SeqCst) {
                    BatchStatus::Cancelled
                } else {
                    match cached_layout(intervals, &view.grid, cache, logger) {
                        Ok(layout) => BatchStatus::Completed(layout),
                        Err(error) => {
                            logger.error(&format!("view '{}' failed: {}", view.name, error));
                            BatchStatus::Failed(error)
                        }
                    }
                };
                BatchOutcome {
                    view: view.name.clone(),
                    status,
                }
            })
            .collect()
    });

    let completed = outcomes
        .iter()
        .filter(|outcome| matches!(outcome.status, BatchStatus::Completed(_)))
        .count();
    logger.info(&format!(
        "batch finished: {}/{} views on {} workers",
        completed,
        outcomes.len(),
        workers
    ));

    Ok(outcomes)
}
