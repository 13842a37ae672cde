//! Cache CLI commands

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use clap::Subcommand;

use super::inputs::Inputs;
use super::output::Output;
use crate::layout::cached_layout;
use crate::storage::Config;

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Show cache settings
    Settings,

    /// Lay out every view twice and show cache counters
    Stats {
        /// Task records file (defaults to `tasks` in planner.toml)
        #[arg(long, short = 't')]
        tasks: Option<std::path::PathBuf>,
    },
}

pub fn run(cmd: CacheCommands, config: Config, output: &Output) -> Result<()> {
    match cmd {
        CacheCommands::Settings => settings(&config, output),
        CacheCommands::Stats { tasks } => {
            let inputs = Inputs::load(config, tasks.as_deref(), output)?;
            stats(&inputs, output)
        }
    }
}

fn settings(config: &Config, output: &Output) -> Result<()> {
    let cache = &config.planner.cache;

    if output.is_json() {
        output.data(&serde_json::json!({
            "capacity": cache.capacity,
            "ttl_seconds": cache.ttl_seconds,
            "expires": cache.ttl().is_some(),
        }));
    } else {
        println!("Capacity: {} layouts", cache.capacity);
        match cache.ttl() {
            Some(ttl) => println!("TTL:      {}s", ttl.as_secs()),
            None => println!("TTL:      never expires"),
        }
    }

    Ok(())
}

fn stats(inputs: &Inputs, output: &Output) -> Result<()> {
    let planner = &inputs.config.planner;
    let cache = planner.cache.build(Arc::new(*output));
    let views = inputs.batch_views(&[])?;

    let start = Instant::now();
    for pass in 1..=2 {
        for view in &views {
            let layout = cached_layout(&inputs.normalized.intervals, &view.grid, &cache, output)?;
            output.verbose_ctx(
                "cache",
                &format!(
                    "pass {} view '{}': {} ({})",
                    pass,
                    view.name,
                    layout.key.short(),
                    if layout.cache_hit { "hit" } else { "computed" }
                ),
            );
        }
    }
    let duration = start.elapsed();
    let stats = cache.stats();

    if output.is_json() {
        output.data(&serde_json::json!({
            "views": views.len(),
            "duration_ms": duration.as_millis(),
            "stats": stats,
        }));
    } else {
        println!("Laid out {} views twice in {:?}", views.len(), duration);
        println!("  Entries:   {}", stats.entry_count);
        println!("  Hits:      {}", stats.hit_count);
        println!("  Misses:    {}", stats.miss_count);
        println!("  Evictions: {}", stats.eviction_count);
        println!("  Expired:   {}", stats.expired_count);
        println!("  Coalesced: {}", stats.coalesced_count);
    }

    Ok(())
}
