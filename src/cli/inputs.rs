//! Shared command inputs: configuration, task records and view grids

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::output::Output;
use crate::domain::{normalize, GridConfig, Normalized, RawTask};
use crate::layout::{log_rejections, BatchView};
use crate::storage::{Config, RecordStore, ViewConfig};

/// Loaded configuration plus normalized task records
pub struct Inputs {
    pub config: Config,
    pub tasks_path: PathBuf,
    pub normalized: Normalized,
}

impl Inputs {
    /// Loads config and the task records named by `--tasks` or the config
    pub fn load(config: Config, tasks: Option<&Path>, output: &Output) -> Result<Self> {
        let tasks_path = tasks
            .map(Path::to_path_buf)
            .or_else(|| config.tasks_path())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "No task records given. Pass --tasks or set `tasks` in planner.toml."
                )
            })?;

        output.verbose_ctx("inputs", &format!("Reading tasks from {}", tasks_path.display()));
        let raw = RecordStore::new(&tasks_path).read_all()?;
        let normalized = normalize(&raw);
        log_rejections(&normalized.rejected, output);
        output.verbose_ctx(
            "inputs",
            &format!(
                "{} records: {} valid, {} rejected, {} undated",
                raw.len(),
                normalized.intervals.len(),
                normalized.rejected.len(),
                normalized.undated.len()
            ),
        );

        Ok(Self {
            config,
            tasks_path,
            normalized,
        })
    }

    /// The named view, or the first configured one
    pub fn view(&self, name: Option<&str>) -> Result<ViewConfig> {
        let planner = &self.config.planner;
        match name {
            Some(name) => planner.view(name).ok_or_else(|| {
                let known: Vec<String> = planner.views().into_iter().map(|v| v.name).collect();
                anyhow::anyhow!("Unknown view '{}'. Known views: {}", name, known.join(", "))
            }),
            None => planner
                .views()
                .into_iter()
                .next()
                .context("No views configured"),
        }
    }

    /// Resolved grid for a view, window derived from the tasks when unset
    pub fn grid_for(&self, view: &ViewConfig) -> Result<GridConfig> {
        self.config
            .planner
            .settings_for(view)
            .resolve(self.normalized.date_range())
            .with_context(|| format!("Invalid grid for view '{}'", view.name))
    }

    /// Batch views for the given names, or all views
    pub fn batch_views(&self, names: &[String]) -> Result<Vec<BatchView>> {
        let views = if names.is_empty() {
            self.config.planner.views()
        } else {
            names
                .iter()
                .map(|name| self.view(Some(name)))
                .collect::<Result<Vec<_>>>()?
        };

        views
            .into_iter()
            .map(|view| {
                let grid = self.grid_for(&view)?;
                Ok(BatchView {
                    name: view.name,
                    grid,
                })
            })
            .collect()
    }

    pub fn undated(&self) -> &[RawTask] {
        &self.normalized.undated
    }
}
