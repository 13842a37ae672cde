//! Configuration handling for calplan
//!
//! Planner configuration lives in `planner.toml`, found by walking upward
//! from the working directory (or passed with `--config`). User preferences
//! live in the platform config directory (`~/.config/calplan/config.toml` on
//! Linux).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Weekday};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{month_end, month_start, ClipPolicy, GridConfig};
use crate::logging::SharedLogger;
use crate::storage::LayoutCache;

/// Name of the planner configuration file
pub const CONFIG_FILE: &str = "planner.toml";

/// Name given to the implicit view when none are configured
pub const DEFAULT_VIEW: &str = "default";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Grid fields as written in TOML; anything unset falls back
///
/// A view's settings are layered over the `[grid]` section, which is layered
/// over the built-in defaults. The calendar window, when not set anywhere, is
/// derived from the tasks being laid out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_start: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_end: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_lanes_per_day: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlap_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month_boundary_gap: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lane_spacing: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week_start: Option<Weekday>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_breaks: Option<Vec<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip_policy: Option<ClipPolicy>,
}

impl GridSettings {
    /// Returns these settings with unset fields taken from `base`
    pub fn over(&self, base: &GridSettings) -> GridSettings {
        GridSettings {
            calendar_start: self.calendar_start.or(base.calendar_start),
            calendar_end: self.calendar_end.or(base.calendar_end),
            day_width: self.day_width.or(base.day_width),
            row_height: self.row_height.or(base.row_height),
            max_lanes_per_day: self.max_lanes_per_day.or(base.max_lanes_per_day),
            overlap_threshold: self.overlap_threshold.or(base.overlap_threshold),
            month_boundary_gap: self.month_boundary_gap.or(base.month_boundary_gap),
            lane_spacing: self.lane_spacing.or(base.lane_spacing),
            week_start: self.week_start.or(base.week_start),
            page_breaks: self.page_breaks.clone().or_else(|| base.page_breaks.clone()),
            clip_policy: self.clip_policy.or(base.clip_policy),
        }
    }

    /// Returns true if both ends of the window are configured
    pub fn has_window(&self) -> bool {
        self.calendar_start.is_some() && self.calendar_end.is_some()
    }

    /// Builds a validated grid
    ///
    /// A missing window end is derived from `task_range` widened to whole
    /// months; with no tasks either, the current month is used.
    pub fn resolve(&self, task_range: Option<(NaiveDate, NaiveDate)>) -> Result<GridConfig, ConfigError> {
        let (first, last) = task_range.unwrap_or_else(|| {
            let today = chrono::Local::now().date_naive();
            (today, today)
        });
        let start = self.calendar_start.unwrap_or_else(|| match self.calendar_end {
            Some(end) if end < first => month_start(end),
            _ => month_start(first),
        });
        let end = self.calendar_end.unwrap_or_else(|| {
            if start > last {
                month_end(start)
            } else {
                month_end(last)
            }
        });

        let mut grid = GridConfig::new(start, end);
        if let Some(value) = self.day_width {
            grid.day_width = value;
        }
        if let Some(value) = self.row_height {
            grid.row_height = value;
        }
        if let Some(value) = self.max_lanes_per_day {
            grid.max_lanes_per_day = value;
        }
        if let Some(value) = self.overlap_threshold {
            grid.overlap_threshold = value;
        }
        if let Some(value) = self.month_boundary_gap {
            grid.month_boundary_gap = value;
        }
        if let Some(value) = self.lane_spacing {
            grid.lane_spacing = value;
        }
        grid.week_start = self.week_start;
        grid.page_breaks = self.page_breaks.clone().unwrap_or_default();
        grid.clip_policy = self.clip_policy.unwrap_or_default();

        grid.validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(grid)
    }
}

/// A named calendar view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    pub name: String,

    /// Grid overrides for this view
    #[serde(flatten)]
    pub grid: GridSettings,
}

impl ViewConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            grid: GridSettings::default(),
        }
    }
}

/// Layout cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Maximum number of layouts kept
    pub capacity: usize,

    /// Seconds before a layout is recomputed; 0 keeps layouts forever
    pub ttl_seconds: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: LayoutCache::DEFAULT_CAPACITY,
            ttl_seconds: LayoutCache::DEFAULT_TTL.as_secs(),
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_seconds > 0).then(|| Duration::from_secs(self.ttl_seconds))
    }

    /// Creates a cache with these settings
    pub fn build(&self, logger: SharedLogger) -> LayoutCache {
        LayoutCache::new(self.capacity, self.ttl()).with_logger(logger)
    }
}

/// Batch rendering settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    /// Worker threads; 0 uses the available parallelism
    pub workers: usize,
}

/// Contents of `planner.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Task records file, relative to the config file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks: Option<PathBuf>,

    pub grid: GridSettings,

    pub cache: CacheSettings,

    pub batch: BatchSettings,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub views: Vec<ViewConfig>,
}

impl PlannerConfig {
    /// Starter configuration written by `calplan init`
    pub fn starter() -> Self {
        Self {
            tasks: Some(PathBuf::from("tasks.jsonl")),
            grid: GridSettings {
                day_width: Some(GridConfig::DEFAULT_DAY_WIDTH),
                row_height: Some(GridConfig::DEFAULT_ROW_HEIGHT),
                max_lanes_per_day: Some(GridConfig::DEFAULT_MAX_LANES),
                overlap_threshold: Some(GridConfig::DEFAULT_OVERLAP_THRESHOLD),
                month_boundary_gap: Some(GridConfig::DEFAULT_MONTH_GAP),
                lane_spacing: Some(GridConfig::DEFAULT_LANE_SPACING),
                ..GridSettings::default()
            },
            cache: CacheSettings::default(),
            batch: BatchSettings::default(),
            views: vec![
                ViewConfig::new("monthly"),
                ViewConfig {
                    name: "weekly".to_string(),
                    grid: GridSettings {
                        week_start: Some(Weekday::Mon),
                        ..GridSettings::default()
                    },
                },
            ],
        }
    }

    /// Parses and validates a TOML document
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: PlannerConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks settings that can be judged without tasks
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut names = std::collections::HashSet::new();
        for view in &self.views {
            if view.name.trim().is_empty() {
                return Err(ConfigError::Invalid("view name is empty".to_string()));
            }
            if !names.insert(view.name.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate view '{}'", view.name)));
            }
        }

        // Geometry must already be valid for a window where one is fixed
        for view in self.views() {
            let settings = view.grid.over(&self.grid);
            if settings.has_window() {
                settings.resolve(None).map_err(|e| match e {
                    ConfigError::Invalid(reason) | ConfigError::Parse(reason) => {
                        ConfigError::Invalid(format!("view '{}': {}", view.name, reason))
                    }
                })?;
            }
        }
        Ok(())
    }

    /// Configured views, or the single default view
    pub fn views(&self) -> Vec<ViewConfig> {
        if self.views.is_empty() {
            vec![ViewConfig::new(DEFAULT_VIEW)]
        } else {
            self.views.clone()
        }
    }

    pub fn view(&self, name: &str) -> Option<ViewConfig> {
        self.views().into_iter().find(|view| view.name == name)
    }

    /// Settings for a view layered over `[grid]`
    pub fn settings_for(&self, view: &ViewConfig) -> GridSettings {
        view.grid.over(&self.grid)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize planner config")
    }
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,
}

/// Output format preference
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Combined configuration (global + planner)
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub planner: PlannerConfig,
    pub global: GlobalConfig,
    /// Path of the loaded `planner.toml`, if any
    pub path: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from an explicit file or the nearest `planner.toml`
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let global = Self::load_global()?;
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => std::env::current_dir()
                .ok()
                .and_then(|dir| Self::find_config_from(&dir)),
        };

        let planner = match &path {
            Some(path) => Self::load_planner(path)?,
            None => PlannerConfig::default(),
        };

        Ok(Self {
            planner,
            global,
            path,
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "calplan", "calplan").map(|dirs| dirs.config_dir().to_path_buf())
    }

    fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")
    }

    /// Reads and validates one planner file
    pub fn load_planner(path: &Path) -> Result<PlannerConfig> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read planner config: {}", path.display()))?;

        PlannerConfig::parse(&content)
            .with_context(|| format!("Failed to load planner config: {}", path.display()))
    }

    /// Finds `planner.toml` in `start` or the nearest ancestor
    pub fn find_config_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            let candidate = current.join(CONFIG_FILE);
            if candidate.is_file() {
                return Some(candidate);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Directory relative paths in the config are resolved against
    pub fn base_dir(&self) -> PathBuf {
        self.path
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Task records file named by the config, if any
    pub fn tasks_path(&self) -> Option<PathBuf> {
        let tasks = self.planner.tasks.as_ref()?;
        if tasks.is_absolute() {
            Some(tasks.clone())
        } else {
            Some(self.base_dir().join(tasks))
        }
    }
}
