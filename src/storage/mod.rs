//! # Storage Layer
//!
//! Everything with state: the layout cache, configuration files and task
//! record input.
//!
//! ## Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Task records | JSONL (one JSON per line) | `tasks.jsonl` (path set in config) |
//! | Planner config | TOML | `planner.toml`, nearest ancestor directory |
//! | User config | TOML | platform config dir, `config.toml` |
//! | Layouts | in memory | [`LayoutCache`] |
//!
//! ## Concurrency Safety
//!
//! - [`RecordStore`] takes a shared `fs2` lock while reading and writes via
//!   temp file + rename
//! - [`LayoutCache`] is `Sync`; one read/write lock guards the entries and a
//!   per-key in-flight marker gives single-flight computation
//!
//! ## Key Types
//!
//! - [`LayoutKey`] - Content hash of a task set and grid
//! - [`LayoutCache`] - Bounded, TTL-aware, single-flight cache
//! - [`Config`] - Planner and user configuration
//! - [`RecordStore`] - Read/write task records

mod cache;
mod config;
mod key;
mod records;

pub use cache::{CacheStats, LayoutCache};
pub use config::{
    BatchSettings, CacheSettings, Config, ConfigError, GlobalConfig, GridSettings, OutputFormat,
    PlannerConfig, ViewConfig, CONFIG_FILE, DEFAULT_VIEW,
};
pub use key::LayoutKey;
pub use records::RecordStore;
