//! # Command-Line Interface
//!
//! Thin front end over the layout engine.
//!
//! ## Commands
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `init` | Write a starter `planner.toml` and `tasks.jsonl` |
//! | `check` | Validate task records, list rejections |
//! | `layout` | Lay out one view, print bars and statistics |
//! | `batch` | Lay out several views on a worker pool |
//! | `cache settings`, `cache stats` | Inspect the layout cache |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug output, including the engine's and
//! cache's log lines:
//! ```bash
//! calplan --verbose layout --stats
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod batch_cmd;
mod cache_cmd;
mod inputs;
mod layout_cmd;
mod output;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
