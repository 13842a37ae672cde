//! Content-addressed layout keys
//!
//! A key is the BLAKE3 hash of everything that can change a layout: each
//! task's id, dates, milestone flag, priority and category (sorted by id, so
//! input order does not matter) plus every grid field. Identical inputs always
//! produce the same key; any change produces a different one.

use std::fmt;

use chrono::{Datelike, NaiveDate};

use crate::domain::{GridConfig, TaskInterval};

/// Bumped whenever the hashed layout changes meaning
const KEY_VERSION: &str = "calplan-layout-v1";

/// Hash identifying one (task set, grid) layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayoutKey([u8; 32]);

struct KeyWriter {
    hasher: blake3::Hasher,
}

impl KeyWriter {
    fn new() -> Self {
        let mut writer = Self {
            hasher: blake3::Hasher::new(),
        };
        writer.str(KEY_VERSION);
        writer
    }

    fn bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Length-prefixed so adjacent strings cannot run together
    fn str(&mut self, value: &str) {
        self.u64(value.len() as u64);
        self.bytes(value.as_bytes());
    }

    fn u64(&mut self, value: u64) {
        self.bytes(&value.to_le_bytes());
    }

    fn i64(&mut self, value: i64) {
        self.bytes(&value.to_le_bytes());
    }

    fn f64(&mut self, value: f64) {
        self.u64(value.to_bits());
    }

    fn bool(&mut self, value: bool) {
        self.bytes(&[u8::from(value)]);
    }

    fn date(&mut self, value: NaiveDate) {
        self.i64(i64::from(value.num_days_from_ce()));
    }

    fn finish(self) -> LayoutKey {
        LayoutKey(*self.hasher.finalize().as_bytes())
    }
}

impl LayoutKey {
    /// Computes the key for laying out `intervals` on `grid`
    pub fn compute(intervals: &[TaskInterval], grid: &GridConfig) -> Self {
        let mut writer = KeyWriter::new();

        let mut sorted: Vec<&TaskInterval> = intervals.iter().collect();
        sorted.sort_by(|a, b| a.id.cmp(&b.id));
        writer.u64(sorted.len() as u64);
        for interval in sorted {
            writer.str(&interval.id);
            writer.date(interval.start);
            writer.date(interval.end);
            writer.bool(interval.is_milestone);
            writer.i64(i64::from(interval.priority));
            writer.str(&interval.category);
        }

        writer.date(grid.calendar_start);
        writer.date(grid.calendar_end);
        writer.f64(grid.day_width);
        writer.f64(grid.row_height);
        writer.u64(grid.max_lanes_per_day as u64);
        writer.f64(grid.overlap_threshold);
        writer.f64(grid.month_boundary_gap);
        writer.f64(grid.lane_spacing);
        match grid.week_start {
            Some(weekday) => {
                writer.bool(true);
                writer.u64(u64::from(weekday.num_days_from_monday()));
            }
            None => writer.bool(false),
        }
        let mut pages = grid.page_breaks.clone();
        pages.sort();
        pages.dedup();
        writer.u64(pages.len() as u64);
        for page in pages {
            writer.date(page);
        }
        writer.str(grid.clip_policy.as_str());

        writer.finish()
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// First seven hex digits, for log lines
    pub fn short(&self) -> String {
        let mut hex = self.to_string();
        hex.truncate(7);
        hex
    }
}

impl fmt::Display for LayoutKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}
