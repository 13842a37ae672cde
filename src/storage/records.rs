//! JSONL task records
//!
//! Ingestion hands the layout core one JSON object per line. Records are read
//! under a shared lock and kept in file order; validation happens later in
//! [`crate::domain::normalize`].

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;

use crate::domain::RawTask;

/// Task records stored as JSON lines
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads all records in file order
    ///
    /// Blank lines are skipped. A malformed line fails the read with its line
    /// number.
    pub fn read_all(&self) -> Result<Vec<RawTask>> {
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open task records: {}", self.path.display()))?;

        file.lock_shared()
            .context("Failed to acquire read lock on task records")?;

        let reader = BufReader::new(&file);
        let mut records = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read line {}", line_num + 1))?;

            if line.trim().is_empty() {
                continue;
            }

            let record: RawTask = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse task record at line {}", line_num + 1))?;
            records.push(record);
        }

        // Lock is released when file is dropped
        Ok(records)
    }

    /// Writes all records (full rewrite, temp file then rename)
    pub fn write_all(&self, records: &[RawTask]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let temp_path = self.path.with_extension("jsonl.tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

            file.lock_exclusive()
                .context("Failed to acquire write lock on task records")?;

            let mut writer = BufWriter::new(&file);
            for record in records {
                let line = serde_json::to_string(record).context("Failed to serialize task record")?;
                writeln!(writer, "{}", line).context("Failed to write task record")?;
            }
            writer.flush().context("Failed to flush task records")?;
        }

        fs::rename(&temp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                self.path.display()
            )
        })?;

        Ok(())
    }
}
