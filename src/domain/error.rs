//! Error taxonomy for the layout core

use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Errors produced while normalizing, laying out or caching tasks
///
/// Nothing here is fatal: an invalid task is excluded from its batch, an
/// out-of-range bar is dropped, and a failed computation is retried on the
/// next cache request.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LayoutError {
    #[error("Invalid interval for task '{task_id}': {reason}")]
    InvalidInterval { task_id: String, reason: String },

    #[error("Task '{task_id}' segment {start}..={end} lies outside the calendar window")]
    OutOfRange {
        task_id: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("Invalid grid configuration: {0}")]
    InvalidGrid(String),

    #[error("Layout computation failed for key {key}: {source}")]
    CacheComputeFailed {
        key: String,
        #[source]
        source: Box<LayoutError>,
    },

    #[error("Layout computation aborted: {0}")]
    ComputeAborted(String),
}

impl LayoutError {
    pub(crate) fn invalid(task_id: impl Into<String>, reason: impl Into<String>) -> Self {
        LayoutError::InvalidInterval {
            task_id: task_id.into(),
            reason: reason.into(),
        }
    }

    /// Returns the task this error refers to, if any
    pub fn task_id(&self) -> Option<&str> {
        match self {
            LayoutError::InvalidInterval { task_id, .. } | LayoutError::OutOfRange { task_id, .. } => {
                Some(task_id)
            }
            LayoutError::InvalidGrid(_) | LayoutError::ComputeAborted(_) => None,
            LayoutError::CacheComputeFailed { source, .. } => source.task_id(),
        }
    }
}

impl Serialize for LayoutError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
