//! Task interval model
//!
//! Raw task records arrive from ingestion with optional, loosely formatted
//! dates. [`normalize`] turns them into validated [`TaskInterval`]s, collecting
//! failures instead of aborting the batch:
//!
//! - both dates missing: the task goes to the undated bucket
//! - one date missing: the task is a single-day interval
//! - end before start, duplicate or empty id, unparseable date: rejected
//!
//! Day spans are inclusive (`start..=end`). For lane packing an interval
//! occupies the half-open span `[start, max(end, start + 1))`, so a task ending
//! on the day another starts can share its lane.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::LayoutError;

/// Date formats accepted in raw records, tried in order
pub const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Words that mark a record as a milestone when no explicit flag is given
const MILESTONE_KEYWORDS: &[&str] = &["milestone", "deadline", "due", "submit", "deliver"];

/// Parses a date in any of [`DATE_FORMATS`]
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

/// A task record as delivered by ingestion, before validation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawTask {
    pub id: String,
    pub name: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub category: String,
    pub priority: i32,
    /// Explicit milestone flag; keyword detection applies when absent
    pub milestone: Option<bool>,
    pub description: Option<String>,
}

impl RawTask {
    /// Creates a record with the given id and no dates
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Creates a dated record
    pub fn dated(id: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start_date: Some(start.format("%Y-%m-%d").to_string()),
            end_date: Some(end.format("%Y-%m-%d").to_string()),
            ..Self::new(id)
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_milestone(mut self, milestone: bool) -> Self {
        self.milestone = Some(milestone);
        self
    }

    /// Returns true if the record is a milestone, by flag or by keyword
    pub fn is_milestone(&self) -> bool {
        if let Some(flag) = self.milestone {
            return flag;
        }
        let text = format!(
            "{} {}",
            self.name,
            self.description.as_deref().unwrap_or_default()
        )
        .to_lowercase();
        text.split(|c: char| !c.is_alphanumeric())
            .any(|word| MILESTONE_KEYWORDS.contains(&word))
    }
}

/// A validated, immutable day range for one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInterval {
    pub id: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Tie-break only; higher sorts first among equal starts and durations
    pub priority: i32,
    pub category: String,
    pub is_milestone: bool,
}

impl TaskInterval {
    /// Creates an interval, enforcing `start <= end` and single-day milestones
    pub fn new(
        id: impl Into<String>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Self, LayoutError> {
        let id = id.into();
        if end < start {
            return Err(LayoutError::invalid(
                id,
                format!("end date {} is before start date {}", end, start),
            ));
        }
        Ok(Self {
            id,
            start,
            end,
            priority: 0,
            category: String::new(),
            is_milestone: false,
        })
    }

    /// Creates a milestone on a single day
    pub fn milestone(id: impl Into<String>, day: NaiveDate) -> Self {
        Self {
            id: id.into(),
            start: day,
            end: day,
            priority: 0,
            category: String::new(),
            is_milestone: true,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Inclusive number of calendar days covered
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// First day no longer occupied in lane terms
    pub fn occupied_end(&self) -> NaiveDate {
        self.end.max(self.start + chrono::Duration::days(1))
    }

    /// Number of days occupied in lane terms (always at least one)
    pub fn occupied_days(&self) -> i64 {
        (self.occupied_end() - self.start).num_days()
    }

    /// Returns true if the two intervals cannot share a lane
    pub fn overlaps(&self, other: &TaskInterval) -> bool {
        self.start < other.occupied_end() && other.start < self.occupied_end()
    }

    /// Returns true if any occupied day falls in `first..=last`
    ///
    /// An interval whose end date is `first` only touches the range with its
    /// trailing edge and does not occupy it.
    pub fn occupies(&self, first: NaiveDate, last: NaiveDate) -> bool {
        self.start <= last && self.occupied_end() > first
    }
}

/// A record excluded from layout, with the reason
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    pub task: RawTask,
    pub error: LayoutError,
}

/// Output of [`normalize`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Normalized {
    /// Valid intervals, in input order
    pub intervals: Vec<TaskInterval>,
    /// Invalid records with the reason they were excluded
    pub rejected: Vec<Rejection>,
    /// Records without any date, rendered separately by the caller
    pub undated: Vec<RawTask>,
}

impl Normalized {
    /// Earliest start and latest end over all intervals
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let start = self.intervals.iter().map(|i| i.start).min()?;
        let end = self.intervals.iter().map(|i| i.end).max()?;
        Some((start, end))
    }
}

fn parse_field(task: &RawTask, field: &str, value: Option<&str>) -> Result<Option<NaiveDate>, LayoutError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => parse_date(text)
            .map(Some)
            .ok_or_else(|| LayoutError::invalid(&task.id, format!("unrecognized {} '{}'", field, text))),
    }
}

fn normalize_one(task: &RawTask) -> Result<Option<TaskInterval>, LayoutError> {
    let start = parse_field(task, "start date", task.start_date.as_deref())?;
    let end = parse_field(task, "end date", task.end_date.as_deref())?;

    let (start, end) = match (start, end) {
        (None, None) => return Ok(None),
        (Some(day), None) | (None, Some(day)) => (day, day),
        (Some(start), Some(end)) => (start, end),
    };

    let interval = if task.is_milestone() {
        if end < start {
            return Err(LayoutError::invalid(
                &task.id,
                format!("end date {} is before start date {}", end, start),
            ));
        }
        // A milestone marks its deadline
        TaskInterval::milestone(&task.id, end)
    } else {
        TaskInterval::new(&task.id, start, end)?
    };

    Ok(Some(
        interval
            .with_priority(task.priority)
            .with_category(task.category.clone()),
    ))
}

/// Validates raw records into intervals, collecting rejections and undated tasks
///
/// Never fails as a whole: every record ends up in exactly one of the three
/// output buckets. The first occurrence of an id wins; later duplicates are
/// rejected.
pub fn normalize(raw: &[RawTask]) -> Normalized {
    let mut out = Normalized::default();
    let mut seen: HashSet<&str> = HashSet::new();

    for task in raw {
        let id = task.id.trim();
        if id.is_empty() {
            out.rejected.push(Rejection {
                task: task.clone(),
                error: LayoutError::invalid("", "task id is empty"),
            });
            continue;
        }
        if !seen.insert(id) {
            out.rejected.push(Rejection {
                task: task.clone(),
                error: LayoutError::invalid(id, "duplicate task id"),
            });
            continue;
        }

        match normalize_one(task) {
            Ok(Some(interval)) => out.intervals.push(interval),
            Ok(None) => out.undated.push(task.clone()),
            Err(error) => out.rejected.push(Rejection {
                task: task.clone(),
                error,
            }),
        }
    }

    out
}
