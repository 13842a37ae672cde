//! Boundary splitting
//!
//! A bar that runs across a month, week or page boundary is drawn as several
//! contiguous segments. Splitting only changes geometry: every segment keeps
//! the lane chosen for the whole interval.

use std::collections::BTreeMap;
use std::ops::Bound;

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::domain::{GridConfig, TaskInterval};

/// Why a day starts a new section; stronger kinds win when dates coincide
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryKind {
    Week,
    Page,
    Month,
}

/// Sorted set of section start days
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Boundaries {
    starts: BTreeMap<NaiveDate, BoundaryKind>,
}

impl Boundaries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a section start, keeping the stronger kind on collisions
    pub fn insert(&mut self, day: NaiveDate, kind: BoundaryKind) {
        let entry = self.starts.entry(day).or_insert(kind);
        *entry = (*entry).max(kind);
    }

    /// Month starts in `(after, through]`
    pub fn months(after: NaiveDate, through: NaiveDate) -> Self {
        let mut boundaries = Self::new();
        let mut next = crate::domain::month_end(after) + Duration::days(1);
        while next <= through {
            boundaries.insert(next, BoundaryKind::Month);
            next = crate::domain::month_end(next) + Duration::days(1);
        }
        boundaries
    }

    /// All boundaries a grid draws inside its window
    pub fn for_grid(grid: &GridConfig) -> Self {
        let (after, through) = (grid.calendar_start, grid.calendar_end);
        let mut boundaries = Self::months(after, through);

        if let Some(weekday) = grid.week_start {
            let offset = (7 + i64::from(weekday.num_days_from_monday())
                - i64::from(after.weekday().num_days_from_monday()))
                % 7;
            let mut next = after + Duration::days(if offset == 0 { 7 } else { offset });
            while next <= through {
                boundaries.insert(next, BoundaryKind::Week);
                next += Duration::days(7);
            }
        }

        for &page in &grid.page_breaks {
            if after < page && page <= through {
                boundaries.insert(page, BoundaryKind::Page);
            }
        }

        boundaries
    }

    pub fn kind_at(&self, day: NaiveDate) -> Option<BoundaryKind> {
        self.starts.get(&day).copied()
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    /// Boundaries in `(after, through]`
    pub fn within(
        &self,
        after: NaiveDate,
        through: NaiveDate,
    ) -> impl Iterator<Item = (NaiveDate, BoundaryKind)> + '_ {
        let range = if after < through {
            Some(self.starts.range((Bound::Excluded(after), Bound::Included(through))))
        } else {
            None
        };
        range.into_iter().flatten().map(|(day, kind)| (*day, *kind))
    }
}

/// One contiguous piece of a task between boundaries
#[derive(Debug, Clone, PartialEq)]
pub struct Segment<'a> {
    pub interval: &'a TaskInterval,
    pub lane: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub is_start: bool,
    pub is_end: bool,
    pub is_continuation: bool,
    pub crosses_month_boundary: bool,
}

/// Splits an interval at every boundary strictly inside it
///
/// The segments cover `interval.start..=interval.end` exactly, in order, with
/// no gaps or overlaps. A boundary on the end date is not a cut: the end date
/// is the bar's trailing edge, so the final segment always occupies at least
/// one day.
pub fn split<'a>(interval: &'a TaskInterval, lane: usize, boundaries: &Boundaries) -> Vec<Segment<'a>> {
    let mut segments = Vec::new();
    let mut start = interval.start;
    let mut leading_month = false;
    let last_cut = interval.end.pred_opt().unwrap_or(interval.end);

    for (cut, kind) in boundaries.within(interval.start, last_cut) {
        let trailing_month = kind == BoundaryKind::Month;
        segments.push(Segment {
            interval,
            lane,
            start,
            end: cut - Duration::days(1),
            is_start: segments.is_empty(),
            is_end: false,
            is_continuation: !segments.is_empty(),
            crosses_month_boundary: leading_month || trailing_month,
        });
        start = cut;
        leading_month = trailing_month;
    }

    segments.push(Segment {
        interval,
        lane,
        start,
        end: interval.end,
        is_start: segments.is_empty(),
        is_end: true,
        is_continuation: !segments.is_empty(),
        crosses_month_boundary: leading_month,
    });

    segments
}
