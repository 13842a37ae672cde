//! Calendar grid geometry

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::error::LayoutError;

/// What to do with bar segments that extend past the calendar window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClipPolicy {
    /// Trim the segment to the window and keep it
    #[default]
    Clip,
    /// Drop any segment not fully inside the window
    Drop,
}

impl ClipPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClipPolicy::Clip => "clip",
            ClipPolicy::Drop => "drop",
        }
    }
}

/// Page and grid geometry for one calendar view
///
/// Widths and heights are in abstract render units; the render adapter decides
/// what a unit is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// First visible day
    pub calendar_start: NaiveDate,
    /// Last visible day (inclusive)
    pub calendar_end: NaiveDate,
    pub day_width: f64,
    /// Height of one lane
    pub row_height: f64,
    /// Lanes shown per day before bars count as overflow
    pub max_lanes_per_day: usize,
    /// Overlap ratio above which a pair is reported; reporting only
    pub overlap_threshold: f64,
    /// Horizontal gap inserted at every month boundary
    pub month_boundary_gap: f64,
    /// Vertical gap between lanes
    pub lane_spacing: f64,
    /// Split bars at the start of every week when set
    #[serde(default)]
    pub week_start: Option<Weekday>,
    /// First days of explicit pages; bars split there
    #[serde(default)]
    pub page_breaks: Vec<NaiveDate>,
    #[serde(default)]
    pub clip_policy: ClipPolicy,
}

impl GridConfig {
    pub const DEFAULT_DAY_WIDTH: f64 = 20.0;
    pub const DEFAULT_ROW_HEIGHT: f64 = 12.0;
    pub const DEFAULT_MAX_LANES: usize = 4;
    pub const DEFAULT_OVERLAP_THRESHOLD: f64 = 0.5;
    pub const DEFAULT_MONTH_GAP: f64 = 4.0;
    pub const DEFAULT_LANE_SPACING: f64 = 2.0;

    /// Creates a grid for the given window with default geometry
    pub fn new(calendar_start: NaiveDate, calendar_end: NaiveDate) -> Self {
        Self {
            calendar_start,
            calendar_end,
            day_width: Self::DEFAULT_DAY_WIDTH,
            row_height: Self::DEFAULT_ROW_HEIGHT,
            max_lanes_per_day: Self::DEFAULT_MAX_LANES,
            overlap_threshold: Self::DEFAULT_OVERLAP_THRESHOLD,
            month_boundary_gap: Self::DEFAULT_MONTH_GAP,
            lane_spacing: Self::DEFAULT_LANE_SPACING,
            week_start: None,
            page_breaks: Vec::new(),
            clip_policy: ClipPolicy::Clip,
        }
    }

    /// Creates a grid whose window covers whole months around `first..=last`
    pub fn covering(first: NaiveDate, last: NaiveDate) -> Self {
        Self::new(month_start(first), month_end(last))
    }

    /// Checks that the geometry can produce a layout
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.calendar_end < self.calendar_start {
            return Err(LayoutError::InvalidGrid(format!(
                "calendar_end {} is before calendar_start {}",
                self.calendar_end, self.calendar_start
            )));
        }
        let positive = [("day_width", self.day_width), ("row_height", self.row_height)];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(LayoutError::InvalidGrid(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        let non_negative = [
            ("month_boundary_gap", self.month_boundary_gap),
            ("lane_spacing", self.lane_spacing),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(LayoutError::InvalidGrid(format!(
                    "{} must not be negative, got {}",
                    name, value
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.overlap_threshold) {
            return Err(LayoutError::InvalidGrid(format!(
                "overlap_threshold must be within [0, 1], got {}",
                self.overlap_threshold
            )));
        }
        if self.max_lanes_per_day == 0 {
            return Err(LayoutError::InvalidGrid(
                "max_lanes_per_day must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of visible days (inclusive window)
    pub fn span_days(&self) -> i64 {
        days_between(self.calendar_start, self.calendar_end) + 1
    }

    /// Returns true if the day is inside the window
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.calendar_start <= day && day <= self.calendar_end
    }

    /// Whole days of clearance required between bars sharing a lane
    pub fn lane_gap_days(&self) -> i64 {
        (self.lane_spacing / self.day_width).floor() as i64
    }

    /// Vertical distance between the tops of adjacent lanes
    pub fn lane_pitch(&self) -> f64 {
        self.row_height + self.lane_spacing
    }
}

/// Signed number of days from `from` to `to`
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Number of month starts in `(from, to]`
pub fn month_boundaries_between(from: NaiveDate, to: NaiveDate) -> i64 {
    let months = |d: NaiveDate| i64::from(d.year()) * 12 + i64::from(d.month0());
    (months(to) - months(from)).max(0)
}

/// First day of the month containing `day`
pub fn month_start(day: NaiveDate) -> NaiveDate {
    day.with_day(1).unwrap_or(day)
}

/// Last day of the month containing `day`
pub fn month_end(day: NaiveDate) -> NaiveDate {
    let (year, month) = if day.month() == 12 {
        (day.year() + 1, 1)
    } else {
        (day.year(), day.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|next| next - Duration::days(1))
        .unwrap_or(day)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn default_grid_is_valid() {
        let grid = GridConfig::new(date(2025, 1, 1), date(2025, 3, 31));
        assert!(grid.validate().is_ok());
        assert_eq!(grid.span_days(), 90);
        assert_eq!(grid.lane_gap_days(), 0);
    }

    #[test]
    fn rejects_inverted_window() {
        let grid = GridConfig::new(date(2025, 2, 1), date(2025, 1, 1));
        assert!(matches!(grid.validate(), Err(LayoutError::InvalidGrid(_))));
    }

    #[test]
    fn rejects_bad_geometry() {
        let mut grid = GridConfig::new(date(2025, 1, 1), date(2025, 1, 31));
        grid.day_width = 0.0;
        assert!(grid.validate().is_err());

        let mut grid = GridConfig::new(date(2025, 1, 1), date(2025, 1, 31));
        grid.overlap_threshold = 1.5;
        assert!(grid.validate().is_err());

        let mut grid = GridConfig::new(date(2025, 1, 1), date(2025, 1, 31));
        grid.lane_spacing = f64::NAN;
        assert!(grid.validate().is_err());

        let mut grid = GridConfig::new(date(2025, 1, 1), date(2025, 1, 31));
        grid.max_lanes_per_day = 0;
        assert!(grid.validate().is_err());
    }

    #[test]
    fn lane_gap_counts_whole_days() {
        let mut grid = GridConfig::new(date(2025, 1, 1), date(2025, 1, 31));
        grid.day_width = 10.0;
        grid.lane_spacing = 25.0;
        assert_eq!(grid.lane_gap_days(), 2);
    }

    #[test]
    fn covering_widens_to_months() {
        let grid = GridConfig::covering(date(2024, 12, 14), date(2025, 2, 3));
        assert_eq!(grid.calendar_start, date(2024, 12, 1));
        assert_eq!(grid.calendar_end, date(2025, 2, 28));
    }

    #[test]
    fn counts_month_boundaries() {
        assert_eq!(month_boundaries_between(date(2025, 1, 1), date(2025, 1, 31)), 0);
        assert_eq!(month_boundaries_between(date(2025, 1, 15), date(2025, 2, 1)), 1);
        assert_eq!(month_boundaries_between(date(2024, 11, 30), date(2025, 2, 10)), 3);
        assert_eq!(month_boundaries_between(date(2025, 3, 1), date(2025, 1, 1)), 0);
    }

    #[test]
    fn month_end_handles_december_and_leap_years() {
        assert_eq!(month_end(date(2024, 12, 5)), date(2024, 12, 31));
        assert_eq!(month_end(date(2024, 2, 10)), date(2024, 2, 29));
    }

    #[test]
    fn parse_grid_from_toml() {
        let toml = r#"
calendar_start = "2025-01-01"
calendar_end = "2025-06-30"
day_width = 16.0
row_height = 10.0
max_lanes_per_day = 3
overlap_threshold = 0.25
month_boundary_gap = 6.0
lane_spacing = 1.0
week_start = "Mon"
clip_policy = "drop"
"#;
        let grid: GridConfig = toml::from_str(toml).unwrap();
        assert_eq!(grid.week_start, Some(Weekday::Mon));
        assert_eq!(grid.clip_policy, ClipPolicy::Drop);
        assert!(grid.page_breaks.is_empty());
    }
}
