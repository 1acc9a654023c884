use crate::error::{AnalysisError, Result};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};

/// Half-open time range `[start, stop)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub stop: NaiveDateTime,
}

impl TimeWindow {
    pub fn new(start: NaiveDateTime, stop: NaiveDateTime) -> Self {
        Self { start, stop }
    }

    pub fn duration(&self) -> Duration {
        self.stop - self.start
    }
}

/// Consecutive windows of at most `max_window` covering `[start, end)`.
///
/// Cloning yields an independent iterator starting from the same position.
#[derive(Debug, Clone)]
pub struct TimeWindows {
    next_start: NaiveDateTime,
    end: NaiveDateTime,
    max_window: Duration,
}

impl TimeWindows {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime, max_window_seconds: i64) -> Result<Self> {
        if max_window_seconds <= 0 {
            return Err(AnalysisError::Config(format!(
                "Window length must be positive, got {} seconds",
                max_window_seconds
            )));
        }

        Ok(Self {
            next_start: start,
            end,
            max_window: Duration::seconds(max_window_seconds),
        })
    }

    pub fn from_days(start: NaiveDateTime, end: NaiveDateTime, max_days: u32) -> Result<Self> {
        Self::new(start, end, i64::from(max_days) * 86_400)
    }
}

impl Iterator for TimeWindows {
    type Item = TimeWindow;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_start >= self.end {
            return None;
        }

        let start = self.next_start;
        let stop = (start + self.max_window).min(self.end);
        self.next_start = stop;

        Some(TimeWindow::new(start, stop))
    }
}

/// Calendar month covered by one reference grid file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferencePeriod {
    pub year: i32,
    pub month: u32,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl ReferencePeriod {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            AnalysisError::InvalidFormat(format!("Invalid reference month {}-{:02}", year, month))
        })?;

        let (next_year, next_month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };
        let next_first = NaiveDate::from_ymd_opt(next_year, next_month, 1).ok_or_else(|| {
            AnalysisError::InvalidFormat(format!("Invalid reference month {}-{:02}", year, month))
        })?;

        Ok(Self {
            year,
            month,
            start: first.and_time(chrono::NaiveTime::MIN),
            end: next_first.and_time(chrono::NaiveTime::MIN),
        })
    }

    /// Parse the period from a file name carrying `YYYYMM` at characters 3..9
    /// (e.g. `FF_201501_hourly.json`)
    pub fn from_file_name(name: &str) -> Result<Self> {
        let year = name
            .get(3..7)
            .and_then(|s| s.parse::<i32>().ok())
            .ok_or_else(|| {
                AnalysisError::InvalidFormat(format!("No year at characters 3..7 of '{}'", name))
            })?;
        let month = name
            .get(7..9)
            .and_then(|s| s.parse::<u32>().ok())
            .ok_or_else(|| {
                AnalysisError::InvalidFormat(format!("No month at characters 7..9 of '{}'", name))
            })?;

        Self::new(year, month)
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn windows(&self, max_days: u32) -> Result<TimeWindows> {
        TimeWindows::from_days(self.start, self.end, max_days)
    }

    /// `YYYYMM` label used in output file names
    pub fn label(&self) -> String {
        format!("{:04}{:02}", self.start.year(), self.start.month())
    }
}
