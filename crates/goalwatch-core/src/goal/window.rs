//! Recurring daily time windows.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// One recurring daily interval `[start, end)` in local clock time.
///
/// `index` is the stable identifier used for press records and check-points.
/// Windows never cross midnight; a window whose end is not after its start is
/// invalid rather than wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    pub index: u32,
    pub start_hour: u32,
    pub start_minute: u32,
    pub end_hour: u32,
    pub end_minute: u32,
}

impl TimeWindow {
    pub fn new(index: u32, start_hour: u32, start_minute: u32, end_hour: u32, end_minute: u32) -> Self {
        Self {
            index,
            start_hour,
            start_minute,
            end_hour,
            end_minute,
        }
    }

    /// Minutes since midnight at which the window opens.
    pub fn start_minutes(&self) -> u32 {
        self.start_hour * 60 + self.start_minute
    }

    /// Minutes since midnight at which the window closes.
    pub fn end_minutes(&self) -> u32 {
        self.end_hour * 60 + self.end_minute
    }

    /// Checks that both ends are real clock times and the end is after the start.
    pub fn is_valid(&self) -> bool {
        self.start_hour <= 23
            && self.end_hour <= 23
            && self.start_minute <= 59
            && self.end_minute <= 59
            && self.start_minutes() < self.end_minutes()
    }

    /// Half-open interval intersection. Adjacent windows do not overlap.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        !(self.end_minutes() <= other.start_minutes() || self.start_minutes() >= other.end_minutes())
    }

    pub fn start_time(&self) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(self.start_hour, self.start_minute, 0)
    }

    pub fn end_time(&self) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(self.end_hour, self.end_minute, 0)
    }

    /// Inclusive at start, exclusive at end.
    pub fn contains(&self, time: NaiveTime) -> bool {
        match (self.start_time(), self.end_time()) {
            (Some(start), Some(end)) => time >= start && time < end,
            _ => false,
        }
    }

    /// The instant on `date` at which this window closes.
    pub fn end_instant(&self, date: NaiveDate) -> Option<NaiveDateTime> {
        self.end_time().map(|end| date.and_time(end))
    }

    /// Same window with a different index.
    pub fn with_index(self, index: u32) -> Self {
        Self { index, ..self }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02} - {:02}:{:02}",
            self.start_hour, self.start_minute, self.end_hour, self.end_minute
        )
    }
}

/// Parses `HH:MM-HH:MM` into a window with index 0.
///
/// Only the shape is checked here; range and ordering are left to validation
/// so the user gets the same message whichever way a window was entered.
impl FromStr for TimeWindow {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unparsable = || ValidationError::UnparsableWindow {
            input: s.to_string(),
        };

        let (start, end) = s.split_once('-').ok_or_else(unparsable)?;
        let (start_hour, start_minute) = parse_clock(start.trim()).ok_or_else(unparsable)?;
        let (end_hour, end_minute) = parse_clock(end.trim()).ok_or_else(unparsable)?;
        Ok(TimeWindow::new(0, start_hour, start_minute, end_hour, end_minute))
    }
}

fn parse_clock(s: &str) -> Option<(u32, u32)> {
    let (hour, minute) = s.split_once(':')?;
    Some((hour.trim().parse().ok()?, minute.trim().parse().ok()?))
}
