//! "Which window is open right now" resolution.

use chrono::NaiveTime;
use std::sync::Arc;

use crate::clock::Clock;
use crate::goal::TimeWindow;

/// Index of the first window, in list order, whose `[start, end)` contains `now`.
///
/// Validated window sets never overlap, so at most one can match. Sets that
/// bypassed validation resolve to the first match.
pub fn current_open_window(now: NaiveTime, windows: &[TimeWindow]) -> Option<u32> {
    windows.iter().find(|w| w.contains(now)).map(|w| w.index)
}

/// Clock-backed resolver.
#[derive(Clone)]
pub struct WindowResolver {
    clock: Arc<dyn Clock>,
}

impl WindowResolver {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Index of the window open at the clock's current time of day.
    pub fn current_window_index(&self, windows: &[TimeWindow]) -> Option<u32> {
        current_open_window(self.clock.time_of_day(), windows)
    }

    pub fn is_time_in_window(&self, time: NaiveTime, window: &TimeWindow) -> bool {
        window.contains(time)
    }

    pub fn is_in_any_window(&self, windows: &[TimeWindow]) -> bool {
        self.current_window_index(windows).is_some()
    }
}
