//! Unsaved window list used while composing a goal.

use super::validation::validate_window;
use super::TimeWindow;
use crate::error::ValidationError;

/// Windows are validated as they are added, so a draft is always a valid,
/// non-overlapping, densely indexed list (possibly empty).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowDraft {
    windows: Vec<TimeWindow>,
}

impl WindowDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a window at the next index.
    ///
    /// The draft is left untouched when the window is malformed or overlaps
    /// one already in the list.
    pub fn add(
        &mut self,
        start_hour: u32,
        start_minute: u32,
        end_hour: u32,
        end_minute: u32,
    ) -> Result<&TimeWindow, ValidationError> {
        let index = self.windows.len() as u32;
        self.push(TimeWindow::new(index, start_hour, start_minute, end_hour, end_minute))
    }

    /// Append an already-built window, re-indexing it to the next slot.
    pub fn push(&mut self, window: TimeWindow) -> Result<&TimeWindow, ValidationError> {
        let window = window.with_index(self.windows.len() as u32);
        validate_window(&window)?;

        if let Some(existing) = self.windows.iter().find(|w| w.overlaps(&window)) {
            return Err(ValidationError::OverlappingWindows {
                first: existing.to_string(),
                second: window.to_string(),
            });
        }

        self.windows.push(window);
        Ok(&self.windows[self.windows.len() - 1])
    }

    /// Remove the window at `position` and re-index the rest to `0..N-1`.
    pub fn remove(&mut self, position: usize) -> Result<TimeWindow, ValidationError> {
        if position >= self.windows.len() {
            return Err(ValidationError::OutOfBounds {
                position,
                len: self.windows.len(),
            });
        }
        let removed = self.windows.remove(position);
        for (i, window) in self.windows.iter_mut().enumerate() {
            window.index = i as u32;
        }
        Ok(removed)
    }

    pub fn windows(&self) -> &[TimeWindow] {
        &self.windows
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn into_windows(self) -> Vec<TimeWindow> {
        self.windows
    }
}

impl TryFrom<Vec<TimeWindow>> for WindowDraft {
    type Error = ValidationError;

    fn try_from(windows: Vec<TimeWindow>) -> Result<Self, Self::Error> {
        let mut draft = WindowDraft::new();
        for window in windows {
            draft.push(window)?;
        }
        Ok(draft)
    }
}
