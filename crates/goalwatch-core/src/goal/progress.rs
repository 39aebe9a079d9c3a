//! Derived progress toward a goal.

use serde::{Deserialize, Serialize};

/// Progress is never stored; it is recomputed from the press count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub completed: u32,
    pub required: u32,
    /// 0.0 ..= 1.0
    pub ratio: f64,
    pub is_completed: bool,
}

impl Progress {
    pub fn new(completed: u32, required: u32) -> Self {
        let ratio = if required > 0 {
            (f64::from(completed) / f64::from(required)).clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            completed,
            required,
            ratio,
            is_completed: completed >= required,
        }
    }

    /// Percentage rounded half-up to one decimal place.
    pub fn percentage(&self) -> f64 {
        (self.ratio * 1000.0).round() / 10.0
    }

    /// e.g. `"42.9%"`.
    pub fn percentage_label(&self) -> String {
        format!("{:.1}%", self.percentage())
    }

    pub fn remaining(&self) -> u32 {
        self.required.saturating_sub(self.completed)
    }
}
