//! Debug domain: settings for the periodic status report.

use bevy::prelude::*;

/// Resource tracking debug mode state
#[derive(Resource, Debug)]
pub struct DebugState {
    /// Whether the stage status is logged at all
    pub show_status: bool,
    /// Seconds between two status reports
    pub interval: f32,
    /// Seconds since the last report
    pub since_last: f32,
}

impl Default for DebugState {
    fn default() -> Self {
        Self {
            show_status: true,
            interval: 1.0,
            since_last: 0.0,
        }
    }
}

impl DebugState {
    /// Accumulates `delta` and reports whether a status report is due.
    pub fn tick(&mut self, delta: f32) -> bool {
        self.since_last += delta;
        if self.since_last < self.interval {
            return false;
        }
        self.since_last = 0.0;
        true
    }
}
