//! Super focus burst: a fixed countdown during which mode launches are locked.

use std::time::Duration;

pub const FOCUS_BURST: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusTick {
    Idle,
    Running { label: String },
    Finished,
}

#[derive(Debug)]
pub struct FocusTimer {
    length_secs: u64,
    time_left: u64,
    running: bool,
}

impl Default for FocusTimer {
    fn default() -> Self {
        Self::new(FOCUS_BURST)
    }
}

impl FocusTimer {
    pub fn new(length: Duration) -> Self {
        let length_secs = length.as_secs().max(1);
        Self {
            length_secs,
            time_left: length_secs,
            running: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn time_left(&self) -> u64 {
        self.time_left
    }

    /// Returns false if a burst is already running.
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.time_left = self.length_secs;
        self.running = true;
        true
    }

    /// Advance one second.
    pub fn tick(&mut self) -> FocusTick {
        if !self.running {
            return FocusTick::Idle;
        }
        self.time_left = self.time_left.saturating_sub(1);
        if self.time_left == 0 {
            self.running = false;
            return FocusTick::Finished;
        }
        FocusTick::Running { label: self.label() }
    }

    /// Empty when idle.
    pub fn label(&self) -> String {
        if !self.running {
            return String::new();
        }
        format!(
            "Focus Time Left: {:02}:{:02}",
            self.time_left / 60,
            self.time_left % 60
        )
    }

    pub fn minutes(&self) -> u64 {
        self.length_secs / 60
    }
}
