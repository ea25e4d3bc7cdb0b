//! Round countdown timer
//!
//! Driven from the single update loop; there is no OS timer, so the
//! double-interval-registration hazard of subscription-driven timers cannot
//! occur by construction.

use crate::config::TimerTuning;

#[derive(Debug, Clone)]
pub struct CountdownTimer {
    tuning: TimerTuning,
    time_remaining: f32,
    is_running: bool,
}

impl CountdownTimer {
    pub fn new(tuning: TimerTuning) -> Self {
        let time_remaining = tuning.round_seconds;
        Self {
            tuning,
            time_remaining,
            is_running: false,
        }
    }

    pub fn start(&mut self) {
        self.is_running = true;
    }

    pub fn stop(&mut self) {
        self.is_running = false;
    }

    /// Back to a full clock, stopped
    pub fn reset(&mut self) {
        self.time_remaining = self.tuning.round_seconds;
        self.is_running = false;
    }

    /// Advance the countdown; clamps at zero and stops once elapsed
    pub fn tick(&mut self, dt: f32) {
        if self.is_running && self.time_remaining > 0.0 {
            self.time_remaining = (self.time_remaining - dt).max(0.0);
        }
        if self.time_remaining <= 0.0 {
            self.is_running = false;
        }
    }

    #[inline]
    pub fn time_remaining(&self) -> f32 {
        self.time_remaining
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.is_running
    }

    #[inline]
    pub fn is_elapsed(&self) -> bool {
        self.time_remaining <= 0.0
    }
}
