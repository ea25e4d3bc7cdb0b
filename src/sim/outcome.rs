//! Win/loss coordination
//!
//! A two-input race between "all towers destroyed" and "timer elapsed",
//! evaluated once per tick. Destruction wins the race when both conditions
//! land on the same tick; the terminal state latches until an explicit reset.

use crate::sim::timer::CountdownTimer;

#[derive(Debug, Clone, Copy, Default)]
pub struct WinLoss {
    has_won: bool,
    is_game_over: bool,
}

impl WinLoss {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate the terminal-state race. Idempotent: once game over, nothing
    /// changes until [`WinLoss::reset`].
    pub fn evaluate(&mut self, active_towers: usize, timer: &mut CountdownTimer) {
        if self.is_game_over {
            return;
        }

        // Destruction takes priority over timeout when both hold this tick
        if active_towers == 0 {
            self.has_won = true;
            self.is_game_over = true;
            timer.stop();
            log::info!("all towers destroyed: victory");
            return;
        }

        if timer.is_elapsed() {
            self.has_won = false;
            self.is_game_over = true;
            log::info!("time up with {active_towers} towers standing: defeat");
        }
    }

    /// Clear the terminal flags (rebuild path)
    pub fn reset(&mut self) {
        self.has_won = false;
        self.is_game_over = false;
    }

    #[inline]
    pub fn has_won(&self) -> bool {
        self.has_won
    }

    #[inline]
    pub fn is_game_over(&self) -> bool {
        self.is_game_over
    }
}
