//! Lifetime play/win/streak aggregates. Mutated exactly once per finished
//! game; calling `record_outcome` twice for one game corrupts the counters,
//! so the state machine is the only caller.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::logging::{log, obj, Domain, Level};

pub const STATS_KEY: &str = "lifetime_stats";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LifetimeStats {
    pub played: u32,
    pub won: u32,
    pub current_streak: u32,
    pub max_streak: u32,
    /// Running average of attempts on winning games, 1 decimal.
    pub avg_attempts: f64,
}

impl LifetimeStats {
    /// Records one finished game. Precondition: at most once per game.
    pub fn record_outcome(&mut self, won: bool, attempts_used: u32) {
        self.played += 1;
        if won {
            self.won += 1;
            self.current_streak += 1;
            self.max_streak = self.max_streak.max(self.current_streak);
            let total = self.avg_attempts * (self.won - 1) as f64 + attempts_used as f64;
            self.avg_attempts = (total / self.won as f64 * 10.0).round() / 10.0;
        } else {
            self.current_streak = 0;
        }
        log(
            Level::Info,
            Domain::Stats,
            "outcome_recorded",
            obj(&[
                ("won", json!(won)),
                ("attempts", json!(attempts_used)),
                ("played", json!(self.played)),
                ("streak", json!(self.current_streak)),
            ]),
        );
    }

    /// Percentage of played games won, rounded; computed on demand.
    pub fn win_rate(&self) -> u32 {
        if self.played == 0 {
            0
        } else {
            (self.won as f64 / self.played as f64 * 100.0).round() as u32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_win_increments_everything() {
        let mut s = LifetimeStats::default();
        s.record_outcome(true, 3);
        assert_eq!(s.played, 1);
        assert_eq!(s.won, 1);
        assert_eq!(s.current_streak, 1);
        assert_eq!(s.max_streak, 1);
        assert_eq!(s.avg_attempts, 3.0);
    }

    #[test]
    fn test_loss_breaks_streak_and_skips_average() {
        let mut s = LifetimeStats::default();
        s.record_outcome(true, 2);
        s.record_outcome(true, 4);
        s.record_outcome(false, 6);
        assert_eq!(s.played, 3);
        assert_eq!(s.won, 2);
        assert_eq!(s.current_streak, 0);
        assert_eq!(s.max_streak, 2);
        // Losses never feed the attempts average.
        assert_eq!(s.avg_attempts, 3.0);
    }

    #[test]
    fn test_incremental_average_rounds_to_one_decimal() {
        let mut s = LifetimeStats::default();
        s.record_outcome(true, 2);
        s.record_outcome(true, 3);
        s.record_outcome(true, 3);
        // (2 + 3 + 3) / 3 = 2.666... -> 2.7
        assert_eq!(s.avg_attempts, 2.7);
    }

    #[test]
    fn test_max_streak_survives_later_losses() {
        let mut s = LifetimeStats::default();
        for _ in 0..5 {
            s.record_outcome(true, 1);
        }
        s.record_outcome(false, 6);
        s.record_outcome(true, 1);
        assert_eq!(s.max_streak, 5);
        assert_eq!(s.current_streak, 1);
    }

    #[test]
    fn test_win_rate_rounds() {
        let mut s = LifetimeStats::default();
        assert_eq!(s.win_rate(), 0);
        s.record_outcome(true, 1);
        s.record_outcome(false, 6);
        s.record_outcome(true, 2);
        // 2/3 = 66.7% -> 67
        assert_eq!(s.win_rate(), 67);
    }
}
