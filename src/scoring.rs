use crate::question::{Kind, QuestionRecord};
use std::collections::HashMap;

/// Wrong multiple-choice answers at or under this elapsed time count as a
/// guess signal.
pub const FAST_WRONG_MS: u64 = 3_000;

const STREAK_STEP: f64 = 0.05;
const STREAK_CAP: f64 = 1.25;

/// Time-decay factor over elapsed answer time: full credit up to 7s, linear
/// decay to 0.2 until 25s, floor of 0.2 until 30s, zero from 30s (timeout).
pub fn time_factor(elapsed_ms: u64) -> f64 {
    let t = elapsed_ms as f64 / 1000.0;
    if t <= 7.0 {
        1.0
    } else if t < 25.0 {
        1.0 - ((t - 7.0) / 18.0) * 0.8
    } else if t < 30.0 {
        0.2
    } else {
        0.0
    }
}

/// Consecutive-correct bonus, 5% per streak step capped at 1.25.
pub fn streak_multiplier(streak: u32) -> f64 {
    (1.0 + STREAK_STEP * streak as f64).min(STREAK_CAP)
}

/// Theoretical maximum raw score for a drawn set: every question answered
/// correctly at full time factor, streak growing by the live multiplier rule.
/// Clamped to a minimum of 1.0 so normalization never divides by zero.
pub fn max_raw_points(set: &[QuestionRecord]) -> f64 {
    let mut streak = 0u32;
    let mut max = 0.0;
    for q in set {
        streak += 1;
        max += q.value * streak_multiplier(streak);
    }
    if max > 0.0 {
        max
    } else {
        1.0
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Tally {
    pub correct: u32,
    pub total: u32,
}

/// Accumulated scoring state for one session: raw points, the live streak,
/// and the per-difficulty / fast-wrong tallies the anti-guess adjustment
/// reads after the session finishes.
#[derive(Clone, Debug, Default)]
pub struct ScoreBook {
    pub raw_points: f64,
    pub streak: u32,
    pub by_difficulty: HashMap<String, Tally>,
    pub fast_wrong: u32,
    pub total_wrong: u32,
}

impl ScoreBook {
    /// Record one terminal answer event. `chosen` is `None` for a timeout.
    /// Returns the points gained by this answer.
    pub fn record(&mut self, question: &QuestionRecord, chosen: Option<&str>, elapsed_ms: u64) -> f64 {
        let correct = chosen.is_some_and(|key| key == question.answer_key);

        let tally = self
            .by_difficulty
            .entry(question.difficulty.clone())
            .or_default();
        tally.total += 1;
        if correct {
            tally.correct += 1;
        }

        if !correct && question.kind == Kind::MultipleChoice {
            self.total_wrong += 1;
            if elapsed_ms <= FAST_WRONG_MS {
                self.fast_wrong += 1;
            }
        }

        if correct {
            self.streak += 1;
            let gained = question.value * time_factor(elapsed_ms) * streak_multiplier(self.streak);
            self.raw_points += gained;
            gained
        } else {
            self.streak = 0;
            0.0
        }
    }

    /// Accuracy for one difficulty tier; 0 when nothing was attempted.
    pub fn accuracy(&self, difficulty: &str) -> f64 {
        match self.by_difficulty.get(difficulty) {
            Some(tally) if tally.total > 0 => tally.correct as f64 / tally.total as f64,
            _ => 0.0,
        }
    }

    /// Share of wrong multiple-choice answers submitted inside the fast-wrong
    /// window; 0 when no wrong multiple-choice answers occurred.
    pub fn fast_wrong_rate(&self) -> f64 {
        if self.total_wrong == 0 {
            0.0
        } else {
            self.fast_wrong as f64 / self.total_wrong as f64
        }
    }
}
