use crate::quiz::Quiz;
use crate::scoring::ScoreBook;
use chrono::{DateTime, Local};

// Tuned anti-guess constants. These thresholds have no derivation beyond
// playtesting; keep them as-is rather than re-deriving.
const EASY_ACCURACY_FLOOR: f64 = 0.50;
const INVERSION_GAP: f64 = 0.35;
const CONSISTENCY_MIN: f64 = 0.60;
const FAST_WRONG_SOFT: f64 = 0.40;
const FAST_WRONG_HARD: f64 = 0.55;
const GUESS_MIN: f64 = 0.70;

/// One achievement tier: the minimum final score that earns `label`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tier {
    pub min_score: u32,
    pub label: &'static str,
}

/// Default tier ladder, ascending. The 0-minimum floor guarantees a tier is
/// always found.
pub const TIERS: [Tier; 6] = [
    Tier { min_score: 0, label: "Bronze" },
    Tier { min_score: 200, label: "Silver" },
    Tier { min_score: 400, label: "Gold" },
    Tier { min_score: 600, label: "Platinum" },
    Tier { min_score: 750, label: "Diamond" },
    Tier { min_score: 900, label: "Conqueror" },
];

/// Highest tier whose minimum is at or below `score`
pub fn pick_tier<'a>(score: u32, tiers: &'a [Tier]) -> &'a Tier {
    let mut chosen = &tiers[0];
    for tier in tiers {
        if score >= tier.min_score {
            chosen = tier;
        }
    }
    chosen
}

/// Penalizes the "hard beaten but easy missed" pattern, which is
/// inconsistent with genuine skill. Accuracy of an unattempted tier reads
/// as 0 here.
pub fn consistency_factor(book: &ScoreBook) -> f64 {
    let easy = book.accuracy("Easy");
    let hard = book.accuracy("Hard");
    let elite = book.accuracy("Elite");

    let mut factor: f64 = 1.0;
    if easy < EASY_ACCURACY_FLOOR {
        factor -= 0.10;
    }
    if (hard - easy) >= INVERSION_GAP {
        factor -= 0.15;
    }
    if (elite - easy) >= INVERSION_GAP {
        factor -= 0.20;
    }
    factor.clamp(CONSISTENCY_MIN, 1.0)
}

/// Penalizes rapid wrong multiple-choice answers, a chance-guessing
/// signature.
pub fn guess_factor(book: &ScoreBook) -> f64 {
    let rate = book.fast_wrong_rate();
    let mut factor: f64 = 1.0;
    if rate >= FAST_WRONG_SOFT {
        factor -= 0.10;
    }
    if rate >= FAST_WRONG_HARD {
        factor -= 0.10;
    }
    factor.clamp(GUESS_MIN, 1.0)
}

/// Final snapshot of one play-through; the entire handoff to presentation
/// and share collaborators.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionResult {
    pub final_score: u32,
    pub tier_label: String,
    pub player_label: String,
    pub finished_at: DateTime<Local>,
}

/// Normalize raw points against the drawn set's theoretical maximum, apply
/// both anti-guess factors, clamp to [0, 1000], and map onto the tier
/// ladder. Runs once, after the session reaches `Finished`.
pub fn finalize(quiz: &Quiz, tiers: &[Tier]) -> SessionResult {
    let normalized =
        ((1000.0 * quiz.book.raw_points / quiz.max_raw_points).round()).clamp(0.0, 1000.0);

    let consistency = consistency_factor(&quiz.book);
    let guess = guess_factor(&quiz.book);
    let final_score = (normalized * consistency * guess).round().clamp(0.0, 1000.0) as u32;

    SessionResult {
        final_score,
        tier_label: pick_tier(final_score, tiers).label.to_string(),
        player_label: quiz.player_label.clone(),
        finished_at: Local::now(),
    }
}

/// Share message for the results screen's tweet intent
pub fn share_text(result: &SessionResult) -> String {
    format!(
        "{} scored {} ({}) in the kwiz knowledge challenge. Can you beat it?",
        result.player_label, result.final_score, result.tier_label
    )
}
