use crate::question::{canon_label, Kind, QuestionRecord, AREAS};
use crate::scoring;
use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{HashMap, HashSet};

pub const DEFAULT_SESSION_SIZE: usize = 24;

/// Difficulty tiers in draw order, rarest quota first, so scarce tiers are
/// not crowded out of the pool by common ones.
pub const DIFFICULTY_DRAW_ORDER: [&str; 4] = ["Elite", "Hard", "Medium", "Easy"];

// Quota weights at the default session size of 24
const DIFFICULTY_WEIGHTS: [(&str, usize); 4] =
    [("Easy", 6), ("Medium", 8), ("Hard", 6), ("Elite", 4)];
const KIND_WEIGHTS: [(Kind, usize); 2] = [(Kind::MultipleChoice, 18), (Kind::TrueFalse, 6)];

/// Per-dimension target counts for one drawn session. Each table sums to the
/// session size.
#[derive(Clone, Debug)]
pub struct Quotas {
    pub difficulty: HashMap<String, usize>,
    pub kind: HashMap<Kind, usize>,
    pub area: HashMap<String, usize>,
}

impl Quotas {
    /// Scale the default quota ratios to an arbitrary session size, keeping
    /// each table summing to `size` (largest-remainder apportionment).
    pub fn balanced(size: usize) -> Self {
        let difficulty = apportion(&DIFFICULTY_WEIGHTS, size)
            .into_iter()
            .map(|(d, n)| (d.to_string(), n))
            .collect();
        let area_weights: Vec<(&str, usize)> = AREAS.iter().map(|a| (*a, 1)).collect();
        let area = apportion(&area_weights, size)
            .into_iter()
            .map(|(a, n)| (a.to_string(), n))
            .collect();
        let kind = apportion(&KIND_WEIGHTS, size).into_iter().collect();
        Quotas {
            difficulty,
            kind,
            area,
        }
    }
}

impl Default for Quotas {
    fn default() -> Self {
        Self::balanced(DEFAULT_SESSION_SIZE)
    }
}

/// Split `size` across weighted keys; floors first, remainders to the
/// largest fractional shares, ties resolved by table order.
fn apportion<K: Copy>(weights: &[(K, usize)], size: usize) -> Vec<(K, usize)> {
    let total: usize = weights.iter().map(|(_, w)| w).sum();
    if total == 0 {
        return weights.iter().map(|(k, _)| (*k, 0)).collect();
    }
    let mut shares: Vec<(K, usize, usize)> = weights
        .iter()
        .map(|(k, w)| (*k, size * w / total, size * w % total))
        .collect();
    let mut leftover = size - shares.iter().map(|s| s.1).sum::<usize>();
    let mut order: Vec<usize> = (0..shares.len()).collect();
    order.sort_by(|&a, &b| shares[b].2.cmp(&shares[a].2));
    for i in order {
        if leftover == 0 {
            break;
        }
        shares[i].1 += 1;
        leftover -= 1;
    }
    shares.into_iter().map(|(k, n, _)| (k, n)).collect()
}

/// One balanced draw: the session queue in presentation order plus the
/// theoretical maximum raw score for that exact set.
#[derive(Clone, Debug)]
pub struct DrawnSet {
    pub queue: Vec<QuestionRecord>,
    pub max_raw_points: f64,
}

pub fn draw(pool: &[QuestionRecord], quotas: &Quotas, size: usize) -> DrawnSet {
    draw_with_rng(pool, quotas, size, &mut rand::thread_rng())
}

/// Draw up to `size` questions satisfying the quota tables as closely as the
/// pool allows. Never repeats an id; a pool smaller than `size` yields a
/// short session rather than an error.
pub fn draw_with_rng<R: Rng>(
    pool: &[QuestionRecord],
    quotas: &Quotas,
    size: usize,
    rng: &mut R,
) -> DrawnSet {
    // Canonicalize labels so they line up with the quota keys, and reset the
    // runtime carry field for the fresh session.
    let pool: Vec<QuestionRecord> = pool
        .iter()
        .map(|q| {
            let mut q = q.clone();
            q.area = canon_label(&q.area);
            q.difficulty = canon_label(&q.difficulty);
            q.elapsed_carry_ms = 0;
            q
        })
        .collect();

    // Arena of pool indices per (area, difficulty, kind); each bucket is
    // shuffled so popping the tail is an unbiased draw.
    let mut buckets: HashMap<(String, String, Kind), Vec<usize>> = pool
        .iter()
        .enumerate()
        .map(|(i, q)| ((q.area.clone(), q.difficulty.clone(), q.kind), i))
        .into_group_map();
    for bucket in buckets.values_mut() {
        bucket.shuffle(rng);
    }

    let mut need_difficulty = quotas.difficulty.clone();
    let mut need_area = quotas.area.clone();
    let mut need_kind = quotas.kind.clone();

    let mut picked: Vec<usize> = Vec::with_capacity(size);
    let mut used_ids: HashSet<String> = HashSet::new();

    for difficulty in DIFFICULTY_DRAW_ORDER {
        while picked.len() < size && need_difficulty.get(difficulty).copied().unwrap_or(0) > 0 {
            let mut candidates: Vec<&String> = need_area
                .iter()
                .filter(|(_, &left)| left > 0)
                .map(|(area, _)| area)
                .sorted()
                .collect();
            if candidates.is_empty() {
                break;
            }
            // uniform random area first; the rest serve as fallback when the
            // chosen (area, difficulty) pairing is exhausted
            let lead = rng.gen_range(0..candidates.len());
            candidates.swap(0, lead);

            let mut filled_area: Option<String> = None;
            for area in candidates {
                if let Some(idx) = pick_one(
                    &pool,
                    &mut buckets,
                    &mut used_ids,
                    &mut need_kind,
                    area,
                    difficulty,
                ) {
                    picked.push(idx);
                    filled_area = Some(area.clone());
                    break;
                }
            }

            // Quota counters move only on success; a tier with no stock left
            // anywhere is abandoned.
            match filled_area {
                Some(area) => {
                    if let Some(left) = need_difficulty.get_mut(difficulty) {
                        *left -= 1;
                    }
                    if let Some(left) = need_area.get_mut(&area) {
                        *left -= 1;
                    }
                }
                None => break,
            }
        }
    }

    // Backfill with whatever is left, quotas ignored, until the target size
    // or the pool runs dry.
    if picked.len() < size {
        let mut rest: Vec<usize> = (0..pool.len())
            .filter(|&i| !used_ids.contains(&pool[i].id))
            .collect();
        rest.shuffle(rng);
        while picked.len() < size {
            let Some(idx) = rest.pop() else { break };
            if !used_ids.insert(pool[idx].id.clone()) {
                continue;
            }
            picked.push(idx);
        }
    }

    // Presentation order must not leak selection order.
    picked.shuffle(rng);

    let queue: Vec<QuestionRecord> = picked.into_iter().map(|i| pool[i].clone()).collect();
    let max_raw_points = scoring::max_raw_points(&queue);
    DrawnSet {
        queue,
        max_raw_points,
    }
}

/// Try to take one unused question for (area, difficulty), preferring the
/// kind that is further under its quota and falling back to the other.
fn pick_one(
    pool: &[QuestionRecord],
    buckets: &mut HashMap<(String, String, Kind), Vec<usize>>,
    used_ids: &mut HashSet<String>,
    need_kind: &mut HashMap<Kind, usize>,
    area: &str,
    difficulty: &str,
) -> Option<usize> {
    let mc_left = need_kind.get(&Kind::MultipleChoice).copied().unwrap_or(0);
    let tf_left = need_kind.get(&Kind::TrueFalse).copied().unwrap_or(0);
    let preference = if mc_left >= tf_left {
        [Kind::MultipleChoice, Kind::TrueFalse]
    } else {
        [Kind::TrueFalse, Kind::MultipleChoice]
    };

    for kind in preference {
        let key = (area.to_string(), difficulty.to_string(), kind);
        let Some(bucket) = buckets.get_mut(&key) else {
            continue;
        };
        while let Some(idx) = bucket.pop() {
            if !used_ids.insert(pool[idx].id.clone()) {
                continue;
            }
            if let Some(left) = need_kind.get_mut(&kind) {
                *left = left.saturating_sub(1);
            }
            return Some(idx);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::tests::{mc_question, tf_question};
    use crate::question::DIFFICULTIES;

    /// Pool with plenty of stock in every (area, difficulty, kind) bucket
    fn ample_pool() -> Vec<QuestionRecord> {
        let mut pool = Vec::new();
        for area in AREAS {
            for difficulty in DIFFICULTIES {
                for n in 0..6 {
                    pool.push(mc_question(
                        &format!("mc-{area}-{difficulty}-{n}"),
                        area,
                        difficulty,
                    ));
                }
                for n in 0..3 {
                    pool.push(tf_question(
                        &format!("tf-{area}-{difficulty}-{n}"),
                        area,
                        difficulty,
                    ));
                }
            }
        }
        pool
    }

    fn count_by<F: Fn(&QuestionRecord) -> String>(queue: &[QuestionRecord], f: F) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for q in queue {
            *counts.entry(f(q)).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn test_default_quotas_sum_to_session_size() {
        let quotas = Quotas::default();
        assert_eq!(quotas.difficulty.values().sum::<usize>(), 24);
        assert_eq!(quotas.area.values().sum::<usize>(), 24);
        assert_eq!(quotas.kind.values().sum::<usize>(), 24);
        assert_eq!(quotas.difficulty["Easy"], 6);
        assert_eq!(quotas.difficulty["Medium"], 8);
        assert_eq!(quotas.difficulty["Hard"], 6);
        assert_eq!(quotas.difficulty["Elite"], 4);
        assert_eq!(quotas.kind[&Kind::MultipleChoice], 18);
        assert_eq!(quotas.kind[&Kind::TrueFalse], 6);
    }

    #[test]
    fn test_balanced_quotas_scale_to_other_sizes() {
        for size in [1, 5, 10, 12, 23, 48] {
            let quotas = Quotas::balanced(size);
            assert_eq!(quotas.difficulty.values().sum::<usize>(), size, "size {size}");
            assert_eq!(quotas.area.values().sum::<usize>(), size, "size {size}");
            assert_eq!(quotas.kind.values().sum::<usize>(), size, "size {size}");
        }
    }

    #[test]
    fn test_draw_meets_quotas_with_ample_pool() {
        let pool = ample_pool();
        let drawn = draw(&pool, &Quotas::default(), 24);

        assert_eq!(drawn.queue.len(), 24);

        let by_difficulty = count_by(&drawn.queue, |q| q.difficulty.clone());
        assert_eq!(by_difficulty["Easy"], 6);
        assert_eq!(by_difficulty["Medium"], 8);
        assert_eq!(by_difficulty["Hard"], 6);
        assert_eq!(by_difficulty["Elite"], 4);

        let by_area = count_by(&drawn.queue, |q| q.area.clone());
        for area in AREAS {
            assert_eq!(by_area[area], 6, "area {area}");
        }
    }

    #[test]
    fn test_draw_never_repeats_an_id() {
        let pool = ample_pool();
        for _ in 0..20 {
            let drawn = draw(&pool, &Quotas::default(), 24);
            let mut seen = HashSet::new();
            for q in &drawn.queue {
                assert!(seen.insert(q.id.clone()), "duplicate id {}", q.id);
            }
        }
    }

    #[test]
    fn test_draw_excludes_duplicate_pool_ids() {
        let mut pool = Vec::new();
        for n in 0..30 {
            pool.push(mc_question(&format!("q{n}"), "History", "Easy"));
        }
        // same id present twice in the pool
        pool.push(mc_question("q0", "Science", "Hard"));

        for _ in 0..20 {
            let drawn = draw(&pool, &Quotas::default(), 24);
            let q0_count = drawn.queue.iter().filter(|q| q.id == "q0").count();
            assert!(q0_count <= 1);
        }
    }

    #[test]
    fn test_short_pool_yields_short_session() {
        let pool: Vec<QuestionRecord> = (0..5)
            .map(|n| mc_question(&format!("q{n}"), "History", "Easy"))
            .collect();
        let drawn = draw(&pool, &Quotas::default(), 24);
        assert_eq!(drawn.queue.len(), 5);
    }

    #[test]
    fn test_empty_pool_yields_empty_session() {
        let drawn = draw(&[], &Quotas::default(), 24);
        assert!(drawn.queue.is_empty());
        assert_eq!(drawn.max_raw_points, 1.0);
    }

    #[test]
    fn test_backfill_ignores_quotas() {
        // Nothing matches the canonical areas, so the tier loop finds no
        // stock and backfill must still fill the session.
        let pool: Vec<QuestionRecord> = (0..30)
            .map(|n| mc_question(&format!("q{n}"), "Mythology", "nightmare"))
            .collect();
        let drawn = draw(&pool, &Quotas::default(), 24);
        assert_eq!(drawn.queue.len(), 24);
        assert!(drawn.queue.iter().all(|q| q.area == "Mythology"));
    }

    #[test]
    fn test_labels_are_canonicalized() {
        let mut pool = ample_pool();
        for q in &mut pool {
            q.area = q.area.to_lowercase();
            q.difficulty = q.difficulty.to_uppercase();
        }
        let drawn = draw(&pool, &Quotas::default(), 24);
        for q in &drawn.queue {
            assert!(AREAS.contains(&q.area.as_str()), "area {}", q.area);
            assert!(
                DIFFICULTIES.contains(&q.difficulty.as_str()),
                "difficulty {}",
                q.difficulty
            );
        }
    }

    #[test]
    fn test_carry_reset_at_sampling_time() {
        let mut pool = ample_pool();
        for q in &mut pool {
            q.elapsed_carry_ms = 9_000;
        }
        let drawn = draw(&pool, &Quotas::default(), 24);
        assert!(drawn.queue.iter().all(|q| q.elapsed_carry_ms == 0));
    }

    #[test]
    fn test_max_raw_points_computed_for_drawn_set() {
        let pool = ample_pool();
        let drawn = draw(&pool, &Quotas::default(), 24);
        assert!(
            (drawn.max_raw_points - scoring::max_raw_points(&drawn.queue)).abs() < 1e-9
        );
        assert!(drawn.max_raw_points > 0.0);
    }

    #[test]
    fn test_kind_quota_is_best_effort_with_ample_pool() {
        // With stock in every bucket the soft kind preference lands on the
        // exact targets.
        let pool = ample_pool();
        let drawn = draw(&pool, &Quotas::default(), 24);
        let mc = drawn
            .queue
            .iter()
            .filter(|q| q.kind == Kind::MultipleChoice)
            .count();
        assert_eq!(mc, 18);
        assert_eq!(drawn.queue.len() - mc, 6);
    }

    #[test]
    fn test_kind_quota_not_enforced_when_pool_is_skewed() {
        // A pool of nothing but true/false questions still fills the session.
        let mut pool = Vec::new();
        for area in AREAS {
            for difficulty in DIFFICULTIES {
                for n in 0..3 {
                    pool.push(tf_question(&format!("tf-{area}-{difficulty}-{n}"), area, difficulty));
                }
            }
        }
        let drawn = draw(&pool, &Quotas::default(), 24);
        assert_eq!(drawn.queue.len(), 24);
        assert!(drawn.queue.iter().all(|q| q.kind == Kind::TrueFalse));
    }

    #[test]
    fn test_apportion_largest_remainder() {
        let shares = apportion(&DIFFICULTY_WEIGHTS, 12);
        let map: HashMap<&str, usize> = shares.into_iter().collect();
        assert_eq!(map.values().sum::<usize>(), 12);
        assert_eq!(map["Medium"], 4);
    }
}
