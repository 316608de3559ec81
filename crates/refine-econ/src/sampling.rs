//! Seeded Monte Carlo rollouts of a refining strategy.
//!
//! Used to cross-check [`crate::simulate`] empirically: the sampled mean cost
//! converges to the expected cost as `runs` grows.

use crate::schedule::{Attempt, AttemptSchedule};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use refine_core::{MarketPriceTable, RefiningStage};
use serde::{Deserialize, Serialize};

/// Aggregate of sampled refining runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SampleSummary {
    pub runs: u32,
    /// Mean gold spent per run, one-time material included.
    pub mean_cost: f64,
    /// Mean attempts made per run.
    pub mean_attempts: f64,
    /// Share of runs that succeeded within the horizon.
    pub success_share: f64,
}

/// Roll `runs` independent refining runs with a seeded RNG.
///
/// Returns `None` when `runs` is zero.
pub fn sample_strategy(
    stage: &RefiningStage,
    prices: &MarketPriceTable,
    breath_uses: u32,
    metallurgy_uses: u32,
    max_attempts: u32,
    runs: u32,
    seed: u64,
) -> Option<SampleSummary> {
    if runs == 0 {
        return None;
    }
    let schedule = AttemptSchedule::new(stage, prices, breath_uses, metallurgy_uses, max_attempts);
    let one_time = schedule.costs().one_time;
    let attempts: Vec<Attempt> = schedule.collect();

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut total_cost = 0.0_f64;
    let mut total_attempts = 0u64;
    let mut successes = 0u32;
    for _ in 0..runs {
        total_cost += one_time;
        for a in &attempts {
            total_cost += a.cost;
            total_attempts += 1;
            let roll: f64 = rng.gen();
            if roll * 100.0 < a.actual_rate {
                successes += 1;
                break;
            }
        }
    }

    let n = f64::from(runs);
    Some(SampleSummary {
        runs,
        mean_cost: total_cost / n,
        mean_attempts: total_attempts as f64 / n,
        success_share: f64::from(successes) / n,
    })
}
